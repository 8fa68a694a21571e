// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Image step execution: every page of a step is dispatched onto the
// bounded pool, each worker owning exactly one page at a time. A failing
// page cancels the step and surfaces its error when the pool joins.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use tracing::{info, warn};

use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::plan::{DerivateStep, StepKind};
use blattwerk_core::DigitalPage;
use blattwerk_document::footer::FooterRenderer;
use blattwerk_document::image::processor::ImageProcessor;

use crate::pool;

/// Run one image step over all pages.
///
/// `granular_counter` tallies the pages that actually carried a granular
/// URN (exposed in the run summary).
pub fn execute_image_step(
    step: &DerivateStep,
    pages: &mut [DigitalPage],
    footer: Option<&FooterRenderer>,
    granular_counter: &AtomicUsize,
) -> Result<()> {
    std::fs::create_dir_all(&step.output_dir)?;

    let pool_size = pool::effective_pool_size(step.pool_size);
    info!(
        "process {:02} images in {} with quality {:02} in {:02} threads",
        pages.len(),
        step.input_dir.display(),
        step.quality,
        pool_size
    );

    let processor = ImageProcessor::new(step.quality, step.maximal);
    let started = Instant::now();

    let pool = pool::build_pool(pool_size)?;
    pool.install(|| {
        pages.par_iter_mut().try_for_each(|page| {
            process_page(step, &processor, footer, granular_counter, page)
        })
    })?;

    let elapsed = started.elapsed();
    info!(
        "created {:02} images at {} in {}m{:02}s",
        pages.len(),
        step.output_dir.display(),
        elapsed.as_secs() / 60,
        elapsed.as_secs() % 60
    );
    Ok(())
}

fn process_page(
    step: &DerivateStep,
    processor: &ImageProcessor,
    footer: Option<&FooterRenderer>,
    granular_counter: &AtomicUsize,
    page: &mut DigitalPage,
) -> Result<()> {
    let (img, density) = processor.read_with_metadata(&page.image_path)?;
    let img = processor.handle_maximal(img);

    let (img, footer_height) = match step.kind {
        StepKind::ImageCopy | StepKind::ImageScale => (img, None),
        StepKind::ImageFooter => {
            let renderer = footer_renderer(footer)?;
            let (branded, height) = renderer.brand(processor, &img, None)?;
            (branded, Some(height))
        }
        StepKind::ImageFooterGranular => {
            let renderer = footer_renderer(footer)?;
            let granular = match &page.identifier {
                Some(urn) => {
                    granular_counter.fetch_add(1, Ordering::Relaxed);
                    Some(urn.as_str())
                }
                None => {
                    warn!("no granular URN for {page}");
                    None
                }
            };
            let (branded, height) = renderer.brand(processor, &img, granular)?;
            (branded, Some(height))
        }
        StepKind::Pdf | StepKind::Enrich => {
            return Err(BlattwerkError::Config(format!(
                "step kind {:?} is not an image step",
                step.kind
            )))
        }
    };

    let target = step.output_dir.join(jpeg_name(&page.file_pointer));
    processor.write_jpeg(&img, &target, density)?;

    page.image_path = target;
    if footer_height.is_some() {
        page.footer_height = footer_height;
    }
    Ok(())
}

fn footer_renderer(footer: Option<&FooterRenderer>) -> Result<&FooterRenderer> {
    footer.ok_or_else(|| {
        BlattwerkError::Config("footer step declared without a footer template".into())
    })
}

/// Output basename: the page's file pointer with a `.jpg` extension.
fn jpeg_name(file_pointer: &str) -> String {
    let stem = Path::new(file_pointer)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_pointer.to_string());
    format!("{stem}.jpg")
}

#[cfg(test)]
mod tests {
    use super::*;
    use blattwerk_core::plan::StepKind;
    use image::{DynamicImage, Rgb, RgbImage};
    use std::path::PathBuf;

    fn seed_images(dir: &Path, count: usize, width: u32, height: u32) -> Vec<DigitalPage> {
        let processor = ImageProcessor::new(90, 0);
        (1..=count)
            .map(|number| {
                let name = format!("{number:08}.jpg");
                let path = dir.join(&name);
                let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(
                    width,
                    height,
                    Rgb([210, 210, 210]),
                ));
                processor.write_jpeg(&img, &path, None).unwrap();
                DigitalPage::new(number as u32, name, path)
            })
            .collect()
    }

    fn step(kind: StepKind, input: &Path, output: PathBuf, maximal: u32) -> DerivateStep {
        DerivateStep {
            kind,
            input_dir: input.to_path_buf(),
            output_dir: output,
            quality: 80,
            maximal,
            pool_size: 2,
            pdf_conformance: None,
            insert_into_mets: false,
        }
    }

    #[test]
    fn scale_step_bounds_every_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("MAX");
        std::fs::create_dir_all(&input).unwrap();
        let mut pages = seed_images(&input, 3, 400, 300);

        let step = step(StepKind::ImageScale, &input, dir.path().join("IMAGE_80"), 200);
        let counter = AtomicUsize::new(0);
        execute_image_step(&step, &mut pages, None, &counter).unwrap();

        for page in &pages {
            assert!(page.image_path.starts_with(dir.path().join("IMAGE_80")));
            let img = image::open(&page.image_path).unwrap();
            assert!(img.width().max(img.height()) <= 200);
            // aspect ratio within a pixel of rounding
            assert_eq!(img.width(), 200);
            assert_eq!(img.height(), 150);
        }
    }

    #[test]
    fn granular_step_counts_and_brands() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("MAX");
        std::fs::create_dir_all(&input).unwrap();
        let mut pages = seed_images(&input, 2, 2400, 1000);
        pages[0].identifier = Some("urn:nbn:de:gbv:3:3-21437-p0001-0".into());

        let renderer = FooterRenderer::new("Digitale Sammlungen").unwrap();
        let step = step(
            StepKind::ImageFooterGranular,
            &input,
            dir.path().join("FOOTER"),
            0,
        );
        let counter = AtomicUsize::new(0);
        execute_image_step(&step, &mut pages, Some(&renderer), &counter).unwrap();

        assert_eq!(counter.load(Ordering::Relaxed), 1);
        for page in &pages {
            assert_eq!(page.footer_height, Some(renderer.band_height()));
            let img = image::open(&page.image_path).unwrap();
            assert_eq!(img.height(), 1000 + renderer.band_height());
        }
    }

    #[test]
    fn failing_page_fails_the_step() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("MAX");
        std::fs::create_dir_all(&input).unwrap();
        let mut pages = seed_images(&input, 2, 100, 100);
        // second page points at nothing
        pages[1].image_path = input.join("missing.jpg");

        let step = step(StepKind::ImageCopy, &input, dir.path().join("OUT"), 0);
        let counter = AtomicUsize::new(0);
        let result = execute_image_step(&step, &mut pages, None, &counter);
        assert!(matches!(result, Err(BlattwerkError::Image(_))));
    }

    #[test]
    fn footer_step_without_renderer_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("MAX");
        std::fs::create_dir_all(&input).unwrap();
        let mut pages = seed_images(&input, 1, 100, 100);

        let step = step(StepKind::ImageFooter, &input, dir.path().join("OUT"), 0);
        let counter = AtomicUsize::new(0);
        let result = execute_image_step(&step, &mut pages, None, &counter);
        assert!(matches!(result, Err(BlattwerkError::Config(_))));
    }

    #[test]
    fn tif_pointer_becomes_jpg_output() {
        assert_eq!(jpeg_name("00000001.tif"), "00000001.jpg");
        assert_eq!(jpeg_name("737434.jpg"), "737434.jpg");
    }
}
