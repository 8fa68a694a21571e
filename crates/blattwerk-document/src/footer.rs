// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Footer renderer — pre-renders the template band once and brands each
// page with a clone of it, overlaying the page's granular identifier when
// one exists.

use ab_glyph::{FontRef, PxScale};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_text_mut, text_size};
use tracing::{debug, warn};

use blattwerk_core::error::{BlattwerkError, Result};

use crate::image::processor::{ImageProcessor, EXPECTED_MINIMAL_HEIGHT};

/// Packaged band font.
const FONT_BYTES: &[u8] = include_bytes!("../../../resources/fonts/DejaVuSansMono-Bold.ttf");

/// Nominal band geometry; the band is fitted to each page's width at
/// branding time.
const BAND_WIDTH: u32 = 2400;
const ROW_HEIGHT: u32 = 64;
const TEMPLATE_SCALE: f32 = 48.0;
const GRANULAR_SCALE: f32 = 40.0;

/// Tolerated relative deviation between band and page width before the
/// band is rescaled.
const MAXIMAL_RATIO_DEVIATION: f32 = 0.02;

const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Renders the per-page footer band.
///
/// The base band (template text, centred, top-to-bottom) is produced once;
/// each page clones it, optionally gains its granular identifier in the
/// reserved bottom row, is fitted to the page width and appended below the
/// page image.
pub struct FooterRenderer {
    font: FontRef<'static>,
    base: RgbImage,
}

impl FooterRenderer {
    pub fn new(template: &str) -> Result<Self> {
        let font = FontRef::try_from_slice(FONT_BYTES)
            .map_err(|err| BlattwerkError::Image(format!("footer font unusable: {err}")))?;

        let lines: Vec<&str> = template.lines().filter(|line| !line.trim().is_empty()).collect();
        if lines.is_empty() {
            return Err(BlattwerkError::Image("footer template is empty".into()));
        }

        // one extra row is reserved for the granular identifier
        let height = (lines.len() as u32 + 1) * ROW_HEIGHT;
        let mut base = RgbImage::from_pixel(BAND_WIDTH, height, WHITE);
        let scale = PxScale::from(TEMPLATE_SCALE);
        for (row, line) in lines.iter().enumerate() {
            draw_centred(&mut base, &font, scale, row as u32, line);
        }

        debug!(
            rows = lines.len(),
            width = BAND_WIDTH,
            height,
            "footer band pre-rendered"
        );
        Ok(Self { font, base })
    }

    pub fn band_height(&self) -> u32 {
        self.base.height()
    }

    /// Clone the base band and brand `image` with it.
    ///
    /// Returns the branded image and the height of the appended band.
    pub fn brand(
        &self,
        processor: &ImageProcessor,
        image: &DynamicImage,
        granular: Option<&str>,
    ) -> Result<(DynamicImage, u32)> {
        let mut band = self.base.clone();

        if let Some(urn) = granular {
            let row = band.height() / ROW_HEIGHT - 1;
            draw_centred(&mut band, &self.font, PxScale::from(GRANULAR_SCALE), row, urn);
        }

        let mut band = DynamicImage::ImageRgb8(band);
        let ratio = image.width() as f32 / band.width() as f32;
        if (1.0 - ratio).abs() > MAXIMAL_RATIO_DEVIATION {
            debug!(ratio, "scaling footer band to page width");
            band = processor.scale(&band, ratio);
        }

        if band.height() < EXPECTED_MINIMAL_HEIGHT {
            warn!(height = band.height(), "footer band collapsed");
            return Err(BlattwerkError::Image(format!(
                "scale problem: footer height dropped beneath {EXPECTED_MINIMAL_HEIGHT}"
            )));
        }

        let footer_height = band.height();
        let branded = processor.append(image, &band);
        Ok((branded, footer_height))
    }
}

fn draw_centred(canvas: &mut RgbImage, font: &FontRef<'_>, scale: PxScale, row: u32, text: &str) {
    let (text_width, text_height) = text_size(scale, font, text);
    let x = (canvas.width().saturating_sub(text_width as u32)) / 2;
    let y = row * ROW_HEIGHT + (ROW_HEIGHT.saturating_sub(text_height as u32)) / 2;
    draw_text_mut(canvas, BLACK, x as i32, y as i32, scale, font, text);
}
