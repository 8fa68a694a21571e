// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Image processor — single-image primitives for the derivation pipeline:
// decode with metadata, scale, append, bound to a maximal dimension, and
// JPEG re-encode at a configured quality with DPI carry-over.

use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};
use tracing::{debug, instrument};

use blattwerk_core::error::{BlattwerkError, Result};

use super::jfif::{self, JpegDensity};

/// Error marker: a long chain of down-scales must not make an appended
/// footer band disappear.
pub const EXPECTED_MINIMAL_HEIGHT: u32 = 25;

/// Stateless-per-image processor carrying the step's encoding parameters.
pub struct ImageProcessor {
    /// JPEG quality in 1..=100.
    quality: u8,
    /// Maximal dimension in width or height; 0 means unbounded.
    maximal: u32,
}

impl ImageProcessor {
    pub fn new(quality: u8, maximal: u32) -> Self {
        Self { quality, maximal }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    // -- Decoding -------------------------------------------------------------

    /// Load an image together with the density metadata of its source
    /// format.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn read_with_metadata(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<(DynamicImage, Option<JpegDensity>)> {
        let path = path.as_ref();
        let img = image::open(path).map_err(|err| {
            BlattwerkError::Image(format!("failed to open {}: {}", path.display(), err))
        })?;
        let density = jfif::source_density(path)?;
        debug!(width = img.width(), height = img.height(), ?density, "image loaded");
        Ok((img, density))
    }

    // -- Geometry -------------------------------------------------------------

    /// Scale both dimensions by `ratio` using Lanczos3 resampling.
    pub fn scale(&self, img: &DynamicImage, ratio: f32) -> DynamicImage {
        let width = ((img.width() as f32 * ratio) as u32).max(1);
        let height = ((img.height() as f32 * ratio) as u32).max(1);
        img.resize_exact(width, height, FilterType::Lanczos3)
    }

    /// Draw `bottom` below `top` on a canvas of the top image's width.
    pub fn append(&self, top: &DynamicImage, bottom: &DynamicImage) -> DynamicImage {
        let width = top.width();
        let height = top.height() + bottom.height();
        let mut canvas = RgbImage::from_pixel(width, height, image::Rgb([255, 255, 255]));
        image::imageops::overlay(&mut canvas, &top.to_rgb8(), 0, 0);
        image::imageops::overlay(&mut canvas, &bottom.to_rgb8(), 0, top.height() as i64);
        DynamicImage::ImageRgb8(canvas)
    }

    pub fn clone_image(&self, img: &DynamicImage) -> DynamicImage {
        img.clone()
    }

    /// Scale down so that `max(width, height) <= maximal`; identity when
    /// already within bounds or when no bound is configured.
    pub fn handle_maximal(&self, img: DynamicImage) -> DynamicImage {
        if self.maximal == 0 {
            return img;
        }
        let (width, height) = (img.width(), img.height());
        if width <= self.maximal && height <= self.maximal {
            return img;
        }
        let ratio = self.maximal as f32 / width.max(height) as f32;
        debug!(width, height, ratio, "bounding image to maximal dimension");
        self.scale(&img, ratio)
    }

    // -- Encoding -------------------------------------------------------------

    /// Encode as JPEG at the configured quality, stamping the given density
    /// metadata into the JFIF header, and write to `path`.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn write_jpeg(
        &self,
        img: &DynamicImage,
        path: impl AsRef<Path>,
        density: Option<JpegDensity>,
    ) -> Result<()> {
        let path = path.as_ref();
        let mut encoded = self.encode_jpeg(img)?;
        if let Some(density) = density {
            jfif::apply_density(&mut encoded, density)?;
        }
        std::fs::write(path, &encoded).map_err(|err| {
            BlattwerkError::Image(format!("failed to write {}: {}", path.display(), err))
        })?;
        debug!(bytes = encoded.len(), "JPEG written");
        Ok(())
    }

    fn encode_jpeg(&self, img: &DynamicImage) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, self.quality);
        // keep single-channel sources single-channel
        match img {
            DynamicImage::ImageLuma8(gray) => gray.write_with_encoder(encoder),
            DynamicImage::ImageLuma16(_) => img.to_luma8().write_with_encoder(encoder),
            _ => img.to_rgb8().write_with_encoder(encoder),
        }
        .map_err(|err| BlattwerkError::Image(format!("JPEG encoding failed: {err}")))?;
        Ok(buffer)
    }
}
