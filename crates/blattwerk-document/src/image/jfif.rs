// SPDX-License-Identifier: PMPL-1.0-or-later
//
// JFIF density metadata on encoded JPEG streams.
//
// DPI carry-over works on the byte level: after encoding, the APP0 JFIF
// segment is patched in place (or synthesised directly after SOI) with the
// density taken from the source image. TIFF sources contribute their
// XResolution tag translated to dots-per-inch units; JPEG sources forward
// their existing JFIF fields unchanged.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use tiff::decoder::ifd::Value;
use tiff::decoder::Decoder;
use tiff::tags::Tag;
use tracing::debug;

use blattwerk_core::error::{BlattwerkError, Result};

/// Density units: dots per inch.
pub const UNITS_INCH: u8 = 1;

/// JFIF density fields of a JPEG stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JpegDensity {
    /// 0 = aspect ratio only, 1 = dots/inch, 2 = dots/cm.
    pub units: u8,
    pub x_density: u16,
    pub y_density: u16,
}

impl JpegDensity {
    pub fn dpi(dots_per_inch: u16) -> Self {
        Self {
            units: UNITS_INCH,
            x_density: dots_per_inch,
            y_density: dots_per_inch,
        }
    }
}

/// Read the density metadata belonging to a source image. TIFF resolution
/// tags are translated; JPEG JFIF fields are forwarded as-is.
pub fn source_density(path: &Path) -> Result<Option<JpegDensity>> {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "tif" | "tiff" => tiff_density(path),
        "jpg" | "jpeg" => {
            let bytes = std::fs::read(path)?;
            Ok(read_density(&bytes))
        }
        _ => Ok(None),
    }
}

/// XResolution (tag 282) of a TIFF file, assuming square pixels, mapped
/// to inch units.
fn tiff_density(path: &Path) -> Result<Option<JpegDensity>> {
    let reader = BufReader::new(File::open(path)?);
    let mut decoder = Decoder::new(reader).map_err(|err| {
        BlattwerkError::Image(format!("cannot read TIFF {}: {}", path.display(), err))
    })?;
    let value = decoder.find_tag(Tag::XResolution).map_err(|err| {
        BlattwerkError::Image(format!("TIFF tag access failed: {err}"))
    })?;
    let dpi = value.and_then(rational_value);
    debug!(path = %path.display(), ?dpi, "TIFF resolution read");
    Ok(dpi.map(|dots| JpegDensity::dpi(dots as u16)))
}

fn rational_value(value: Value) -> Option<f64> {
    match value {
        Value::Rational(numerator, denominator) if denominator != 0 => {
            Some(numerator as f64 / denominator as f64)
        }
        Value::RationalBig(numerator, denominator) if denominator != 0 => {
            Some(numerator as f64 / denominator as f64)
        }
        Value::Unsigned(plain) => Some(plain as f64),
        Value::List(values) => values.into_iter().next().and_then(rational_value),
        _ => None,
    }
}

/// Parse the density fields of an encoded JPEG's APP0 JFIF segment.
pub fn read_density(jpeg: &[u8]) -> Option<JpegDensity> {
    let app0 = find_app0(jpeg)?;
    Some(JpegDensity {
        units: jpeg[app0 + 9],
        x_density: u16::from_be_bytes([jpeg[app0 + 10], jpeg[app0 + 11]]),
        y_density: u16::from_be_bytes([jpeg[app0 + 12], jpeg[app0 + 13]]),
    })
}

/// Write density fields into an encoded JPEG, patching the existing JFIF
/// segment or inserting a fresh one right after SOI.
pub fn apply_density(jpeg: &mut Vec<u8>, density: JpegDensity) -> Result<()> {
    if jpeg.len() < 4 || jpeg[0] != 0xFF || jpeg[1] != 0xD8 {
        return Err(BlattwerkError::Image("not a JPEG stream".into()));
    }
    if let Some(app0) = find_app0(jpeg) {
        jpeg[app0 + 9] = density.units;
        jpeg[app0 + 10..app0 + 12].copy_from_slice(&density.x_density.to_be_bytes());
        jpeg[app0 + 12..app0 + 14].copy_from_slice(&density.y_density.to_be_bytes());
        return Ok(());
    }

    // no JFIF header present: synthesise a minimal APP0 segment
    let mut segment = Vec::with_capacity(18);
    segment.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x10]);
    segment.extend_from_slice(b"JFIF\0");
    segment.extend_from_slice(&[1, 1, density.units]);
    segment.extend_from_slice(&density.x_density.to_be_bytes());
    segment.extend_from_slice(&density.y_density.to_be_bytes());
    segment.extend_from_slice(&[0, 0]);
    jpeg.splice(2..2, segment);
    Ok(())
}

/// Offset of the APP0 marker byte (0xFF) of a JFIF segment, if present
/// among the leading segments.
fn find_app0(jpeg: &[u8]) -> Option<usize> {
    let mut offset = 2usize;
    while offset + 4 <= jpeg.len() {
        if jpeg[offset] != 0xFF {
            return None;
        }
        let marker = jpeg[offset + 1];
        // start of scan: no metadata segments beyond this point
        if marker == 0xDA {
            return None;
        }
        let length = u16::from_be_bytes([jpeg[offset + 2], jpeg[offset + 3]]) as usize;
        if marker == 0xE0
            && offset + 9 + 5 <= jpeg.len()
            && &jpeg[offset + 4..offset + 9] == b"JFIF\0"
            && offset + 14 <= jpeg.len()
        {
            return Some(offset);
        }
        offset += 2 + length;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded_jpeg() -> Vec<u8> {
        let img = ::image::RgbImage::from_pixel(32, 16, ::image::Rgb([200, 200, 200]));
        let mut buffer = Vec::new();
        let encoder =
            ::image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, 80);
        img.write_with_encoder(encoder).unwrap();
        buffer
    }

    #[test]
    fn density_survives_patch_and_reparse() {
        let mut jpeg = encoded_jpeg();
        apply_density(&mut jpeg, JpegDensity::dpi(300)).unwrap();

        let density = read_density(&jpeg).unwrap();
        assert_eq!(density.units, UNITS_INCH);
        assert_eq!(density.x_density, 300);
        assert_eq!(density.y_density, 300);

        // still a decodable JPEG
        let decoded = ::image::load_from_memory(&jpeg).unwrap();
        assert_eq!(decoded.width(), 32);
    }

    #[test]
    fn patch_is_idempotent_in_size() {
        let mut jpeg = encoded_jpeg();
        let before = jpeg.len();
        apply_density(&mut jpeg, JpegDensity::dpi(300)).unwrap();
        let after_first = jpeg.len();
        apply_density(&mut jpeg, JpegDensity::dpi(150)).unwrap();
        // a second patch rewrites fields without growing the stream
        assert_eq!(jpeg.len(), after_first);
        assert!(after_first == before || after_first == before + 18);
        assert_eq!(read_density(&jpeg).unwrap().x_density, 150);
    }

    #[test]
    fn garbage_is_rejected() {
        let mut garbage = vec![0u8; 16];
        assert!(apply_density(&mut garbage, JpegDensity::dpi(300)).is_err());
    }

    #[test]
    fn non_image_extension_has_no_density() {
        assert!(source_density(Path::new("metadata.xml")).unwrap().is_none());
    }
}
