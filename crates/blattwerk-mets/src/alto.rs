// SPDX-License-Identifier: PMPL-1.0-or-later
//
// ALTO OCR reader — extracts text lines with pixel bounding boxes from
// per-page OCR files. Only the line geometry (HPOS/VPOS/WIDTH/HEIGHT) and
// the concatenated String contents are consumed.

use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::{DigitalPage, OcrPage, Region, TextLine};

/// Parse an ALTO document into an [`OcrPage`].
pub fn read_alto(input: &str) -> Result<OcrPage> {
    let mut reader = Reader::from_str(input);

    let mut page_width: u32 = 0;
    let mut page_height: u32 = 0;
    let mut lines: Vec<TextLine> = Vec::new();

    let mut current_bounds: Option<Region> = None;
    let mut current_words: Vec<String> = Vec::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|err| BlattwerkError::Parse(format!("malformed ALTO: {err}")))?;
        match event {
            Event::Start(ref start) | Event::Empty(ref start) => {
                match local_name(start).as_str() {
                    "Page" => {
                        if page_width == 0 {
                            page_width = numeric_attr(start, "WIDTH")?;
                            page_height = numeric_attr(start, "HEIGHT")?;
                        }
                    }
                    "TextLine" => {
                        current_bounds = Some(Region::new(
                            numeric_attr(start, "HPOS")?,
                            numeric_attr(start, "VPOS")?,
                            numeric_attr(start, "WIDTH")?,
                            numeric_attr(start, "HEIGHT")?,
                        ));
                        current_words.clear();
                    }
                    "String" => {
                        if current_bounds.is_some() {
                            if let Some(content) = string_attr(start, "CONTENT")? {
                                if !content.is_empty() {
                                    current_words.push(content);
                                }
                            }
                        }
                    }
                    _ => {}
                }
            }
            Event::End(ref end) => {
                let name = String::from_utf8_lossy(end.name().as_ref()).into_owned();
                if name.ends_with("TextLine") {
                    if let Some(mut bounds) = current_bounds.take() {
                        let text = normalise(&current_words.join(" "));
                        if !text.is_empty() {
                            bounds.clamp_into(page_width, page_height);
                            lines.push(TextLine { text, bounds });
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if page_width == 0 || page_height == 0 {
        return Err(BlattwerkError::Parse(
            "ALTO page has no usable dimensions".into(),
        ));
    }

    debug!(page_width, page_height, lines = lines.len(), "ALTO read");
    Ok(OcrPage {
        page_width,
        page_height,
        lines,
    })
}

/// Load the OCR file belonging to `page` from the fulltext directory, if
/// one exists. The ALTO file shares the image's basename stem.
pub fn load_for_page(fulltext_dir: &Path, page: &DigitalPage) -> Result<Option<OcrPage>> {
    let stem = Path::new(&page.file_pointer)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| page.file_pointer.clone());
    let path = fulltext_dir.join(format!("{stem}.xml"));
    if !path.is_file() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(&path)?;
    let ocr = read_alto(&raw).map_err(|err| {
        BlattwerkError::Parse(format!("{}: {}", path.display(), err))
    })?;
    Ok(Some(ocr))
}

fn local_name(start: &BytesStart<'_>) -> String {
    let qualified = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    match qualified.rsplit_once(':') {
        Some((_, local)) => local.to_string(),
        None => qualified,
    }
}

fn string_attr(start: &BytesStart<'_>, wanted: &str) -> Result<Option<String>> {
    for attribute in start.attributes() {
        let attribute =
            attribute.map_err(|err| BlattwerkError::Parse(format!("bad attribute: {err}")))?;
        if attribute.key.as_ref() == wanted.as_bytes() {
            let value = attribute
                .unescape_value()
                .map_err(|err| BlattwerkError::Parse(format!("bad attribute value: {err}")))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Numeric ALTO attributes may be written as integers or decimals.
fn numeric_attr(start: &BytesStart<'_>, wanted: &str) -> Result<u32> {
    let value = string_attr(start, wanted)?.ok_or_else(|| {
        BlattwerkError::Parse(format!("ALTO element misses attribute {wanted}"))
    })?;
    value
        .parse::<f32>()
        .map(|number| number.max(0.0).round() as u32)
        .map_err(|_| BlattwerkError::Parse(format!("ALTO attribute {wanted}='{value}' not numeric")))
}

fn normalise(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
