// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Text-layer fonts for the PDF composer.
//
// Plain PDFs use built-in Helvetica with WinAnsi encoding (not embedded);
// PDF/A output embeds the packaged monospace TrueType as a
// Type0/CIDFontType2 with Identity-H encoding and a ToUnicode map so the
// text layer stays searchable and copyable.

use std::collections::BTreeMap;

use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use ttf_parser::Face;

use blattwerk_core::error::{BlattwerkError, Result};

/// Packaged embedded font for PDF/A conformant output.
pub const EMBED_FONT_BYTES: &[u8] =
    include_bytes!("../../../../resources/fonts/DejaVuSansMono-Bold.ttf");

const EMBED_FONT_NAME: &str = "DejaVuSansMono-Bold";

/// Width in 1/1000 em used for characters without metrics.
const FALLBACK_WIDTH: f32 = 556.0;

/// Helvetica AFM advance widths for ASCII 32..=126, in 1/1000 em.
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333,
    278, 278, 556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278,
    584, 584, 584, 556, 1015, 667, 667, 722, 722, 667, 611, 778, 722, 278,
    500, 667, 556, 833, 722, 778, 667, 778, 722, 667, 611, 722, 667, 944,
    667, 667, 611, 278, 278, 278, 469, 556, 333, 556, 556, 500, 556, 556,
    278, 556, 556, 222, 222, 500, 222, 833, 556, 556, 556, 556, 333, 500,
    278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Font used for the OCR text layer, with just enough metric access for
/// per-line size fitting.
pub enum PdfFont {
    /// Built-in Helvetica, WinAnsi encoded, not embedded.
    Builtin,
    /// Embedded TrueType with Identity-H encoding.
    Embedded(EmbeddedFont),
}

pub struct EmbeddedFont {
    face: Face<'static>,
    /// Glyphs actually shown, mapped back to their characters for the
    /// ToUnicode CMap.
    used: BTreeMap<u16, char>,
}

impl PdfFont {
    pub fn builtin() -> Self {
        Self::Builtin
    }

    pub fn embedded() -> Result<Self> {
        let face = Face::parse(EMBED_FONT_BYTES, 0)
            .map_err(|err| BlattwerkError::Pdf(format!("embedded font unusable: {err}")))?;
        Ok(Self::Embedded(EmbeddedFont {
            face,
            used: BTreeMap::new(),
        }))
    }

    /// Summed advance width of `text` in 1/1000 em.
    pub fn width_milli(&self, text: &str) -> f32 {
        match self {
            Self::Builtin => text.chars().map(helvetica_width).sum(),
            Self::Embedded(embedded) => {
                let units_per_em = embedded.face.units_per_em() as f32;
                text.chars()
                    .map(|ch| {
                        embedded
                            .face
                            .glyph_index(ch)
                            .and_then(|gid| embedded.face.glyph_hor_advance(gid))
                            .map(|advance| advance as f32 * 1000.0 / units_per_em)
                            .unwrap_or(FALLBACK_WIDTH)
                    })
                    .sum()
            }
        }
    }

    /// Rendered width of `text` at `size` points.
    pub fn text_width(&self, text: &str, size: f32) -> f32 {
        self.width_milli(text) / 1000.0 * size
    }

    /// Fit a font size so the rendered line stays within `width`: start
    /// from the advance-derived seed, then step down by 3 until it fits,
    /// never dropping below 1.
    pub fn fit_size(&self, text: &str, width: f32, height: f32) -> f32 {
        let milli = self.width_milli(text);
        if milli <= 0.0 {
            return 1.0;
        }
        let mut size = milli / 1000.0 * height;
        while milli / 1000.0 * size > width && size > 1.0 {
            size -= 3.0;
        }
        size.max(1.0)
    }

    /// Encode `text` for a `Tj` operand, recording used glyphs.
    pub fn encode(&mut self, text: &str) -> Object {
        match self {
            Self::Builtin => {
                let bytes = text
                    .chars()
                    .map(|ch| if (ch as u32) < 256 { ch as u8 } else { b'?' })
                    .collect();
                Object::String(bytes, StringFormat::Literal)
            }
            Self::Embedded(embedded) => {
                let mut bytes = Vec::with_capacity(text.len() * 2);
                for ch in text.chars() {
                    let gid = embedded
                        .face
                        .glyph_index(ch)
                        .map(|gid| gid.0)
                        .unwrap_or(0);
                    embedded.used.insert(gid, ch);
                    bytes.extend_from_slice(&gid.to_be_bytes());
                }
                Object::String(bytes, StringFormat::Hexadecimal)
            }
        }
    }

    /// Materialise the font dictionary at a pre-allocated object id. Must
    /// run after all text has been encoded so the ToUnicode map is
    /// complete.
    pub fn register(&self, doc: &mut Document, font_id: ObjectId) -> Result<()> {
        match self {
            Self::Builtin => {
                doc.objects.insert(
                    font_id,
                    Object::Dictionary(dictionary! {
                        "Type" => "Font",
                        "Subtype" => "Type1",
                        "BaseFont" => "Helvetica",
                        "Encoding" => "WinAnsiEncoding",
                    }),
                );
                Ok(())
            }
            Self::Embedded(embedded) => embedded.register(doc, font_id),
        }
    }
}

impl EmbeddedFont {
    fn register(&self, doc: &mut Document, font_id: ObjectId) -> Result<()> {
        let face = &self.face;
        let units_per_em = face.units_per_em() as f32;
        let scale = |value: i16| -> i64 { (value as f32 * 1000.0 / units_per_em).round() as i64 };

        let file_id = doc.add_object(Stream::new(
            dictionary! { "Length1" => EMBED_FONT_BYTES.len() as i64 },
            EMBED_FONT_BYTES.to_vec(),
        ));

        let bbox = face.global_bounding_box();
        let cap_height = face.capital_height().unwrap_or(face.ascender());
        let descriptor_id = doc.add_object(dictionary! {
            "Type" => "FontDescriptor",
            "FontName" => EMBED_FONT_NAME,
            // fixed pitch + non-symbolic
            "Flags" => 33,
            "FontBBox" => Object::Array(vec![
                scale(bbox.x_min).into(),
                scale(bbox.y_min).into(),
                scale(bbox.x_max).into(),
                scale(bbox.y_max).into(),
            ]),
            "ItalicAngle" => 0,
            "Ascent" => scale(face.ascender()),
            "Descent" => scale(face.descender()),
            "CapHeight" => scale(cap_height),
            "StemV" => 80,
            "FontFile2" => file_id,
        });

        let default_width = face
            .glyph_index(' ')
            .and_then(|gid| face.glyph_hor_advance(gid))
            .map(|advance| (advance as f32 * 1000.0 / units_per_em).round() as i64)
            .unwrap_or(600);

        let descendant_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType2",
            "BaseFont" => EMBED_FONT_NAME,
            "CIDSystemInfo" => dictionary! {
                "Registry" => Object::string_literal("Adobe"),
                "Ordering" => Object::string_literal("Identity"),
                "Supplement" => 0,
            },
            "FontDescriptor" => descriptor_id,
            "DW" => default_width,
            "CIDToGIDMap" => "Identity",
        });

        let to_unicode = doc.add_object(Stream::new(
            dictionary! {},
            build_to_unicode(&self.used).into_bytes(),
        ));

        doc.objects.insert(
            font_id,
            Object::Dictionary(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type0",
                "BaseFont" => EMBED_FONT_NAME,
                "Encoding" => "Identity-H",
                "DescendantFonts" => Object::Array(vec![descendant_id.into()]),
                "ToUnicode" => to_unicode,
            }),
        );
        Ok(())
    }
}

fn helvetica_width(ch: char) -> f32 {
    let code = ch as u32;
    if (32..=126).contains(&code) {
        HELVETICA_WIDTHS[(code - 32) as usize] as f32
    } else {
        FALLBACK_WIDTH
    }
}

/// ToUnicode CMap mapping shown glyph ids back to characters.
fn build_to_unicode(used: &BTreeMap<u16, char>) -> String {
    let mut cmap = String::from(
        "/CIDInit /ProcSet findresource begin\n\
         12 dict begin\n\
         begincmap\n\
         /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
         /CMapName /Adobe-Identity-UCS def\n\
         /CMapType 2 def\n\
         1 begincodespacerange\n\
         <0000> <FFFF>\n\
         endcodespacerange\n",
    );
    let entries: Vec<(u16, char)> = used.iter().map(|(gid, ch)| (*gid, *ch)).collect();
    for chunk in entries.chunks(100) {
        cmap.push_str(&format!("{} beginbfchar\n", chunk.len()));
        for (gid, ch) in chunk {
            let mut units = [0u16; 2];
            let encoded = ch.encode_utf16(&mut units);
            let unicode: String = encoded.iter().map(|unit| format!("{unit:04X}")).collect();
            cmap.push_str(&format!("<{gid:04X}> <{unicode}>\n"));
        }
        cmap.push_str("endbfchar\n");
    }
    cmap.push_str(
        "endcmap\n\
         CMapName currentdict /CMap defineresource pop\n\
         end\n\
         end\n",
    );
    cmap
}
