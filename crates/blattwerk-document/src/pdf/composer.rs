// SPDX-License-Identifier: PMPL-1.0-or-later
//
// PDF composer — assembles the searchable document from the final image
// set: one page per image (1 px = 1 PDF unit, zero margins), the OCR text
// layer rendered beneath the image, an outline from the structure tree,
// document metadata, and PDF/A output intent when requested.

use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use tracing::{debug, info, instrument};

use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::plan::PdfConformance;
use blattwerk_core::{DescriptiveData, DigitalPage, DigitalStructureTree};

use super::fonts::PdfFont;
use super::pdf_text_string;

/// Packaged sRGB profile embedded as PDF/A output intent.
const ICC_BYTES: &[u8] = include_bytes!("../../../../resources/icc/sRGB.icc");

/// What the composer produced; the run succeeds only when every input
/// page was written and the outline could be built.
#[derive(Debug, Clone, Copy)]
pub struct ComposeResult {
    pub pages_written: usize,
    pub outline_built: bool,
}

impl ComposeResult {
    pub fn succeeded(&self, expected_pages: usize) -> bool {
        self.pages_written == expected_pages && self.outline_built
    }
}

pub struct PdfComposer<'a> {
    description: &'a DescriptiveData,
    structure: Option<&'a DigitalStructureTree>,
    conformance: Option<PdfConformance>,
    /// Fallback text size for degenerate OCR boxes.
    font_size: u32,
}

impl<'a> PdfComposer<'a> {
    pub fn new(
        description: &'a DescriptiveData,
        structure: Option<&'a DigitalStructureTree>,
        conformance: Option<PdfConformance>,
        font_size: u32,
    ) -> Self {
        Self {
            description,
            structure,
            conformance,
            font_size,
        }
    }

    /// Compose and save the document. OCR data is scaled in place to the
    /// current image geometry, once per page.
    #[instrument(skip_all, fields(output = %output.display(), pages = pages.len()))]
    pub fn compose(&self, pages: &mut [DigitalPage], output: &Path) -> Result<ComposeResult> {
        if pages.is_empty() {
            return Err(BlattwerkError::Pdf("no pages to compose".into()));
        }

        let version = match self.conformance {
            Some(level) if level.part() == 1 => "1.4",
            Some(_) => "1.7",
            None => "1.5",
        };
        let mut doc = Document::with_version(version);
        let pages_id = doc.new_object_id();
        let font_id = doc.new_object_id();

        let mut font = match self.conformance {
            Some(_) => PdfFont::embedded()?,
            None => PdfFont::builtin(),
        };

        let mut page_ids: Vec<ObjectId> = Vec::new();
        for page in pages.iter_mut() {
            let page_id = self.add_page(&mut doc, pages_id, font_id, &mut font, page)?;
            page_ids.push(page_id);
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => Object::Array(page_ids.iter().map(|id| Object::Reference(*id)).collect()),
                "Count" => page_ids.len() as i64,
            }),
        );
        font.register(&mut doc, font_id)?;

        let mut catalog = dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        };

        let outline_built = match self.structure {
            Some(tree) => {
                let outlines_id = build_outline(&mut doc, tree, &page_ids);
                catalog.set("Outlines", outlines_id);
                catalog.set("PageMode", Object::Name(b"UseOutlines".to_vec()));
                true
            }
            // nothing was requested, nothing is missing
            None => true,
        };

        let metadata_id = doc.add_object(Stream::new(
            dictionary! { "Type" => "Metadata", "Subtype" => "XML" },
            self.xmp_packet().into_bytes(),
        ));
        catalog.set("Metadata", metadata_id);

        if self.conformance.is_some() {
            let profile_id = doc.add_object(Stream::new(
                dictionary! { "N" => 3, "Alternate" => "DeviceRGB" },
                ICC_BYTES.to_vec(),
            ));
            let intent_id = doc.add_object(dictionary! {
                "Type" => "OutputIntent",
                "S" => "GTS_PDFA1",
                "OutputConditionIdentifier" => Object::string_literal("Custom"),
                "Info" => Object::string_literal("sRGB IEC61966-2.1"),
                "RegistryName" => Object::string_literal("http://www.color.org"),
                "DestOutputProfile" => profile_id,
            });
            catalog.set("OutputIntents", Object::Array(vec![intent_id.into()]));
        }

        let catalog_id = doc.add_object(catalog);
        let info_id = self.build_info(&mut doc);
        doc.trailer.set("Root", catalog_id);
        doc.trailer.set("Info", info_id);

        doc.save(output)
            .map_err(|err| BlattwerkError::Pdf(format!("cannot save {}: {}", output.display(), err)))?;

        let result = ComposeResult {
            pages_written: page_ids.len(),
            outline_built,
        };
        info!(
            pages = result.pages_written,
            outline = result.outline_built,
            "PDF written"
        );
        Ok(result)
    }

    /// One page: image XObject plus the OCR under-layer.
    fn add_page(
        &self,
        doc: &mut Document,
        pages_id: ObjectId,
        font_id: ObjectId,
        font: &mut PdfFont,
        page: &mut DigitalPage,
    ) -> Result<ObjectId> {
        let bytes = std::fs::read(&page.image_path).map_err(|err| {
            BlattwerkError::Pdf(format!(
                "cannot read page image {}: {}",
                page.image_path.display(),
                err
            ))
        })?;
        let decoded = image::load_from_memory(&bytes).map_err(|err| {
            BlattwerkError::Pdf(format!("bad page image {}: {}", page.image_path.display(), err))
        })?;
        let (width, height) = (decoded.width(), decoded.height());

        // JPEG bytes pass through unchanged as a DCT-encoded XObject
        let color_space = match decoded.color() {
            image::ColorType::L8 | image::ColorType::L16 => "DeviceGray",
            _ => "DeviceRGB",
        };
        let image_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => color_space,
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            bytes,
        ));

        let mut operations: Vec<Operation> = Vec::new();
        // text goes first so the opaque image covers it
        if let Some(ocr) = page.ocr.as_mut() {
            let ocr_height = ocr.page_height + page.footer_height.unwrap_or(0);
            if ocr_height > 0 {
                let ratio = height as f32 / ocr_height as f32;
                if (1.0 - ratio).abs() > 0.01 {
                    debug!(ratio, page = %page.file_pointer, "scaling OCR data");
                    ocr.scale(ratio);
                }
            }
            for line in &ocr.lines {
                if line.text.is_empty() {
                    continue;
                }
                let bounds = line.bounds;
                let size = if bounds.height == 0 || bounds.width == 0 {
                    self.font_size as f32
                } else {
                    font.fit_size(&line.text, bounds.width as f32, bounds.height as f32)
                };
                // VPOS measures from the page top; the baseline sits one
                // font size below the box top in PDF user space
                let baseline = (height as f32 - bounds.top() as f32 - size).max(0.0);
                operations.push(Operation::new("BT", vec![]));
                operations.push(Operation::new(
                    "Tf",
                    vec!["F1".into(), Object::Real(size)],
                ));
                operations.push(Operation::new(
                    "Td",
                    vec![Object::Real(bounds.left() as f32), Object::Real(baseline)],
                ));
                operations.push(Operation::new("Tj", vec![font.encode(&line.text)]));
                operations.push(Operation::new("ET", vec![]));
            }
        }
        operations.push(Operation::new("q", vec![]));
        operations.push(Operation::new(
            "cm",
            vec![
                Object::Real(width as f32),
                Object::Real(0.0),
                Object::Real(0.0),
                Object::Real(height as f32),
                Object::Real(0.0),
                Object::Real(0.0),
            ],
        ));
        operations.push(Operation::new("Do", vec!["Im0".into()]));
        operations.push(Operation::new("Q", vec![]));

        let content = Content { operations };
        let content_bytes = content
            .encode()
            .map_err(|err| BlattwerkError::Pdf(format!("content encoding failed: {err}")))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, content_bytes));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(width as f32),
                Object::Real(height as f32),
            ]),
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im0" => image_id },
                "Font" => dictionary! { "F1" => font_id },
            },
        });
        Ok(page_id)
    }

    fn build_info(&self, doc: &mut Document) -> ObjectId {
        let mut info = Dictionary::new();
        info.set("Title", pdf_text_string(&self.description.title));
        info.set("Author", pdf_text_string(&self.description.person));
        if let Some(creator) = &self.description.creator {
            info.set("Creator", pdf_text_string(creator));
        }
        if let Some(keywords) = &self.description.keywords {
            info.set("Keywords", pdf_text_string(keywords));
        }
        info.set("Producer", pdf_text_string(&producer_label()));
        info.set(
            "CreationDate",
            Object::String(
                chrono::Local::now()
                    .format("D:%Y%m%d%H%M%S")
                    .to_string()
                    .into_bytes(),
                StringFormat::Literal,
            ),
        );
        doc.add_object(info)
    }

    /// Custom info entries merged by the stamper after the initial save.
    pub fn custom_info(&self) -> Vec<(String, String)> {
        let mut extra = Vec::new();
        if let Some(license) = self.description.license() {
            extra.push(("Access condition".to_string(), license.to_string()));
        }
        extra.push((
            "Published".to_string(),
            self.description.year_published().to_string(),
        ));
        extra
    }

    fn xmp_packet(&self) -> String {
        let mut packet = String::new();
        packet.push_str("<?xpacket begin=\"\u{FEFF}\" id=\"W5M0MpCehiHzreSzNTczkc9d\"?>\n");
        packet.push_str("<x:xmpmeta xmlns:x=\"adobe:ns:meta/\">\n");
        packet.push_str(
            " <rdf:RDF xmlns:rdf=\"http://www.w3.org/1999/02/22-rdf-syntax-ns#\">\n",
        );
        packet.push_str(
            "  <rdf:Description rdf:about=\"\" xmlns:dc=\"http://purl.org/dc/elements/1.1/\">\n",
        );
        packet.push_str(&format!(
            "   <dc:title><rdf:Alt><rdf:li xml:lang=\"x-default\">{}</rdf:li></rdf:Alt></dc:title>\n",
            xml_escape(&self.description.title)
        ));
        packet.push_str(&format!(
            "   <dc:creator><rdf:Seq><rdf:li>{}</rdf:li></rdf:Seq></dc:creator>\n",
            xml_escape(&self.description.person)
        ));
        packet.push_str("  </rdf:Description>\n");
        packet.push_str(&format!(
            "  <rdf:Description rdf:about=\"\" xmlns:pdf=\"http://ns.adobe.com/pdf/1.3/\" pdf:Producer=\"{}\"/>\n",
            xml_escape(&producer_label())
        ));
        if let Some(level) = self.conformance {
            packet.push_str(&format!(
                "  <rdf:Description rdf:about=\"\" xmlns:pdfaid=\"http://www.aiim.org/pdfa/ns/id/\" pdfaid:part=\"{}\" pdfaid:conformance=\"{}\"/>\n",
                level.part(),
                level.level()
            ));
        }
        packet.push_str(" </rdf:RDF>\n</x:xmpmeta>\n<?xpacket end=\"w\"?>");
        packet
    }
}

fn producer_label() -> String {
    format!("blattwerk {}", env!("CARGO_PKG_VERSION"))
}

fn xml_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// -- Outline ------------------------------------------------------------------

/// Build the outline dictionary tree; the structure root becomes the
/// single top-level entry beneath /Outlines.
fn build_outline(
    doc: &mut Document,
    tree: &DigitalStructureTree,
    page_ids: &[ObjectId],
) -> ObjectId {
    let outlines_id = doc.new_object_id();
    let top_id = emit_outline_item(doc, tree, outlines_id, page_ids);
    doc.objects.insert(
        outlines_id,
        Object::Dictionary(dictionary! {
            "Type" => "Outlines",
            "First" => top_id,
            "Last" => top_id,
            "Count" => count_nodes(tree) as i64,
        }),
    );
    outlines_id
}

fn emit_outline_item(
    doc: &mut Document,
    node: &DigitalStructureTree,
    parent_id: ObjectId,
    page_ids: &[ObjectId],
) -> ObjectId {
    let id = doc.new_object_id();

    let child_ids: Vec<ObjectId> = node
        .children
        .iter()
        .map(|child| emit_outline_item(doc, child, id, page_ids))
        .collect();
    link_siblings(doc, &child_ids);

    let page_index = (node.page.max(1) as usize - 1).min(page_ids.len() - 1);
    let mut dict = dictionary! {
        "Title" => pdf_text_string(&node.label),
        "Parent" => parent_id,
        "Dest" => Object::Array(vec![
            Object::Reference(page_ids[page_index]),
            Object::Name(b"FitB".to_vec()),
        ]),
    };
    if let (Some(first), Some(last)) = (child_ids.first(), child_ids.last()) {
        dict.set("First", *first);
        dict.set("Last", *last);
        dict.set("Count", (count_nodes(node) - 1) as i64);
    }
    doc.objects.insert(id, Object::Dictionary(dict));
    id
}

fn link_siblings(doc: &mut Document, ids: &[ObjectId]) {
    for (index, id) in ids.iter().enumerate() {
        let prev = (index > 0).then(|| ids[index - 1]);
        let next = (index + 1 < ids.len()).then(|| ids[index + 1]);
        if let Some(Object::Dictionary(dict)) = doc.objects.get_mut(id) {
            if let Some(prev) = prev {
                dict.set("Prev", prev);
            }
            if let Some(next) = next {
                dict.set("Next", next);
            }
        }
    }
}

fn count_nodes(node: &DigitalStructureTree) -> usize {
    1 + node.children.iter().map(count_nodes).sum::<usize>()
}
