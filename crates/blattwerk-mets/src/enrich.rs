// SPDX-License-Identifier: PMPL-1.0-or-later
//
// METS enrichment — records the produced PDF inside the METS file: an
// agent entry in the header, a DOWNLOAD file group, and a file pointer as
// first child of the top logical container. Enrichment is semantically
// idempotent: re-running it never duplicates the file group or pointer.

use chrono::Local;
use tracing::{debug, info, warn};

use blattwerk_core::error::{BlattwerkError, Result};

use crate::store::MetadataStore;
use crate::xml::{self, XmlElement, XmlNode};

/// Logical container types the PDF pointer is attached to.
const PDF_CONTAINER_TYPES: [&str; 2] = ["monograph", "volume"];

impl MetadataStore {
    /// Enrich the METS with the generated PDF and persist it in place.
    ///
    /// Returns the agent note text, mirroring what is written into the
    /// header.
    pub fn enrich_pdf(&mut self, identifier: &str, agent_label: &str) -> Result<String> {
        let note = self.enrich_agent(identifier, agent_label);
        self.add_pdf_file_group(identifier)?;
        self.add_pdf_pointer(identifier, true)?;
        self.write()?;
        info!(identifier, "METS enriched with PDF file group");
        Ok(note)
    }

    /// Append a software agent entry to `metsHdr`, creating the header if
    /// the document has none.
    fn enrich_agent(&mut self, identifier: &str, agent_label: &str) -> String {
        let timestamp = Local::now().format("%Y-%m-%dT%H:%M:%S");
        let note_text = format!("PDF FileGroup for {identifier} created at {timestamp}");

        let mut agent = XmlElement::new("mets:agent");
        agent.set_attr("TYPE", "OTHER");
        agent.set_attr("ROLE", "OTHER");
        agent.set_attr("OTHERTYPE", "SOFTWARE");
        let mut name = XmlElement::new("mets:name");
        name.push_text(agent_label);
        let mut note = XmlElement::new("mets:note");
        note.push_text(note_text.clone());
        agent.push_element(name);
        agent.push_element(note);

        let has_header = self
            .root_mut()
            .elements_mut()
            .any(|element| element.local_name().eq_ignore_ascii_case("metsHdr"));
        let root = self.root_mut();
        if has_header {
            let header = root
                .elements_mut()
                .find(|element| element.local_name().eq_ignore_ascii_case("metsHdr"))
                .expect("checked above");
            header.push_element(agent);
        } else {
            let mut header = XmlElement::new("mets:metsHdr");
            header.set_attr("CREATEDATE", Local::now().format("%Y-%m-%dT%H:%M:%S").to_string());
            header.push_element(agent);
            root.insert_element_first(header);
        }
        note_text
    }

    /// Insert `<fileGrp USE="DOWNLOAD">` with the PDF file entry, unless one
    /// exists already.
    fn add_pdf_file_group(&mut self, identifier: &str) -> Result<()> {
        let pdf_href = format!("{identifier}.pdf");
        let file_id = format!("PDF_{identifier}");

        let root = self.root_mut();
        let file_sec = root
            .elements_mut()
            .find(|element| element.is("fileSec"))
            .ok_or_else(|| {
                BlattwerkError::MetsWrite("METS has no fileSec to extend".into())
            })?;

        if file_sec
            .elements()
            .any(|group| group.is("fileGrp") && group.attr("USE") == Some("DOWNLOAD"))
        {
            debug!("DOWNLOAD file group already present, skipping");
            return Ok(());
        }

        let mut locat = XmlElement::new("mets:FLocat");
        locat.set_attr("LOCTYPE", "URL");
        locat.set_attr("xlink:href", pdf_href);
        let mut file = XmlElement::new("mets:file");
        file.set_attr("ID", file_id);
        file.set_attr("MIMETYPE", "application/pdf");
        file.push_element(locat);
        let mut group = XmlElement::new("mets:fileGrp");
        group.set_attr("USE", "DOWNLOAD");
        group.push_element(file);
        file_sec.push_element(group);
        Ok(())
    }

    /// Insert `<fptr FILEID="PDF_<id>">` as the first child of the logical
    /// `monograph`/`volume` container. With `reorder`, children are stably
    /// sorted so every fptr precedes every div.
    fn add_pdf_pointer(&mut self, identifier: &str, reorder: bool) -> Result<()> {
        let file_id = format!("PDF_{identifier}");

        let root = self.root_mut();
        let struct_map = root
            .elements_mut()
            .find(|element| {
                element.is("structMap") && element.attr("TYPE") == Some("LOGICAL")
            })
            .ok_or_else(|| {
                BlattwerkError::MetsWrite("METS has no logical structMap to extend".into())
            })?;
        let root_div = struct_map
            .first_mut("div")
            .ok_or_else(|| {
                BlattwerkError::MetsWrite("logical structMap has no container".into())
            })?;

        let container = find_pdf_container(root_div).ok_or_else(|| {
            BlattwerkError::MetsWrite(
                "no monograph or volume container for the PDF pointer".into(),
            )
        })?;

        if container.elements().any(|element| {
            element.is("fptr") && element.attr("FILEID") == Some(file_id.as_str())
        }) {
            debug!("PDF file pointer already present, skipping");
            return Ok(());
        }

        let mut fptr = XmlElement::new("mets:fptr");
        fptr.set_attr("FILEID", file_id);
        container.insert_element_first(fptr);

        if reorder {
            sort_fptr_first(container);
        }
        Ok(())
    }

    /// Serialise the document back to its source path.
    pub fn write(&self) -> Result<()> {
        let serialised = xml::to_string_pretty(self.root())?;
        std::fs::write(self.path(), serialised).map_err(|err| {
            BlattwerkError::MetsWrite(format!(
                "cannot write {}: {}",
                self.path().display(),
                err
            ))
        })
    }
}

/// The container receiving the file pointer: the logical root when it is a
/// monograph/volume itself, otherwise the first such descendant. Located
/// as an index path first, then walked mutably.
fn find_pdf_container(root_div: &mut XmlElement) -> Option<&mut XmlElement> {
    let path = find_container_path(root_div)?;
    let mut current = root_div;
    for index in path {
        current = match &mut current.children[index] {
            XmlNode::Element(element) => element,
            XmlNode::Text(_) => return None,
        };
    }
    Some(current)
}

fn find_container_path(element: &XmlElement) -> Option<Vec<usize>> {
    if element.is("div")
        && PDF_CONTAINER_TYPES.contains(&element.attr("TYPE").unwrap_or_default())
    {
        return Some(Vec::new());
    }
    for (index, node) in element.children.iter().enumerate() {
        if let XmlNode::Element(child) = node {
            if let Some(mut path) = find_container_path(child) {
                path.insert(0, index);
                return Some(path);
            }
        }
    }
    None
}

/// Stable partition: all fptr children before all other elements.
fn sort_fptr_first(container: &mut XmlElement) {
    container.children.sort_by_key(|node| match node {
        XmlNode::Element(element) if element.is("fptr") => 0,
        _ => 1,
    });
    if container.elements().filter(|e| e.is("fptr")).count() > 1 {
        warn!("logical container carries multiple file pointers");
    }
}
