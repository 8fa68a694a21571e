// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Structure mapper — turns the logical structMap into the outline tree,
// resolving logical→physical links through the structLink section.

use std::collections::HashMap;

use tracing::{debug, error, warn};

use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::DigitalStructureTree;

use crate::store::MetadataStore;
use crate::xml::XmlElement;

/// Special link target mapping the whole physical section to page 1.
const STRUCT_PHYSICAL_ROOT: &str = "physroot";

/// Logical types whose page links cover the whole print; plain leaves are
/// never rendered beneath them because some source systems link every
/// single page to the top container.
const TOP_LOGICAL_TYPES: [&str; 2] = ["volume", "monograph"];

/// Builds the outline tree for PDF generation.
pub struct StructureMapper<'a> {
    store: &'a MetadataStore,
    fallback_title: String,
    render_plain_leaves: bool,
    links: HashMap<String, Vec<String>>,
}

impl<'a> StructureMapper<'a> {
    pub fn new(store: &'a MetadataStore, fallback_title: impl Into<String>) -> Self {
        Self::with_leaves(store, fallback_title, true)
    }

    /// `render_plain_leaves = false` disables per-page outline entries.
    pub fn with_leaves(
        store: &'a MetadataStore,
        fallback_title: impl Into<String>,
        render_plain_leaves: bool,
    ) -> Self {
        let mut links: HashMap<String, Vec<String>> = HashMap::new();
        for (from, to) in store.struct_links() {
            links.entry(from).or_default().push(to);
        }
        Self {
            store,
            fallback_title: fallback_title.into(),
            render_plain_leaves,
            links,
        }
    }

    pub fn build(&self) -> Result<DigitalStructureTree> {
        let root_div = self.store.logical_root_div().ok_or_else(|| {
            BlattwerkError::Structure("METS is missing a logical structMap".into())
        })?;

        let label = non_blank(root_div.attr("LABEL"))
            .or_else(|| non_blank(root_div.attr("ORDERLABEL")))
            .unwrap_or_else(|| self.fallback_title.clone());
        let mut root = DigitalStructureTree::new(1, label);

        for child in root_div.elements() {
            if child.is("div") && child.attr("TYPE").is_some() {
                let subtree = self.extend(child)?;
                root.children.push(subtree);
            }
        }

        root.drop_unresolved();
        debug!(children = root.children.len(), "structure tree built");
        Ok(root)
    }

    fn extend(&self, div: &XmlElement) -> Result<DigitalStructureTree> {
        let log_id = div.attr("ID").unwrap_or_default().to_string();
        let log_type = div.attr("TYPE").unwrap_or_default();

        // an unmapped logical type has no label at all; the node is marked
        // unresolved and swept up by the post-pass
        let label = match self.label_for(div, log_type) {
            Some(label) => label,
            None => {
                error!(log_type, "no mapping for logical type");
                return Ok(DigitalStructureTree::new(-1, ""));
            }
        };

        let (page, leaf_targets) = self.resolve_page(&log_id, log_type)?;
        let mut node = DigitalStructureTree::new(page, label);

        for target in leaf_targets {
            node.children.push(self.leaf_for(&target)?);
        }

        for child in div.elements() {
            if child.is("div") && child.attr("TYPE").is_some() {
                let subtree = self.extend(child)?;
                node.children.push(subtree);
            }
        }
        Ok(node)
    }

    fn label_for(&self, div: &XmlElement, log_type: &str) -> Option<String> {
        non_blank(div.attr("LABEL"))
            .or_else(|| non_blank(div.attr("ORDERLABEL")))
            .or_else(|| map_logical_type(log_type).map(str::to_string))
    }

    /// Resolve the start page of a logical division plus the physical
    /// targets that become plain leaves (all linked pages, except beneath
    /// top-level containers).
    fn resolve_page(&self, log_id: &str, log_type: &str) -> Result<(i32, Vec<String>)> {
        let targets = self.links.get(log_id).ok_or_else(|| {
            BlattwerkError::Structure(format!(
                "no physical struct linked from '{log_id}@{log_type}'"
            ))
        })?;
        let first = targets.first().expect("links map never stores empty lists");

        if first.eq_ignore_ascii_case(STRUCT_PHYSICAL_ROOT) {
            return Ok((1, Vec::new()));
        }

        let order = self.physical_order(first).map_err(|err| {
            BlattwerkError::Structure(format!("logical '{log_id}': {err}"))
        })?;

        let leaves = if self.render_plain_leaves
            && !TOP_LOGICAL_TYPES.contains(&log_type)
        {
            targets.clone()
        } else {
            Vec::new()
        };
        Ok((order, leaves))
    }

    fn physical_order(&self, phys_id: &str) -> Result<i32> {
        let div = self.store.physical_div(phys_id).ok_or_else(|| {
            BlattwerkError::Structure(format!("invalid physical struct '{phys_id}'"))
        })?;
        div.attr("ORDER")
            .and_then(|order| order.parse::<i32>().ok())
            .ok_or_else(|| {
                BlattwerkError::Structure(format!("no order for '{phys_id}'"))
            })
    }

    fn leaf_for(&self, phys_id: &str) -> Result<DigitalStructureTree> {
        let div = self.store.physical_div(phys_id).ok_or_else(|| {
            BlattwerkError::Structure(format!("invalid physical struct '{phys_id}'"))
        })?;
        let label = non_blank(div.attr("LABEL"))
            .or_else(|| non_blank(div.attr("ORDERLABEL")))
            .ok_or_else(|| {
                BlattwerkError::Structure(format!("no valid labelling for page '{phys_id}'"))
            })?;
        let order = self.physical_order(phys_id)?;
        Ok(DigitalStructureTree::new(order, label))
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Localised labels for the DFG structure data set
/// (http://dfg-viewer.de/strukturdatenset/). An unknown type yields `None`
/// and the node is discarded.
fn map_logical_type(log_type: &str) -> Option<&'static str> {
    let label = match log_type {
        "cover_front" => "Vorderdeckel",
        "cover_back" => "Rückdeckel",
        "title_page" => "Titelblatt",
        "preface" => "Vorwort",
        "dedication" => "Widmung",
        "illustration" => "Illustration",
        "image" => "Bild",
        "table" => "Tabelle",
        "contents" => "Inhaltsverzeichnis",
        "engraved_titlepage" => "Kupfertitel",
        "map" => "Karte",
        "imprint" => "Impressum",
        "corrigenda" => "Errata",
        "section" => "Abschnitt",
        "provenance" => "Besitznachweis",
        "bookplate" => "Exlibris",
        "entry" => "Eintrag",
        "printers_mark" => "Druckermarke",
        "chapter" => "Kapitel",
        "index" => "Register",
        // important if a volume misses its LABEL
        "volume" => "Band",
        _ => {
            warn!(log_type, "logical type outside mapped vocabulary");
            return None;
        }
    };
    Some(label)
}
