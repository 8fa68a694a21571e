// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Metadata store — read-only projections over a parsed METS/MODS file:
// descriptive data, the ordered physical page sequence, and lookups the
// structure mapper needs (struct links, physical divisions).

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::{DescriptiveData, DigitalPage, UNKNOWN};

use crate::xml::{self, XmlElement};

/// File group names that carry the original page images, in preference order.
const IMAGE_FILE_GROUPS: [&str; 2] = ["MAX", "DEFAULT"];

/// Parsed METS document with projection accessors.
pub struct MetadataStore {
    path: PathBuf,
    root: XmlElement,
}

impl MetadataStore {
    /// Parse a METS file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(BlattwerkError::InputMissing(format!(
                "METS file {} does not exist",
                path.display()
            )));
        }
        let raw = std::fs::read_to_string(path)?;
        let root = xml::parse(&raw)?;
        if !root.is("mets") {
            return Err(BlattwerkError::Parse(format!(
                "{} is not a METS document (root <{}>)",
                path.display(),
                root.name
            )));
        }
        debug!(path = %path.display(), "METS loaded");
        Ok(Self {
            path: path.to_path_buf(),
            root,
        })
    }

    /// Construct from an in-memory document (tests, enrichment round trips).
    pub fn from_parts(path: PathBuf, root: XmlElement) -> Self {
        Self { path, root }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn root(&self) -> &XmlElement {
        &self.root
    }

    pub(crate) fn root_mut(&mut self) -> &mut XmlElement {
        &mut self.root
    }

    // -- Struct map access ----------------------------------------------------

    pub fn logical_struct_map(&self) -> Option<&XmlElement> {
        self.root
            .elements()
            .find(|element| element.is("structMap") && element.attr("TYPE") == Some("LOGICAL"))
    }

    pub fn physical_struct_map(&self) -> Option<&XmlElement> {
        self.root
            .elements()
            .find(|element| element.is("structMap") && element.attr("TYPE") == Some("PHYSICAL"))
    }

    /// Root container of the logical structure.
    pub fn logical_root_div(&self) -> Option<&XmlElement> {
        self.logical_struct_map().and_then(|map| map.first("div"))
    }

    fn physical_sequence(&self) -> Option<&XmlElement> {
        self.physical_struct_map().and_then(|map| map.first("div"))
    }

    /// Physical page division by its ID attribute.
    pub fn physical_div(&self, id: &str) -> Option<&XmlElement> {
        self.physical_sequence()?
            .descendants()
            .into_iter()
            .find(|div| div.is("div") && div.attr("ID") == Some(id))
    }

    /// All `smLink` pairs `(from, to)` of the struct-link section.
    pub fn struct_links(&self) -> Vec<(String, String)> {
        let Some(link_section) = self.root.elements().find(|e| e.is("structLink")) else {
            return Vec::new();
        };
        link_section
            .elements()
            .filter(|element| element.is("smLink"))
            .filter_map(|link| {
                let from = link.attr("from")?;
                let to = link.attr("to")?;
                Some((from.to_string(), to.to_string()))
            })
            .collect()
    }

    // -- Descriptive data -----------------------------------------------------

    /// The MODS section describing the object: the one linked from the
    /// logical root container via DMDID, falling back to the first
    /// subdivision carrying a DMDID (multivolume works).
    pub fn primary_mods(&self) -> Result<&XmlElement> {
        let root_div = self.logical_root_div().ok_or_else(|| {
            BlattwerkError::Parse("METS is missing a logical structMap".into())
        })?;
        let dmd_id = root_div.attr("DMDID").or_else(|| {
            root_div
                .descendants()
                .into_iter()
                .find(|div| div.is("div") && div.attr("DMDID").is_some())
                .and_then(|div| div.attr("DMDID"))
        });
        let dmd_id = dmd_id.ok_or_else(|| {
            BlattwerkError::Parse("no logical container carries a DMDID".into())
        })?;

        let dmd_sec = self
            .root
            .elements()
            .find(|element| element.is("dmdSec") && element.attr("ID") == Some(dmd_id))
            .ok_or_else(|| {
                BlattwerkError::Parse(format!("descriptive section '{dmd_id}' not found"))
            })?;
        dmd_sec
            .descendants()
            .into_iter()
            .find(|element| element.is("mods"))
            .ok_or_else(|| {
                BlattwerkError::Parse(format!("section '{dmd_id}' holds no MODS metadata"))
            })
    }

    /// Projection of the descriptive metadata used for PDF generation.
    pub fn descriptive_data(&self) -> Result<DescriptiveData> {
        let mods = self.primary_mods()?;
        let mut data = DescriptiveData::default();
        data.identifier = record_identifier(mods)?;
        data.urn = typed_identifier(mods, "urn").unwrap_or_else(|| UNKNOWN.into());
        data.title = title(mods).unwrap_or_else(|| UNKNOWN.into());
        data.person = person(mods).unwrap_or_else(|| UNKNOWN.into());
        data.set_year_published(year(mods).unwrap_or_else(|| UNKNOWN.into()));
        data.set_license(access_condition(mods).unwrap_or_else(|| UNKNOWN.into()));
        debug!(%data, "descriptive data built");
        Ok(data)
    }

    // -- Page sequence --------------------------------------------------------

    /// Ordered page list of the physical structMap. `order` is rewritten to
    /// be 1-based and contiguous; `image_dir` anchors the page image paths.
    pub fn pages(&self, image_dir: &Path) -> Result<Vec<DigitalPage>> {
        let sequence = self.physical_sequence().ok_or_else(|| {
            BlattwerkError::Parse("METS is missing a physical structMap".into())
        })?;

        let mut divs: Vec<&XmlElement> = sequence
            .elements()
            .filter(|div| div.is("div"))
            .collect();
        divs.sort_by_key(|div| {
            div.attr("ORDER")
                .and_then(|order| order.parse::<u32>().ok())
                .unwrap_or(u32::MAX)
        });

        let mut pages = Vec::with_capacity(divs.len());
        for (index, div) in divs.iter().enumerate() {
            let file_id = div
                .first("fptr")
                .and_then(|fptr| fptr.attr("FILEID"))
                .ok_or_else(|| {
                    BlattwerkError::Parse(format!(
                        "physical div '{}' has no file pointer",
                        div.attr("ID").unwrap_or("?")
                    ))
                })?;
            let file_pointer = self.file_href(file_id).ok_or_else(|| {
                BlattwerkError::Parse(format!("file '{file_id}' not found in image file group"))
            })?;
            let file_pointer = basename(&file_pointer);

            let mut page = DigitalPage::new(
                index as u32 + 1,
                file_pointer.clone(),
                image_dir.join(&file_pointer),
            );
            page.identifier = div.attr("CONTENTIDS").map(str::to_string);
            pages.push(page);
        }

        if pages.is_empty() {
            warn!("physical structMap lists no pages");
        }
        Ok(pages)
    }

    /// Subdirectory holding the original images, derived from the first
    /// file group reference (commonly `MAX` or `DEFAULT`).
    pub fn image_subdir(&self) -> Option<String> {
        let href = self.first_image_href()?;
        let path = Path::new(&href);
        path.parent()
            .and_then(|parent| parent.file_name())
            .map(|dir| dir.to_string_lossy().into_owned())
    }

    fn image_file_group(&self) -> Option<&XmlElement> {
        let file_sec = self.root.elements().find(|e| e.is("fileSec"))?;
        for wanted in IMAGE_FILE_GROUPS {
            if let Some(group) = file_sec
                .elements()
                .find(|g| g.is("fileGrp") && g.attr("USE") == Some(wanted))
            {
                return Some(group);
            }
        }
        None
    }

    fn first_image_href(&self) -> Option<String> {
        self.image_file_group()?
            .elements()
            .find(|f| f.is("file"))?
            .first("FLocat")?
            .attr("href")
            .map(str::to_string)
    }

    fn file_href(&self, file_id: &str) -> Option<String> {
        self.image_file_group()?
            .elements()
            .find(|file| file.is("file") && file.attr("ID") == Some(file_id))?
            .first("FLocat")?
            .attr("href")
            .map(str::to_string)
    }
}

fn basename(href: &str) -> String {
    href.rsplit(['/', '\\'])
        .next()
        .unwrap_or(href)
        .to_string()
}

// -- MODS field extraction ----------------------------------------------------

/// `recordInfo/recordIdentifier[@source]`. This value names the produced
/// PDF, so there is no sensible default: a METS without it is unusable.
fn record_identifier(mods: &XmlElement) -> Result<String> {
    let record_info = mods.first("recordInfo").ok_or_else(|| {
        BlattwerkError::Parse("MODS carries no recordInfo section".into())
    })?;
    record_info
        .all("recordIdentifier")
        .into_iter()
        .find(|identifier| identifier.attr("source").is_some())
        .map(|identifier| identifier.text())
        .ok_or_else(|| BlattwerkError::Parse("found no valid recordIdentifier".into()))
}

fn typed_identifier(mods: &XmlElement, wanted: &str) -> Option<String> {
    mods.all("identifier")
        .into_iter()
        .find(|identifier| identifier.attr("type") == Some(wanted))
        .map(|identifier| identifier.text())
}

fn title(mods: &XmlElement) -> Option<String> {
    let title = mods.first("titleInfo")?.first("title")?.text();
    (!title.is_empty()).then_some(title)
}

fn access_condition(mods: &XmlElement) -> Option<String> {
    let text = mods.first("accessCondition")?.text();
    (!text.is_empty()).then_some(text)
}

/// `originInfo[@eventType='publication']/dateIssued`, falling back to any
/// `originInfo/dateIssued` when the event type annotation is missing.
fn year(mods: &XmlElement) -> Option<String> {
    let origin_infos = mods.all("originInfo");
    let publication = origin_infos
        .iter()
        .find(|info| {
            info.attr("eventType")
                .map(|event| event.eq_ignore_ascii_case("publication"))
                .unwrap_or(false)
        })
        .or(origin_infos.first());
    let issued = publication?.first("dateIssued")?.text();
    (!issued.is_empty()).then_some(issued)
}

/// MARC relator codes mapped to a display person: authors win over
/// publishers; within the chosen name, `displayForm` wins over the family
/// `namePart`.
fn person(mods: &XmlElement) -> Option<String> {
    let names = mods.all("name");
    let mut authors: Vec<&XmlElement> = Vec::new();
    let mut publishers: Vec<&XmlElement> = Vec::new();

    for name in names {
        for role in name.all("role") {
            for term in role.all("roleTerm") {
                if term.attr("type") != Some("code") {
                    continue;
                }
                match term.text().as_str() {
                    "aut" => authors.push(name),
                    "pbl" => publishers.push(name),
                    other => debug!(code = other, "not mapped as person"),
                }
            }
        }
    }

    let candidates = if !authors.is_empty() {
        authors
    } else if !publishers.is_empty() {
        publishers
    } else {
        warn!("found no properly related persons");
        return None;
    };

    for name in candidates {
        if let Some(display) = name.first("displayForm") {
            return Some(display.text());
        }
        if let Some(part) = name
            .all("namePart")
            .into_iter()
            .find(|part| part.attr("type") == Some("family"))
        {
            return Some(part.text());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{METS_MONOGRAPH, METS_MULTIVOLUME};

    fn store(raw: &str) -> MetadataStore {
        MetadataStore::from_parts("test.xml".into(), xml::parse(raw).unwrap())
    }

    #[test]
    fn descriptive_data_of_monograph() {
        let data = store(METS_MONOGRAPH).descriptive_data().unwrap();
        assert_eq!(data.identifier, "191092622");
        assert_eq!(data.urn, "urn:nbn:de:gbv:3:3-21437");
        assert!(data.title.starts_with("Ode In Solemni Panegyri"));
        assert_eq!(data.person, "Brühl");
        assert_eq!(data.year_published(), "1731");
        assert!(data.license().is_none());
    }

    #[test]
    fn descriptive_data_of_multivolume_falls_back_to_subdivision() {
        let data = store(METS_MULTIVOLUME).descriptive_data().unwrap();
        assert_eq!(data.identifier, "323633072");
        // no author present, so the publisher's family name is used
        assert_eq!(data.person, "Gebauer");
        // year taken from originInfo without eventType annotation
        assert_eq!(data.year_published(), "1740");
        assert_eq!(data.license(), Some("CC-BY-SA 3.0 DE"));
    }

    #[test]
    fn display_form_wins_over_family_name_part() {
        let data = store(METS_MONOGRAPH).descriptive_data().unwrap();
        assert_eq!(data.person, "Brühl");
        assert_ne!(data.person, "von Brühl");
    }

    #[test]
    fn page_sequence_is_ordered_and_contiguous() {
        let pages = store(METS_MONOGRAPH).pages(Path::new("MAX")).unwrap();
        assert_eq!(pages.len(), 4);
        for (index, page) in pages.iter().enumerate() {
            assert_eq!(page.order, index as u32 + 1);
            assert!(page.identifier.is_some());
        }
        assert_eq!(pages[0].file_pointer, "737434.jpg");
        assert_eq!(pages[1].file_pointer, "737436.jpg");
        assert_eq!(pages[2].file_pointer, "737437.jpg");
        assert_eq!(pages[3].file_pointer, "737438.jpg");
        assert_eq!(
            pages[0].identifier.as_deref(),
            Some("urn:nbn:de:gbv:3:3-21437-p0001-0")
        );
        assert_eq!(
            pages[3].identifier.as_deref(),
            Some("urn:nbn:de:gbv:3:3-21437-p0004-6")
        );
    }

    #[test]
    fn pages_without_granular_urns() {
        let pages = store(METS_MULTIVOLUME).pages(Path::new("DEFAULT")).unwrap();
        assert_eq!(pages.len(), 2);
        assert!(pages.iter().all(|page| page.identifier.is_none()));
    }

    #[test]
    fn image_subdir_is_derived_from_file_group() {
        assert_eq!(store(METS_MONOGRAPH).image_subdir().as_deref(), Some("MAX"));
        assert_eq!(
            store(METS_MULTIVOLUME).image_subdir().as_deref(),
            Some("DEFAULT")
        );
    }

    #[test]
    fn struct_links_resolve_physical_orders() {
        let store = store(METS_MONOGRAPH);
        let links = store.struct_links();
        assert_eq!(links.len(), 5);
        assert_eq!(links[0], ("log737429".into(), "physroot".into()));
        let div = store.physical_div("phys737436").unwrap();
        assert_eq!(div.attr("ORDER"), Some("2"));
    }

    #[test]
    fn missing_record_identifier_is_fatal() {
        let raw = METS_MONOGRAPH.replace("recordIdentifier source=\"gbv\"", "recordIdentifier");
        let result = store(&raw).descriptive_data();
        assert!(matches!(result, Err(BlattwerkError::Parse(_))));
    }
}
