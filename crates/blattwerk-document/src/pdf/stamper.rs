// SPDX-License-Identifier: PMPL-1.0-or-later
//
// In-place info stamper — re-opens a saved PDF and merges additional
// info-dictionary entries without touching page content.

use std::path::Path;

use lopdf::{Dictionary, Document, Object};
use tracing::{debug, instrument};

use blattwerk_core::error::{BlattwerkError, Result};

use super::pdf_text_string;

/// Merge `entries` into the document's info dictionary and save in place.
#[instrument(skip(entries), fields(path = %path.display(), entries = entries.len()))]
pub fn stamp_info(path: &Path, entries: &[(String, String)]) -> Result<()> {
    if entries.is_empty() {
        return Ok(());
    }

    let mut doc = Document::load(path)
        .map_err(|err| BlattwerkError::Pdf(format!("cannot reopen {}: {}", path.display(), err)))?;

    let info_id = match doc.trailer.get(b"Info") {
        Ok(Object::Reference(id)) => *id,
        _ => {
            let id = doc.add_object(Dictionary::new());
            doc.trailer.set("Info", id);
            id
        }
    };

    let info = doc
        .get_object_mut(info_id)
        .and_then(Object::as_dict_mut)
        .map_err(|err| BlattwerkError::Pdf(format!("info dictionary unusable: {err}")))?;
    for (key, value) in entries {
        info.set(key.as_bytes().to_vec(), pdf_text_string(value));
    }

    doc.save(path)
        .map_err(|err| BlattwerkError::Pdf(format!("cannot rewrite {}: {}", path.display(), err)))?;
    debug!("info dictionary stamped");
    Ok(())
}
