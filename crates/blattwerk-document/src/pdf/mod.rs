// SPDX-License-Identifier: PMPL-1.0-or-later

pub mod composer;
pub mod fonts;
pub mod stamper;

use lopdf::{Object, StringFormat};

/// PDF text string: plain literal for ASCII, UTF-16BE with BOM otherwise.
pub(crate) fn pdf_text_string(value: &str) -> Object {
    if value.is_ascii() {
        Object::String(value.as_bytes().to_vec(), StringFormat::Literal)
    } else {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in value.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        Object::String(bytes, StringFormat::Hexadecimal)
    }
}
