// SPDX-License-Identifier: PMPL-1.0-or-later
//
// blattwerk-pipeline — Executes the run plan: ordered steps, each image
// step fanning its pages out onto a bounded worker pool, the PDF and METS
// steps running on the driving thread.

pub mod pool;
pub mod runner;
pub mod steps;

pub use runner::{Derivans, RunSummary};

/// Tool label injected into METS agent entries, from the packaged
/// revision resource when it carries a version, otherwise from the crate
/// version.
pub fn tool_label() -> String {
    let packaged = include_str!("../../../resources/revision.properties");
    for line in packaged.lines() {
        if let Some((key, value)) = line.split_once(':') {
            if key.trim() == "revision" {
                let version = value.trim().trim_matches('"');
                if !version.is_empty() {
                    return format!("{} V{version}", blattwerk_core::TOOL_LABEL);
                }
            }
        }
    }
    format!("{} V{}", blattwerk_core::TOOL_LABEL, env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_label_carries_a_version() {
        let label = tool_label();
        assert!(label.starts_with("blattwerk V"));
        assert!(label.len() > "blattwerk V".len());
    }
}
