// SPDX-License-Identifier: PMPL-1.0-or-later
//
// blattwerk-mets — Read-only projections of METS/MODS bibliographic
// metadata (descriptive data, page sequence, logical structure) plus the
// one mutation the pipeline needs: enriching the METS with the produced
// PDF file group.

pub mod alto;
pub mod enrich;
pub mod store;
pub mod structure;
pub mod xml;

#[cfg(test)]
pub(crate) mod fixtures;

pub use alto::read_alto;
pub use store::MetadataStore;
pub use structure::StructureMapper;
