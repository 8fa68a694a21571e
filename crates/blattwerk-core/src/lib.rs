// SPDX-License-Identifier: PMPL-1.0-or-later
//
// blattwerk-core — Shared types, errors and configuration for the
// blattwerk derivative generator.

pub mod config;
pub mod error;
pub mod plan;
pub mod types;

pub use config::RunConfig;
pub use error::{BlattwerkError, Result};
pub use plan::{DerivateStep, RunPlan, StepKind};
pub use types::*;

/// Sentinel for descriptive metadata fields without a usable source value.
pub const UNKNOWN: &str = "n.a.";

/// Tool label used in generated METS agent entries and PDF producer fields.
pub const TOOL_LABEL: &str = "blattwerk";
