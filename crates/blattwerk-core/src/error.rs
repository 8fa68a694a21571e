// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Unified error types for blattwerk.

use thiserror::Error;

/// Top-level error type for all blattwerk operations.
#[derive(Debug, Error)]
pub enum BlattwerkError {
    // -- Run setup --
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("input missing: {0}")]
    InputMissing(String),

    // -- Metadata --
    #[error("metadata parsing failed: {0}")]
    Parse(String),

    #[error("structure mapping failed: {0}")]
    Structure(String),

    // -- Derivates --
    #[error("image processing failed: {0}")]
    Image(String),

    #[error("PDF composition failed: {0}")]
    Pdf(String),

    #[error("METS write failed: {0}")]
    MetsWrite(String),

    // -- I/O --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BlattwerkError>;
