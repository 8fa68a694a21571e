// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Run configuration, loaded from a TOML file. Every knob has a default so
// a bare input directory is enough to run the full default pipeline.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{BlattwerkError, Result};
use crate::plan::{PdfConformance, StepKind};

pub const DEFAULT_QUALITY: u8 = 80;
pub const DEFAULT_POOLSIZE: usize = 2;
pub const DEFAULT_FONT_SIZE: u32 = 10;

/// Persistent run settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Worker count for image steps; capped at cores − 1 during execution.
    pub poolsize: usize,
    /// JPEG quality (1..=100) for image steps without their own value.
    pub quality: u8,
    /// Maximal image dimension; 0 means no limit.
    pub maximal: u32,
    pub footer: FooterConfig,
    pub pdf: PdfConfig,
    /// Ordered step declarations; defaults to footer-branding, PDF, enrich.
    pub steps: Vec<StepConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FooterConfig {
    /// Multi-line band template, rendered centred onto the footer band.
    pub template: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// PDF/A conformance tag such as `PDF_A_1B`; absent means plain PDF.
    pub conformance: Option<String>,
    /// Seed font size for the OCR text layer.
    pub font_size: u32,
}

/// One declared pipeline step. Directories are relative to the run root;
/// an absent `input_subdir` chains to the previous step's output (or the
/// detected image directory for the first step).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepConfig {
    pub kind: StepKind,
    #[serde(default)]
    pub input_subdir: Option<String>,
    #[serde(default)]
    pub output_subdir: Option<String>,
    #[serde(default)]
    pub quality: Option<u8>,
    #[serde(default)]
    pub maximal: Option<u32>,
    #[serde(default)]
    pub insert_into_mets: Option<bool>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            poolsize: DEFAULT_POOLSIZE,
            quality: DEFAULT_QUALITY,
            maximal: 0,
            footer: FooterConfig::default(),
            pdf: PdfConfig::default(),
            steps: vec![
                StepConfig {
                    kind: StepKind::ImageFooterGranular,
                    input_subdir: None,
                    output_subdir: Some("IMAGE_80".into()),
                    quality: Some(DEFAULT_QUALITY),
                    maximal: None,
                    insert_into_mets: None,
                },
                StepConfig {
                    kind: StepKind::Pdf,
                    input_subdir: None,
                    output_subdir: None,
                    quality: None,
                    maximal: None,
                    insert_into_mets: None,
                },
                StepConfig {
                    kind: StepKind::Enrich,
                    input_subdir: None,
                    output_subdir: None,
                    quality: None,
                    maximal: None,
                    insert_into_mets: Some(true),
                },
            ],
        }
    }
}

impl Default for FooterConfig {
    fn default() -> Self {
        Self {
            template: "Digitale Sammlungen".into(),
        }
    }
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            conformance: None,
            font_size: DEFAULT_FONT_SIZE,
        }
    }
}

impl RunConfig {
    /// Load and validate a configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|err| {
            BlattwerkError::Config(format!("cannot read {}: {}", path.display(), err))
        })?;
        let config: Self = toml::from_str(&raw).map_err(|err| {
            BlattwerkError::Config(format!("cannot parse {}: {}", path.display(), err))
        })?;
        config.validate()?;
        debug!(steps = config.steps.len(), "configuration loaded");
        Ok(config)
    }

    /// Reject invalid settings before any work begins.
    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.quality) {
            return Err(BlattwerkError::Config(format!(
                "quality {} outside 1..=100",
                self.quality
            )));
        }
        for step in &self.steps {
            if let Some(quality) = step.quality {
                if !(1..=100).contains(&quality) {
                    return Err(BlattwerkError::Config(format!(
                        "step quality {quality} outside 1..=100"
                    )));
                }
            }
        }
        if self.steps.is_empty() {
            return Err(BlattwerkError::Config("no steps declared".into()));
        }
        if let Some(tag) = &self.pdf.conformance {
            PdfConformance::parse(tag)?;
        }
        if self.footer.template.trim().is_empty() {
            return Err(BlattwerkError::Config("footer template is empty".into()));
        }
        Ok(())
    }

    /// Parsed conformance level, validated beforehand by [`Self::validate`].
    pub fn conformance(&self) -> Option<PdfConformance> {
        self.pdf
            .conformance
            .as_deref()
            .and_then(|tag| PdfConformance::parse(tag).ok())
    }
}
