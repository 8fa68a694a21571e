// SPDX-License-Identifier: PMPL-1.0-or-later
//
// The run plan: an immutable, ordered list of typed derivation steps.
// Replaces the inheritance chain of classic derivative generators with a
// tagged step variant sharing one execution contract.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{BlattwerkError, Result};

/// What a single pipeline step does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// Re-encode pages as JPEG without dimension changes.
    ImageCopy,
    /// Re-encode pages as JPEG, bounded to a maximal dimension.
    ImageScale,
    /// Scale plus footer branding from the template band.
    ImageFooter,
    /// Scale plus footer branding including per-page granular URNs.
    ImageFooterGranular,
    /// Compose the searchable PDF from the final image set.
    Pdf,
    /// Write the PDF reference back into the METS file.
    Enrich,
}

impl StepKind {
    /// Steps that transform page images on the worker pool.
    pub fn is_image_step(&self) -> bool {
        matches!(
            self,
            Self::ImageCopy | Self::ImageScale | Self::ImageFooter | Self::ImageFooterGranular
        )
    }
}

/// PDF/A conformance level as requested through configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfConformance {
    A1A,
    A1B,
    A2A,
    A2B,
    A2U,
    A3A,
    A3B,
    A3U,
}

impl PdfConformance {
    /// Parse a configuration tag such as `PDF_A_1B` or `PDF_A_2B`.
    pub fn parse(tag: &str) -> Result<Self> {
        match tag {
            "PDF_A_1A" => Ok(Self::A1A),
            "PDF_A_1B" => Ok(Self::A1B),
            "PDF_A_2A" => Ok(Self::A2A),
            "PDF_A_2B" => Ok(Self::A2B),
            "PDF_A_2U" => Ok(Self::A2U),
            "PDF_A_3A" => Ok(Self::A3A),
            "PDF_A_3B" => Ok(Self::A3B),
            "PDF_A_3U" => Ok(Self::A3U),
            other => Err(BlattwerkError::Config(format!(
                "unknown PDF/A conformance tag '{other}'"
            ))),
        }
    }

    /// ISO 19005 part number.
    pub fn part(&self) -> u8 {
        match self {
            Self::A1A | Self::A1B => 1,
            Self::A2A | Self::A2B | Self::A2U => 2,
            Self::A3A | Self::A3B | Self::A3U => 3,
        }
    }

    /// Conformance letter within the part.
    pub fn level(&self) -> char {
        match self {
            Self::A1A | Self::A2A | Self::A3A => 'A',
            Self::A1B | Self::A2B | Self::A3B => 'B',
            Self::A2U | Self::A3U => 'U',
        }
    }
}

impl std::fmt::Display for PdfConformance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PDF_A_{}{}", self.part(), self.level())
    }
}

/// One fully resolved pipeline step.
#[derive(Debug, Clone)]
pub struct DerivateStep {
    pub kind: StepKind,
    pub input_dir: PathBuf,
    /// Directory (image steps) or file path (PDF step) this step produces.
    pub output_dir: PathBuf,
    pub quality: u8,
    /// Maximal dimension for scaling; 0 means no limit.
    pub maximal: u32,
    pub pool_size: usize,
    pub pdf_conformance: Option<PdfConformance>,
    pub insert_into_mets: bool,
}

/// Immutable, ordered sequence of derivation steps.
///
/// Image steps must chain: the i-th step's output directory is the
/// (i+1)-th step's input directory.
#[derive(Debug, Clone)]
pub struct RunPlan {
    steps: Vec<DerivateStep>,
}

impl RunPlan {
    pub fn new(steps: Vec<DerivateStep>) -> Result<Self> {
        if steps.is_empty() {
            return Err(BlattwerkError::Config("run plan has no steps".into()));
        }
        let mut previous: Option<&DerivateStep> = None;
        for step in &steps {
            if let Some(prev) = previous {
                if prev.kind.is_image_step() && step.input_dir != prev.output_dir {
                    return Err(BlattwerkError::Config(format!(
                        "step chain broken: '{}' does not consume '{}'",
                        step.input_dir.display(),
                        prev.output_dir.display()
                    )));
                }
            }
            if step.kind.is_image_step() && !(1..=100).contains(&step.quality) {
                return Err(BlattwerkError::Config(format!(
                    "JPEG quality {} outside 1..=100",
                    step.quality
                )));
            }
            previous = Some(step);
        }
        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[DerivateStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
