// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Run orchestration: detect the inputs (bare image tree or METS file),
// build the immutable run plan from configuration, then execute the steps
// in declared order. Every step is a barrier; a failing step aborts the
// run and leaves its partial outputs on disk for inspection.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, info, instrument, warn};

use blattwerk_core::config::RunConfig;
use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::plan::{DerivateStep, RunPlan, StepKind};
use blattwerk_core::{DescriptiveData, DigitalPage, DigitalStructureTree};
use blattwerk_document::footer::FooterRenderer;
use blattwerk_document::pdf::composer::PdfComposer;
use blattwerk_document::pdf::stamper;
use blattwerk_mets::{alto, MetadataStore, StructureMapper};

use crate::steps;
use crate::tool_label;

/// Image subdirectories probed when no METS file group tells us better.
const IMAGE_SUBDIRS: [&str; 3] = ["MAX", "TIF", "DEFAULT"];
const FULLTEXT_SUBDIR: &str = "FULLTEXT";

/// What a finished run reports on stdout.
#[derive(Debug)]
pub struct RunSummary {
    pub identifier: String,
    pub pages: usize,
    pub pdf_path: PathBuf,
    pub granulars: usize,
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} page(s) -> {} ({} granular URN(s))",
            self.identifier,
            self.pages,
            self.pdf_path.display(),
            self.granulars
        )
    }
}

/// One derivative generation run over a digitised object.
pub struct Derivans {
    config: RunConfig,
    root: PathBuf,
    image_dir: PathBuf,
    fulltext_dir: Option<PathBuf>,
    store: Option<MetadataStore>,
    description: DescriptiveData,
    identifier: String,
}

impl Derivans {
    /// Detect inputs below `input`: either a METS file path or a directory
    /// holding an image subdirectory.
    pub fn new(input: impl AsRef<Path>, config: RunConfig) -> Result<Self> {
        let input = input.as_ref();
        config.validate()?;

        if input.is_file() {
            Self::from_mets(input, config)
        } else if input.is_dir() {
            Self::from_directory(input, config)
        } else {
            Err(BlattwerkError::InputMissing(format!(
                "input path {} does not exist",
                input.display()
            )))
        }
    }

    fn from_mets(mets_path: &Path, config: RunConfig) -> Result<Self> {
        let store = MetadataStore::load(mets_path)?;
        let root = mets_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let subdir = store.image_subdir().unwrap_or_else(|| "MAX".into());
        let image_dir = root.join(&subdir);
        if !image_dir.is_dir() {
            return Err(BlattwerkError::InputMissing(format!(
                "image directory {} referenced by METS does not exist",
                image_dir.display()
            )));
        }

        let description = store.descriptive_data()?;
        let identifier = description.identifier.clone();
        let fulltext_dir = existing_dir(root.join(FULLTEXT_SUBDIR));
        info!(%identifier, root = %root.display(), "run input: METS");
        Ok(Self {
            config,
            root,
            image_dir,
            fulltext_dir,
            store: Some(store),
            description,
            identifier,
        })
    }

    fn from_directory(root: &Path, config: RunConfig) -> Result<Self> {
        let image_dir = IMAGE_SUBDIRS
            .iter()
            .map(|subdir| root.join(subdir))
            .find(|candidate| candidate.is_dir())
            .ok_or_else(|| {
                BlattwerkError::InputMissing(format!(
                    "no image subdirectory ({}) below {}",
                    IMAGE_SUBDIRS.join(", "),
                    root.display()
                ))
            })?;

        // without metadata the directory name identifies the object
        let identifier = root
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "digitalisat".into());
        let mut description = DescriptiveData::default();
        description.identifier = identifier.clone();

        let fulltext_dir = existing_dir(root.join(FULLTEXT_SUBDIR));
        info!(%identifier, root = %root.display(), "run input: image directory");
        Ok(Self {
            config,
            root: root.to_path_buf(),
            image_dir,
            fulltext_dir,
            store: None,
            description,
            identifier,
        })
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Execute the full plan.
    #[instrument(skip(self), fields(identifier = %self.identifier))]
    pub fn run(&mut self) -> Result<RunSummary> {
        let mut pages = self.resolve_pages()?;
        if pages.is_empty() {
            return Err(BlattwerkError::InputMissing(format!(
                "no images found in {}",
                self.image_dir.display()
            )));
        }

        let structure = self.build_structure()?;
        let plan = self.assemble_plan()?;
        let footer = self.footer_renderer(&plan)?;
        let granulars = AtomicUsize::new(0);
        let mut pdf_path = self.root.join(format!("{}.pdf", self.identifier));

        for step in plan.steps() {
            match step.kind {
                kind if kind.is_image_step() => {
                    steps::execute_image_step(step, &mut pages, footer.as_ref(), &granulars)?;
                }
                StepKind::Pdf => {
                    self.attach_ocr(&mut pages)?;
                    let composer = PdfComposer::new(
                        &self.description,
                        structure.as_ref(),
                        step.pdf_conformance,
                        self.config.pdf.font_size,
                    );
                    let result = composer.compose(&mut pages, &step.output_dir)?;
                    if !result.succeeded(pages.len()) {
                        return Err(BlattwerkError::Pdf(format!(
                            "composer wrote {} of {} pages",
                            result.pages_written,
                            pages.len()
                        )));
                    }
                    stamper::stamp_info(&step.output_dir, &composer.custom_info())?;
                    pdf_path = step.output_dir.clone();
                }
                StepKind::Enrich => {
                    if !step.insert_into_mets {
                        debug!("enrichment step disabled");
                        continue;
                    }
                    match self.store.as_mut() {
                        Some(store) => {
                            store.enrich_pdf(&self.identifier, &tool_label())?;
                        }
                        None => warn!("no METS loaded, skipping enrichment"),
                    }
                }
                _ => unreachable!("image steps are matched by the guard"),
            }
        }

        let summary = RunSummary {
            identifier: self.identifier.clone(),
            pages: pages.len(),
            pdf_path,
            granulars: granulars.load(Ordering::Relaxed),
        };
        info!(%summary, "run finished");
        Ok(summary)
    }

    /// Page list from METS, or from a sorted directory listing when no
    /// metadata is available.
    fn resolve_pages(&self) -> Result<Vec<DigitalPage>> {
        if let Some(store) = &self.store {
            return store.pages(&self.image_dir);
        }

        let mut names: Vec<String> = std::fs::read_dir(&self.image_dir)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| {
                let lower = name.to_ascii_lowercase();
                lower.ends_with(".jpg") || lower.ends_with(".jpeg") || lower.ends_with(".tif")
            })
            .collect();
        names.sort();

        Ok(names
            .into_iter()
            .enumerate()
            .map(|(index, name)| {
                DigitalPage::new(index as u32 + 1, name.clone(), self.image_dir.join(name))
            })
            .collect())
    }

    fn build_structure(&self) -> Result<Option<DigitalStructureTree>> {
        match &self.store {
            Some(store) => {
                let mapper = StructureMapper::with_leaves(store, &self.description.title, false);
                Ok(Some(mapper.build()?))
            }
            None => Ok(None),
        }
    }

    /// Resolve step declarations into the immutable plan: each image
    /// step's output feeds the next step; the PDF lands beside the image
    /// directories.
    fn assemble_plan(&self) -> Result<RunPlan> {
        let mut steps = Vec::with_capacity(self.config.steps.len());
        let mut current_input = self.image_dir.clone();

        for declared in &self.config.steps {
            let quality = declared.quality.unwrap_or(self.config.quality);
            let input_dir = declared
                .input_subdir
                .as_ref()
                .map(|subdir| self.root.join(subdir))
                .unwrap_or_else(|| current_input.clone());
            let output_dir = match declared.kind {
                StepKind::Pdf => self.root.join(format!("{}.pdf", self.identifier)),
                StepKind::Enrich => self
                    .store
                    .as_ref()
                    .map(|store| store.path().to_path_buf())
                    .unwrap_or_else(|| self.root.clone()),
                _ => {
                    let subdir = declared
                        .output_subdir
                        .clone()
                        .unwrap_or_else(|| format!("IMAGE_{quality}"));
                    self.root.join(subdir)
                }
            };

            if declared.kind.is_image_step() {
                current_input = output_dir.clone();
            }

            steps.push(DerivateStep {
                kind: declared.kind,
                input_dir,
                output_dir,
                quality,
                maximal: declared.maximal.unwrap_or(self.config.maximal),
                pool_size: self.config.poolsize,
                pdf_conformance: self.config.conformance(),
                insert_into_mets: declared.insert_into_mets.unwrap_or(false),
            });
        }
        RunPlan::new(steps)
    }

    fn footer_renderer(&self, plan: &RunPlan) -> Result<Option<FooterRenderer>> {
        let needs_footer = plan.steps().iter().any(|step| {
            matches!(
                step.kind,
                StepKind::ImageFooter | StepKind::ImageFooterGranular
            )
        });
        if !needs_footer {
            return Ok(None);
        }
        Ok(Some(FooterRenderer::new(&self.config.footer.template)?))
    }

    /// Attach OCR lazily, right before composition.
    fn attach_ocr(&self, pages: &mut [DigitalPage]) -> Result<()> {
        let Some(fulltext_dir) = &self.fulltext_dir else {
            return Ok(());
        };
        let mut attached = 0usize;
        for page in pages.iter_mut() {
            if page.ocr.is_none() {
                page.ocr = alto::load_for_page(fulltext_dir, page)?;
                if page.ocr.is_some() {
                    attached += 1;
                }
            }
        }
        debug!(attached, "OCR pages attached");
        Ok(())
    }
}

fn existing_dir(path: PathBuf) -> Option<PathBuf> {
    path.is_dir().then_some(path)
}
