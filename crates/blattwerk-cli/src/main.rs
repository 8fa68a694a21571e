// SPDX-License-Identifier: PMPL-1.0-or-later
//
// blattwerk — derivative generation for digitised library holdings.
//
// Entry point: initialises logging, loads the configuration, runs the
// derivation pipeline and reports a one-line summary. Exit code 0 on
// success, 1 on any fatal error.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use blattwerk_core::config::RunConfig;
use blattwerk_core::error::Result;
use blattwerk_pipeline::{Derivans, RunSummary};

#[derive(Parser)]
#[command(
    name = "blattwerk",
    version,
    about = "Generate JPEG derivatives, a searchable PDF and an enriched METS for a digitised object"
)]
struct Cli {
    /// METS file, or directory containing an image subdirectory (MAX/, TIF/)
    input: PathBuf,

    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// JPEG quality (1..=100) for image steps
    #[arg(long)]
    quality: Option<u8>,

    /// Maximal image dimension; 0 disables scaling
    #[arg(long)]
    maximal: Option<u32>,

    /// Worker count for image steps (capped at cores - 1)
    #[arg(long)]
    poolsize: Option<usize>,

    /// PDF/A conformance tag, e.g. PDF_A_1B
    #[arg(long, value_name = "TAG")]
    conformance: Option<String>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(summary) => {
            println!("{summary}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<RunSummary> {
    let mut config = match &cli.config {
        Some(path) => RunConfig::from_path(path)?,
        None => RunConfig::default(),
    };
    if let Some(quality) = cli.quality {
        config.quality = quality;
    }
    if let Some(maximal) = cli.maximal {
        config.maximal = maximal;
    }
    if let Some(poolsize) = cli.poolsize {
        config.poolsize = poolsize;
    }
    if let Some(conformance) = cli.conformance {
        config.pdf.conformance = Some(conformance);
    }
    config.validate()?;

    tracing::info!(input = %cli.input.display(), "blattwerk starting");
    Derivans::new(&cli.input, config)?.run()
}
