//! Report generation command

use anyhow::{Context, Result};
use clap::Args;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::cli::Output;
use crate::config::ReportConfig;
use crate::report::generate_reports;
use crate::scan::{FileKey, UnpackReport, discover_leaf_reports, select_ranked_files};

#[derive(Args)]
pub struct GenerateArgs {
    /// Top-level working directory holding `filereports/`
    #[arg(value_name = "DIR")]
    pub top_dir: PathBuf,

    /// JSON map of unpacked paths to unpack reports; only files tagged
    /// `ranking` are processed. Without it every leaf report is processed.
    #[arg(long, value_name = "FILE")]
    pub unpack_report: Option<PathBuf>,

    /// Configuration override `key=value` (repeatable, or colon-separated)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub overrides: Vec<String>,
}

pub fn execute(args: GenerateArgs, config_path: Option<&Path>, quiet: bool) -> Result<()> {
    let output = Output::new(quiet);
    let start = Instant::now();

    let settings = ReportConfig::load(config_path, &args.overrides)?.settings()?;
    let file_keys = select_files(&args)?;
    if file_keys.is_empty() {
        output.warning(&format!("No ranked files found under {}", args.top_dir.display()));
    } else {
        output.info(&format!("Generating reports for {} files", file_keys.len()));
    }

    let summary = generate_reports(&file_keys, &args.top_dir, &settings)?;

    output.header("Report generation");
    output.summary_stats("Files considered", summary.files_considered);
    output.summary_stats("Files with artifacts", summary.files_with_artifacts);
    output.summary_stats("Unique artifacts", summary.canonical_artifacts);
    output.summary_stats("Duplicates skipped", summary.duplicates_discarded);
    output.summary_stats("Fragments rendered", summary.fragments_rendered);
    output.summary_stats("Reports written", summary.reports_written);
    if summary.unit_failures > 0 {
        output.warning(&format!("{} units failed, see log for details", summary.unit_failures));
    }
    output.success(&format!(
        "Reports written to {} in {:.2?}",
        settings.directories(&args.top_dir).report_dir.display(),
        start.elapsed()
    ));
    Ok(())
}

fn select_files(args: &GenerateArgs) -> Result<Vec<FileKey>> {
    match &args.unpack_report {
        Some(path) => {
            let content = fs::read(path)
                .with_context(|| format!("Failed to read unpack report: {}", path.display()))?;
            let reports: BTreeMap<String, UnpackReport> = serde_json::from_slice(&content)
                .with_context(|| format!("Failed to parse unpack report: {}", path.display()))?;
            Ok(select_ranked_files(&reports, &args.top_dir))
        }
        None if !args.top_dir.join("filereports").is_dir() => Ok(Vec::new()),
        None => discover_leaf_reports(&args.top_dir),
    }
}
