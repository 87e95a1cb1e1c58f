//! Extract, deduplicate, render and reassemble reports for a batch of files

use super::assemble::Assembler;
use super::extract::{Extraction, Extractor};
use super::layout::StagingLayout;
use super::registry::{FileOwnership, OwnedPackage, OwnershipIndex, Registration, Registry};
use super::render::Renderer;
use crate::config::Settings;
use crate::parallel::ExecutionStrategy;
use crate::scan::FileKey;
use anyhow::Result;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

/// Counters describing one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    pub files_considered: usize,
    pub files_with_artifacts: usize,
    pub canonical_artifacts: usize,
    pub duplicates_discarded: usize,
    pub fragments_rendered: usize,
    pub unit_failures: usize,
    pub reports_written: usize,
}

impl fmt::Display for PipelineSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} files ({} with artifacts), {} unique artifacts, {} duplicates skipped, \
             {} fragments rendered, {} reports written, {} failed units",
            self.files_considered,
            self.files_with_artifacts,
            self.canonical_artifacts,
            self.duplicates_discarded,
            self.fragments_rendered,
            self.reports_written,
            self.unit_failures,
        )
    }
}

/// Generate every report for `file_keys`, reading leaf records under `top_dir`.
///
/// Only a failure to create the output directories aborts the run. Units
/// that fail are logged, counted and left without a report.
pub fn generate_reports(file_keys: &[FileKey], top_dir: &Path, settings: &Settings) -> Result<PipelineSummary> {
    let dirs = settings.directories(top_dir);
    dirs.bootstrap()?;
    let layout = StagingLayout::new(dirs);

    let workers = ExecutionStrategy::calculate_optimal_workers(
        settings.parallel.max_threads,
        settings.parallel.thread_percentage,
    );
    let strategy = |count: usize| ExecutionStrategy::auto(count, settings.parallel.min_items_for_parallel, workers);

    // Each file owns its artifacts once, however often it is listed
    let mut seen = HashSet::new();
    let file_keys: Vec<FileKey> = file_keys.iter().filter(|key| seen.insert(key.as_str())).cloned().collect();

    let mut summary = PipelineSummary {
        files_considered: file_keys.len(),
        ..Default::default()
    };

    // Extraction: one unit per file, no shared state
    let extractor = Extractor::new(&layout, top_dir, settings.hashing.chunk_size);
    let extracted = strategy(file_keys.len()).execute(
        file_keys,
        |file_key, _| extractor.extract(file_key),
        "Extracting",
    )?;
    summary.unit_failures += extracted.failures;
    summary.reports_written += extracted.results.iter().map(|e| e.auxiliary_reports).sum::<usize>();
    tracing::debug!("Extracted {} files", extracted.results.len());

    // Registration: serialized, first seen wins in input order
    let registry = Registry::new(layout.clone());
    let mut ownership = OwnershipIndex::new();
    for extraction in extracted.results {
        if extraction.artifact_count() == 0 {
            continue;
        }
        summary.files_with_artifacts += 1;
        let file_key = extraction.file_key.clone();
        let owned = register_extraction(&registry, extraction, &mut summary);
        if !owned.is_empty() {
            ownership.insert(file_key, owned);
        }
    }
    summary.canonical_artifacts = registry.len();
    tracing::debug!(
        "Registered {} unique artifacts, {} duplicates",
        summary.canonical_artifacts,
        summary.duplicates_discarded
    );

    // Rendering: one unit per canonical hash
    let renderer = Renderer::new(&layout);
    let pending = registry.pending_render();
    let rendered = strategy(pending.len()).execute(pending, |entry, _| renderer.render(entry), "Rendering")?;
    summary.fragments_rendered = rendered.results.len();
    summary.unit_failures += rendered.failures;

    // Assembly: one unit per file, fragments released under the registry lock
    let assembler = Assembler::new(&layout, &registry);
    let owners: Vec<(FileKey, FileOwnership)> = ownership.into_iter().collect();
    let assembled = strategy(owners.len()).execute(
        owners,
        |(file_key, owned), _| assembler.assemble(file_key, owned),
        "Assembling",
    )?;
    summary.reports_written += assembled.results.iter().sum::<usize>();
    summary.unit_failures += assembled.failures;

    if !registry.is_empty() {
        tracing::debug!("{} canonical artifacts were not released", registry.len());
    }

    tracing::info!("Report generation finished: {summary}");
    Ok(summary)
}

/// Register the artifacts of one file, returning what it ends up owning
fn register_extraction(registry: &Registry, extraction: Extraction, summary: &mut PipelineSummary) -> FileOwnership {
    let file_key = extraction.file_key;
    let mut owned = FileOwnership::default();

    if let Some(staged) = extraction.unmatched {
        match registry.register(&file_key, staged) {
            Ok((key, registration)) => {
                if registration == Registration::Duplicate {
                    summary.duplicates_discarded += 1;
                }
                owned.unmatched = Some(key);
            }
            Err(e) => {
                tracing::warn!("Registering unmatched strings of {file_key}: {e:#}");
                summary.unit_failures += 1;
            }
        }
    }

    for package in extraction.packages {
        match registry.register(&file_key, package.staged) {
            Ok((key, registration)) => {
                if registration == Registration::Duplicate {
                    summary.duplicates_discarded += 1;
                }
                owned.packages.push(OwnedPackage {
                    rank: package.rank,
                    key,
                    package_name: package.package_name,
                    match_count: package.match_count,
                });
            }
            Err(e) => {
                tracing::warn!("Registering {} for {file_key}: {e:#}", package.package_name);
                summary.unit_failures += 1;
            }
        }
    }
    owned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::html::read_gzip;
    use crate::scan::{LeafReport, Occurrence, PackageReport, RankingResult, UniqueMatch, leaf_path};
    use std::collections::BTreeMap;
    use std::fs;
    use tempfile::TempDir;

    fn zlib_report() -> PackageReport {
        PackageReport {
            rank: 1,
            package_name: "zlib".to_string(),
            unique_matches: vec![UniqueMatch {
                search_string: "inflate 1.2.3 Copyright".to_string(),
                occurrences: vec![
                    Occurrence {
                        checksum: "c0ffee".to_string(),
                        version: "1.2.3".to_string(),
                        line_number: 17,
                        source_file: "zlib-1.2.3/inflate.c".to_string(),
                    },
                    Occurrence {
                        checksum: "c0ffee".to_string(),
                        version: "1.2.4".to_string(),
                        line_number: 17,
                        source_file: "zlib-1.2.4/inflate.c".to_string(),
                    },
                ],
            }],
            percentage: 80.0,
            package_versions: BTreeMap::new(),
            licenses: vec!["Zlib".to_string()],
        }
    }

    fn write_leaf(top: &Path, key: &str, ranking: Option<RankingResult>) {
        let path = leaf_path(top, key);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, serde_json::to_vec(&LeafReport { ranking }).unwrap()).unwrap();
    }

    fn settings(workers: usize) -> Settings {
        let mut settings = Settings::default();
        settings.parallel.max_threads = workers;
        settings
    }

    #[test]
    fn test_identical_files_render_once_and_share_tables() {
        let temp = TempDir::new().unwrap();
        let keys: Vec<FileKey> = (0..4).map(|i| format!("file{i}")).collect();
        for key in &keys {
            let mut ranking = RankingResult::default();
            ranking.match_result.reports = vec![zlib_report()];
            ranking.match_result.unmatched = vec!["garbage".to_string()];
            write_leaf(temp.path(), key, Some(ranking));
        }

        let summary = generate_reports(&keys, temp.path(), &settings(4)).unwrap();
        assert_eq!(summary.files_with_artifacts, 4);
        assert_eq!(summary.canonical_artifacts, 2);
        assert_eq!(summary.duplicates_discarded, 6);
        assert_eq!(summary.fragments_rendered, 2);
        assert_eq!(summary.reports_written, 8);
        assert_eq!(summary.unit_failures, 0);

        let reports = temp.path().join("reports");
        let first = read_gzip(&reports.join("file0-unique.html.gz"));
        assert!(first.contains("<tr><td>inflate.c</td><td>1.2.3, 1.2.4</td>"));
        for key in &keys[1..] {
            assert_eq!(read_gzip(&reports.join(format!("{key}-unique.html.gz"))), first);
            assert!(reports.join(format!("{key}-unmatched.html.gz")).exists());
        }

        let leftovers: Vec<_> = fs::read_dir(temp.path().join("staging")).unwrap().collect();
        assert!(leftovers.is_empty(), "staging must be empty after assembly");
    }

    #[test]
    fn test_empty_ranking_yields_no_outputs() {
        let temp = TempDir::new().unwrap();
        write_leaf(temp.path(), "empty", Some(RankingResult::default()));
        write_leaf(temp.path(), "unranked", None);
        let keys = vec!["empty".to_string(), "unranked".to_string(), "missing".to_string()];

        let summary = generate_reports(&keys, temp.path(), &settings(2)).unwrap();
        assert_eq!(summary.files_considered, 3);
        assert_eq!(summary.files_with_artifacts, 0);
        assert_eq!(summary.reports_written, 0);
        assert_eq!(fs::read_dir(temp.path().join("reports")).unwrap().count(), 0);
    }

    #[test]
    fn test_malformed_leaf_does_not_abort_siblings() {
        let temp = TempDir::new().unwrap();
        let mut ranking = RankingResult::default();
        ranking.match_result.reports = vec![zlib_report()];
        write_leaf(temp.path(), "good", Some(ranking));
        fs::write(leaf_path(temp.path(), "bad"), "{ not json").unwrap();

        let keys = vec!["bad".to_string(), "good".to_string()];
        let summary = generate_reports(&keys, temp.path(), &settings(1)).unwrap();
        assert_eq!(summary.unit_failures, 1);
        assert!(temp.path().join("reports/good-unique.html.gz").exists());
        assert!(!temp.path().join("reports/bad-unique.html.gz").exists());
    }

    #[test]
    fn test_repeated_file_key_is_processed_once() {
        let temp = TempDir::new().unwrap();
        let mut ranking = RankingResult::default();
        ranking.match_result.unmatched = vec!["lonely".to_string()];
        write_leaf(temp.path(), "a", Some(ranking));

        let keys = vec!["a".to_string(), "a".to_string()];
        let summary = generate_reports(&keys, temp.path(), &settings(2)).unwrap();
        assert_eq!(summary.files_considered, 1);
        assert_eq!(summary.duplicates_discarded, 0);
        assert_eq!(summary.reports_written, 1);
        assert!(temp.path().join("reports/a-unmatched.html.gz").exists());
        assert_eq!(fs::read_dir(temp.path().join("staging")).unwrap().count(), 0);
    }

    #[test]
    fn test_bootstrap_failure_aborts_run() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("reports"), "in the way").unwrap();

        let err = generate_reports(&["x".to_string()], temp.path(), &settings(1)).unwrap_err();
        assert!(err.downcast_ref::<crate::error::ReportError>().is_some());
    }
}
