//! Per-file extraction of renderable artifacts from leaf reports

use super::artifact::{Artifact, StagedArtifact};
use super::auxiliary::{render_function_names, render_language_names};
use super::html::write_gzip;
use super::layout::StagingLayout;
use crate::scan::{FileKey, RankingResult, leaf_path, load_leaf};
use anyhow::Result;
use std::path::Path;

/// Package artifact staged for registration
#[derive(Debug)]
pub struct StagedPackage {
    pub rank: u32,
    pub package_name: String,
    pub match_count: usize,
    pub staged: StagedArtifact,
}

/// Everything extraction produced for one file-key
#[derive(Debug, Default)]
pub struct Extraction {
    pub file_key: FileKey,
    pub unmatched: Option<StagedArtifact>,
    pub packages: Vec<StagedPackage>,
    /// Function-name and language reports written straight to the report dir
    pub auxiliary_reports: usize,
}

impl Extraction {
    fn empty(file_key: &str) -> Self {
        Self {
            file_key: file_key.to_string(),
            ..Default::default()
        }
    }

    pub fn artifact_count(&self) -> usize {
        self.packages.len() + usize::from(self.unmatched.is_some())
    }
}

pub struct Extractor<'a> {
    layout: &'a StagingLayout,
    top_dir: &'a Path,
    chunk_size: usize,
}

impl<'a> Extractor<'a> {
    pub fn new(layout: &'a StagingLayout, top_dir: &'a Path, chunk_size: usize) -> Self {
        Self {
            layout,
            top_dir,
            chunk_size,
        }
    }

    /// Stage the artifacts of one file and write its auxiliary reports.
    ///
    /// A file without a leaf record or without ranking data yields an empty
    /// extraction. A leaf record that cannot be parsed is an error.
    pub fn extract(&self, file_key: &str) -> Result<Extraction> {
        let path = leaf_path(self.top_dir, file_key);
        if !path.exists() {
            tracing::debug!("No leaf report for {file_key}");
            return Ok(Extraction::empty(file_key));
        }

        let Some(ranking) = load_leaf(&path)?.ranking else {
            tracing::trace!("No ranking data for {file_key}");
            return Ok(Extraction::empty(file_key));
        };
        if ranking.is_empty() {
            tracing::trace!("Empty ranking for {file_key}");
            return Ok(Extraction::empty(file_key));
        }
        self.extract_ranking(file_key, &ranking)
    }

    fn extract_ranking(&self, file_key: &str, ranking: &RankingResult) -> Result<Extraction> {
        let mut extraction = Extraction::empty(file_key);
        let staging = self.layout.staging_dir();

        if let Some(artifact) = Artifact::unmatched(&ranking.match_result.unmatched) {
            extraction.unmatched = Some(StagedArtifact::stage(&artifact, staging, self.chunk_size)?);
        }

        for report in &ranking.match_result.reports {
            if report.unique_matches.is_empty() {
                continue;
            }
            let artifact = Artifact::PackageMatch {
                package_name: report.package_name.clone(),
                unique_matches: report.unique_matches.clone(),
            };
            extraction.packages.push(StagedPackage {
                rank: report.rank,
                package_name: report.package_name.clone(),
                match_count: report.unique_matches.len(),
                staged: StagedArtifact::stage(&artifact, staging, self.chunk_size)?,
            });
        }

        if let Some(html) = render_function_names(&ranking.dynamic) {
            write_gzip(&self.layout.function_names_report(file_key), &html)?;
            extraction.auxiliary_reports += 1;
        }

        if let Some(html) = ranking.language.as_ref().and_then(render_language_names) {
            write_gzip(&self.layout.names_report(file_key), &html)?;
            extraction.auxiliary_reports += 1;
        }

        tracing::trace!(
            "Extracted {} artifacts from {file_key}",
            extraction.artifact_count()
        );
        Ok(extraction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Directories;
    use crate::report::html::read_gzip;
    use crate::scan::{LeafReport, PackageReport, UniqueMatch};
    use std::collections::BTreeMap;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, StagingLayout) {
        let temp = TempDir::new().unwrap();
        let dirs = Directories {
            report_dir: temp.path().join("reports"),
            staging_dir: temp.path().join("staging"),
        };
        dirs.bootstrap().unwrap();
        (temp, StagingLayout::new(dirs))
    }

    fn write_leaf(top: &Path, key: &str, leaf: &LeafReport) {
        let path = leaf_path(top, key);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, serde_json::to_vec(leaf).unwrap()).unwrap();
    }

    fn package(rank: u32, name: &str, matches: &[&str]) -> PackageReport {
        PackageReport {
            rank,
            package_name: name.to_string(),
            unique_matches: matches
                .iter()
                .map(|s| UniqueMatch {
                    search_string: s.to_string(),
                    occurrences: vec![],
                })
                .collect(),
            percentage: 0.0,
            package_versions: BTreeMap::new(),
            licenses: vec![],
        }
    }

    #[test]
    fn test_missing_leaf_yields_empty_extraction() {
        let (temp, layout) = setup();
        let extraction = Extractor::new(&layout, temp.path(), 1024).extract("absent").unwrap();
        assert_eq!(extraction.artifact_count(), 0);
        assert_eq!(extraction.auxiliary_reports, 0);
    }

    #[test]
    fn test_empty_ranking_stages_nothing() {
        let (temp, layout) = setup();
        write_leaf(temp.path(), "blank", &LeafReport { ranking: Some(RankingResult::default()) });

        let extraction = Extractor::new(&layout, temp.path(), 1024).extract("blank").unwrap();
        assert_eq!(extraction.artifact_count(), 0);
        assert_eq!(extraction.auxiliary_reports, 0);
        assert_eq!(fs::read_dir(layout.staging_dir()).unwrap().count(), 0);
        assert!(!layout.function_names_report("blank").exists());
    }

    #[test]
    fn test_malformed_leaf_is_an_error() {
        let (temp, layout) = setup();
        let path = leaf_path(temp.path(), "broken");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "not json").unwrap();

        assert!(Extractor::new(&layout, temp.path(), 1024).extract("broken").is_err());
    }

    #[test]
    fn test_packages_without_unique_matches_are_dropped() {
        let (temp, layout) = setup();
        let mut ranking = RankingResult::default();
        ranking.match_result.unmatched = vec!["b".to_string(), "a".to_string()];
        ranking.match_result.reports = vec![
            package(1, "zlib", &["inflate"]),
            package(2, "empty", &[]),
            package(3, "bzip2", &["BZh", "bzip2recover"]),
        ];
        write_leaf(temp.path(), "f1", &LeafReport { ranking: Some(ranking) });

        let extraction = Extractor::new(&layout, temp.path(), 1024).extract("f1").unwrap();
        assert!(extraction.unmatched.is_some());
        let names: Vec<&str> = extraction.packages.iter().map(|p| p.package_name.as_str()).collect();
        assert_eq!(names, vec!["zlib", "bzip2"]);
        assert_eq!(extraction.packages[1].match_count, 2);
        assert_eq!(extraction.packages[1].rank, 3);
    }

    #[test]
    fn test_auxiliary_reports_written_directly() {
        let (temp, layout) = setup();
        let mut ranking = RankingResult::default();
        ranking
            .dynamic
            .unique_packages
            .insert("openssl".to_string(), vec!["SSL_new".to_string()]);
        write_leaf(temp.path(), "f2", &LeafReport { ranking: Some(ranking) });

        let extraction = Extractor::new(&layout, temp.path(), 1024).extract("f2").unwrap();
        assert_eq!(extraction.artifact_count(), 0);
        assert_eq!(extraction.auxiliary_reports, 1);

        let html = read_gzip(&layout.function_names_report("f2"));
        assert!(html.contains("SSL_new<br>"));
        assert!(!layout.names_report("f2").exists());
    }
}
