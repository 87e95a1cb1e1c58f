use super::artifact::{ArtifactKind, CanonicalKey};
use crate::config::Directories;
use std::path::{Path, PathBuf};

/// File naming for staged artifacts, fragments and final reports
#[derive(Debug, Clone)]
pub struct StagingLayout {
    dirs: Directories,
}

impl StagingLayout {
    pub fn new(dirs: Directories) -> Self {
        Self { dirs }
    }

    pub fn staging_dir(&self) -> &Path {
        &self.dirs.staging_dir
    }

    /// Stored bytes of a canonical artifact, awaiting rendering
    pub fn canonical_artifact(&self, key: &CanonicalKey) -> PathBuf {
        self.dirs.staging_dir.join(format!("{key}.json"))
    }

    /// Rendered fragment of a canonical artifact
    pub fn fragment(&self, key: &CanonicalKey) -> PathBuf {
        let name = match key.kind {
            ArtifactKind::PackageMatch => format!("{}-unique.snippet", key.digest),
            ArtifactKind::Unmatched => format!("{}-unmatched.html.gz", key.digest),
        };
        self.dirs.staging_dir.join(name)
    }

    pub fn unique_report(&self, file_key: &str) -> PathBuf {
        self.report(file_key, "unique")
    }

    pub fn unmatched_report(&self, file_key: &str) -> PathBuf {
        self.report(file_key, "unmatched")
    }

    pub fn function_names_report(&self, file_key: &str) -> PathBuf {
        self.report(file_key, "functionnames")
    }

    pub fn names_report(&self, file_key: &str) -> PathBuf {
        self.report(file_key, "names")
    }

    fn report(&self, file_key: &str, suffix: &str) -> PathBuf {
        self.dirs.report_dir.join(format!("{file_key}-{suffix}.html.gz"))
    }
}
