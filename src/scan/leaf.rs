use super::types::{FileKey, LeafReport, UnpackReport};
use anyhow::{Context, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

const FILEREPORTS_DIR: &str = "filereports";
const LEAF_SUFFIX: &str = "-filereport.json";
const RANKING_TAG: &str = "ranking";

/// Location of the leaf record for `file_key` under the top-level directory
pub fn leaf_path(top_dir: &Path, file_key: &str) -> PathBuf {
    top_dir
        .join(FILEREPORTS_DIR)
        .join(format!("{file_key}{LEAF_SUFFIX}"))
}

/// Load and parse a leaf record
pub fn load_leaf(path: &Path) -> Result<LeafReport> {
    let content = fs::read(path)
        .with_context(|| format!("Failed to read leaf report: {}", path.display()))?;
    serde_json::from_slice(&content)
        .with_context(|| format!("Failed to parse leaf report: {}", path.display()))
}

/// File-keys of the unpacked files that carry ranking results on disk.
///
/// Several paths may share one file-key; each key is returned once, sorted.
pub fn select_ranked_files(
    unpack_reports: &BTreeMap<String, UnpackReport>,
    top_dir: &Path,
) -> Vec<FileKey> {
    let mut keys = BTreeSet::new();
    for (path, report) in unpack_reports {
        let Some(sha256) = report.sha256.as_deref() else {
            continue;
        };
        if !report.has_tag(RANKING_TAG) {
            continue;
        }
        if !leaf_path(top_dir, sha256).exists() {
            tracing::trace!("No leaf report for {path} ({sha256})");
            continue;
        }
        keys.insert(sha256.to_string());
    }
    keys.into_iter().collect()
}

/// File-keys of every leaf record present under `<top>/filereports`
pub fn discover_leaf_reports(top_dir: &Path) -> Result<Vec<FileKey>> {
    let dir = top_dir.join(FILEREPORTS_DIR);
    let entries = fs::read_dir(&dir)
        .with_context(|| format!("Failed to list leaf reports in {}", dir.display()))?;

    let mut keys = Vec::new();
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        if let Some(key) = name.to_str().and_then(|n| n.strip_suffix(LEAF_SUFFIX)) {
            keys.push(key.to_string());
        }
    }
    keys.sort();
    Ok(keys)
}
