//! Records produced by the upstream ranking engine, one leaf report per file-key.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Stable content identifier (sha256 hex digest) of a scanned file
pub type FileKey = String;

/// Per-file leaf record written by the scan engine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LeafReport {
    pub ranking: Option<RankingResult>,
}

/// Ranking output for one scanned file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingResult {
    pub match_result: MatchResult,
    pub dynamic: DynamicMatchResult,
    pub language: Option<LanguageMatchResult>,
}

impl RankingResult {
    /// True when there is nothing to render for this file
    pub fn is_empty(&self) -> bool {
        self.match_result.unmatched.is_empty()
            && self.match_result.reports.is_empty()
            && self.dynamic.unique_packages.is_empty()
            && self.language.is_none()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchResult {
    pub unmatched: Vec<String>,
    pub reports: Vec<PackageReport>,
}

/// One ranked package candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageReport {
    pub rank: u32,
    pub package_name: String,
    #[serde(default)]
    pub unique_matches: Vec<UniqueMatch>,
    #[serde(default)]
    pub percentage: f64,
    #[serde(default)]
    pub package_versions: BTreeMap<String, u64>,
    #[serde(default)]
    pub licenses: Vec<String>,
}

/// A string found in the binary that only this package contains
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueMatch {
    pub search_string: String,
    #[serde(default)]
    pub occurrences: Vec<Occurrence>,
}

/// Where a unique string occurs in the reference database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    pub checksum: String,
    pub version: String,
    pub line_number: u64,
    pub source_file: String,
}

/// Function-name matches from dynamically linked symbols
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicMatchResult {
    /// package -> function names that only that package defines
    pub unique_packages: BTreeMap<String, Vec<String>>,
}

/// Language-specific name matches
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "language")]
pub enum LanguageMatchResult {
    Java {
        #[serde(default)]
        classes: BTreeMap<String, Vec<PackageVersion>>,
        #[serde(default)]
        sources: BTreeMap<String, Vec<PackageVersion>>,
        #[serde(default)]
        fields: BTreeMap<String, Vec<PackageVersion>>,
    },
    C {
        /// variable name -> package -> versions
        #[serde(default)]
        variables: BTreeMap<String, BTreeMap<String, Vec<String>>>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageVersion {
    pub package: String,
    pub version: String,
}

/// Entry from the unpack phase describing one file in the scanned tree
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UnpackReport {
    pub sha256: Option<String>,
    pub tags: Vec<String>,
}

impl UnpackReport {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}
