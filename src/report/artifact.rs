//! Renderable units of match data and their content hashes

use crate::scan::UniqueMatch;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tempfile::TempPath;

/// Hash namespace of an artifact. Equal digests of different kinds never merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Unmatched,
    PackageMatch,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Unmatched => "unmatched",
            ArtifactKind::PackageMatch => "package",
        }
    }
}

/// Candidate unit of renderable content.
///
/// Serialization is deterministic: equal content always gives equal bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Artifact {
    Unmatched {
        strings: Vec<String>,
    },
    PackageMatch {
        package_name: String,
        unique_matches: Vec<UniqueMatch>,
    },
}

impl Artifact {
    /// Sorted, deduplicated unmatched strings, or `None` when there are none
    pub fn unmatched(strings: &[String]) -> Option<Self> {
        let mut strings = strings.to_vec();
        strings.sort();
        strings.dedup();
        if strings.is_empty() {
            None
        } else {
            Some(Artifact::Unmatched { strings })
        }
    }

    pub fn kind(&self) -> ArtifactKind {
        match self {
            Artifact::Unmatched { .. } => ArtifactKind::Unmatched,
            Artifact::PackageMatch { .. } => ArtifactKind::PackageMatch,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).context("Failed to serialize artifact")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read artifact: {}", path.display()))?;
        serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse artifact: {}", path.display()))
    }
}

/// Registry key: artifact kind plus sha256 of the serialized bytes
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalKey {
    pub kind: ArtifactKind,
    pub digest: String,
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.digest, self.kind.as_str())
    }
}

/// An artifact written to a private temporary file in the staging directory.
///
/// Dropping it removes the file; [`StagedArtifact::persist`] moves it into
/// canonical storage instead.
#[derive(Debug)]
pub struct StagedArtifact {
    pub key: CanonicalKey,
    path: TempPath,
}

impl StagedArtifact {
    pub fn stage(artifact: &Artifact, staging_dir: &Path, chunk_size: usize) -> Result<Self> {
        let bytes = artifact.to_bytes()?;
        let mut file = tempfile::Builder::new()
            .prefix(".artifact-")
            .suffix(".json")
            .tempfile_in(staging_dir)
            .with_context(|| format!("Failed to stage artifact in {}", staging_dir.display()))?;
        file.write_all(&bytes)?;
        file.flush()?;

        let path = file.into_temp_path();
        let digest = hash_file(&path, chunk_size)?;
        Ok(Self {
            key: CanonicalKey {
                kind: artifact.kind(),
                digest,
            },
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Move the staged bytes to their canonical location
    pub fn persist(self, dest: &Path) -> Result<()> {
        self.path
            .persist(dest)
            .with_context(|| format!("Failed to store canonical artifact: {}", dest.display()))
    }
}

/// SHA-256 of a file, read in chunks of at most `chunk_size` bytes
pub fn hash_file(path: &Path, chunk_size: usize) -> Result<String> {
    let mut file =
        File::open(path).with_context(|| format!("Failed to open for hashing: {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; chunk_size.max(1)];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}
