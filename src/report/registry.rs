//! Content-hash registry deciding canonical ownership of artifacts

use super::artifact::{CanonicalKey, StagedArtifact};
use super::layout::StagingLayout;
use crate::scan::FileKey;
use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// The single stored copy of one unique content hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalEntry {
    pub key: CanonicalKey,
    /// Where the artifact bytes are stored until rendering
    pub location: PathBuf,
    /// Every file-key that produced this content, first producer first
    pub owners: Vec<FileKey>,
}

/// Outcome of registering one artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// First time this content was seen; stored and pending rendering
    Canonical,
    /// Content already registered; bytes discarded, owner recorded
    Duplicate,
}

struct EntryState {
    entry: CanonicalEntry,
    /// Owners that have not been assembled yet
    outstanding: usize,
}

#[derive(Default)]
struct RegistryState {
    entries: HashMap<CanonicalKey, EntryState>,
    first_seen: Vec<CanonicalKey>,
}

/// Mutex-guarded map from content hash to canonical entry.
///
/// Registration is linearizable per hash: the first producer stores the
/// bytes, later producers only join the owner list. Fragments are deleted
/// when the last owner releases them.
pub struct Registry {
    layout: StagingLayout,
    state: Mutex<RegistryState>,
}

impl Registry {
    pub fn new(layout: StagingLayout) -> Self {
        Self {
            layout,
            state: Mutex::new(RegistryState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn register(&self, file_key: &str, staged: StagedArtifact) -> Result<(CanonicalKey, Registration)> {
        let mut state = self.lock();
        let key = staged.key.clone();

        if let Some(existing) = state.entries.get_mut(&key) {
            existing.entry.owners.push(file_key.to_string());
            existing.outstanding += 1;
            drop(staged);
            tracing::trace!("Duplicate {key} from {file_key}");
            return Ok((key, Registration::Duplicate));
        }

        let location = self.layout.canonical_artifact(&key);
        staged.persist(&location)?;
        state.entries.insert(
            key.clone(),
            EntryState {
                entry: CanonicalEntry {
                    key: key.clone(),
                    location,
                    owners: vec![file_key.to_string()],
                },
                outstanding: 1,
            },
        );
        state.first_seen.push(key.clone());
        tracing::trace!("Canonical {key} from {file_key}");
        Ok((key, Registration::Canonical))
    }

    pub fn lookup(&self, key: &CanonicalKey) -> Option<CanonicalEntry> {
        self.lock().entries.get(key).map(|state| state.entry.clone())
    }

    /// Canonical entries in first-seen order, each scheduled for rendering once
    pub fn pending_render(&self) -> Vec<CanonicalEntry> {
        let state = self.lock();
        state
            .first_seen
            .iter()
            .filter_map(|key| state.entries.get(key))
            .map(|s| s.entry.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Record that one owner has consumed the fragment of `key`.
    ///
    /// Deletes the fragment and any leftover stored bytes once no owner is
    /// outstanding; returns whether that happened.
    pub fn release(&self, key: &CanonicalKey) -> Result<bool> {
        let mut state = self.lock();
        let Some(entry_state) = state.entries.get_mut(key) else {
            return Ok(false);
        };

        entry_state.outstanding = entry_state.outstanding.saturating_sub(1);
        if entry_state.outstanding > 0 {
            return Ok(false);
        }

        let location = entry_state.entry.location.clone();
        state.entries.remove(key);
        let fragment = remove_if_present(&self.layout.fragment(key));
        let stored = remove_if_present(&location);
        fragment.and(stored)?;
        tracing::trace!("Released {key}");
        Ok(true)
    }
}

fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => {
            Err(e).with_context(|| format!("Failed to remove {}", path.display()))
        }
        _ => Ok(()),
    }
}

/// Package artifact owned by one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedPackage {
    pub rank: u32,
    pub key: CanonicalKey,
    pub package_name: String,
    pub match_count: usize,
}

/// Everything one file-key owns in the registry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileOwnership {
    pub packages: Vec<OwnedPackage>,
    pub unmatched: Option<CanonicalKey>,
}

impl FileOwnership {
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty() && self.unmatched.is_none()
    }

    /// Every key this file holds a reference on
    pub fn keys(&self) -> impl Iterator<Item = &CanonicalKey> {
        self.packages.iter().map(|p| &p.key).chain(self.unmatched.iter())
    }
}

pub type OwnershipIndex = BTreeMap<FileKey, FileOwnership>;
