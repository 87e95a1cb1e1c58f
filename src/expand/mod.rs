//! Expansion of filesystem images into a tree of regular files.
//!
//! The report pipeline only consumes the expanded tree; this module wraps
//! the external tools that do the actual work behind [`ImageExpander`].

use crate::error::ExpandError;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Capability to turn an image file into a directory of files
pub trait ImageExpander {
    /// Expand `image` into `target`, or a fresh temporary directory when no
    /// target is given, and return the root of the expanded tree
    fn expand(&self, image: &Path, target: Option<&Path>) -> Result<PathBuf, ExpandError>;
}

/// Kind of entry reported by an ext2 directory listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub name: String,
    pub kind: EntryKind,
}

/// Ext2 mode flag prefixes (mode without the permission digits)
const MODE_DIRECTORY: u32 = 40;
const MODE_REGULAR_FIRST: u32 = 100;
const MODE_REGULAR_END: u32 = 120;

/// Parse the output of `e2ls -l`.
///
/// Only directories and regular files are kept; regular files include those
/// with setuid, setgid or sticky bits. Returns `None` when the listing does
/// not look like a valid file system.
pub fn parse_listing(output: &str) -> Option<Vec<ListingEntry>> {
    let output = output.trim();
    if output.is_empty() || output == "No files found!" {
        return Some(Vec::new());
    }

    let mut entries = Vec::new();
    for line in output.lines() {
        if line.starts_with('>') {
            continue;
        }
        let columns: Vec<&str> = line.split_whitespace().collect();
        let mode = *columns.get(1)?;
        if mode.len() < 5 || !mode.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let flag: u32 = mode[..mode.len() - 3].parse().ok()?;
        let Some(name) = columns.get(7) else {
            continue;
        };
        if *name == "." || *name == ".." {
            continue;
        }

        let kind = match flag {
            MODE_DIRECTORY => EntryKind::Directory,
            MODE_REGULAR_FIRST..MODE_REGULAR_END => EntryKind::File,
            _ => continue,
        };
        entries.push(ListingEntry {
            name: name.to_string(),
            kind,
        });
    }
    Some(entries)
}

/// Expands ext2 images with e2tools, recreating directories itself and
/// copying regular files one by one
pub struct Ext2Expander {
    e2ls: PathBuf,
    e2cp: PathBuf,
}

impl Ext2Expander {
    /// Locate `e2ls` and `e2cp` on the `PATH`
    pub fn new() -> Result<Self, ExpandError> {
        let e2ls = which::which("e2ls").map_err(|_| ExpandError::ToolUnavailable("e2ls"))?;
        let e2cp = which::which("e2cp").map_err(|_| ExpandError::ToolUnavailable("e2cp"))?;
        Ok(Self::with_tools(e2ls, e2cp))
    }

    pub fn with_tools(e2ls: PathBuf, e2cp: PathBuf) -> Self {
        Self { e2ls, e2cp }
    }

    fn list(&self, image: &Path, fs_path: &str) -> Result<Option<Vec<ListingEntry>>, ExpandError> {
        let output = Command::new(&self.e2ls)
            .arg("-l")
            .arg(image_spec(image, fs_path))
            .output()
            .map_err(|source| ExpandError::Io {
                source,
                path: self.e2ls.clone(),
            })?;
        if !output.status.success() {
            return Err(ExpandError::ToolFailed {
                tool: "e2ls",
                status: output.status,
            });
        }
        Ok(parse_listing(&String::from_utf8_lossy(&output.stdout)))
    }

    fn copy_dir(&self, image: &Path, fs_path: &str, target: &Path) -> Result<(), ExpandError> {
        let entries = match self.list(image, fs_path) {
            Ok(Some(entries)) => entries,
            Ok(None) => {
                tracing::warn!("Skipping unreadable directory {fs_path} in {}", image.display());
                return Ok(());
            }
            Err(e) => {
                tracing::warn!("Skipping {fs_path} in {}: {e}", image.display());
                return Ok(());
            }
        };
        self.copy_entries(image, fs_path, entries, target)
    }

    fn copy_entries(
        &self,
        image: &Path,
        fs_path: &str,
        entries: Vec<ListingEntry>,
        target: &Path,
    ) -> Result<(), ExpandError> {
        for entry in entries {
            let child = format!("{fs_path}/{}", entry.name);
            match entry.kind {
                EntryKind::Directory => {
                    let dir = target.join(&entry.name);
                    fs::create_dir_all(&dir).map_err(|source| ExpandError::Io {
                        source,
                        path: dir.clone(),
                    })?;
                    self.copy_dir(image, &child, &dir)?;
                }
                EntryKind::File => self.copy_file(image, &child, target),
            }
        }
        Ok(())
    }

    /// Copy one regular file; failures only lose that file
    fn copy_file(&self, image: &Path, fs_path: &str, target: &Path) {
        let status = Command::new(&self.e2cp)
            .arg(image_spec(image, fs_path))
            .arg("-d")
            .arg(target)
            .output();
        match status {
            Ok(output) if output.status.success() => {}
            Ok(output) => tracing::warn!("e2cp failed for {fs_path}: {}", output.status),
            Err(e) => tracing::warn!("e2cp failed for {fs_path}: {e}"),
        }
    }
}

impl ImageExpander for Ext2Expander {
    fn expand(&self, image: &Path, target: Option<&Path>) -> Result<PathBuf, ExpandError> {
        if !image.is_file() {
            return Err(ExpandError::Io {
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "image not found"),
                path: image.to_path_buf(),
            });
        }

        // The root listing decides whether this is an ext2 image at all
        let root = match self.list(image, "") {
            Ok(Some(entries)) if !entries.is_empty() => entries,
            Ok(_) | Err(ExpandError::ToolFailed { .. }) => {
                return Err(ExpandError::UnrecognizedFormat(image.to_path_buf()));
            }
            Err(e) => return Err(e),
        };
        tracing::debug!("{} top-level entries in {}", root.len(), image.display());

        let target = match target {
            Some(dir) => {
                fs::create_dir_all(dir).map_err(|source| ExpandError::Io {
                    source,
                    path: dir.to_path_buf(),
                })?;
                dir.to_path_buf()
            }
            None => tempfile::Builder::new()
                .prefix("matchreport-image-")
                .tempdir()
                .map_err(|source| ExpandError::Io {
                    source,
                    path: std::env::temp_dir(),
                })?
                .keep(),
        };

        self.copy_entries(image, "", root, &target)?;
        tracing::info!("Expanded {} into {}", image.display(), target.display());
        Ok(target)
    }
}

/// `<image>:<path inside the image>` as e2tools expect it
fn image_spec(image: &Path, fs_path: &str) -> OsString {
    let mut spec = image.as_os_str().to_owned();
    spec.push(":");
    spec.push(fs_path);
    spec
}
