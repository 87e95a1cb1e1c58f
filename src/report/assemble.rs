//! Stitching shared fragments into per-file reports

use super::html::{html_escape, page, write_gzip};
use super::layout::StagingLayout;
use super::registry::{FileOwnership, OwnedPackage, Registry};
use anyhow::{Context, Result};
use std::fmt::Write;
use std::fs;
use std::io;

pub struct Assembler<'a> {
    layout: &'a StagingLayout,
    registry: &'a Registry,
}

impl<'a> Assembler<'a> {
    pub fn new(layout: &'a StagingLayout, registry: &'a Registry) -> Self {
        Self { layout, registry }
    }

    /// Write the unique-matches and unmatched reports of one file.
    ///
    /// Every key the file owns is released afterwards, whether or not the
    /// reports could be written, so fragments are reclaimed once their last
    /// owner is done. Returns the number of reports written.
    pub fn assemble(&self, file_key: &str, ownership: &FileOwnership) -> Result<usize> {
        let written = self.write_reports(file_key, ownership);

        let mut release_error = None;
        for key in ownership.keys() {
            if let Err(e) = self.registry.release(key) {
                tracing::warn!("Failed to release {key} for {file_key}: {e:#}");
                release_error.get_or_insert(e);
            }
        }
        match (written, release_error) {
            (Ok(_), Some(e)) => Err(e),
            (written, _) => written,
        }
    }

    fn write_reports(&self, file_key: &str, ownership: &FileOwnership) -> Result<usize> {
        let mut written = 0;

        if !ownership.packages.is_empty() && self.write_unique_report(file_key, &ownership.packages)? {
            written += 1;
        }

        if let Some(key) = &ownership.unmatched {
            let fragment = self.layout.fragment(key);
            let report = self.layout.unmatched_report(file_key);
            match fs::copy(&fragment, &report) {
                Ok(_) => written += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    tracing::warn!("No rendered unmatched strings for {file_key} ({key})");
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("Failed to write report: {}", report.display()));
                }
            }
        }
        Ok(written)
    }

    fn write_unique_report(&self, file_key: &str, packages: &[OwnedPackage]) -> Result<bool> {
        let mut ranked: Vec<&OwnedPackage> = packages.iter().collect();
        ranked.sort_by_key(|p| p.rank);

        let mut index = String::new();
        let mut fragments = String::new();
        for package in ranked {
            let fragment = self.layout.fragment(&package.key);
            let snippet = match fs::read_to_string(&fragment) {
                Ok(snippet) => snippet,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    tracing::warn!("No rendered matches of {} for {file_key}", package.package_name);
                    continue;
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("Failed to read fragment: {}", fragment.display()));
                }
            };
            let name = html_escape(&package.package_name);
            let _ = write!(index, "<li><a href=\"#{name}\">{name} ({})</a>", package.match_count);
            fragments.push_str(&snippet);
        }

        if fragments.is_empty() {
            return Ok(false);
        }

        let body = format!("<h1>Unique matches per package</h1><p><ul>{index}</ul></p>{fragments}");
        write_gzip(&self.layout.unique_report(file_key), &page(&body))?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Directories;
    use crate::report::artifact::{Artifact, ArtifactKind, CanonicalKey, StagedArtifact};
    use crate::report::html::read_gzip;
    use crate::scan::UniqueMatch;
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

    fn key(kind: ArtifactKind, digest: &str) -> CanonicalKey {
        CanonicalKey {
            kind,
            digest: digest.to_string(),
        }
    }

    fn owned(rank: u32, digest: &str, name: &str, count: usize) -> OwnedPackage {
        OwnedPackage {
            rank,
            key: key(ArtifactKind::PackageMatch, digest),
            package_name: name.to_string(),
            match_count: count,
        }
    }

    #[test]
    fn test_fragments_concatenated_in_rank_order() {
        let (_temp, layout) = setup();
        let registry = Registry::new(layout.clone());
        let ownership = FileOwnership {
            packages: vec![owned(2, "bb", "bzip2", 1), owned(1, "aa", "zlib", 3)],
            unmatched: None,
        };
        fs::write(layout.fragment(&ownership.packages[0].key), "<p>bzip2</p>").unwrap();
        fs::write(layout.fragment(&ownership.packages[1].key), "<p>zlib</p>").unwrap();

        let written = Assembler::new(&layout, &registry).assemble("f1", &ownership).unwrap();
        assert_eq!(written, 1);

        let html = read_gzip(&layout.unique_report("f1"));
        assert_eq!(
            html,
            "<html><body><h1>Unique matches per package</h1><p><ul>\
             <li><a href=\"#zlib\">zlib (3)</a><li><a href=\"#bzip2\">bzip2 (1)</a>\
             </ul></p><p>zlib</p><p>bzip2</p></body></html>"
        );
    }

    #[test]
    fn test_unmatched_fragment_copied_not_moved() {
        let (_temp, layout) = setup();
        let registry = Registry::new(layout.clone());
        let unmatched = key(ArtifactKind::Unmatched, "cc");
        fs::write(layout.fragment(&unmatched), b"gz").unwrap();

        let ownership = FileOwnership {
            packages: vec![],
            unmatched: Some(unmatched.clone()),
        };
        let written = Assembler::new(&layout, &registry).assemble("f1", &ownership).unwrap();

        assert_eq!(written, 1);
        assert_eq!(fs::read(layout.unmatched_report("f1")).unwrap(), b"gz");
        assert!(layout.fragment(&unmatched).exists());
        assert!(!layout.unique_report("f1").exists());
    }

    #[test]
    fn test_missing_fragments_are_skipped() {
        let (_temp, layout) = setup();
        let registry = Registry::new(layout.clone());
        let ownership = FileOwnership {
            packages: vec![owned(1, "dd", "zlib", 1)],
            unmatched: Some(key(ArtifactKind::Unmatched, "ee")),
        };

        let written = Assembler::new(&layout, &registry).assemble("f1", &ownership).unwrap();
        assert_eq!(written, 0);
        assert!(!layout.unique_report("f1").exists());
        assert!(!layout.unmatched_report("f1").exists());
    }

    #[test]
    fn test_every_key_released_when_one_release_fails() {
        let (_temp, layout) = setup();
        let registry = Registry::new(layout.clone());
        let mut packages = Vec::new();
        for (rank, name) in [(1, "zlib"), (2, "bzip2")] {
            let artifact = Artifact::PackageMatch {
                package_name: name.to_string(),
                unique_matches: vec![UniqueMatch {
                    search_string: format!("{name} banner"),
                    occurrences: vec![],
                }],
            };
            let staged = StagedArtifact::stage(&artifact, layout.staging_dir(), 1024).unwrap();
            let (key, _) = registry.register("f1", staged).unwrap();
            packages.push(OwnedPackage {
                rank,
                key,
                package_name: name.to_string(),
                match_count: 1,
            });
        }
        let ownership = FileOwnership {
            packages,
            unmatched: None,
        };
        let stored = registry.lookup(&ownership.packages[0].key).unwrap().location;
        let blocked = layout.fragment(&ownership.packages[0].key);
        let second = layout.fragment(&ownership.packages[1].key);
        fs::create_dir(&blocked).unwrap();
        fs::write(&second, "<p>bzip2</p>").unwrap();

        assert!(Assembler::new(&layout, &registry).assemble("f1", &ownership).is_err());
        assert!(!second.exists());
        assert!(!stored.exists());
        assert!(registry.is_empty());
    }
}
