//! Rendering of canonical artifacts into HTML fragments

use super::artifact::{Artifact, ArtifactKind};
use super::html::{html_escape, page, write_gzip};
use super::layout::StagingLayout;
use super::registry::CanonicalEntry;
use super::versions::squash_versions;
use crate::scan::UniqueMatch;
use anyhow::{Context, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;
use std::fs;

/// Suffixes distributions append to repackaged source directories
const REPACKAGING_SUFFIXES: &[&str] = &["+dfsg", "~dfsg", ".orig", ".dfsg1", ".dfsg2"];

/// Renders each canonical artifact exactly once into staging
pub struct Renderer<'a> {
    layout: &'a StagingLayout,
}

impl<'a> Renderer<'a> {
    pub fn new(layout: &'a StagingLayout) -> Self {
        Self { layout }
    }

    /// Render the stored artifact of `entry` and write its fragment.
    ///
    /// The stored artifact is consumed: it is deleted once the fragment exists.
    pub fn render(&self, entry: &CanonicalEntry) -> Result<()> {
        let artifact = Artifact::load(&entry.location)?;
        let fragment = self.layout.fragment(&entry.key);

        match entry.key.kind {
            ArtifactKind::Unmatched => write_gzip(&fragment, &render_fragment(&artifact))?,
            ArtifactKind::PackageMatch => fs::write(&fragment, render_fragment(&artifact))
                .with_context(|| format!("Failed to write fragment: {}", fragment.display()))?,
        }
        tracing::trace!("Rendered {} ({} owners)", entry.key, entry.owners.len());

        fs::remove_file(&entry.location)
            .with_context(|| format!("Failed to remove rendered artifact: {}", entry.location.display()))?;
        Ok(())
    }
}

/// HTML for one artifact: a complete page for unmatched strings, a body
/// snippet for package matches
pub fn render_fragment(artifact: &Artifact) -> String {
    match artifact {
        Artifact::Unmatched { strings } => render_unmatched(strings),
        Artifact::PackageMatch {
            package_name,
            unique_matches,
        } => render_package_matches(package_name, unique_matches),
    }
}

fn render_unmatched(strings: &[String]) -> String {
    let mut body = String::from("<h1>Unmatched strings</h1><p><ul>");
    for s in strings {
        let _ = writeln!(body, "<li>{}</li>", html_escape(s));
    }
    body.push_str("</ul></p>");
    page(&body)
}

/// Occurrences of one search string that share checksum and display path
#[derive(Default)]
struct RowGroup<'a> {
    versions: BTreeSet<&'a str>,
    lines: BTreeSet<u64>,
}

fn render_package_matches(package_name: &str, unique_matches: &[UniqueMatch]) -> String {
    let name = html_escape(package_name);
    let mut html = format!(
        "<hr><h2><a name=\"{name}\" href=\"#{name}\">Matches for: {name} ({})</a></h2>",
        unique_matches.len()
    );

    for unique in unique_matches {
        let _ = write!(html, "<h5>{}</h5>", html_escape(&unique.search_string));
        if unique.occurrences.is_empty() {
            continue;
        }

        // checksum -> display path -> versions and lines
        let mut groups: BTreeMap<&str, BTreeMap<&str, RowGroup>> = BTreeMap::new();
        for occurrence in &unique.occurrences {
            let path = display_path(package_name, &occurrence.version, &occurrence.source_file);
            let group = groups
                .entry(occurrence.checksum.as_str())
                .or_default()
                .entry(path)
                .or_default();
            group.versions.insert(&occurrence.version);
            group.lines.insert(occurrence.line_number);
        }

        html.push_str(
            "<p><table><tr><td><b>Filename</b></td><td><b>Version(s)</b></td>\
             <td><b>Line number</b></td><td><b>SHA256</b></td></tr>\n",
        );
        for (checksum, paths) in &groups {
            for (path, group) in paths {
                let versions: Vec<&str> = group.versions.iter().copied().collect();
                let lines = group
                    .lines
                    .iter()
                    .map(|line| format!("<a href=\"unique:/{checksum}#{line}\">{line}</a>"))
                    .collect::<Vec<_>>()
                    .join(", ");
                let _ = writeln!(
                    html,
                    "<tr><td>{}</td><td>{}</td><td>{lines}</td><td>{checksum}</td></tr>",
                    html_escape(path),
                    squash_versions(&versions),
                );
            }
        }
        html.push_str("</table></p>\n");
    }
    html
}

/// Path shown for a source file.
///
/// When the leading directory is `<package>-<version>` or `<package>_<version>`
/// (ignoring repackaging suffixes) it is stripped, so identical files across
/// versions collapse into one row.
pub fn display_path<'a>(package_name: &str, version: &str, source_file: &'a str) -> &'a str {
    let Some((prefix, rest)) = source_file.split_once('/') else {
        return source_file;
    };

    let prefix = REPACKAGING_SUFFIXES
        .iter()
        .find_map(|suffix| prefix.strip_suffix(suffix))
        .unwrap_or(prefix);

    if prefix == format!("{package_name}-{version}") || prefix == format!("{package_name}_{version}") {
        rest
    } else {
        source_file
    }
}
