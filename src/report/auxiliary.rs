//! Per-file reports rendered directly, without deduplication

use super::html::{html_escape, page};
use crate::scan::{DynamicMatchResult, LanguageMatchResult, PackageVersion};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;

/// Page listing packages whose function names only they define, or `None`
/// when there are no such packages
pub fn render_function_names(dynamic: &DynamicMatchResult) -> Option<String> {
    if dynamic.unique_packages.is_empty() {
        return None;
    }

    let mut packages: Vec<(&str, &Vec<String>)> = dynamic
        .unique_packages
        .iter()
        .map(|(package, names)| (package.as_str(), names))
        .collect();
    packages.sort_by(|a, b| b.1.len().cmp(&a.1.len()));

    let mut body = String::from("<h1>Unique function name matches per package</h1><p><ul>\n");
    for (package, names) in &packages {
        let package = html_escape(package);
        let _ = write!(body, "<li><a href=\"#{package}\">{package} ({})</a>", names.len());
    }
    body.push_str("</ul></p>");

    for (package, names) in &packages {
        let package = html_escape(package);
        let _ = writeln!(
            body,
            "<hr><h2><a name=\"{package}\" href=\"#{package}\">Matches for {package} ({})</a></h2><p>",
            names.len()
        );
        let mut names: Vec<&String> = names.iter().collect();
        names.sort();
        for name in names {
            let _ = writeln!(body, "{}<br>", html_escape(name));
        }
        body.push_str("</p>\n");
    }
    Some(page(&body))
}

/// Page with one table per name category, counting per package the names
/// that resolve to exactly that package. `None` when every category is empty.
pub fn render_language_names(language: &LanguageMatchResult) -> Option<String> {
    let tables: Vec<(&str, BTreeMap<&str, usize>)> = match language {
        LanguageMatchResult::Java {
            classes,
            sources,
            fields,
        } => vec![
            ("class names", tally_java(classes)),
            ("source file names", tally_java(sources)),
            ("field names", tally_java(fields)),
        ],
        LanguageMatchResult::C { variables } => vec![("variables", tally_c(variables))],
    };

    let mut body = String::new();
    for (title, counts) in tables.iter().filter(|(_, counts)| !counts.is_empty()) {
        let mut rows: Vec<(&str, usize)> = counts.iter().map(|(p, c)| (*p, *c)).collect();
        rows.sort_by(|a, b| b.1.cmp(&a.1));

        let _ = writeln!(body, "<h3>Unique matches of {title}</h3>\n<table>");
        body.push_str("<tr><td><b>Name</b></td><td><b>Unique matches</b></td></tr>");
        for (package, count) in rows {
            let _ = writeln!(body, "<tr><td>{}</td><td>{count}</td></tr>", html_escape(package));
        }
        body.push_str("</table>\n");
    }

    if body.is_empty() {
        None
    } else {
        Some(page(&body))
    }
}

fn tally_java(names: &BTreeMap<String, Vec<PackageVersion>>) -> BTreeMap<&str, usize> {
    let mut counts = BTreeMap::new();
    for owners in names.values() {
        let packages: BTreeSet<&str> = owners.iter().map(|pv| pv.package.as_str()).collect();
        if packages.len() == 1 {
            if let Some(package) = packages.first() {
                *counts.entry(*package).or_insert(0) += 1;
            }
        }
    }
    counts
}

fn tally_c(variables: &BTreeMap<String, BTreeMap<String, Vec<String>>>) -> BTreeMap<&str, usize> {
    let mut counts = BTreeMap::new();
    for packages in variables.values() {
        if packages.len() == 1 {
            if let Some(package) = packages.keys().next() {
                *counts.entry(package.as_str()).or_insert(0) += 1;
            }
        }
    }
    counts
}
