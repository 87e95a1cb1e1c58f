//! Compact notation for long version lists

/// Condense a list of versions, e.g. `1.2.3, 1.2.4, 1.3.0, 1.3.1` becomes
/// `1.{2.3, 2.4, 3.0, 3.1}`.
///
/// Lists of three or fewer versions, or lists containing a version without a
/// `.`, are joined verbatim. Otherwise versions are grouped by major version
/// and each group shares its longest common dot-separated prefix. The last
/// segment of every version always stays in the distinguishing suffix.
pub fn squash_versions<S: AsRef<str>>(versions: &[S]) -> String {
    let versions: Vec<&str> = versions.iter().map(|v| v.as_ref()).collect();
    if versions.len() <= 3 || versions.iter().any(|v| !v.contains('.')) {
        return versions.join(", ");
    }

    let mut majors: Vec<&str> = Vec::new();
    for version in &versions {
        let major = major_of(version);
        if !majors.contains(&major) {
            majors.push(major);
        }
    }

    majors
        .into_iter()
        .map(|major| {
            let group: Vec<&str> = versions
                .iter()
                .copied()
                .filter(|v| major_of(v) == major)
                .collect();
            squash_group(&group)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn major_of(version: &str) -> &str {
    version.split('.').next().unwrap_or(version)
}

/// Squash versions that share a major version
fn squash_group(group: &[&str]) -> String {
    if group.len() == 1 {
        return group[0].to_string();
    }

    // Never share the final segment of the shortest version
    let max_shared = group
        .iter()
        .map(|v| v.split('.').count())
        .min()
        .unwrap_or(1)
        - 1;

    let splits: Vec<Vec<&str>> = group.iter().map(|v| v.splitn(max_shared + 1, '.').collect()).collect();
    let mut shared = 0;
    while shared < max_shared && splits.iter().all(|s| s[shared] == splits[0][shared]) {
        shared += 1;
    }

    let prefix = splits[0][..shared].join(".");
    let suffixes: Vec<&str> = group
        .iter()
        .map(|v| v.splitn(shared + 1, '.').last().unwrap_or(v))
        .collect();
    format!("{prefix}.{{{}}}", suffixes.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_lists_are_verbatim() {
        assert_eq!(squash_versions(&["1.2.3", "1.2.4", "1.3.0"]), "1.2.3, 1.2.4, 1.3.0");
        assert_eq!(squash_versions(&["2.0"]), "2.0");
        assert_eq!(squash_versions::<&str>(&[]), "");
    }

    #[test]
    fn test_versions_without_dot_are_verbatim() {
        assert_eq!(squash_versions(&["1.0", "1.1", "1.2", "20090101"]), "1.0, 1.1, 1.2, 20090101");
    }

    #[test]
    fn test_singleton_major_groups() {
        assert_eq!(squash_versions(&["1.0", "2.0", "3.0", "4.0"]), "1.0, 2.0, 3.0, 4.0");
    }

    #[test]
    fn test_shared_major_only() {
        assert_eq!(
            squash_versions(&["1.2.3", "1.2.4", "1.3.0", "1.3.1"]),
            "1.{2.3, 2.4, 3.0, 3.1}"
        );
    }

    #[test]
    fn test_shared_minor() {
        assert_eq!(
            squash_versions(&["2.6.30", "2.6.31", "2.6.32", "2.6.33"]),
            "2.6.{30, 31, 32, 33}"
        );
    }

    #[test]
    fn test_mixed_majors_and_depths() {
        assert_eq!(
            squash_versions(&["1.2", "1.2.1", "1.2.2", "3.0"]),
            "1.{2, 2.1, 2.2}, 3.0"
        );
    }
}
