//! `key=value` configuration overrides

/// Short names accepted in addition to full dotted config paths
const ALIASES: &[(&str, &str)] = &[
    ("report_dir", "output.report_dir"),
    ("reportdir", "output.report_dir"),
    ("bat_reportdir", "output.report_dir"),
    ("staging_dir", "output.staging_dir"),
    ("pickledir", "output.staging_dir"),
    ("bat_pickledir", "output.staging_dir"),
];

/// Parse override entries into `(config path, raw value)` pairs.
///
/// Each entry may hold several `:`-separated `key=value` items. Items that do
/// not parse are skipped.
pub fn parse_overrides<S: AsRef<str>>(entries: &[S]) -> Vec<(String, String)> {
    let mut parsed = Vec::new();
    for entry in entries {
        for item in entry.as_ref().split(':') {
            match parse_item(item) {
                Some(pair) => parsed.push(pair),
                None => tracing::debug!("Ignoring malformed override: {item:?}"),
            }
        }
    }
    parsed
}

fn parse_item(item: &str) -> Option<(String, String)> {
    let (key, value) = item.split_once('=')?;
    let key = key.trim().to_ascii_lowercase();
    if key.is_empty() || value.contains('=') {
        return None;
    }
    let key = ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, path)| path.to_string())
        .unwrap_or(key);
    Some((key, value.trim().to_string()))
}
