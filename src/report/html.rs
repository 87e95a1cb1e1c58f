//! Common utilities for HTML report generation

use anyhow::{Context, Result};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// HTML escape a string for safe inclusion in HTML
pub fn html_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Wrap a body in the fixed document header and footer
pub fn page(body: &str) -> String {
    format!("<html><body>{body}</body></html>")
}

/// Write an HTML document gzip-compressed.
///
/// The gzip header carries no timestamp, so equal input gives equal bytes.
pub fn write_gzip(path: &Path, html: &str) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create report: {}", path.display()))?;
    let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    encoder.write_all(html.as_bytes())?;
    encoder
        .finish()
        .and_then(|mut writer| writer.flush())
        .with_context(|| format!("Failed to write report: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
pub(crate) fn read_gzip(path: &Path) -> String {
    use flate2::read::GzDecoder;
    use std::io::Read;

    let mut html = String::new();
    GzDecoder::new(File::open(path).unwrap())
        .read_to_string(&mut html)
        .unwrap();
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_html_escape() {
        assert_eq!(
            html_escape("<script>alert('xss')</script>"),
            "&lt;script&gt;alert(&#x27;xss&#x27;)&lt;/script&gt;"
        );
        assert_eq!(html_escape("a & \"b\""), "a &amp; &quot;b&quot;");
    }

    #[test]
    fn test_write_gzip_is_deterministic() {
        let temp = TempDir::new().unwrap();
        let first = temp.path().join("a.html.gz");
        let second = temp.path().join("b.html.gz");
        write_gzip(&first, &page("<p>x</p>")).unwrap();
        write_gzip(&second, &page("<p>x</p>")).unwrap();

        assert_eq!(std::fs::read(&first).unwrap(), std::fs::read(&second).unwrap());
        assert_eq!(read_gzip(&first), "<html><body><p>x</p></body></html>");
    }
}
