//! # matchreport
//!
//! Renders HTML reports from the per-file results of a binary-matching scan.
//!
//! Many files in one batch carry byte-identical match data. Instead of
//! rendering every file separately, matchreport splits the data into
//! artifacts, hashes them, renders each distinct artifact once on a bounded
//! worker pool and stitches every file's reports from the shared fragments.
//!
//! ## Quick Start
//!
//! ```bash
//! # Reports for every leaf record under ./scan/filereports
//! matchreport generate ./scan
//!
//! # Only the files an unpack pass tagged for ranking
//! matchreport generate ./scan --unpack-report unpack.json --set report_dir=/srv/reports
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod expand;
pub mod parallel;
pub mod report;
pub mod scan;

pub use config::{ReportConfig, Settings};
pub use error::{ExpandError, ReportError};
pub use report::{PipelineSummary, generate_reports};

/// Result type alias for matchreport operations
pub type Result<T> = anyhow::Result<T>;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
