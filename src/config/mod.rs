//! Configuration management for matchreport
//!
//! Settings are layered with figment (embedded defaults, optional config
//! file, `MATCHREPORT_` environment variables, `key=value` overrides) and
//! passed explicitly into the pipeline entry point.
//!
//! Recognized options:
//!
//! | key                               | default     |
//! |-----------------------------------|-------------|
//! | `output.report_dir`               | `reports`   |
//! | `output.staging_dir`              | `staging`   |
//! | `parallel.max_threads`            | `0` (auto)  |
//! | `parallel.thread_percentage`      | `100`       |
//! | `parallel.min_items_for_parallel` | `2`         |
//! | `hashing.chunk_size`              | `10000000`  |

mod core;
mod overrides;

pub use self::core::ReportConfig;
pub use overrides::parse_overrides;

use crate::error::ReportError;
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Typed view over the merged configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub output: OutputSettings,
    pub parallel: ParallelSettings,
    pub hashing: HashingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Where final per-file reports are written
    #[serde(deserialize_with = "scalar_path")]
    pub report_dir: PathBuf,
    /// Where canonical artifacts and rendered fragments live between stages
    #[serde(deserialize_with = "scalar_path")]
    pub staging_dir: PathBuf,
}

/// Directory names like `2024` arrive as numbers from TOML or the environment
fn scalar_path<'de, D: Deserializer<'de>>(deserializer: D) -> Result<PathBuf, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Text(String),
        Unsigned(u64),
        Signed(i64),
        Float(f64),
    }

    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::Text(s) => PathBuf::from(s),
        Scalar::Unsigned(n) => PathBuf::from(n.to_string()),
        Scalar::Signed(n) => PathBuf::from(n.to_string()),
        Scalar::Float(n) => PathBuf::from(n.to_string()),
    })
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            report_dir: PathBuf::from("reports"),
            staging_dir: PathBuf::from("staging"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallelSettings {
    /// Maximum number of worker threads (0 = auto-detect)
    pub max_threads: usize,
    /// Percentage of CPU cores to use (1-100)
    pub thread_percentage: u8,
    /// Batches smaller than this run sequentially
    pub min_items_for_parallel: usize,
}

impl Default for ParallelSettings {
    fn default() -> Self {
        Self {
            max_threads: 0,
            thread_percentage: 100,
            min_items_for_parallel: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HashingSettings {
    pub chunk_size: usize,
}

impl Default for HashingSettings {
    fn default() -> Self {
        Self {
            chunk_size: 10_000_000,
        }
    }
}

impl Settings {
    /// Resolve the output directories against the top-level working directory
    pub fn directories(&self, top_dir: &Path) -> Directories {
        let resolve = |dir: &Path| {
            if dir.is_absolute() {
                dir.to_path_buf()
            } else {
                top_dir.join(dir)
            }
        };
        Directories {
            report_dir: resolve(&self.output.report_dir),
            staging_dir: resolve(&self.output.staging_dir),
        }
    }
}

/// Resolved output locations for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directories {
    pub report_dir: PathBuf,
    pub staging_dir: PathBuf,
}

impl Directories {
    /// Create both directories. Any failure aborts the run before work starts.
    pub fn bootstrap(&self) -> Result<(), ReportError> {
        for (role, path) in [("report", &self.report_dir), ("staging", &self.staging_dir)] {
            fs::create_dir_all(path).map_err(|source| ReportError::Bootstrap {
                role,
                path: path.clone(),
                source,
            })?;
        }
        Ok(())
    }
}
