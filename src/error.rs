use std::path::PathBuf;
use thiserror::Error;

/// Run-level failures. Everything else degrades to "no report for that unit".
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to create {role} directory {}: {source}", path.display())]
    Bootstrap {
        role: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("worker pool failed during {0}")]
    WorkerPool(String),
}

/// Failures of the filesystem-image expansion capability.
#[derive(Debug, Error)]
pub enum ExpandError {
    #[error("unrecognized image format: {}", .0.display())]
    UnrecognizedFormat(PathBuf),

    #[error("required tool `{0}` is not available")]
    ToolUnavailable(&'static str),

    #[error("`{tool}` exited with {status}")]
    ToolFailed {
        tool: &'static str,
        status: std::process::ExitStatus,
    },

    #[error("I/O error: {source} (path: {})", path.display())]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },
}
