//! HTML report generation with content-hash deduplication.
//!
//! Per-file match data is split into artifacts, each distinct artifact is
//! rendered once, and every file's reports are stitched from the shared
//! fragments:
//!
//! ```text
//! leaf reports -> extract (parallel) -> register (serial) -> render (parallel) -> assemble (parallel)
//! ```

pub mod artifact;
pub mod assemble;
pub mod auxiliary;
pub mod extract;
pub mod html;
pub mod layout;
pub mod pipeline;
pub mod registry;
pub mod render;
pub mod versions;

pub use artifact::{Artifact, ArtifactKind, CanonicalKey, StagedArtifact};
pub use layout::StagingLayout;
pub use pipeline::{PipelineSummary, generate_reports};
pub use registry::{CanonicalEntry, Registration, Registry};
pub use versions::squash_versions;
