//! Scan results handed over by the upstream ranking engine

mod leaf;
mod types;

pub use leaf::{discover_leaf_reports, leaf_path, load_leaf, select_ranked_files};
pub use types::{
    DynamicMatchResult, FileKey, LanguageMatchResult, LeafReport, MatchResult, Occurrence,
    PackageReport, PackageVersion, RankingResult, UnpackReport, UniqueMatch,
};
