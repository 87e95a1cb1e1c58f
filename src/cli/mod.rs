//! Command-line interface for matchreport

pub mod commands;
pub mod output;

pub use commands::Cli;
pub use output::Output;
