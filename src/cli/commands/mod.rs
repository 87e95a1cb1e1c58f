use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

pub mod config;
pub mod expand;
pub mod generate;

#[derive(Parser)]
#[command(
    name = "matchreport",
    version = crate::VERSION,
    about = "Render deduplicated HTML match reports from binary scan results",
    long_about = "matchreport turns per-file ranking results into gzip-compressed HTML reports. \
                  Identical match data shared by many files is rendered only once."
)]
pub struct Cli {
    /// Increase verbosity (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Use custom configuration file (TOML or JSON)
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate reports for the scanned files under a top-level directory
    Generate(generate::GenerateArgs),
    /// Expand a filesystem image into a directory tree
    Expand(expand::ExpandArgs),
    /// Show the merged configuration
    Config(config::ConfigArgs),
}

impl Cli {
    pub fn run(self) -> Result<()> {
        setup_logging(self.verbose, self.quiet);

        match self.command {
            Some(Commands::Generate(args)) => generate::execute(args, self.config.as_deref(), self.quiet),
            Some(Commands::Expand(args)) => expand::execute(args, self.quiet),
            Some(Commands::Config(args)) => config::execute(args, self.config.as_deref()),
            None => {
                Cli::command().print_help()?;
                Ok(())
            }
        }
    }
}

fn setup_logging(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => tracing_subscriber::EnvFilter::new("warn"),
        1 => tracing_subscriber::EnvFilter::new("info"),
        2 => tracing_subscriber::EnvFilter::new("debug"),
        _ => tracing_subscriber::EnvFilter::new("trace"),
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
