use anyhow::Result;
use clap::Parser;
use matchreport::cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.run()
}
