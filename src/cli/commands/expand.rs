use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use crate::cli::Output;
use crate::expand::{Ext2Expander, ImageExpander};

#[derive(Args)]
pub struct ExpandArgs {
    /// Filesystem image to expand
    #[arg(value_name = "IMAGE")]
    pub image: PathBuf,

    /// Directory to expand into (a temporary directory when omitted)
    #[arg(long, value_name = "DIR")]
    pub target: Option<PathBuf>,
}

pub fn execute(args: ExpandArgs, quiet: bool) -> Result<()> {
    let output = Output::new(quiet);

    let expander = Ext2Expander::new()?;
    let root = expander.expand(&args.image, args.target.as_deref())?;

    output.success(&format!("Expanded {} into {}", args.image.display(), root.display()));
    Ok(())
}
