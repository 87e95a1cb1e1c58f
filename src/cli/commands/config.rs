use anyhow::{Result, anyhow};
use clap::Args;
use std::path::Path;

use crate::config::ReportConfig;

#[derive(Args)]
pub struct ConfigArgs {
    /// Only print this dotted key, e.g. `output.report_dir`
    #[arg(value_name = "KEY")]
    pub key: Option<String>,

    /// Configuration override `key=value` (repeatable, or colon-separated)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub overrides: Vec<String>,
}

pub fn execute(args: ConfigArgs, custom_config: Option<&Path>) -> Result<()> {
    let config = ReportConfig::load(custom_config, &args.overrides)?;
    // Fail on values that do not fit the typed settings
    config.settings()?;

    let full = config.get_full_config()?;
    let value = match &args.key {
        Some(key) => {
            let pointer = format!("/{}", key.replace('.', "/"));
            full.pointer(&pointer)
                .ok_or_else(|| anyhow!("Unknown configuration key: {key}"))?
        }
        None => &full,
    };

    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
