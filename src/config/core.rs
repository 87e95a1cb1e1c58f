use super::overrides::parse_overrides;
use super::Settings;
use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Json, Toml};
use std::path::Path;

// Embed the default config at compile time
const DEFAULT_CONFIG: &str = include_str!("../../default-config.toml");

const ENV_PREFIX: &str = "MATCHREPORT_";

/// Overrides under this section are directory names and stay strings
const PATH_SECTION: &str = "output.";

/// Layered configuration: defaults, config file, environment, overrides
pub struct ReportConfig {
    figment: Figment,
}

impl ReportConfig {
    pub fn load<S: AsRef<str>>(custom_config: Option<&Path>, overrides: &[S]) -> Result<Self> {
        tracing::trace!("CONFIG LOAD: Starting");

        let mut figment = Figment::new().merge(Toml::string(DEFAULT_CONFIG));

        if let Some(path) = custom_config {
            figment = match path.extension().and_then(|e| e.to_str()) {
                Some("json") => figment.merge(Json::file(path)),
                _ => figment.merge(Toml::file(path)),
            };
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        for (key, raw) in parse_overrides(overrides) {
            tracing::trace!("CONFIG LOAD: Override {key} = {raw}");
            let value = if key.starts_with(PATH_SECTION) {
                serde_json::Value::String(raw)
            } else {
                serde_json::from_str::<serde_json::Value>(&raw).unwrap_or(serde_json::Value::String(raw))
            };
            figment = figment.merge((key, value));
        }

        Ok(ReportConfig { figment })
    }

    /// Extract the typed settings
    pub fn settings(&self) -> Result<Settings> {
        self.figment
            .extract()
            .context("Failed to extract report configuration")
    }

    /// Get the full merged configuration as a structured value
    pub fn get_full_config(&self) -> Result<serde_json::Value> {
        let value = self.figment.extract()?;
        Ok(value)
    }
}
