//! Configuration management for the batch runner
//!
//! Built-in defaults come from the core library; an optional `Recon.toml` in
//! the working directory and `RECON_`-prefixed environment variables are
//! layered on top with figment.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use identity_core::ReconConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const CONFIG_FILE: &str = "Recon.toml";
pub const ENV_PREFIX: &str = "RECON_";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub observability: ObservabilityConfig,
    pub recon: ReconConfig,
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Enable JSON structured logging
    pub json_logs: bool,
    /// Log level for this binary and the core library when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            json_logs: false,
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    pub fn with_builtin_defaults() -> anyhow::Result<Self> {
        Ok(Self {
            observability: ObservabilityConfig::default(),
            recon: ReconConfig::builtin()?,
        })
    }

    /// Default `EnvFilter` directive derived from `log_level`
    pub fn log_directive(&self) -> String {
        let level = &self.observability.log_level;
        format!("identity_recon={},identity_core={}", level, level)
    }
}

/// Layer defaults, the optional config file and the environment
pub fn load_config() -> anyhow::Result<AppConfig> {
    figment(Path::new(CONFIG_FILE))?
        .extract()
        .map_err(anyhow::Error::from)
}

fn figment(config_file: &Path) -> anyhow::Result<Figment> {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::with_builtin_defaults()?));

    if config_file.exists() {
        figment = figment.merge(Toml::file(config_file));
    }

    Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
}
