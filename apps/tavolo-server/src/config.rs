//! Layered application configuration.

use std::path::Path;

use anyhow::Context;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};
use tenancy::config::TenancyConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub tenancy: TenancyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_owned(),
        }
    }
}

impl AppConfig {
    /// Layered load: defaults -> YAML (if provided) -> env (`TAVOLO__*`).
    ///
    /// # Errors
    /// Returns an error when the file or environment cannot be parsed into
    /// a valid configuration.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        figment = figment.merge(Env::prefixed("TAVOLO__").split("__"));
        figment.extract().context("invalid configuration")
    }

    /// Effective configuration rendered for `--print-config` and `check`.
    ///
    /// # Errors
    /// Returns an error when serialization fails.
    pub fn render(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
