/// CLI configuration
use crate::error::{CliError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use vibe_playback::PlayerConfig;

/// Default config file, read from the working directory when present
pub const DEFAULT_CONFIG_FILE: &str = "vibe.toml";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CliConfig {
    #[serde(default = "default_server")]
    pub server: ServerSettings,

    #[serde(default)]
    pub player: PlayerConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerSettings {
    #[serde(default = "default_url")]
    pub url: String,

    /// Bearer token for the backend
    #[serde(default)]
    pub token: Option<String>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            player: PlayerConfig::default(),
        }
    }
}

impl CliConfig {
    /// Load configuration from file and environment
    ///
    /// Without `path`, `vibe.toml` is read if it exists. An explicit path
    /// must exist. Environment variables prefixed with `VIBE_` override file
    /// values, with `__` between section and key (`VIBE_SERVER__TOKEN`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_from(path, None)
    }

    /// Like [`load`](Self::load), reading overrides from `env` instead of the
    /// process environment when given
    pub fn load_from(path: Option<&Path>, env: Option<HashMap<String, String>>) -> Result<Self> {
        let mut settings = config::Config::builder();

        settings = match path {
            Some(path) => settings.add_source(config::File::from(path.to_path_buf())),
            None => settings
                .add_source(config::File::from(PathBuf::from(DEFAULT_CONFIG_FILE)).required(false)),
        };

        settings = settings.add_source(
            config::Environment::with_prefix("VIBE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        let config: Self = settings.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.url.trim().is_empty() {
            return Err(CliError::Config(
                "server URL is required (set VIBE_SERVER__URL)".to_string(),
            ));
        }

        self.player
            .validate()
            .map_err(|e| CliError::Config(e.to_string()))
    }
}

// Default values
fn default_server() -> ServerSettings {
    ServerSettings {
        url: default_url(),
        token: None,
    }
}

fn default_url() -> String {
    "http://localhost:8000".to_string()
}
