//! Configuration resolution for the tabula server.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Config file (JSON, `--config` or `TABULA_CONFIG`)
//! 3. Environment variables
//! 4. CLI arguments (highest priority, applied by the binary)

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Complete tabula server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP/WebSocket server listens on.
    pub listen_addr: String,
    /// Path to the SQLite database file. `None` selects the per-user
    /// default location.
    pub database_path: Option<PathBuf>,
    /// Origins allowed to open sessions, in addition to the built-in
    /// rules (empty, `"null"`, and any `http://localhost*`).
    pub allowed_origins: Vec<String>,
    /// Base URL used when building links sent to users (e.g. email
    /// verification).
    pub base_url: String,
    /// Emit structured JSON log lines instead of the human-readable
    /// format.
    pub log_json: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            database_path: None,
            allowed_origins: Vec::new(),
            base_url: "http://localhost:8080".to_string(),
            log_json: false,
        }
    }
}

/// Load configuration with hierarchical resolution.
pub fn load_config(config_file: Option<&Path>) -> Result<ServerConfig> {
    let mut config = match config_file {
        Some(path) => load_config_file(path)?,
        None => ServerConfig::default(),
    };

    apply_env_overrides(&mut config);

    Ok(config)
}

fn load_config_file(path: &Path) -> Result<ServerConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

fn apply_env_overrides(config: &mut ServerConfig) {
    if let Ok(val) = std::env::var("TABULA_LISTEN_ADDR") {
        config.listen_addr = val;
    }
    if let Ok(val) = std::env::var("TABULA_DB_PATH") {
        config.database_path = Some(PathBuf::from(val));
    }
    if let Ok(val) = std::env::var("TABULA_BASE_URL") {
        config.base_url = val;
    }
    if let Ok(val) = std::env::var("TABULA_ALLOWED_ORIGINS") {
        config.allowed_origins = val
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
    }
    if let Ok(val) = std::env::var("TABULA_LOG_JSON") {
        config.log_json = matches!(val.as_str(), "1" | "true" | "yes");
    }
}
