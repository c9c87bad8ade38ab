//! Configuration discovery and loading.
//!
//! The discovery hierarchy is:
//! 1. Current directory: ./flowbridge.toml or ./.flowbridge/config.toml
//! 2. User config: ~/.flowbridge/config.toml
//! 3. System config: /etc/flowbridge/config.toml
//!
//! Environment variables take precedence over file values:
//! `FLOWBRIDGE_ENGINE_URL` replaces the engine URL, and `FLOW_DEFINITIONS`
//! (a JSON object of slug → definition) is merged over the file's `[flows]`
//! table. A `.env` file in the working directory is loaded first.

use crate::env::{self, vars};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::env as std_env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

const DEFAULT_LOGIN_TIMEOUT_SECS: u64 = 10;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// Fatal configuration problems, raised at load time.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("required configuration value is missing: {0}")]
    Missing(&'static str),
    #[error("invalid engine URL '{url}': {reason}")]
    InvalidEngineUrl { url: String, reason: String },
    #[error("invalid flow definition for '{slug}': expected an object")]
    InvalidFlowDefinition { slug: String },
    #[error("{var} must contain a JSON object: {reason}", var = vars::FLOW_DEFINITIONS)]
    InvalidFlowJson { reason: String },
    #[error("could not read configuration file {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },
    #[error("could not parse configuration file {path}: {reason}")]
    Unparseable { path: PathBuf, reason: String },
}

/// Resolved, validated application configuration.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub engine_url: Url,
    pub login_timeout: Duration,
    pub request_timeout: Duration,
    /// Raw flow definitions, parsed into a catalog at bridge construction.
    pub flows: HashMap<String, Value>,
}

/// On-disk configuration shape. Everything is optional; env overrides and
/// defaults are applied by [`BridgeConfigFile::into_config`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeConfigFile {
    pub engine_url: Option<String>,
    pub login_timeout_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub flows: HashMap<String, Value>,
}

impl BridgeConfigFile {
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|err| ConfigError::Unreadable {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        toml::from_str(&content).map_err(|err| ConfigError::Unparseable {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })
    }

    /// Applies environment overrides and defaults, and validates the result.
    pub fn into_config(mut self) -> Result<BridgeConfig, ConfigError> {
        if let Ok(url) = std_env::var(vars::ENGINE_URL)
            && !url.trim().is_empty()
        {
            self.engine_url = Some(url);
        }

        let raw_url = self
            .engine_url
            .ok_or(ConfigError::Missing("engine_url (or FLOWBRIDGE_ENGINE_URL)"))?;
        let engine_url = Url::parse(&raw_url).map_err(|err| ConfigError::InvalidEngineUrl {
            url: raw_url,
            reason: err.to_string(),
        })?;

        let mut flows = self.flows;
        if let Ok(raw) = std_env::var(vars::FLOW_DEFINITIONS)
            && !raw.trim().is_empty()
        {
            let parsed: Value =
                serde_json::from_str(&raw).map_err(|err| ConfigError::InvalidFlowJson {
                    reason: err.to_string(),
                })?;
            let Value::Object(entries) = parsed else {
                return Err(ConfigError::InvalidFlowJson {
                    reason: "expected a JSON object at the top level".to_string(),
                });
            };
            for (slug, definition) in entries {
                flows.insert(slug, definition);
            }
        }

        Ok(BridgeConfig {
            engine_url,
            login_timeout: Duration::from_secs(
                self.login_timeout_secs.unwrap_or(DEFAULT_LOGIN_TIMEOUT_SECS),
            ),
            request_timeout: Duration::from_secs(
                self.request_timeout_secs
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            ),
            flows,
        })
    }
}

/// Configuration discovery system.
pub struct ConfigDiscovery;

impl ConfigDiscovery {
    /// Loads `.env`, walks the discovery hierarchy and resolves the final
    /// configuration. A missing file is fine; a missing engine URL is not.
    pub fn load() -> Result<BridgeConfig, ConfigError> {
        dotenvy::dotenv().ok();

        let file = match Self::find_config_file() {
            Some(path) => {
                info!("loading configuration from {}", path.display());
                BridgeConfigFile::from_toml_file(path)?
            }
            None => {
                info!("no configuration file found, relying on environment variables");
                BridgeConfigFile::default()
            }
        };
        file.into_config()
    }

    /// Load from an explicit path, bypassing discovery (env still applies).
    pub fn load_from(path: &Path) -> Result<BridgeConfig, ConfigError> {
        dotenvy::dotenv().ok();
        BridgeConfigFile::from_toml_file(path)?.into_config()
    }

    pub fn find_config_file() -> Option<PathBuf> {
        for candidate in Self::config_candidates() {
            debug!("checking for config file: {}", candidate.display());
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        None
    }

    fn config_candidates() -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        if let Ok(current_dir) = std_env::current_dir() {
            candidates.push(current_dir.join(env::LOCAL_CONFIG_FILE_NAME));
            candidates.push(env::local_config_file_path(&current_dir));
        }

        if let Some(home_dir) = Self::home_dir() {
            candidates.push(env::user_config_file_path(&home_dir));
        }

        #[cfg(unix)]
        candidates.push(PathBuf::from("/etc/flowbridge/config.toml"));

        candidates
    }

    fn home_dir() -> Option<PathBuf> {
        std_env::var("HOME")
            .ok()
            .or_else(|| std_env::var("USERPROFILE").ok())
            .map(PathBuf::from)
    }

    /// Prints the discovery hierarchy and which file, if any, would win.
    pub fn show_discovery_info() {
        println!("Configuration discovery order:");
        for candidate in Self::config_candidates() {
            let marker = if candidate.is_file() { "found" } else { "absent" };
            println!("  [{marker}] {}", candidate.display());
        }
        match Self::find_config_file() {
            Some(path) => println!("Active configuration file: {}", path.display()),
            None => println!("No configuration file found; environment variables only."),
        }
        println!(
            "Environment overrides: {}, {}",
            vars::ENGINE_URL,
            vars::FLOW_DEFINITIONS
        );
    }
}
