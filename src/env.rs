//! Environment variable names and configuration file constants.
//!
//! Centralizes the names used throughout the bridge so they are defined
//! in exactly one place.

use std::path::{Path, PathBuf};

/// Hidden configuration directory name (like .git, .cargo)
pub const CONFIG_DIR_NAME: &str = ".flowbridge";

/// Configuration file name inside the config directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Plain configuration file name checked in the working directory
pub const LOCAL_CONFIG_FILE_NAME: &str = "flowbridge.toml";

/// Environment variable names
pub mod vars {
    /// Base URL of the upstream engine (overrides the config file)
    pub const ENGINE_URL: &str = "FLOWBRIDGE_ENGINE_URL";

    /// JSON object of flow definitions, merged over the config file's flows
    pub const FLOW_DEFINITIONS: &str = "FLOW_DEFINITIONS";

    /// Default principal for the CLI
    pub const USERNAME: &str = "FLOWBRIDGE_USERNAME";

    /// Default secret for the CLI
    pub const PASSWORD: &str = "FLOWBRIDGE_PASSWORD";

    /// tracing filter directive for the CLI
    pub const LOG_FILTER: &str = "FLOWBRIDGE_LOG";
}

/// Build the local config file path from a working directory
pub fn local_config_file_path(working_dir: &Path) -> PathBuf {
    working_dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME)
}

/// Build the user config directory path from a home directory
pub fn user_config_dir_path(home_dir: &Path) -> PathBuf {
    home_dir.join(CONFIG_DIR_NAME)
}

/// Build the user config file path from a home directory
pub fn user_config_file_path(home_dir: &Path) -> PathBuf {
    user_config_dir_path(home_dir).join(CONFIG_FILE_NAME)
}
