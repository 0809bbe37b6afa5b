//! Configuration loading and snapshot path resolution

use crate::Result;
use std::path::PathBuf;

/// Storage configuration consumed by the repository
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Snapshot file holding all sessions and feedback
    pub data_file: PathBuf,
    /// Retained feedback entries per session; 0 disables the cap
    pub max_feedback_per_session: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
            max_feedback_per_session: 200,
        }
    }
}

/// Snapshot path resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file (`data_file` key)
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_data_file(cli_arg: Option<&PathBuf>, env_var_name: &str) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.clone();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Ok(config_path) = config_file_path() {
        if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
            if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                if let Some(data_file) = config.get("data_file").and_then(|v| v.as_str()) {
                    return PathBuf::from(data_file);
                }
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    default_data_file()
}

/// Get default configuration file path for the platform
fn config_file_path() -> Result<PathBuf> {
    let path = dirs::config_dir()
        .map(|d| d.join("pulse").join("config.toml"))
        .ok_or_else(|| crate::Error::Config("Could not determine config directory".to_string()))?;

    if path.exists() {
        Ok(path)
    } else {
        Err(crate::Error::Config(format!(
            "Config file not found: {:?}",
            path
        )))
    }
}

/// Get OS-dependent default snapshot path
fn default_data_file() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("pulse"))
        .unwrap_or_else(|| PathBuf::from("./pulse_data"))
        .join("pulse.json")
}
