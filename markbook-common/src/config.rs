//! Configuration file resolution
//!
//! Service settings resolve in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! This module locates and reads the TOML tier; the CLI and environment
//! tiers live with each service's own config type.

use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Locate the Markbook config file for the current platform.
///
/// Linux checks `~/.config/markbook/config.toml` then
/// `/etc/markbook/config.toml`; macOS and Windows use the platform
/// config directory. Returns an error when no file exists.
pub fn locate_config_file() -> Result<PathBuf> {
    if cfg!(target_os = "linux") {
        let user_config = dirs::config_dir().map(|d| d.join("markbook").join("config.toml"));
        let system_config = PathBuf::from("/etc/markbook/config.toml");

        if let Some(path) = user_config {
            if path.exists() {
                return Ok(path);
            }
        }
        if system_config.exists() {
            return Ok(system_config);
        }
        Err(Error::Config("No config file found".to_string()))
    } else {
        let path = dirs::config_dir()
            .map(|d| d.join("markbook").join("config.toml"))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;

        if path.exists() {
            Ok(path)
        } else {
            Err(Error::Config(format!("Config file not found: {:?}", path)))
        }
    }
}

/// Parse a TOML config file into a value tree.
pub fn read_config_file(path: &Path) -> Result<toml::Value> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|e| Error::Config(format!("Invalid TOML in {:?}: {}", path, e)))
}

/// Read one string key from a parsed config value, if present.
pub fn get_string(config: &toml::Value, key: &str) -> Option<String> {
    config.get(key).and_then(|v| v.as_str()).map(|s| s.to_string())
}

/// Read one integer key from a parsed config value, if present.
pub fn get_integer(config: &toml::Value, key: &str) -> Option<i64> {
    config.get(key).and_then(|v| v.as_integer())
}

/// Read one boolean key from a parsed config value, if present.
pub fn get_bool(config: &toml::Value, key: &str) -> Option<bool> {
    config.get(key).and_then(|v| v.as_bool())
}
