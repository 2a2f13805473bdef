//! Configuration system for reconcile.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $RECONCILE_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/reconcile/config.toml
//!   3. ~/.config/reconcile/config.toml
//!
//! Nothing protocol-relevant lives only in config: CLI flags always win
//! over config, which wins over these defaults (§6 CLI).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    pub network: NetworkConfig,
    pub iblt: IbltConfig,
    pub chunker: ChunkerConfig,
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IbltConfig {
    pub table_size_constant: f64,
    pub max_sync_retry: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    pub h: usize,
    pub r: usize,
    pub hash_space: u64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            iblt: IbltConfig::default(),
            chunker: ChunkerConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9590,
        }
    }
}

impl Default for IbltConfig {
    fn default() -> Self {
        Self {
            table_size_constant: 2.5,
            max_sync_retry: 0,
        }
    }
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            h: 8,
            r: 4,
            hash_space: 1024,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

impl ReconcileConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.clone(), e))?
        } else {
            ReconcileConfig::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn file_path() -> PathBuf {
        std::env::var("RECONCILE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&ReconcileConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("RECONCILE_NETWORK__HOST") {
            self.network.host = v;
        }
        if let Ok(v) = std::env::var("RECONCILE_NETWORK__PORT") {
            if let Ok(p) = v.parse() {
                self.network.port = p;
            }
        }
        if let Ok(v) = std::env::var("RECONCILE_IBLT__TABLE_SIZE_CONSTANT") {
            if let Ok(c) = v.parse() {
                self.iblt.table_size_constant = c;
            }
        }
        if let Ok(v) = std::env::var("RECONCILE_LOG_LEVEL") {
            self.log_level = v;
        }
    }
}

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("reconcile")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = ReconcileConfig::default();
        assert_eq!(config.network.port, 9590);
        assert_eq!(config.iblt.table_size_constant, 2.5);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn write_default_if_missing_creates_file() {
        let tmp = std::env::temp_dir().join(format!("reconcile-config-test-{}", std::process::id()));
        let config_path = tmp.join("config.toml");
        std::fs::create_dir_all(&tmp).unwrap();

        unsafe {
            std::env::set_var("RECONCILE_CONFIG", config_path.to_str().unwrap());
        }

        let path = ReconcileConfig::write_default_if_missing().expect("write should succeed");
        assert!(path.exists());

        let config = ReconcileConfig::load().expect("load should succeed");
        assert_eq!(config.network.port, 9590);

        unsafe {
            std::env::remove_var("RECONCILE_CONFIG");
        }
        let _ = std::fs::remove_dir_all(&tmp);
    }
}
