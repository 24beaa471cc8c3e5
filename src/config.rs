//! User configuration for the command-line tool.

use crate::projection::ProjectionInfo;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const CONFIG_FILE_NAME: &str = "config.ron";

/// Errors that can occur when loading the configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: ron::de::SpannedError,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Target used by `reproject` when none is given on the command line.
    pub default_projection: Option<ProjectionInfo>,
    /// Write documents as indented RON.
    pub pretty: bool,
    /// Treat layers left in their old projection as an error.
    pub fail_on_unreprojectable: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_projection: None,
            pretty: true,
            fail_on_unreprojectable: false,
        }
    }
}

impl Config {
    /// Returns the path of the per-user config file.
    pub fn default_path() -> Option<PathBuf> {
        let config_dir = dirs::config_dir()?;
        Some(config_dir.join(env!("CARGO_PKG_NAME")).join(CONFIG_FILE_NAME))
    }

    /// Loads `path` if given, otherwise the per-user file.
    ///
    /// An explicit path must exist; a missing per-user file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load_file(path);
        }

        match Self::default_path() {
            Some(path) if path.exists() => Self::load_file(&path),
            Some(path) => {
                log::debug!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            None => {
                log::debug!("No config directory on this platform, using defaults");
                Ok(Self::default())
            }
        }
    }

    fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let ron_string = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = ron::from_str(&ron_string).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }
}
