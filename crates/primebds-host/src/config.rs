use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid host config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Deserialize)]
pub struct HostConfig {
    pub server: ServerSection,
    pub logging: LoggingSection,
    #[serde(default)]
    pub plugins: PluginsSection,
}

#[derive(Debug, Deserialize)]
pub struct ServerSection {
    /// Level name reported to plugins.
    pub level_name: String,
    pub port: u16,
    /// Players granted host operator status when they join.
    #[serde(default)]
    pub operators: Vec<String>,
    /// Surface height of the simulated flat world.
    #[serde(default = "default_surface_y")]
    pub surface_y: i32,
}

fn default_surface_y() -> i32 {
    63
}

#[derive(Debug, Deserialize)]
pub struct LoggingSection {
    pub level: String,
}

#[derive(Debug, Deserialize)]
pub struct PluginsSection {
    /// Root of per-plugin config and data directories.
    #[serde(default = "default_plugins_directory")]
    pub directory: PathBuf,
}

fn default_plugins_directory() -> PathBuf {
    PathBuf::from("plugins")
}

impl Default for PluginsSection {
    fn default() -> Self {
        Self {
            directory: default_plugins_directory(),
        }
    }
}

impl HostConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, HostConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| HostConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, HostConfigError> {
        Ok(toml::from_str(contents)?)
    }
}
