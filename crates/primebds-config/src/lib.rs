//! PrimeBDS configuration: the typed `config.json` schema and the
//! tag-priority resolver used for combat settings.

pub mod error;
pub mod resolver;
pub mod schema;

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

pub use error::ConfigError;
pub use resolver::{lookup, resolve, resolve_numeric_or, CombatKey, CombatResolver};
pub use schema::*;

/// On-disk shape.
#[derive(Debug, Default, Serialize, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    modules: Modules,
}

/// Loaded plugin configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimeConfig {
    pub modules: Modules,
    /// `modules.combat` as JSON, defaults filled in, for tag resolution.
    combat_tree: Value,
}

impl Default for PrimeConfig {
    fn default() -> Self {
        Self::from_modules(Modules::default())
    }
}

impl PrimeConfig {
    fn from_modules(modules: Modules) -> Self {
        let combat_tree = serde_json::to_value(&modules.combat).unwrap_or(Value::Null);
        Self {
            modules,
            combat_tree,
        }
    }

    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        let file: ConfigFile = serde_json::from_value(value)?;
        Ok(Self::from_modules(file.modules))
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = serde_json::from_str(text)?;
        Ok(Self::from_modules(file.modules))
    }

    pub fn to_value(&self) -> Result<Value, ConfigError> {
        Ok(serde_json::to_value(ConfigFile {
            modules: self.modules.clone(),
        })?)
    }

    /// Read `path`, or write the defaults there if it does not exist yet.
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            return Self::from_json(&text);
        }

        let config = Self::default();
        let text = serde_json::to_string_pretty(&config.to_value()?)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, text).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Wrote default configuration to {}", path.display());
        Ok(config)
    }

    pub fn combat_tree(&self) -> &Value {
        &self.combat_tree
    }

    pub fn combat<'a>(&'a self, tags: &'a [String]) -> CombatResolver<'a> {
        CombatResolver::new(&self.combat_tree, tags)
    }
}
