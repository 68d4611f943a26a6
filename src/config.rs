//! Resolver configuration.
//!
//! Settings come from three layers, lowest precedence first: built-in defaults, an optional
//! JSON file (`--config`), and CLI flags. Every field is optional in the file.
//!
//! ```json
//! {
//!   "relaxed_linking": true,
//!   "jobs": 4,
//!   "inheritance_remap": {
//!     "Foundation.NSObjectProtocol": { "module_name": "Foundation", "type_name": "NSObject" }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tugmock_resolve::{RemapTarget, ResolveOptions};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config value for {field}: {message}")]
    InvalidValue { field: &'static str, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolveConfig {
    pub relaxed_linking: bool,
    /// Worker threads; `None` means one per available processor.
    pub jobs: Option<usize>,
    pub inheritance_remap: BTreeMap<String, RemapTarget>,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        let options = ResolveOptions::default();
        ResolveConfig {
            relaxed_linking: options.relaxed_linking,
            jobs: None,
            inheritance_remap: options.inheritance_remap,
        }
    }
}

/// Command-line values layered over the file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub no_relaxed_linking: bool,
    pub jobs: Option<usize>,
}

impl ResolveConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: ResolveConfig =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::debug!(path = %path.display(), "loaded config file");
        config.validated()
    }

    /// Defaults, then `path` if given, then `overrides`.
    pub fn load(path: Option<&Path>, overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => ResolveConfig::from_file(path)?,
            None => ResolveConfig::default(),
        };
        if overrides.no_relaxed_linking {
            config.relaxed_linking = false;
        }
        if overrides.jobs.is_some() {
            config.jobs = overrides.jobs;
        }
        config.validated()
    }

    fn validated(self) -> Result<Self, ConfigError> {
        if self.jobs == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "jobs",
                message: "must be at least 1".to_string(),
            });
        }
        for (from, target) in &self.inheritance_remap {
            if !from.contains('.') || target.module_name.is_empty() || target.type_name.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "inheritance_remap",
                    message: format!("'{}' must map Module.Type to a module and type name", from),
                });
            }
        }
        Ok(self)
    }

    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            relaxed_linking: self.relaxed_linking,
            inheritance_remap: self.inheritance_remap.clone(),
        }
    }
}
