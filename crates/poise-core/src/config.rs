use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use poise_util::errors::PoiseError;

/// Default number of candidate evaluations before the resolver gives up.
pub const DEFAULT_MAX_ATTEMPTS: usize = 10_000;

/// Global user configuration loaded from `~/.poise/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub resolver: ResolverConfig,
}

/// Package index settings from `[registry]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Path to a TOML index file or a directory of them.
    #[serde(default)]
    pub index: Option<PathBuf>,
}

/// Resolver settings from `[resolver]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ResolverConfig {
    #[serde(default)]
    pub strategy: Strategy,
    #[serde(default)]
    pub allow_prereleases: bool,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            allow_prereleases: false,
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_max_attempts() -> usize {
    DEFAULT_MAX_ATTEMPTS
}

/// Candidate ordering used when several versions satisfy a range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    #[default]
    Newest,
    Oldest,
}

impl GlobalConfig {
    /// Load the global configuration from `~/.poise/config.toml`, or return defaults if the file doesn't exist.
    pub fn load() -> miette::Result<Self> {
        Self::load_from(&Self::default_path())
    }

    pub fn load_from(path: &Path) -> miette::Result<Self> {
        if !path.is_file() {
            tracing::debug!("no global config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| PoiseError::Generic {
            message: format!("Failed to read global config: {e}"),
        })?;
        toml::from_str(&content).map_err(|e| {
            PoiseError::Parse {
                message: format!("Failed to parse global config {}: {e}", path.display()),
            }
            .into()
        })
    }

    /// Returns the default path to the global config file.
    pub fn default_path() -> PathBuf {
        dirs_path().join("config.toml")
    }
}

/// Returns the path to the Poise data directory (`~/.poise/`).
pub fn dirs_path() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    Path::new(&home).join(".poise")
}
