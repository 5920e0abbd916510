use serde::{Deserialize, Serialize};
use std::path::Path;

use poise_util::errors::PoiseError;

use crate::name::PackageName;
use crate::version::Version;

/// File name of the lock written next to `pyproject.toml`.
pub const LOCKFILE_NAME: &str = "poise.lock";

/// Format revision written to `[metadata] lock-version`.
pub const LOCK_VERSION: &str = "1";

/// Deterministic lockfile recording exact resolved dependency versions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lockfile {
    #[serde(default)]
    pub package: Vec<LockedPackage>,
    pub metadata: LockMetadata,
}

/// A single locked package with the groups that reach it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedPackage {
    pub name: PackageName,
    pub version: Version,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extras: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<LockedDependencyRef>,
}

/// A reference to another package within the lockfile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedDependencyRef {
    pub name: PackageName,
    pub version: Version,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LockMetadata {
    pub lock_version: String,
    pub content_hash: String,
    #[serde(default)]
    pub groups: Vec<String>,
}

impl Lockfile {
    /// Load and parse a `poise.lock` file from the given path.
    pub fn from_path(path: &Path) -> miette::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| PoiseError::Lockfile {
            message: format!("Failed to read {}: {e}", path.display()),
        })?;
        Self::from_str(&content)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> miette::Result<Self> {
        let lock: Lockfile = toml::from_str(content).map_err(|e| PoiseError::Lockfile {
            message: format!("Failed to parse lockfile: {e}"),
        })?;
        if lock.metadata.lock_version != LOCK_VERSION {
            return Err(PoiseError::Lockfile {
                message: format!(
                    "unsupported lock-version '{}' (expected '{LOCK_VERSION}')",
                    lock.metadata.lock_version
                ),
            }
            .into());
        }
        Ok(lock)
    }

    /// Serialize the lockfile to a pretty-printed TOML string.
    pub fn to_string_pretty(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Serialize and atomically replace the lock at `path`.
    pub fn write_to(&self, path: &Path) -> miette::Result<()> {
        let content = self.to_string_pretty().map_err(|e| PoiseError::Lockfile {
            message: format!("Failed to serialize lockfile: {e}"),
        })?;
        poise_util::fs::write_atomic(path, content.as_bytes()).map_err(PoiseError::Io)?;
        Ok(())
    }

    pub fn find(&self, name: &str) -> Option<&LockedPackage> {
        self.package.iter().find(|p| p.name.as_str() == name)
    }

    pub fn locked_version(&self, name: &str) -> Option<&Version> {
        self.find(name).map(|p| &p.version)
    }

    /// Whether this lock was produced from a manifest with the given hash.
    pub fn is_fresh(&self, content_hash: &str) -> bool {
        self.metadata.content_hash == content_hash
    }
}
