//! In-memory release table shared by the registry implementations.

use serde::Deserialize;
use std::collections::BTreeMap;

use poise_core::name::PackageName;
use poise_core::version::Version;
use poise_util::errors::PoiseError;

use crate::release::{PackageRelease, RawRelease};

/// The layout of an index file: a list of `[[package]]` release tables.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IndexDocument {
    #[serde(default)]
    pub package: Vec<RawRelease>,
}

/// Every known release, keyed by package then version.
#[derive(Debug, Clone, Default)]
pub struct Index {
    packages: BTreeMap<PackageName, BTreeMap<Version, PackageRelease>>,
}

impl Index {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an index document and add its releases. `origin` names the
    /// source in error messages.
    pub fn load_document(&mut self, content: &str, origin: &str) -> Result<usize, PoiseError> {
        let doc: IndexDocument = toml::from_str(content).map_err(|e| PoiseError::Parse {
            message: format!("{origin}: {e}"),
        })?;
        let count = doc.package.len();
        for raw in doc.package {
            let release = PackageRelease::from_raw(raw).map_err(|e| PoiseError::Parse {
                message: format!("{origin}: {e}"),
            })?;
            self.insert(release)?;
        }
        Ok(count)
    }

    /// Add a release. The same name and version may only appear once.
    pub fn insert(&mut self, release: PackageRelease) -> Result<(), PoiseError> {
        let versions = self.packages.entry(release.name.clone()).or_default();
        if versions.contains_key(&release.version) {
            return Err(PoiseError::Parse {
                message: format!(
                    "duplicate release {} {} in index",
                    release.name, release.version
                ),
            });
        }
        versions.insert(release.version.clone(), release);
        Ok(())
    }

    /// All versions of `name`, oldest first.
    pub fn versions(&self, name: &PackageName) -> Result<Vec<Version>, PoiseError> {
        self.packages
            .get(name)
            .map(|v| v.keys().cloned().collect())
            .ok_or_else(|| PoiseError::NotFound {
                message: format!("package '{name}' does not exist in the index"),
            })
    }

    pub fn release(&self, name: &PackageName, version: &Version) -> Result<PackageRelease, PoiseError> {
        let versions = self.packages.get(name).ok_or_else(|| PoiseError::NotFound {
            message: format!("package '{name}' does not exist in the index"),
        })?;
        versions
            .get(version)
            .cloned()
            .ok_or_else(|| PoiseError::NotFound {
                message: format!("package '{name}' has no release {version}"),
            })
    }

    pub fn package_count(&self) -> usize {
        self.packages.len()
    }

    pub fn release_count(&self) -> usize {
        self.packages.values().map(BTreeMap::len).sum()
    }
}
