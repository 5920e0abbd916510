//! Release metadata as published by an index.

use serde::Deserialize;
use std::collections::BTreeMap;

use poise_core::dependency::{Dependency, PackageDescriptor, MAIN_GROUP};
use poise_core::name::{self, PackageName};
use poise_core::version::Version;
use poise_util::errors::PoiseError;

/// One `[[package]]` table of an index file, before validation.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRelease {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub dependencies: toml::Table,
    #[serde(default)]
    pub extras: BTreeMap<String, Vec<String>>,
}

/// A single published version of a package and what it requires.
#[derive(Debug, Clone)]
pub struct PackageRelease {
    pub name: PackageName,
    pub version: Version,
    pub dependencies: Vec<PackageDescriptor>,
    /// Extra name to the optional dependencies it enables.
    pub extras: BTreeMap<String, Vec<PackageName>>,
}

impl PackageRelease {
    pub fn new(name: PackageName, version: Version) -> Self {
        Self {
            name,
            version,
            dependencies: Vec::new(),
            extras: BTreeMap::new(),
        }
    }

    pub fn from_raw(raw: RawRelease) -> Result<Self, PoiseError> {
        let name = PackageName::new(&raw.name)?;
        let version = Version::parse(&raw.version)?;
        let context = |e: PoiseError| PoiseError::Parse {
            message: format!("release {name} {version}: {e}"),
        };

        let mut release = Self::new(name.clone(), version.clone());
        for (dep_name, value) in &raw.dependencies {
            let dep: Dependency = value.clone().try_into().map_err(|e| PoiseError::Parse {
                message: format!("release {name} {version}: dependency '{dep_name}': {e}"),
            })?;
            let descriptor =
                PackageDescriptor::from_dependency(dep_name, &dep, MAIN_GROUP).map_err(context)?;
            release.dependencies.push(descriptor);
        }

        for (extra, members) in &raw.extras {
            let mut names = Vec::with_capacity(members.len());
            for member in members {
                let member = PackageName::new(member).map_err(context)?;
                if !release
                    .dependencies
                    .iter()
                    .any(|d| d.name == member && d.optional)
                {
                    return Err(PoiseError::Parse {
                        message: format!(
                            "release {name} {version}: extra '{extra}' lists '{member}', which is not an optional dependency"
                        ),
                    });
                }
                names.push(member);
            }
            release.extras.insert(name::normalize(extra), names);
        }

        Ok(release)
    }

    /// Dependencies that are always required.
    pub fn required(&self) -> impl Iterator<Item = &PackageDescriptor> {
        self.dependencies.iter().filter(|d| !d.optional)
    }

    /// Dependencies enabled by `extra`, or `None` if the release has no such extra.
    pub fn extra_dependencies(&self, extra: &str) -> Option<Vec<&PackageDescriptor>> {
        let members = self.extras.get(extra)?;
        Some(
            self.dependencies
                .iter()
                .filter(|d| members.contains(&d.name))
                .collect(),
        )
    }
}
