use poise_core::name::PackageName;
use poise_core::version::Version;
use poise_util::errors::PoiseError;

use crate::index::Index;
use crate::release::PackageRelease;
use crate::Registry;

/// A registry held entirely in memory. Used by tests and by callers that
/// assemble release metadata themselves.
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    index: Index,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from an index document in the file index format.
    pub fn from_toml(content: &str) -> Result<Self, PoiseError> {
        let mut registry = Self::new();
        registry.index.load_document(content, "<memory>")?;
        Ok(registry)
    }

    pub fn insert(&mut self, release: PackageRelease) -> Result<(), PoiseError> {
        self.index.insert(release)
    }

    /// Add a release with no dependencies for each of `versions`.
    pub fn with_versions(mut self, name: &str, versions: &[&str]) -> Result<Self, PoiseError> {
        let name = PackageName::new(name)?;
        for v in versions {
            self.insert(PackageRelease::new(name.clone(), Version::parse(v)?))?;
        }
        Ok(self)
    }
}

impl Registry for MemoryRegistry {
    fn versions(&self, name: &PackageName) -> Result<Vec<Version>, PoiseError> {
        self.index.versions(name)
    }

    fn metadata(&self, name: &PackageName, version: &Version) -> Result<PackageRelease, PoiseError> {
        self.index.release(name, version)
    }
}
