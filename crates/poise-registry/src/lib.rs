//! Package registry access: the [`Registry`] trait the resolver queries, a
//! TOML file index and an in-memory registry.

pub mod file_index;
pub mod index;
pub mod memory;
pub mod release;

use poise_core::name::PackageName;
use poise_core::version::Version;
use poise_util::errors::PoiseError;

pub use file_index::FileIndex;
pub use memory::MemoryRegistry;
pub use release::PackageRelease;

/// A source of package versions and release metadata.
///
/// Both methods fail with [`PoiseError::NotFound`] when the package (or the
/// requested version of it) does not exist.
pub trait Registry {
    /// Every published version of `name`, in any order.
    fn versions(&self, name: &PackageName) -> Result<Vec<Version>, PoiseError>;

    /// Metadata for one release.
    fn metadata(&self, name: &PackageName, version: &Version) -> Result<PackageRelease, PoiseError>;
}

impl<R: Registry + ?Sized> Registry for Box<R> {
    fn versions(&self, name: &PackageName) -> Result<Vec<Version>, PoiseError> {
        (**self).versions(name)
    }

    fn metadata(&self, name: &PackageName, version: &Version) -> Result<PackageRelease, PoiseError> {
        (**self).metadata(name, version)
    }
}
