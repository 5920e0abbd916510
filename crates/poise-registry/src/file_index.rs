//! A registry backed by TOML files on disk.

use std::fs;
use std::path::{Path, PathBuf};

use poise_core::name::PackageName;
use poise_core::version::Version;
use poise_util::errors::PoiseError;

use crate::index::Index;
use crate::release::PackageRelease;
use crate::Registry;

/// A file index: either one TOML file or a directory of `*.toml` files,
/// each holding `[[package]]` release tables.
#[derive(Debug, Clone)]
pub struct FileIndex {
    root: PathBuf,
    index: Index,
}

impl FileIndex {
    /// Load every release under `path`.
    pub fn open(path: &Path) -> Result<Self, PoiseError> {
        let files = if path.is_dir() {
            index_files(path)?
        } else if path.is_file() {
            vec![path.to_path_buf()]
        } else {
            return Err(PoiseError::Registry {
                message: format!("index not found at {}", path.display()),
            });
        };

        let mut index = Index::new();
        for file in &files {
            let content = fs::read_to_string(file)?;
            let count = index.load_document(&content, &file.display().to_string())?;
            tracing::debug!("loaded {count} releases from {}", file.display());
        }
        tracing::debug!(
            "index {} holds {} packages, {} releases",
            path.display(),
            index.package_count(),
            index.release_count()
        );

        Ok(Self {
            root: path.to_path_buf(),
            index,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn index(&self) -> &Index {
        &self.index
    }
}

/// `*.toml` files directly inside `dir`, sorted by name.
fn index_files(dir: &Path) -> Result<Vec<PathBuf>, PoiseError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "toml") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

impl Registry for FileIndex {
    fn versions(&self, name: &PackageName) -> Result<Vec<Version>, PoiseError> {
        self.index.versions(name)
    }

    fn metadata(&self, name: &PackageName, version: &Version) -> Result<PackageRelease, PoiseError> {
        self.index.release(name, version)
    }
}
