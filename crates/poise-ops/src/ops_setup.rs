//! Setup shared by every operation: locating the manifest, loading the
//! global configuration and opening the package index.

use std::path::{Path, PathBuf};

use poise_core::config::GlobalConfig;
use poise_core::lockfile::{Lockfile, LOCKFILE_NAME};
use poise_core::manifest::{Manifest, MANIFEST_NAME};
use poise_registry::FileIndex;
use poise_resolver::ResolveOptions;
use poise_util::errors::{PoiseError, PoiseResult};

/// A loaded project: its validated manifest and the configuration in effect.
pub struct Session {
    pub project_root: PathBuf,
    pub manifest_path: PathBuf,
    pub manifest: Manifest,
    pub config: GlobalConfig,
}

impl Session {
    /// Load the manifest at `manifest_path`, or search upward from the
    /// current directory for `pyproject.toml`.
    pub fn load(manifest_path: Option<&Path>) -> PoiseResult<Self> {
        let config = GlobalConfig::load().unwrap_or_else(|e| {
            tracing::warn!("ignoring global config: {e}");
            GlobalConfig::default()
        });
        Self::load_with_config(manifest_path, config)
    }

    pub fn load_with_config(manifest_path: Option<&Path>, config: GlobalConfig) -> PoiseResult<Self> {
        let manifest_path = match manifest_path {
            Some(p) => p.to_path_buf(),
            None => {
                let cwd = std::env::current_dir().map_err(PoiseError::Io)?;
                let root = poise_util::fs::find_ancestor_with(&cwd, MANIFEST_NAME).ok_or_else(|| {
                    PoiseError::Manifest {
                        message: format!(
                            "could not find {MANIFEST_NAME} in {} or any parent directory",
                            cwd.display()
                        ),
                    }
                })?;
                root.join(MANIFEST_NAME)
            }
        };
        let project_root = match manifest_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        tracing::debug!("using manifest {}", manifest_path.display());
        let manifest = Manifest::from_path(&manifest_path)?;

        Ok(Self {
            project_root,
            manifest_path,
            manifest,
            config,
        })
    }

    pub fn lockfile_path(&self) -> PathBuf {
        self.project_root.join(LOCKFILE_NAME)
    }

    /// The existing lock, if there is one.
    pub fn load_lockfile(&self) -> PoiseResult<Option<Lockfile>> {
        let path = self.lockfile_path();
        if path.is_file() {
            Ok(Some(Lockfile::from_path(&path)?))
        } else {
            Ok(None)
        }
    }

    /// The existing lock, or an error telling the user to create one.
    pub fn require_lockfile(&self) -> PoiseResult<Lockfile> {
        self.load_lockfile()?.ok_or_else(|| {
            PoiseError::Lockfile {
                message: format!(
                    "{LOCKFILE_NAME} not found in {}; run `poise lock` first",
                    self.project_root.display()
                ),
            }
            .into()
        })
    }

    /// Resolver settings from `[resolver]` in the global config.
    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions::from_config(&self.config.resolver)
    }
}

/// Open the package index. An explicit path (from `--index` or
/// `POISE_INDEX`) wins over `[registry] index` in the global config.
pub fn open_registry(index: Option<&Path>, config: &GlobalConfig) -> PoiseResult<FileIndex> {
    let path = index
        .map(Path::to_path_buf)
        .or_else(|| config.registry.index.clone())
        .ok_or_else(|| PoiseError::Registry {
            message: "no package index configured".to_string(),
        })?;
    Ok(FileIndex::open(&path)?)
}
