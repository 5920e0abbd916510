//! Operation: resolve dependencies and write `poise.lock`.

use std::collections::BTreeSet;

use poise_core::dependency::MAIN_GROUP;
use poise_core::lockfile::{LockMetadata, LockedDependencyRef, LockedPackage, Lockfile, LOCK_VERSION};
use poise_core::manifest::Manifest;
use poise_core::name::PackageName;
use poise_registry::Registry;
use poise_resolver::resolver::{self, ResolutionResult, ResolveOptions, Update};
use poise_util::errors::{PoiseError, PoiseResult};

use crate::ops_setup::Session;

/// Options for `poise lock`.
#[derive(Debug, Clone)]
pub struct LockOptions {
    /// Extra groups to resolve alongside `main`.
    pub with: Vec<String>,
    pub all_groups: bool,
    /// Project extras to activate.
    pub extras: Vec<String>,
    pub update: Update,
    /// Resolve and report without writing the lock.
    pub dry_run: bool,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            with: Vec::new(),
            all_groups: false,
            extras: Vec::new(),
            update: Update::Nothing,
            dry_run: false,
        }
    }
}

/// A difference between the previous lock and the new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockChange {
    Added { name: String, version: String },
    Updated { name: String, from: String, to: String },
    Removed { name: String, version: String },
}

/// Resolve, write `poise.lock` (unless `dry_run`) and return the new lock.
pub fn lock(session: &Session, registry: &dyn Registry, opts: &LockOptions) -> PoiseResult<Lockfile> {
    let previous = match session.load_lockfile() {
        Ok(lock) => lock,
        Err(e) => {
            tracing::warn!("ignoring unreadable lock: {e}");
            None
        }
    };

    if let Update::Packages(names) = &opts.update {
        for name in names {
            if previous.as_ref().and_then(|l| l.find(name.as_str())).is_none() {
                poise_util::progress::status_warn("Warning", &format!("'{name}' is not in the lock"));
            }
        }
    }

    let options = build_options(session, opts, previous.as_ref());
    let result = resolve_project(&session.manifest, registry, &options)?;
    let groups = lock_groups(&session.manifest, &options);
    let lockfile = to_lockfile(&session.manifest, &result, groups);

    for change in diff(previous.as_ref(), &lockfile) {
        match change {
            LockChange::Added { name, version } => {
                poise_util::progress::status("Adding", &format!("{name} v{version}"))
            }
            LockChange::Updated { name, from, to } => {
                poise_util::progress::status("Updating", &format!("{name} v{from} -> v{to}"))
            }
            LockChange::Removed { name, version } => {
                poise_util::progress::status("Removing", &format!("{name} v{version}"))
            }
        }
    }

    if opts.dry_run {
        poise_util::progress::status_info(
            "Resolved",
            &format!("{} packages (dry run, lock not written)", lockfile.package.len()),
        );
        return Ok(lockfile);
    }

    lockfile.write_to(&session.lockfile_path())?;
    poise_util::progress::status(
        "Locked",
        &format!(
            "{} packages for {} v{}",
            lockfile.package.len(),
            session.manifest.project.name,
            session.manifest.project.version
        ),
    );
    Ok(lockfile)
}

/// Resolver options for a lock run: config defaults, requested groups and
/// extras, and preferences from the previous lock.
pub fn build_options(
    session: &Session,
    opts: &LockOptions,
    previous: Option<&Lockfile>,
) -> ResolveOptions {
    let mut options = session.resolve_options();
    if opts.all_groups {
        options = options.with_all_groups(&session.manifest);
    }
    for group in &opts.with {
        options = options.with_group(group);
    }
    for extra in &opts.extras {
        options = options.with_extra(extra);
    }
    options.preferred = resolver::locked_preferences(&session.manifest, previous, &opts.update);
    options
}

/// Run the resolver with a spinner, converting failures into diagnostics.
pub fn resolve_project(
    manifest: &Manifest,
    registry: &dyn Registry,
    options: &ResolveOptions,
) -> PoiseResult<ResolutionResult> {
    let sp = poise_util::progress::spinner("Resolving dependencies...");
    let result = resolver::resolve(manifest, registry, options);
    sp.finish_and_clear();
    let result = result.map_err(PoiseError::from)?;
    if !result.conflicts.is_empty() {
        tracing::debug!("backtracked past:\n{}", result.conflicts);
    }
    Ok(result)
}

/// Groups recorded in the lock metadata, in declaration order.
fn lock_groups(manifest: &Manifest, options: &ResolveOptions) -> Vec<String> {
    let mut groups = vec![MAIN_GROUP.to_string()];
    groups.extend(
        manifest
            .group_names()
            .filter(|g| options.groups.contains(*g))
            .map(str::to_string),
    );
    groups
}

/// Convert a resolution into the lock model.
pub fn to_lockfile(manifest: &Manifest, result: &ResolutionResult, groups: Vec<String>) -> Lockfile {
    let package = result
        .packages
        .values()
        .map(|p| LockedPackage {
            name: p.name.clone(),
            version: p.version.clone(),
            groups: p.groups.iter().cloned().collect(),
            extras: p.extras.iter().cloned().collect(),
            dependencies: p
                .dependencies
                .iter()
                .map(|(name, version)| LockedDependencyRef {
                    name: name.clone(),
                    version: version.clone(),
                })
                .collect(),
        })
        .collect();

    Lockfile {
        package,
        metadata: LockMetadata {
            lock_version: LOCK_VERSION.to_string(),
            content_hash: manifest.content_hash(),
            groups,
        },
    }
}

/// Compare two locks package by package.
pub fn diff(old: Option<&Lockfile>, new: &Lockfile) -> Vec<LockChange> {
    let mut changes = Vec::new();
    let Some(old) = old else {
        return changes;
    };

    let names: BTreeSet<&PackageName> = old
        .package
        .iter()
        .chain(&new.package)
        .map(|p| &p.name)
        .collect();
    for name in names {
        match (old.find(name.as_str()), new.find(name.as_str())) {
            (None, Some(n)) => changes.push(LockChange::Added {
                name: name.to_string(),
                version: n.version.to_string(),
            }),
            (Some(o), None) => changes.push(LockChange::Removed {
                name: name.to_string(),
                version: o.version.to_string(),
            }),
            (Some(o), Some(n)) if o.version != n.version => changes.push(LockChange::Updated {
                name: name.to_string(),
                from: o.version.to_string(),
                to: n.version.to_string(),
            }),
            _ => {}
        }
    }
    changes
}
