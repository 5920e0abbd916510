//! Operation: compare locked versions with the newest ones in the index.

use poise_core::constraint::VersionSet;
use poise_core::lockfile::Lockfile;
use poise_core::manifest::Manifest;
use poise_core::version::Version;
use poise_registry::Registry;
use poise_util::errors::PoiseResult;

use crate::ops_setup::Session;

/// A single locked package and the newest release available for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutdatedEntry {
    pub name: String,
    pub current: Version,
    pub latest: Version,
    /// Whether `latest` satisfies every range that currently applies to the package.
    pub in_range: bool,
    pub groups: Vec<String>,
}

impl OutdatedEntry {
    pub fn is_outdated(&self) -> bool {
        self.latest > self.current
    }
}

/// Check every locked package for newer releases and print a report.
pub fn outdated(session: &Session, registry: &dyn Registry) -> PoiseResult<Vec<OutdatedEntry>> {
    let lockfile = session.require_lockfile()?;
    let sp = poise_util::progress::spinner("Checking for outdated packages...");
    let entries = collect(&session.manifest, &lockfile, registry);
    sp.finish_and_clear();
    let entries = entries?;

    let stale: Vec<&OutdatedEntry> = entries.iter().filter(|e| e.is_outdated()).collect();
    if stale.is_empty() {
        poise_util::progress::status("Outdated", "all packages are up to date");
        return Ok(entries);
    }

    println!(
        "{:<30} {:<12} {:<12} {:<9} Groups",
        "Package", "Current", "Latest", "In range"
    );
    println!("{}", "-".repeat(76));
    for entry in stale {
        println!(
            "{:<30} {:<12} {:<12} {:<9} {}",
            entry.name,
            entry.current.to_string(),
            entry.latest.to_string(),
            if entry.in_range { "yes" } else { "no" },
            entry.groups.join(", ")
        );
    }
    Ok(entries)
}

/// Build one entry per locked package, in lock order.
pub fn collect(
    manifest: &Manifest,
    lockfile: &Lockfile,
    registry: &dyn Registry,
) -> PoiseResult<Vec<OutdatedEntry>> {
    let mut entries = Vec::with_capacity(lockfile.package.len());
    for pkg in &lockfile.package {
        let versions = registry.versions(&pkg.name)?;
        let latest = newest(&versions, pkg.version.is_prerelease())
            .cloned()
            .unwrap_or_else(|| pkg.version.clone());
        let range = applicable_range(manifest, lockfile, registry, pkg.name.as_str())?;
        entries.push(OutdatedEntry {
            name: pkg.name.to_string(),
            current: pkg.version.clone(),
            in_range: range.contains(&latest),
            latest,
            groups: pkg.groups.clone(),
        });
    }
    Ok(entries)
}

/// Newest release, skipping pre-releases unless the locked version is one.
fn newest(versions: &[Version], allow_prereleases: bool) -> Option<&Version> {
    versions
        .iter()
        .filter(|v| allow_prereleases || !v.is_prerelease())
        .max()
}

/// Intersection of the manifest's ranges for `name` and the ranges every
/// locked parent release declares for it.
fn applicable_range(
    manifest: &Manifest,
    lockfile: &Lockfile,
    registry: &dyn Registry,
    name: &str,
) -> PoiseResult<VersionSet> {
    let mut range = VersionSet::any();
    for dep in manifest.groups.iter().flat_map(|g| &g.dependencies) {
        if dep.name.as_str() == name {
            range = range.intersect(dep.constraint.set());
        }
    }
    for parent in &lockfile.package {
        if !parent.dependencies.iter().any(|d| d.name.as_str() == name) {
            continue;
        }
        let release = registry.metadata(&parent.name, &parent.version)?;
        for dep in release.dependencies.iter().filter(|d| d.name.as_str() == name) {
            range = range.intersect(dep.constraint.set());
        }
    }
    Ok(range)
}
