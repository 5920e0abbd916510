//! Operation: validate the manifest and, optionally, the lock.

use poise_core::lockfile::{Lockfile, LOCKFILE_NAME};
use poise_core::manifest::MANIFEST_NAME;
use poise_util::errors::{PoiseError, PoiseResult};

use crate::ops_setup::Session;

/// Report on a validated project. The manifest is validated while the
/// session loads, so reaching this point means it is well formed.
pub fn check(session: &Session, lock: bool) -> PoiseResult<()> {
    let manifest = &session.manifest;
    poise_util::progress::status(
        "Checking",
        &format!("{} v{}", manifest.project.name, manifest.project.version),
    );

    for group in &manifest.groups {
        let optional = if group.optional { " (optional)" } else { "" };
        tracing::debug!(
            "group {}{optional}: {} dependencies",
            group.name,
            group.dependencies.len()
        );
    }
    if let Some(bs) = &manifest.build_system {
        if let Some(backend) = &bs.backend {
            tracing::debug!("build backend {backend}");
        }
    }

    if lock {
        let lockfile = verify_lock(session)?;
        poise_util::progress::status_info(
            "Fresh",
            &format!("{LOCKFILE_NAME} ({} packages)", lockfile.package.len()),
        );
    }

    let deps: usize = manifest.groups.iter().map(|g| g.dependencies.len()).sum();
    poise_util::progress::status(
        "Finished",
        &format!("{MANIFEST_NAME} is valid ({} groups, {deps} dependencies)", manifest.groups.len()),
    );
    Ok(())
}

/// Load the lock and make sure it was produced from the current manifest.
pub fn verify_lock(session: &Session) -> PoiseResult<Lockfile> {
    let lockfile = session.require_lockfile()?;
    if !lockfile.is_fresh(&session.manifest.content_hash()) {
        return Err(PoiseError::Lockfile {
            message: format!(
                "{LOCKFILE_NAME} is out of date with {MANIFEST_NAME}; run `poise lock`"
            ),
        }
        .into());
    }
    Ok(lockfile)
}
