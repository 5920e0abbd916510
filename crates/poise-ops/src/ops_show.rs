//! Operation: print the locked package set.

use std::collections::BTreeMap;

use poise_core::lockfile::Lockfile;
use poise_util::errors::{PoiseError, PoiseResult};

use crate::ops_setup::Session;

/// Print `name version` per locked package, or a JSON object with `--json`.
pub fn show(session: &Session, json: bool) -> PoiseResult<()> {
    let lockfile = session.require_lockfile()?;
    if !lockfile.is_fresh(&session.manifest.content_hash()) {
        poise_util::progress::status_warn("Warning", "poise.lock is out of date; run `poise lock`");
    }
    print!("{}", render(&lockfile, json)?);
    Ok(())
}

pub fn render(lockfile: &Lockfile, json: bool) -> PoiseResult<String> {
    if json {
        let mapping: BTreeMap<&str, String> = lockfile
            .package
            .iter()
            .map(|p| (p.name.as_str(), p.version.to_string()))
            .collect();
        let mut out = serde_json::to_string_pretty(&mapping).map_err(|e| PoiseError::Generic {
            message: format!("failed to render JSON: {e}"),
        })?;
        out.push('\n');
        return Ok(out);
    }

    let width = lockfile
        .package
        .iter()
        .map(|p| p.name.as_str().len())
        .max()
        .unwrap_or(0);
    let mut out = String::new();
    for p in &lockfile.package {
        out.push_str(&format!("{:<width$} {}\n", p.name.as_str(), p.version));
    }
    Ok(out)
}
