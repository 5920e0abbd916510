//! Handler for `poise lock`.

use std::collections::BTreeSet;
use std::path::Path;

use miette::Result;

use poise_core::name::PackageName;
use poise_ops::ops_lock::{self, LockOptions};
use poise_ops::ops_setup::{self, Session};
use poise_resolver::Update;

pub fn exec(
    manifest_path: Option<&Path>,
    index: Option<&Path>,
    with: Vec<String>,
    all_groups: bool,
    extras: Vec<String>,
    update: Option<Vec<String>>,
    dry_run: bool,
) -> Result<()> {
    let session = Session::load(manifest_path)?;
    let registry = ops_setup::open_registry(index, &session.config)?;

    let update = match update {
        None => Update::Nothing,
        Some(names) if names.is_empty() => Update::All,
        Some(names) => Update::Packages(
            names
                .iter()
                .map(|n| PackageName::new(n))
                .collect::<Result<BTreeSet<_>, _>>()?,
        ),
    };

    let opts = LockOptions {
        with,
        all_groups,
        extras,
        update,
        dry_run,
    };
    ops_lock::lock(&session, &registry, &opts)?;
    Ok(())
}
