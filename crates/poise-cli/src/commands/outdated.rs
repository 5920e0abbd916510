//! Handler for `poise outdated`.

use std::path::Path;

use miette::Result;

use poise_ops::ops_outdated;
use poise_ops::ops_setup::{self, Session};

pub fn exec(manifest_path: Option<&Path>, index: Option<&Path>) -> Result<()> {
    let session = Session::load(manifest_path)?;
    let registry = ops_setup::open_registry(index, &session.config)?;
    ops_outdated::outdated(&session, &registry)?;
    Ok(())
}
