//! Handler for `poise show`.

use std::path::Path;

use miette::Result;

use poise_ops::ops_setup::Session;

pub fn exec(manifest_path: Option<&Path>, json: bool) -> Result<()> {
    let session = Session::load(manifest_path)?;
    poise_ops::ops_show::show(&session, json)
}
