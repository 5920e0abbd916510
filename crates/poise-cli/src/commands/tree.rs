//! Handler for `poise tree`.

use std::path::Path;

use miette::Result;

use poise_ops::ops_setup::{self, Session};
use poise_ops::ops_tree::{self, TreeOptions};

pub fn exec(
    manifest_path: Option<&Path>,
    index: Option<&Path>,
    depth: Option<u32>,
    why: Option<String>,
    inverted: bool,
) -> Result<()> {
    let session = Session::load(manifest_path)?;
    let registry = ops_setup::open_registry(index, &session.config)?;

    let opts = TreeOptions {
        depth: depth.map(|d| d as usize),
        why,
        inverted,
    };

    ops_tree::tree(&session, &registry, &opts)
}
