//! Command dispatch and handler modules.

mod check;
mod lock;
mod outdated;
mod show;
mod tree;

use miette::Result;

use crate::cli::{Cli, Command};

/// Route a parsed CLI invocation to the appropriate command handler.
pub fn dispatch(cli: Cli) -> Result<()> {
    let manifest_path = cli.manifest_path.as_deref();
    let index = cli.index.as_deref();
    match cli.command {
        Command::Lock {
            with,
            all_groups,
            extras,
            update,
            dry_run,
        } => lock::exec(manifest_path, index, with, all_groups, extras, update, dry_run),
        Command::Check { lock } => check::exec(manifest_path, lock),
        Command::Tree {
            depth,
            why,
            inverted,
        } => tree::exec(manifest_path, index, depth, why, inverted),
        Command::Show { json } => show::exec(manifest_path, json),
        Command::Outdated => outdated::exec(manifest_path, index),
    }
}
