//! High-level operations behind the `poise` commands.

pub mod ops_check;
pub mod ops_lock;
pub mod ops_outdated;
pub mod ops_setup;
pub mod ops_show;
pub mod ops_tree;
