//! CLI argument definitions for Poise.
//!
//! Uses `clap` derive macros to define the command surface. Each command
//! corresponds to a handler in the [`super::commands`] module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "poise",
    version,
    about = "A dependency resolver for Poetry projects",
    long_about = "Poise reads the [tool.poetry] tables of a pyproject.toml, resolves every \
                  constraint against a package index and writes an exact-version lock."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to pyproject.toml (default: search upward from the current directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub manifest_path: Option<PathBuf>,

    /// Package index: a TOML file or a directory of TOML files
    #[arg(long, global = true, env = "POISE_INDEX", value_name = "PATH")]
    pub index: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve dependencies and write poise.lock
    Lock {
        /// Also resolve this dependency group (repeatable)
        #[arg(long, value_name = "GROUP")]
        with: Vec<String>,
        /// Resolve every dependency group
        #[arg(long, conflicts_with = "with")]
        all_groups: bool,
        /// Activate project extras
        #[arg(short = 'E', long, value_delimiter = ',', value_name = "EXTRA")]
        extras: Vec<String>,
        /// Ignore locked versions of these packages (all packages when none are given)
        #[arg(long, num_args = 0.., value_name = "PKG")]
        update: Option<Vec<String>>,
        /// Resolve without writing the lock file
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate the manifest
    Check {
        /// Also verify that poise.lock matches the manifest
        #[arg(long)]
        lock: bool,
    },

    /// Print the dependency tree
    Tree {
        /// Maximum depth
        #[arg(long)]
        depth: Option<u32>,
        /// Explain why a dependency is included
        #[arg(long, value_name = "PKG")]
        why: Option<String>,
        /// Show inverted tree (dependents)
        #[arg(long)]
        inverted: bool,
    },

    /// Print locked package versions
    Show {
        /// Print a JSON object instead of text
        #[arg(long)]
        json: bool,
    },

    /// Show locked packages with newer releases
    Outdated,
}

pub fn parse() -> Cli {
    Cli::parse()
}
