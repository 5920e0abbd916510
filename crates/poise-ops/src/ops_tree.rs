//! Operation: display the resolved dependency tree.

use poise_registry::Registry;
use poise_resolver::graph::DependencyGraph;
use poise_resolver::Update;
use poise_util::errors::PoiseResult;

use crate::ops_lock::{self, LockOptions};
use crate::ops_setup::Session;

/// Options for the `tree` command.
#[derive(Debug, Clone, Default)]
pub struct TreeOptions {
    /// Maximum depth to display.
    pub depth: Option<usize>,
    /// Show why a specific package is included.
    pub why: Option<String>,
    /// Show reverse dependencies.
    pub inverted: bool,
}

/// Resolve every group (keeping locked versions) and print the tree.
pub fn tree(session: &Session, registry: &dyn Registry, opts: &TreeOptions) -> PoiseResult<()> {
    let previous = session.load_lockfile().unwrap_or_else(|e| {
        tracing::warn!("ignoring unreadable lock: {e}");
        None
    });
    let lock_opts = LockOptions {
        all_groups: true,
        update: Update::Nothing,
        ..LockOptions::default()
    };
    let options = ops_lock::build_options(session, &lock_opts, previous.as_ref());
    let result = ops_lock::resolve_project(&session.manifest, registry, &options)?;

    print!("{}", render(&result.graph, opts));
    Ok(())
}

/// Render the graph the way `opts` asks for.
pub fn render(graph: &DependencyGraph, opts: &TreeOptions) -> String {
    if let Some(ref target) = opts.why {
        if graph.find(target).is_none() {
            return format!("Dependency '{target}' not found in the graph.\n");
        }
        if opts.inverted {
            return graph.print_inverted_tree(target);
        }
        return match graph.find_path(target) {
            Some(path) => {
                let mut out = format!("Path to {target}:\n");
                for (i, node) in path.iter().enumerate() {
                    out.push_str(&format!("{}{node}\n", "  ".repeat(i)));
                }
                out
            }
            None => format!("Dependency '{target}' not found in the graph.\n"),
        };
    }

    if opts.inverted {
        let out = graph.print_full_inverted_tree();
        if out.is_empty() {
            return "No dependencies.\n".to_string();
        }
        return out;
    }

    graph.print_tree(opts.depth)
}
