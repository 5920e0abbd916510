//! Dependency graph construction and traversal.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use poise_core::dependency::MAIN_GROUP;
use poise_core::name;

/// A node in the resolved dependency graph.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct ResolvedNode {
    pub name: String,
    pub version: String,
    /// Extras activated on this package.
    pub extras: Vec<String>,
}

impl fmt::Display for ResolvedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.extras.is_empty() {
            write!(f, "{} {}", self.name, self.version)
        } else {
            write!(f, "{}[{}] {}", self.name, self.extras.join(","), self.version)
        }
    }
}

/// Edge label in the dependency graph.
#[derive(Debug, Clone, Default)]
pub struct DepEdge {
    /// Set on edges leaving the root: the manifest group that declared them.
    pub group: Option<String>,
    /// Extras the requiring side asked for.
    pub extras: Vec<String>,
}

/// A resolved dependency graph backed by petgraph.
#[derive(Debug)]
pub struct DependencyGraph {
    graph: DiGraph<ResolvedNode, DepEdge>,
    /// Lookup from package name to node index. The root is not indexed.
    index: HashMap<String, NodeIndex>,
    /// Group labels in the order they were first seen on root edges.
    group_order: Vec<String>,
    pub root: Option<NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            index: HashMap::new(),
            group_order: Vec::new(),
            root: None,
        }
    }

    /// Add the project node and make it the root.
    pub fn add_root(&mut self, node: ResolvedNode) -> NodeIndex {
        let idx = self.graph.add_node(node);
        self.root = Some(idx);
        idx
    }

    /// Add or retrieve a node. If the name already exists, returns the existing index.
    pub fn add_node(&mut self, node: ResolvedNode) -> NodeIndex {
        if let Some(&idx) = self.index.get(&node.name) {
            return idx;
        }
        let key = node.name.clone();
        let idx = self.graph.add_node(node);
        self.index.insert(key, idx);
        idx
    }

    /// Add a dependency edge from `from` to `to`. Parallel edges are kept
    /// only when they carry a different group.
    pub fn add_edge(&mut self, from: NodeIndex, to: NodeIndex, edge: DepEdge) {
        if let Some(group) = &edge.group {
            if !self.group_order.contains(group) {
                self.group_order.push(group.clone());
            }
        }
        if !self
            .graph
            .edges(from)
            .any(|e| e.target() == to && e.weight().group == edge.group)
        {
            self.graph.add_edge(from, to, edge);
        }
    }

    /// Look up a node by package name (normalized before lookup).
    pub fn find(&self, name: &str) -> Option<NodeIndex> {
        self.index.get(&name::normalize(name)).copied()
    }

    /// Get the node data for an index.
    pub fn node(&self, idx: NodeIndex) -> &ResolvedNode {
        &self.graph[idx]
    }

    /// Direct dependencies of a node, sorted by name.
    pub fn dependencies_of(&self, idx: NodeIndex) -> Vec<(NodeIndex, &DepEdge)> {
        let mut deps: Vec<(NodeIndex, &DepEdge)> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| (e.target(), e.weight()))
            .collect();
        deps.sort_by(|a, b| self.graph[a.0].name.cmp(&self.graph[b.0].name));
        deps
    }

    /// Reverse dependencies (who depends on this node), sorted by name.
    /// A dependent reaching the node through several groups is listed once.
    pub fn dependents_of(&self, idx: NodeIndex) -> Vec<(NodeIndex, &DepEdge)> {
        let mut deps: Vec<(NodeIndex, &DepEdge)> = self
            .graph
            .edges_directed(idx, Direction::Incoming)
            .map(|e| (e.source(), e.weight()))
            .collect();
        deps.sort_by(|a, b| self.graph[a.0].name.cmp(&self.graph[b.0].name));
        deps.dedup_by_key(|d| d.0);
        deps
    }

    /// For every package, the groups whose root edges reach it.
    pub fn group_reachability(&self) -> BTreeMap<String, BTreeSet<String>> {
        let mut reach: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let Some(root) = self.root else {
            return reach;
        };
        for (start, edge) in self.dependencies_of(root) {
            let Some(group) = &edge.group else {
                continue;
            };
            let mut seen = HashSet::new();
            let mut queue = VecDeque::from([start]);
            while let Some(idx) = queue.pop_front() {
                if idx == root || !seen.insert(idx) {
                    continue;
                }
                reach
                    .entry(self.graph[idx].name.clone())
                    .or_default()
                    .insert(group.clone());
                for (child, _) in self.dependencies_of(idx) {
                    queue.push_back(child);
                }
            }
        }
        reach
    }

    /// Print the dependency tree to a string, grouping root edges by manifest group.
    pub fn print_tree(&self, max_depth: Option<usize>) -> String {
        let mut output = String::new();
        let root = match self.root {
            Some(r) => r,
            None => return output,
        };

        let root_node = &self.graph[root];
        output.push_str(&format!("{}\n", root_node));

        let deps = self.dependencies_of(root);
        let mut sections: Vec<(String, Vec<NodeIndex>)> = self
            .group_order
            .iter()
            .map(|g| (g.clone(), Vec::new()))
            .collect();
        for (idx, edge) in &deps {
            let group = edge.group.as_deref().unwrap_or(MAIN_GROUP);
            if let Some((_, list)) = sections.iter_mut().find(|(g, _)| g == group) {
                list.push(*idx);
            }
        }
        sections.retain(|(_, list)| !list.is_empty());

        let show_headers = sections.len() > 1 || sections.iter().any(|(g, _)| g != MAIN_GROUP);
        let mut visited = HashSet::new();
        visited.insert(root);

        let total_sections = sections.len();
        for (section, (group, deps_list)) in sections.iter().enumerate() {
            if show_headers {
                if group == MAIN_GROUP {
                    output.push_str("[dependencies]\n");
                } else {
                    output.push_str(&format!("[group.{group}]\n"));
                }
            }
            let is_last_section = section + 1 == total_sections;
            let count = deps_list.len();
            for (i, idx) in deps_list.iter().enumerate() {
                let is_last = i == count - 1 && is_last_section;
                self.print_subtree(&mut output, *idx, "", is_last, 1, max_depth, &mut visited);
            }
        }

        output
    }

    #[allow(clippy::too_many_arguments)]
    fn print_subtree(
        &self,
        output: &mut String,
        idx: NodeIndex,
        prefix: &str,
        is_last: bool,
        depth: usize,
        max_depth: Option<usize>,
        visited: &mut HashSet<NodeIndex>,
    ) {
        let connector = if is_last { "└── " } else { "├── " };
        let node = &self.graph[idx];
        output.push_str(&format!("{prefix}{connector}{node}\n"));

        if let Some(max) = max_depth {
            if depth >= max {
                return;
            }
        }

        if !visited.insert(idx) {
            return;
        }

        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        let deps = self.dependencies_of(idx);
        let count = deps.len();
        for (i, (child, _)) in deps.iter().enumerate() {
            let is_last = i == count - 1;
            self.print_subtree(
                output,
                *child,
                &child_prefix,
                is_last,
                depth + 1,
                max_depth,
                visited,
            );
        }

        visited.remove(&idx);
    }

    /// Find the path from root to a package.
    pub fn find_path(&self, name: &str) -> Option<Vec<&ResolvedNode>> {
        let root = self.root?;
        let target = self.find(name)?;
        let mut path = Vec::new();
        let mut visited = HashSet::new();
        if self.dfs_path(root, target, &mut path, &mut visited) {
            Some(path.iter().map(|&idx| &self.graph[idx]).collect())
        } else {
            None
        }
    }

    fn dfs_path(
        &self,
        current: NodeIndex,
        target: NodeIndex,
        path: &mut Vec<NodeIndex>,
        visited: &mut HashSet<NodeIndex>,
    ) -> bool {
        path.push(current);
        if current == target {
            return true;
        }
        if !visited.insert(current) {
            path.pop();
            return false;
        }
        for (child, _) in self.dependencies_of(current) {
            if self.dfs_path(child, target, path, visited) {
                return true;
            }
        }
        path.pop();
        visited.remove(&current);
        false
    }

    /// Build an inverted dependency tree (reverse edges) for a single package.
    pub fn print_inverted_tree(&self, name: &str) -> String {
        let mut output = String::new();
        let Some(idx) = self.find(name) else {
            return output;
        };

        let node = &self.graph[idx];
        output.push_str(&format!("{node}\n"));

        let mut visited = HashSet::new();
        visited.insert(idx);

        let dependents = self.dependents_of(idx);
        let count = dependents.len();
        for (i, (dep_idx, _)) in dependents.iter().enumerate() {
            let is_last = i == count - 1;
            self.print_inverted_subtree(&mut output, *dep_idx, "", is_last, &mut visited);
        }

        output
    }

    fn print_inverted_subtree(
        &self,
        output: &mut String,
        idx: NodeIndex,
        prefix: &str,
        is_last: bool,
        visited: &mut HashSet<NodeIndex>,
    ) {
        let connector = if is_last { "└── " } else { "├── " };
        let node = &self.graph[idx];
        output.push_str(&format!("{prefix}{connector}{node}\n"));

        if !visited.insert(idx) {
            return;
        }

        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        let dependents = self.dependents_of(idx);
        let count = dependents.len();
        for (i, (dep_idx, _)) in dependents.iter().enumerate() {
            let is_last = i == count - 1;
            self.print_inverted_subtree(output, *dep_idx, &child_prefix, is_last, visited);
        }

        visited.remove(&idx);
    }

    /// Print every package followed by what depends on it.
    pub fn print_full_inverted_tree(&self) -> String {
        let mut output = String::new();
        let mut nodes: Vec<NodeIndex> = self.index.values().copied().collect();
        nodes.sort_by(|a, b| self.graph[*a].name.cmp(&self.graph[*b].name));

        for idx in nodes {
            let dependents = self.dependents_of(idx);
            if dependents.is_empty() {
                continue;
            }
            output.push_str(&format!("{}\n", self.graph[idx]));
            let count = dependents.len();
            for (i, (dep_idx, _)) in dependents.iter().enumerate() {
                let connector = if i == count - 1 { "└── " } else { "├── " };
                output.push_str(&format!("{connector}{}\n", self.graph[*dep_idx]));
            }
            output.push('\n');
        }

        output
    }

    /// Number of nodes (excluding root).
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}
