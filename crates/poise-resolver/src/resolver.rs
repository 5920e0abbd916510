//! Core dependency resolution algorithm: range intersection with
//! backtracking search, extras activation, group selection and lock
//! preferences.
//!
//! The search keeps a partial solution holding, for every package seen so
//! far, the requirements placed on it, the intersection of their ranges and
//! the selected version once one is chosen. Each step picks the undecided
//! package with the fewest candidates, tries its candidates in preference
//! order and recurses on a copy of the state, so abandoning a branch is just
//! dropping the copy.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use poise_core::config::{ResolverConfig, Strategy, DEFAULT_MAX_ATTEMPTS};
use poise_core::constraint::VersionSet;
use poise_core::dependency::{PackageDescriptor, MAIN_GROUP};
use poise_core::lockfile::Lockfile;
use poise_core::manifest::Manifest;
use poise_core::name::{self, PackageName};
use poise_core::version::Version;
use poise_registry::{PackageRelease, Registry};
use poise_util::errors::PoiseError;

use crate::cache::RegistryCache;
use crate::conflict::{ConflictKind, ConflictReport, Requirement, Source, VersionConflict};
use crate::graph::{DepEdge, DependencyGraph, ResolvedNode};

/// The interpreter package. Its candidates are ordered by series, see [`order_candidates`].
pub const INTERPRETER: &str = "python";

/// What to resolve and how to rank candidates.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Groups besides `main` to include.
    pub groups: BTreeSet<String>,
    /// Project extras to activate.
    pub extras: BTreeSet<String>,
    pub strategy: Strategy,
    pub allow_prereleases: bool,
    /// Candidate evaluations allowed before the search gives up.
    pub max_attempts: usize,
    /// Versions tried before any other candidate, usually from a previous lock.
    pub preferred: BTreeMap<PackageName, Version>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            groups: BTreeSet::new(),
            extras: BTreeSet::new(),
            strategy: Strategy::Newest,
            allow_prereleases: false,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            preferred: BTreeMap::new(),
        }
    }
}

impl ResolveOptions {
    pub fn from_config(config: &ResolverConfig) -> Self {
        Self {
            strategy: config.strategy,
            allow_prereleases: config.allow_prereleases,
            max_attempts: config.max_attempts,
            ..Self::default()
        }
    }

    pub fn with_group(mut self, group: &str) -> Self {
        self.groups.insert(name::normalize(group));
        self
    }

    pub fn with_extra(mut self, extra: &str) -> Self {
        self.extras.insert(name::normalize(extra));
        self
    }

    /// Include every group the manifest declares.
    pub fn with_all_groups(mut self, manifest: &Manifest) -> Self {
        self.groups.extend(
            manifest
                .group_names()
                .filter(|g| *g != MAIN_GROUP)
                .map(str::to_string),
        );
        self
    }
}

/// Which locked versions an update releases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update {
    /// Keep every locked version that still fits.
    Nothing,
    /// Ignore the lock entirely.
    All,
    /// Release these packages and their locked subtrees.
    Packages(BTreeSet<PackageName>),
}

/// The output of dependency resolution.
#[derive(Debug)]
pub struct ResolutionResult {
    pub packages: BTreeMap<PackageName, ResolvedPackage>,
    pub graph: DependencyGraph,
    /// Conflicts met on branches the search abandoned.
    pub conflicts: ConflictReport,
    pub attempts: usize,
}

/// One selected package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPackage {
    pub name: PackageName,
    pub version: Version,
    pub extras: BTreeSet<String>,
    /// Manifest groups through which this package is reached.
    pub groups: BTreeSet<String>,
    pub dependencies: Vec<(PackageName, Version)>,
}

impl ResolutionResult {
    pub fn version_of(&self, name: &str) -> Option<&Version> {
        self.packages.get(name).map(|p| &p.version)
    }

    /// The `name -> version` mapping.
    pub fn versions(&self) -> BTreeMap<&str, &Version> {
        self.packages
            .iter()
            .map(|(n, p)| (n.as_str(), &p.version))
            .collect()
    }
}

/// Why resolution failed.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// Declared ranges for one package share no version.
    #[error("{report}")]
    Conflict { report: ConflictReport },

    /// A package does not exist, or no release matches its range.
    #[error("{message}")]
    NotFound { message: String },

    #[error("gave up after {attempts} attempts\n{report}")]
    Exhausted {
        attempts: usize,
        report: ConflictReport,
    },

    #[error("unknown dependency group '{0}'")]
    UnknownGroup(String),

    #[error("unknown extra '{0}'")]
    UnknownExtra(String),

    #[error(transparent)]
    Registry(PoiseError),
}

impl From<ResolveError> for PoiseError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::Conflict { report } => PoiseError::Conflict {
                message: report.to_string().trim_end().to_string(),
            },
            ResolveError::NotFound { message } => PoiseError::NotFound { message },
            e @ ResolveError::Exhausted { .. } => PoiseError::Resolution {
                message: e.to_string().trim_end().to_string(),
            },
            e @ (ResolveError::UnknownGroup(_) | ResolveError::UnknownExtra(_)) => {
                PoiseError::Manifest {
                    message: e.to_string(),
                }
            }
            ResolveError::Registry(e) => e,
        }
    }
}

/// Resolve the selected groups of `manifest` against `registry`.
pub fn resolve(
    manifest: &Manifest,
    registry: &dyn Registry,
    options: &ResolveOptions,
) -> Result<ResolutionResult, ResolveError> {
    for group in &options.groups {
        if manifest.group(group).is_none() {
            return Err(ResolveError::UnknownGroup(group.clone()));
        }
    }
    let mut enabled: BTreeSet<&PackageName> = BTreeSet::new();
    for extra in &options.extras {
        let members = manifest
            .extras
            .get(extra)
            .ok_or_else(|| ResolveError::UnknownExtra(extra.clone()))?;
        enabled.extend(members);
    }

    let python = manifest.python_constraint().map(|c| c.set().clone());
    let mut search = Search::new(registry, options, python);
    let mut state = PartialSolution::default();

    for group in &manifest.groups {
        if group.name != MAIN_GROUP && !options.groups.contains(&group.name) {
            continue;
        }
        for dep in &group.dependencies {
            if dep.optional && !enabled.contains(&dep.name) {
                continue;
            }
            if !search.applies(dep) {
                tracing::debug!("skipping {}: python restriction does not overlap", dep.name);
                continue;
            }
            if !search.add_requirement(&mut state, Source::Root, dep, Some(&group.name))? {
                return Err(search.failure());
            }
        }
    }

    match search.solve(state)? {
        Some(solution) => {
            tracing::debug!(
                "resolved {} packages in {} attempts ({} registry queries)",
                solution.packages.len(),
                search.attempts,
                search.cache.misses()
            );
            Ok(search.finish(manifest, solution))
        }
        None => Err(search.failure()),
    }
}

/// Locked versions to prefer, minus everything `update` releases.
///
/// A direct requirement whose range no longer admits its locked version is
/// released too, together with its locked subtree, so a changed manifest
/// entry re-resolves everything below it.
pub fn locked_preferences(
    manifest: &Manifest,
    lockfile: Option<&Lockfile>,
    update: &Update,
) -> BTreeMap<PackageName, Version> {
    let lf = match (lockfile, update) {
        (Some(lf), Update::Nothing | Update::Packages(_)) => lf,
        _ => return BTreeMap::new(),
    };

    let mut roots: Vec<PackageName> = match update {
        Update::Packages(names) => names.iter().cloned().collect(),
        _ => Vec::new(),
    };
    for dep in manifest.groups.iter().flat_map(|g| &g.dependencies) {
        match lf.locked_version(dep.name.as_str()) {
            Some(v) if dep.constraint.contains(v) => {}
            _ => roots.push(dep.name.clone()),
        }
    }

    let stale = compute_stale(lf, roots);
    lf.package
        .iter()
        .filter(|p| !stale.contains(&p.name))
        .map(|p| (p.name.clone(), p.version.clone()))
        .collect()
}

/// Walk the lock's dependency references from `roots` and collect every
/// package reached.
fn compute_stale(lf: &Lockfile, roots: Vec<PackageName>) -> HashSet<PackageName> {
    let mut stale = HashSet::new();
    let mut visit_queue: VecDeque<PackageName> = roots.into_iter().collect();
    while let Some(name) = visit_queue.pop_front() {
        if !stale.insert(name.clone()) {
            continue;
        }
        if let Some(pkg) = lf.find(name.as_str()) {
            for dep in &pkg.dependencies {
                if !stale.contains(&dep.name) {
                    visit_queue.push_back(dep.name.clone());
                }
            }
        }
    }
    stale
}

/// Sort candidates best first.
///
/// Under [`Strategy::Newest`] the interpreter is the exception: a project
/// must work on the lowest interpreter series it admits, so series are tried
/// oldest first with the newest patch of each series first.
pub fn order_candidates(name: &PackageName, candidates: &mut [Version], strategy: Strategy) {
    match strategy {
        Strategy::Oldest => candidates.sort(),
        Strategy::Newest if name.as_str() == INTERPRETER => candidates.sort_by(|a, b| {
            (a.major(), a.minor())
                .cmp(&(b.major(), b.minor()))
                .then_with(|| b.cmp(a))
        }),
        Strategy::Newest => candidates.sort_by(|a, b| b.cmp(a)),
    }
}

#[derive(Debug, Clone, Default)]
struct PartialSolution {
    packages: BTreeMap<PackageName, PackageState>,
    edges: Vec<EdgeRecord>,
}

#[derive(Debug, Clone)]
struct PackageState {
    requirements: Vec<Requirement>,
    range: VersionSet,
    prereleases: bool,
    extras: BTreeSet<String>,
    selected: Option<Version>,
}

impl PackageState {
    fn new() -> Self {
        Self {
            requirements: Vec::new(),
            range: VersionSet::any(),
            prereleases: false,
            extras: BTreeSet::new(),
            selected: None,
        }
    }
}

/// `from` is `None` for the project itself.
#[derive(Debug, Clone, PartialEq, Eq)]
struct EdgeRecord {
    from: Option<PackageName>,
    to: PackageName,
    group: Option<String>,
    extras: BTreeSet<String>,
}

struct Search<'r> {
    cache: RegistryCache<'r>,
    options: &'r ResolveOptions,
    python: Option<VersionSet>,
    report: ConflictReport,
    attempts: usize,
    warned: HashSet<(PackageName, String)>,
}

impl<'r> Search<'r> {
    fn new(registry: &'r dyn Registry, options: &'r ResolveOptions, python: Option<VersionSet>) -> Self {
        Self {
            cache: RegistryCache::new(registry),
            options,
            python,
            report: ConflictReport::new(),
            attempts: 0,
            warned: HashSet::new(),
        }
    }

    /// Whether a dependency's `python` restriction overlaps the project's.
    fn applies(&self, dep: &PackageDescriptor) -> bool {
        match (&dep.python, &self.python) {
            (Some(restriction), Some(project)) => !restriction.set().intersect(project).is_empty(),
            _ => true,
        }
    }

    /// Record `dep` as a requirement from `source`. Returns `false` when the
    /// current branch can no longer succeed.
    fn add_requirement(
        &mut self,
        state: &mut PartialSolution,
        source: Source,
        dep: &PackageDescriptor,
        group: Option<&str>,
    ) -> Result<bool, ResolveError> {
        let name = dep.name.clone();
        let edge = EdgeRecord {
            from: match &source {
                Source::Root => None,
                Source::Package { name, .. } => Some(name.clone()),
            },
            to: name.clone(),
            group: group.map(str::to_string),
            extras: dep.extras.clone(),
        };
        if !state.edges.contains(&edge) {
            state.edges.push(edge);
        }

        let entry = state.packages.entry(name.clone()).or_insert_with(PackageState::new);
        let requirement = Requirement {
            source: source.clone(),
            constraint: dep.constraint.clone(),
        };
        if !entry.requirements.contains(&requirement) {
            entry.requirements.push(requirement);
        }
        entry.range = entry.range.intersect(dep.constraint.set());
        entry.prereleases |= dep.allow_prereleases || dep.constraint.mentions_prerelease();

        if entry.range.is_empty() {
            tracing::debug!("{name}: requirements are disjoint");
            self.report.add(VersionConflict {
                package: name,
                kind: ConflictKind::Disjoint,
                requirements: entry.requirements.clone(),
            });
            return Ok(false);
        }

        let new_extras: Vec<String> = dep.extras.difference(&entry.extras).cloned().collect();
        entry.extras.extend(new_extras.iter().cloned());

        let Some(selected) = entry.selected.clone() else {
            return Ok(true);
        };
        if !entry.range.contains(&selected) {
            tracing::debug!("{name} {selected} is excluded by {source}");
            self.report.add(VersionConflict {
                package: name,
                kind: ConflictKind::Excludes { selected },
                requirements: entry.requirements.clone(),
            });
            return Ok(false);
        }
        if new_extras.is_empty() {
            return Ok(true);
        }

        let release = self
            .cache
            .release(&name, &selected)
            .map_err(ResolveError::Registry)?;
        let deps = self.extra_dependencies(&release, &new_extras);
        let source = Source::Package {
            name,
            version: selected,
        };
        self.add_all(state, &source, &deps)
    }

    fn add_all(
        &mut self,
        state: &mut PartialSolution,
        source: &Source,
        deps: &[PackageDescriptor],
    ) -> Result<bool, ResolveError> {
        for dep in deps {
            if !self.applies(dep) {
                tracing::debug!("skipping {} from {source}: python restriction does not overlap", dep.name);
                continue;
            }
            if !self.add_requirement(state, source.clone(), dep, None)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Optional dependencies enabled by `extras` on `release`. Unknown
    /// extras are reported once and skipped.
    fn extra_dependencies(&mut self, release: &PackageRelease, extras: &[String]) -> Vec<PackageDescriptor> {
        let mut deps = Vec::new();
        for extra in extras {
            match release.extra_dependencies(extra) {
                Some(found) => deps.extend(found.into_iter().cloned()),
                None => {
                    if self.warned.insert((release.name.clone(), extra.clone())) {
                        tracing::warn!(
                            "{} {} does not provide the extra '{extra}'",
                            release.name,
                            release.version
                        );
                    }
                }
            }
        }
        deps
    }

    /// Select `version` for `name` and add the release's requirements.
    fn decide(
        &mut self,
        state: &mut PartialSolution,
        name: &PackageName,
        version: &Version,
    ) -> Result<bool, ResolveError> {
        let release = match self.cache.release(name, version) {
            Ok(release) => release,
            Err(PoiseError::NotFound { message }) => {
                self.record_missing(name, state, message);
                return Ok(false);
            }
            Err(other) => return Err(ResolveError::Registry(other)),
        };
        let extras: Vec<String> = match state.packages.get_mut(name) {
            Some(pkg) => {
                pkg.selected = Some(version.clone());
                pkg.extras.iter().cloned().collect()
            }
            None => Vec::new(),
        };

        let mut deps: Vec<PackageDescriptor> = release.required().cloned().collect();
        deps.extend(self.extra_dependencies(&release, &extras));
        let source = Source::Package {
            name: name.clone(),
            version: version.clone(),
        };
        self.add_all(state, &source, &deps)
    }

    /// Registry versions inside the package's range, best first.
    fn candidates(&self, name: &PackageName, pkg: &PackageState) -> Result<Vec<Version>, PoiseError> {
        let all = self.cache.versions(name)?;
        let allow_pre = self.options.allow_prereleases || pkg.prereleases;
        let mut candidates: Vec<Version> = all
            .iter()
            .filter(|v| pkg.range.contains(v) && (allow_pre || !v.is_prerelease()))
            .cloned()
            .collect();
        order_candidates(name, &mut candidates, self.options.strategy);

        if let Some(preferred) = self.options.preferred.get(name) {
            if let Some(pos) = candidates.iter().position(|v| v == preferred) {
                let v = candidates.remove(pos);
                candidates.insert(0, v);
            }
        }
        Ok(candidates)
    }

    /// A registry miss fails the current branch only. It becomes an error
    /// once no branch succeeds, see [`Search::failure`].
    fn record_missing(&mut self, name: &PackageName, state: &PartialSolution, message: String) {
        tracing::debug!("{name}: {message}");
        self.report.add(VersionConflict {
            package: name.clone(),
            kind: ConflictKind::Missing { message },
            requirements: state
                .packages
                .get(name)
                .map(|p| p.requirements.clone())
                .unwrap_or_default(),
        });
    }

    fn solve(&mut self, state: PartialSolution) -> Result<Option<PartialSolution>, ResolveError> {
        let mut next: Option<(PackageName, Vec<Version>)> = None;
        for (name, pkg) in state.packages.iter().filter(|(_, p)| p.selected.is_none()) {
            let candidates = match self.candidates(name, pkg) {
                Ok(candidates) => candidates,
                Err(PoiseError::NotFound { message }) => {
                    self.record_missing(name, &state, message);
                    return Ok(None);
                }
                Err(other) => return Err(ResolveError::Registry(other)),
            };
            if candidates.is_empty() {
                let available = self
                    .cache
                    .versions(name)
                    .map(|v| v.to_vec())
                    .unwrap_or_default();
                tracing::debug!("{name}: no release inside {}", pkg.range);
                self.report.add(VersionConflict {
                    package: name.clone(),
                    kind: ConflictKind::NoMatchingVersion { available },
                    requirements: pkg.requirements.clone(),
                });
                return Ok(None);
            }
            if next
                .as_ref()
                .map_or(true, |(_, best)| candidates.len() < best.len())
            {
                next = Some((name.clone(), candidates));
            }
        }

        let Some((name, candidates)) = next else {
            return Ok(Some(state));
        };

        for version in candidates {
            self.attempts += 1;
            if self.attempts > self.options.max_attempts {
                return Err(ResolveError::Exhausted {
                    attempts: self.options.max_attempts,
                    report: self.report.clone(),
                });
            }
            tracing::debug!("trying {name} {version}");
            let mut branch = state.clone();
            if !self.decide(&mut branch, &name, &version)? {
                tracing::debug!("backtracking from {name} {version}");
                continue;
            }
            if let Some(solution) = self.solve(branch)? {
                return Ok(Some(solution));
            }
            tracing::debug!("backtracking from {name} {version}");
        }
        Ok(None)
    }

    /// The error for a search that found no solution.
    fn failure(&self) -> ResolveError {
        if self.report.has_disjoint() {
            let mut report = ConflictReport::new();
            for c in self.report.disjoint() {
                report.add(c.clone());
            }
            return ResolveError::Conflict { report };
        }
        let unmatched: Vec<String> = self.report.unmatched().map(ToString::to_string).collect();
        if !unmatched.is_empty() {
            return ResolveError::NotFound {
                message: unmatched.join("; "),
            };
        }
        ResolveError::Conflict {
            report: self.report.clone(),
        }
    }

    fn finish(self, manifest: &Manifest, solution: PartialSolution) -> ResolutionResult {
        let mut graph = DependencyGraph::new();
        let root = graph.add_root(ResolvedNode {
            name: manifest.project.name.to_string(),
            version: manifest.project.version.to_string(),
            extras: self.options.extras.iter().cloned().collect(),
        });

        let selected: BTreeMap<&PackageName, &Version> = solution
            .packages
            .iter()
            .filter_map(|(n, p)| p.selected.as_ref().map(|v| (n, v)))
            .collect();

        for (name, pkg) in &solution.packages {
            if let Some(version) = &pkg.selected {
                graph.add_node(ResolvedNode {
                    name: name.to_string(),
                    version: version.to_string(),
                    extras: pkg.extras.iter().cloned().collect(),
                });
            }
        }

        let mut dependencies: BTreeMap<&PackageName, BTreeSet<(PackageName, Version)>> = BTreeMap::new();
        for edge in &solution.edges {
            let from = match &edge.from {
                None => Some(root),
                Some(n) => graph.find(n.as_str()),
            };
            let (Some(from), Some(to)) = (from, graph.find(edge.to.as_str())) else {
                continue;
            };
            graph.add_edge(
                from,
                to,
                DepEdge {
                    group: edge.group.clone(),
                    extras: edge.extras.iter().cloned().collect(),
                },
            );
            if let (Some(parent), Some(version)) = (&edge.from, selected.get(&edge.to)) {
                dependencies
                    .entry(parent)
                    .or_default()
                    .insert((edge.to.clone(), (*version).clone()));
            }
        }

        let reach = graph.group_reachability();
        let packages = solution
            .packages
            .iter()
            .filter_map(|(name, pkg)| {
                let version = pkg.selected.clone()?;
                Some((
                    name.clone(),
                    ResolvedPackage {
                        name: name.clone(),
                        version,
                        extras: pkg.extras.clone(),
                        groups: reach.get(name.as_str()).cloned().unwrap_or_default(),
                        dependencies: dependencies
                            .get(name)
                            .map(|d| d.iter().cloned().collect())
                            .unwrap_or_default(),
                    },
                ))
            })
            .collect();

        ResolutionResult {
            packages,
            graph,
            conflicts: self.report,
            attempts: self.attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use poise_core::lockfile::{LockMetadata, LockedDependencyRef, LockedPackage, LOCK_VERSION};
    use poise_registry::MemoryRegistry;

    fn manifest(deps: &str) -> Manifest {
        Manifest::from_str(&format!(
            r#"
[tool.poetry]
name = "app"
version = "0.1.0"

{deps}
"#
        ))
        .unwrap()
    }

    fn registry(index: &str) -> MemoryRegistry {
        MemoryRegistry::from_toml(index).unwrap()
    }

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn n(s: &str) -> PackageName {
        PackageName::new(s).unwrap()
    }

    fn names(result: &ResolutionResult) -> Vec<&str> {
        result.packages.keys().map(|k| k.as_str()).collect()
    }

    const PYTHON: &str = r#"
[[package]]
name = "python"
version = "3.10.0"

[[package]]
name = "python"
version = "3.11.4"

[[package]]
name = "python"
version = "3.12.0"
"#;

    #[test]
    fn pins_resolve_to_exact_versions() {
        let m = manifest(
            r#"
[tool.poetry.dependencies]
fastapi = "0.95.2"
pymongo = "==4.3.3"
"#,
        );
        let r = registry(
            r#"
[[package]]
name = "fastapi"
version = "0.95.2"

[[package]]
name = "fastapi"
version = "0.96.0"

[[package]]
name = "pymongo"
version = "4.3.3"

[[package]]
name = "pymongo"
version = "4.4.0"
"#,
        );
        let result = resolve(&m, &r, &ResolveOptions::default()).unwrap();
        assert_eq!(result.version_of("fastapi"), Some(&v("0.95.2")));
        assert_eq!(result.version_of("pymongo"), Some(&v("4.3.3")));
        assert_eq!(result.packages.len(), 2);
    }

    #[test]
    fn python_caret_selects_lowest_series_newest_patch() {
        let m = manifest("[tool.poetry.dependencies]\npython = \"^3.11\"\n");
        let result = resolve(&m, &registry(PYTHON), &ResolveOptions::default()).unwrap();
        assert_eq!(result.version_of("python"), Some(&v("3.11.4")));
    }

    #[test]
    fn newest_satisfying_version_is_default() {
        let m = manifest("[tool.poetry.dependencies]\nidna = \"^3.0\"\n");
        let r = MemoryRegistry::new()
            .with_versions("idna", &["2.10", "3.3", "3.4"])
            .unwrap();
        let result = resolve(&m, &r, &ResolveOptions::default()).unwrap();
        assert_eq!(result.version_of("idna"), Some(&v("3.4")));
    }

    #[test]
    fn oldest_strategy() {
        let m = manifest("[tool.poetry.dependencies]\nidna = \"^3.0\"\n");
        let r = MemoryRegistry::new()
            .with_versions("idna", &["2.10", "3.3", "3.4"])
            .unwrap();
        let options = ResolveOptions {
            strategy: Strategy::Oldest,
            ..ResolveOptions::default()
        };
        let result = resolve(&m, &r, &options).unwrap();
        assert_eq!(result.version_of("idna"), Some(&v("3.3")));
    }

    #[test]
    fn disjoint_transitive_ranges_name_both_sources() {
        let m = manifest(
            r#"
[tool.poetry.dependencies]
starlette = "^1.0"
httpx = "^1.0"
"#,
        );
        let r = registry(
            r#"
[[package]]
name = "starlette"
version = "1.0.0"
dependencies = { anyio = "^1.0.0" }

[[package]]
name = "httpx"
version = "1.0.0"
dependencies = { anyio = "^2.0.0" }

[[package]]
name = "anyio"
version = "1.0.0"

[[package]]
name = "anyio"
version = "2.0.0"
"#,
        );
        let err = resolve(&m, &r, &ResolveOptions::default()).unwrap_err();
        let ResolveError::Conflict { report } = &err else {
            panic!("expected conflict, got {err:?}");
        };
        let conflict = report.disjoint().next().unwrap();
        assert_eq!(conflict.package.as_str(), "anyio");
        let message = err.to_string();
        assert!(message.contains("starlette 1.0.0 requires ^1.0.0"));
        assert!(message.contains("httpx 1.0.0 requires ^2.0.0"));

        let poise: PoiseError = err.into();
        assert!(matches!(poise, PoiseError::Conflict { .. }));
    }

    #[test]
    fn disjoint_root_ranges_across_groups() {
        let m = manifest(
            r#"
[tool.poetry.dependencies]
httpx = "^0.23"

[tool.poetry.group.dev.dependencies]
httpx = "^0.24"
"#,
        );
        let r = MemoryRegistry::new()
            .with_versions("httpx", &["0.23.0", "0.24.1"])
            .unwrap();
        assert!(resolve(&m, &r, &ResolveOptions::default()).is_ok());
        let err = resolve(&m, &r, &ResolveOptions::default().with_group("dev")).unwrap_err();
        assert!(matches!(err, ResolveError::Conflict { .. }));
    }

    #[test]
    fn backtracks_to_older_candidate() {
        let m = manifest(
            r#"
[tool.poetry.dependencies]
fastapi = "^0.95"
pydantic = "^1.10"
"#,
        );
        let r = registry(
            r#"
[[package]]
name = "fastapi"
version = "0.95.1"
dependencies = { pydantic = ">=1.6,<2.0" }

[[package]]
name = "fastapi"
version = "0.95.2"
dependencies = { pydantic = ">=2.0" }

[[package]]
name = "pydantic"
version = "1.10.7"

[[package]]
name = "pydantic"
version = "2.0.0"
"#,
        );
        let result = resolve(&m, &r, &ResolveOptions::default()).unwrap();
        assert_eq!(result.version_of("fastapi"), Some(&v("0.95.1")));
        assert_eq!(result.version_of("pydantic"), Some(&v("1.10.7")));
        assert!(result.conflicts.has_disjoint());
    }

    #[test]
    fn unknown_package_is_not_found() {
        let m = manifest("[tool.poetry.dependencies]\nflask = \"^2.0\"\n");
        let err = resolve(&m, &MemoryRegistry::new(), &ResolveOptions::default()).unwrap_err();
        let ResolveError::NotFound { message } = &err else {
            panic!("expected not found, got {err:?}");
        };
        assert!(message.contains("flask"));
        assert!(message.contains("required by <root>"));
    }

    #[test]
    fn unknown_transitive_package_backtracks() {
        let m = manifest("[tool.poetry.dependencies]\nfastapi = \"*\"\n");
        let r = registry(
            r#"
[[package]]
name = "fastapi"
version = "0.95.1"

[[package]]
name = "fastapi"
version = "0.95.2"
dependencies = { ghost = "^1.0" }
"#,
        );
        let result = resolve(&m, &r, &ResolveOptions::default()).unwrap();
        assert_eq!(result.version_of("fastapi"), Some(&v("0.95.1")));
        assert!(result.version_of("ghost").is_none());
        assert_eq!(result.conflicts.unmatched().count(), 1);
    }

    #[test]
    fn unknown_transitive_package_everywhere_is_not_found() {
        let m = manifest("[tool.poetry.dependencies]\nfastapi = \"*\"\n");
        let r = registry(
            r#"
[[package]]
name = "fastapi"
version = "0.95.1"
dependencies = { ghost = "^1.0" }

[[package]]
name = "fastapi"
version = "0.95.2"
dependencies = { ghost = "^1.0" }
"#,
        );
        let err = resolve(&m, &r, &ResolveOptions::default()).unwrap_err();
        let ResolveError::NotFound { message } = &err else {
            panic!("expected not found, got {err:?}");
        };
        assert!(message.contains("ghost"));
        assert!(message.contains("fastapi 0.95.2"));
        assert!(message.contains("fastapi 0.95.1"));
    }

    #[test]
    fn range_without_release_is_not_found() {
        let m = manifest("[tool.poetry.dependencies]\npython = \"^3.13\"\n");
        let err = resolve(&m, &registry(PYTHON), &ResolveOptions::default()).unwrap_err();
        assert!(matches!(err, ResolveError::NotFound { .. }));
        assert!(err
            .to_string()
            .contains("available: 3.10.0, 3.11.4, 3.12.0"));
    }

    #[test]
    fn dev_group_only_when_requested() {
        let m = manifest(
            r#"
[tool.poetry.dependencies]
fastapi = "*"

[tool.poetry.group.dev.dependencies]
pytest = "*"
"#,
        );
        let r = MemoryRegistry::new()
            .with_versions("fastapi", &["0.95.2"])
            .unwrap()
            .with_versions("pytest", &["7.3.1"])
            .unwrap();

        let main_only = resolve(&m, &r, &ResolveOptions::default()).unwrap();
        assert_eq!(names(&main_only), vec!["fastapi"]);

        let with_dev = resolve(&m, &r, &ResolveOptions::default().with_group("dev")).unwrap();
        assert_eq!(names(&with_dev), vec!["fastapi", "pytest"]);
        assert!(with_dev.packages[&n("pytest")].groups.contains("dev"));

        let all = resolve(&m, &r, &ResolveOptions::default().with_all_groups(&m)).unwrap();
        assert_eq!(all.packages.len(), 2);
    }

    #[test]
    fn unknown_group_rejected() {
        let m = manifest("[tool.poetry.dependencies]\n");
        let err = resolve(&m, &MemoryRegistry::new(), &ResolveOptions::default().with_group("docs"))
            .unwrap_err();
        assert!(matches!(err, ResolveError::UnknownGroup(_)));
    }

    const UVICORN: &str = r#"
[[package]]
name = "uvicorn"
version = "0.22.0"
dependencies = { click = ">=7.0", websockets = { version = ">=10.4", optional = true } }
extras = { standard = ["websockets"] }

[[package]]
name = "click"
version = "8.1.3"

[[package]]
name = "websockets"
version = "11.0.3"
"#;

    #[test]
    fn package_extras_pull_optional_dependencies() {
        let with = manifest(
            "[tool.poetry.dependencies]\nuvicorn = { version = \"^0.22\", extras = [\"standard\"] }\n",
        );
        let without = manifest("[tool.poetry.dependencies]\nuvicorn = \"^0.22\"\n");
        let r = registry(UVICORN);

        let result = resolve(&with, &r, &ResolveOptions::default()).unwrap();
        assert_eq!(names(&result), vec!["click", "uvicorn", "websockets"]);
        assert!(result.packages[&n("uvicorn")].extras.contains("standard"));

        let result = resolve(&without, &r, &ResolveOptions::default()).unwrap();
        assert_eq!(names(&result), vec!["click", "uvicorn"]);
    }

    #[test]
    fn extra_requested_after_selection_adds_dependencies() {
        let m = manifest(
            r#"
[tool.poetry.dependencies]
uvicorn = "^0.22"
worker-shim = "^1.0"
"#,
        );
        let r = registry(&format!(
            r#"{UVICORN}
[[package]]
name = "worker-shim"
version = "1.0.0"
dependencies = {{ uvicorn = {{ version = "^0.22", extras = ["standard"] }} }}
"#
        ));
        let result = resolve(&m, &r, &ResolveOptions::default()).unwrap();
        assert!(result.packages.contains_key("websockets"));
    }

    #[test]
    fn unknown_package_extra_is_ignored() {
        let m = manifest(
            "[tool.poetry.dependencies]\nuvicorn = { version = \"^0.22\", extras = [\"turbo\"] }\n",
        );
        let result = resolve(&m, &registry(UVICORN), &ResolveOptions::default()).unwrap();
        assert_eq!(names(&result), vec!["click", "uvicorn"]);
    }

    #[test]
    fn project_extras_enable_optional_dependencies() {
        let m = manifest(
            r#"
[tool.poetry.dependencies]
pymongo = "^4.3"
dnspython = { version = "^2.3", optional = true }

[tool.poetry.extras]
srv = ["dnspython"]
"#,
        );
        let r = MemoryRegistry::new()
            .with_versions("pymongo", &["4.3.3"])
            .unwrap()
            .with_versions("dnspython", &["2.3.0"])
            .unwrap();

        let plain = resolve(&m, &r, &ResolveOptions::default()).unwrap();
        assert_eq!(names(&plain), vec!["pymongo"]);

        let srv = resolve(&m, &r, &ResolveOptions::default().with_extra("srv")).unwrap();
        assert_eq!(names(&srv), vec!["dnspython", "pymongo"]);

        let err = resolve(&m, &r, &ResolveOptions::default().with_extra("tls")).unwrap_err();
        assert!(matches!(err, ResolveError::UnknownExtra(_)));
    }

    #[test]
    fn python_restricted_dependency_skipped() {
        let m = manifest(
            r#"
[tool.poetry.dependencies]
python = "^3.11"
tomli = { version = "^2.0", python = "<3.11" }
"#,
        );
        let result = resolve(&m, &registry(PYTHON), &ResolveOptions::default()).unwrap();
        assert_eq!(names(&result), vec!["python"]);
    }

    #[test]
    fn prereleases_excluded_unless_allowed() {
        let m = manifest("[tool.poetry.dependencies]\npydantic = \">=1.10\"\n");
        let r = MemoryRegistry::new()
            .with_versions("pydantic", &["1.10.7", "2.0b3"])
            .unwrap();

        let result = resolve(&m, &r, &ResolveOptions::default()).unwrap();
        assert_eq!(result.version_of("pydantic"), Some(&v("1.10.7")));

        let options = ResolveOptions {
            allow_prereleases: true,
            ..ResolveOptions::default()
        };
        let result = resolve(&m, &r, &options).unwrap();
        assert_eq!(result.version_of("pydantic"), Some(&v("2.0b3")));

        let m = manifest("[tool.poetry.dependencies]\npydantic = \">=2.0b1\"\n");
        let result = resolve(&m, &r, &ResolveOptions::default()).unwrap();
        assert_eq!(result.version_of("pydantic"), Some(&v("2.0b3")));
    }

    #[test]
    fn preferred_version_tried_first() {
        let m = manifest("[tool.poetry.dependencies]\nidna = \"^3.0\"\n");
        let r = MemoryRegistry::new()
            .with_versions("idna", &["3.3", "3.4"])
            .unwrap();
        let mut options = ResolveOptions::default();
        options.preferred.insert(n("idna"), v("3.3"));
        let result = resolve(&m, &r, &options).unwrap();
        assert_eq!(result.version_of("idna"), Some(&v("3.3")));
    }

    #[test]
    fn attempt_budget_exhausted() {
        let m = manifest(
            r#"
[tool.poetry.dependencies]
fastapi = "^0.95"
pydantic = "^1.10"
"#,
        );
        let r = registry(
            r#"
[[package]]
name = "fastapi"
version = "0.95.1"

[[package]]
name = "fastapi"
version = "0.95.2"
dependencies = { pydantic = ">=2.0" }

[[package]]
name = "pydantic"
version = "1.10.7"
"#,
        );
        let options = ResolveOptions {
            max_attempts: 2,
            ..ResolveOptions::default()
        };
        let err = resolve(&m, &r, &options).unwrap_err();
        assert!(matches!(err, ResolveError::Exhausted { attempts: 2, .. }));
    }

    #[test]
    fn graph_and_groups_reflect_solution() {
        let m = manifest(
            r#"
[tool.poetry.dependencies]
fastapi = "*"

[tool.poetry.group.dev.dependencies]
httpx = "*"
"#,
        );
        let r = registry(
            r#"
[[package]]
name = "fastapi"
version = "0.95.2"
dependencies = { anyio = "*" }

[[package]]
name = "httpx"
version = "0.24.1"
dependencies = { anyio = "*" }

[[package]]
name = "anyio"
version = "3.7.0"
"#,
        );
        let result = resolve(&m, &r, &ResolveOptions::default().with_group("dev")).unwrap();
        let anyio = &result.packages[&n("anyio")];
        assert_eq!(
            anyio.groups,
            BTreeSet::from(["dev".to_string(), "main".to_string()])
        );
        assert_eq!(
            result.packages[&n("fastapi")].dependencies,
            vec![(n("anyio"), v("3.7.0"))]
        );
        let tree = result.graph.print_tree(None);
        assert!(tree.starts_with("app 0.1.0\n"));
        assert!(tree.contains("[group.dev]"));
    }

    #[test]
    fn interpreter_ordering() {
        let mut c = vec![v("3.10.0"), v("3.11.4"), v("3.11.2"), v("3.12.0")];
        order_candidates(&n("python"), &mut c, Strategy::Newest);
        assert_eq!(c, vec![v("3.10.0"), v("3.11.4"), v("3.11.2"), v("3.12.0")]);
        order_candidates(&n("idna"), &mut c, Strategy::Newest);
        assert_eq!(c[0], v("3.12.0"));
    }

    fn lock(packages: Vec<LockedPackage>) -> Lockfile {
        Lockfile {
            package: packages,
            metadata: LockMetadata {
                lock_version: LOCK_VERSION.to_string(),
                content_hash: String::new(),
                groups: vec!["main".to_string()],
            },
        }
    }

    fn locked(name: &str, version: &str, deps: &[(&str, &str)]) -> LockedPackage {
        LockedPackage {
            name: n(name),
            version: v(version),
            groups: vec!["main".to_string()],
            extras: vec![],
            dependencies: deps
                .iter()
                .map(|(dn, dv)| LockedDependencyRef {
                    name: n(dn),
                    version: v(dv),
                })
                .collect(),
        }
    }

    #[test]
    fn lock_preferences_keep_fitting_versions() {
        let m = manifest("[tool.poetry.dependencies]\nfastapi = \"^0.95\"\n");
        let lf = lock(vec![
            locked("fastapi", "0.95.1", &[("starlette", "0.26.1")]),
            locked("starlette", "0.26.1", &[]),
        ]);
        let prefs = locked_preferences(&m, Some(&lf), &Update::Nothing);
        assert_eq!(prefs.get("fastapi"), Some(&v("0.95.1")));
        assert_eq!(prefs.get("starlette"), Some(&v("0.26.1")));

        assert!(locked_preferences(&m, Some(&lf), &Update::All).is_empty());
        assert!(locked_preferences(&m, None, &Update::Nothing).is_empty());
    }

    #[test]
    fn changed_direct_constraint_releases_subtree() {
        let m = manifest("[tool.poetry.dependencies]\nfastapi = \"^0.96\"\nclick = \"*\"\n");
        let lf = lock(vec![
            locked("fastapi", "0.95.1", &[("starlette", "0.26.1")]),
            locked("starlette", "0.26.1", &[]),
            locked("click", "8.1.3", &[]),
        ]);
        let prefs = locked_preferences(&m, Some(&lf), &Update::Nothing);
        assert!(prefs.get("fastapi").is_none());
        assert!(prefs.get("starlette").is_none());
        assert_eq!(prefs.get("click"), Some(&v("8.1.3")));
    }

    #[test]
    fn updating_named_package_releases_it() {
        let m = manifest("[tool.poetry.dependencies]\nclick = \"*\"\nidna = \"*\"\n");
        let lf = lock(vec![locked("click", "8.1.3", &[]), locked("idna", "3.3", &[])]);
        let update = Update::Packages(BTreeSet::from([n("idna")]));
        let prefs = locked_preferences(&m, Some(&lf), &update);
        assert!(prefs.contains_key("click"));
        assert!(!prefs.contains_key("idna"));
    }
}
