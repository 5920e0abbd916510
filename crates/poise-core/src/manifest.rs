use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use poise_util::errors::PoiseError;

use crate::constraint::Constraint;
use crate::dependency::{Dependency, PackageDescriptor, DEV_GROUP, MAIN_GROUP};
use crate::name::{self, PackageName};
use crate::version::Version;

/// File name of the manifest Poise reads.
pub const MANIFEST_NAME: &str = "pyproject.toml";

/// The raw shape of a `pyproject.toml` file, before validation.
#[derive(Debug, Clone, Deserialize)]
pub struct PyProject {
    #[serde(default)]
    pub tool: ToolTable,

    #[serde(default, rename = "build-system")]
    pub build_system: Option<BuildSystemTable>,
}

/// The `[tool]` table. Only `[tool.poetry]` is read.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolTable {
    #[serde(default)]
    pub poetry: Option<PoetryTable>,
}

/// Project identity and dependencies from `[tool.poetry]`.
#[derive(Debug, Clone, Deserialize)]
pub struct PoetryTable {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub readme: Option<Readme>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub repository: Option<String>,

    /// Kept as a raw table so declaration order survives.
    #[serde(default)]
    pub dependencies: toml::Table,

    #[serde(default, rename = "dev-dependencies")]
    pub dev_dependencies: toml::Table,

    #[serde(default)]
    pub group: toml::Table,

    #[serde(default)]
    pub extras: BTreeMap<String, Vec<String>>,
}

/// `readme` is either one path or a list of paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Readme {
    Single(String),
    Many(Vec<String>),
}

/// A `[tool.poetry.group.<name>]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupTable {
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub dependencies: toml::Table,
}

/// The `[build-system]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildSystemTable {
    #[serde(default)]
    pub requires: Vec<String>,
    #[serde(default, rename = "build-backend")]
    pub build_backend: Option<String>,
}

/// A validated manifest.
#[derive(Debug, Clone, Serialize)]
pub struct Manifest {
    pub project: ProjectMetadata,
    /// Dependency groups, `main` first, the rest in declaration order.
    pub groups: Vec<DependencyGroup>,
    /// Project extras: extra name to the optional main dependencies it enables.
    pub extras: BTreeMap<String, Vec<PackageName>>,
    pub build_system: Option<BuildSystem>,
}

/// Package identity from `[tool.poetry]`.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectMetadata {
    pub name: PackageName,
    pub version: Version,
    pub description: Option<String>,
    pub authors: Vec<String>,
    pub readme: Vec<String>,
    pub license: Option<String>,
    pub homepage: Option<String>,
    pub repository: Option<String>,
}

/// A named partition of the dependency list.
#[derive(Debug, Clone, Serialize)]
pub struct DependencyGroup {
    pub name: String,
    pub optional: bool,
    pub dependencies: Vec<PackageDescriptor>,
}

/// The build tool requirement and backend entry point.
#[derive(Debug, Clone, Serialize)]
pub struct BuildSystem {
    pub requires: Vec<BuildRequirement>,
    pub backend: Option<String>,
}

/// One `build-system.requires` entry, e.g. `poetry-core>=1.0.0`.
#[derive(Debug, Clone, Serialize)]
pub struct BuildRequirement {
    pub name: PackageName,
    pub constraint: Constraint,
}

impl BuildRequirement {
    /// Parse a PEP 508 requirement string. Extras in brackets and
    /// environment markers after `;` are accepted and dropped.
    pub fn parse(requirement: &str) -> Result<Self, PoiseError> {
        let without_marker = requirement.split(';').next().unwrap_or("").trim();
        let name_end = without_marker
            .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
            .unwrap_or(without_marker.len());
        let (raw_name, rest) = without_marker.split_at(name_end);
        let name = PackageName::new(raw_name).map_err(|e| PoiseError::Parse {
            message: format!("build-system requirement '{requirement}': {e}"),
        })?;

        let mut rest = rest.trim();
        if rest.starts_with('[') {
            let close = rest.find(']').ok_or_else(|| PoiseError::Parse {
                message: format!("build-system requirement '{requirement}': unclosed extras"),
            })?;
            rest = rest[close + 1..].trim();
        }
        let rest = rest
            .strip_prefix('(')
            .and_then(|r| r.strip_suffix(')'))
            .unwrap_or(rest);

        let constraint = Constraint::parse(rest).map_err(|e| PoiseError::Parse {
            message: format!("build-system requirement '{requirement}': {e}"),
        })?;
        Ok(Self { name, constraint })
    }

    /// Import paths this requirement provides: `poetry-core` provides
    /// `poetry.core` and `poetry_core`.
    fn import_paths(&self) -> [String; 2] {
        let name = self.name.as_str();
        [name.replace('-', "."), name.replace('-', "_")]
    }
}

impl BuildSystem {
    /// Whether the backend's module path is provided by one of `requires`.
    pub fn backend_is_resolvable(&self) -> bool {
        let Some(backend) = &self.backend else {
            return true;
        };
        let backend = backend.trim().to_ascii_lowercase();
        let module = backend.split(':').next().unwrap_or("");
        self.requires.iter().any(|req| {
            req.import_paths().iter().any(|path| {
                module == path.as_str()
                    || module
                        .strip_prefix(path.as_str())
                        .is_some_and(|rest| rest.starts_with('.'))
            })
        })
    }
}

impl Manifest {
    /// Load and validate a `pyproject.toml` file from the given path.
    pub fn from_path(path: &Path) -> miette::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| PoiseError::Parse {
            message: format!("Failed to read {}: {e}", path.display()),
        })?;
        Self::from_str(&content)
    }

    /// Parse and validate a manifest from a string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> miette::Result<Self> {
        let raw: PyProject = toml::from_str(content).map_err(|e| PoiseError::Parse {
            message: format!("Failed to parse pyproject.toml: {e}"),
        })?;
        Ok(Self::from_raw(raw)?)
    }

    /// Validate the raw document into a [`Manifest`].
    pub fn from_raw(raw: PyProject) -> Result<Self, PoiseError> {
        let poetry = raw.tool.poetry.ok_or_else(|| PoiseError::Manifest {
            message: "missing [tool.poetry] section".to_string(),
        })?;

        let project = ProjectMetadata {
            name: PackageName::new(&poetry.name)?,
            version: Version::parse(&poetry.version)?,
            description: poetry.description,
            authors: poetry.authors,
            readme: match poetry.readme {
                None => Vec::new(),
                Some(Readme::Single(path)) => vec![path],
                Some(Readme::Many(paths)) => paths,
            },
            license: poetry.license,
            homepage: poetry.homepage,
            repository: poetry.repository,
        };

        let mut groups = vec![DependencyGroup {
            name: MAIN_GROUP.to_string(),
            optional: false,
            dependencies: descriptors(&poetry.dependencies, MAIN_GROUP)?,
        }];

        for (group_name, value) in &poetry.group {
            let group_name = name::normalize(group_name);
            if group_name == MAIN_GROUP {
                return Err(PoiseError::Manifest {
                    message: "the group name 'main' is reserved for [tool.poetry.dependencies]"
                        .to_string(),
                });
            }
            let table: GroupTable = value.clone().try_into().map_err(|e| PoiseError::Parse {
                message: format!("invalid group '{group_name}': {e}"),
            })?;
            groups.push(DependencyGroup {
                dependencies: descriptors(&table.dependencies, &group_name)?,
                name: group_name,
                optional: table.optional,
            });
        }

        if !poetry.dev_dependencies.is_empty() {
            let legacy = descriptors(&poetry.dev_dependencies, DEV_GROUP)?;
            match groups.iter_mut().find(|g| g.name == DEV_GROUP) {
                Some(dev) => dev.dependencies.extend(legacy),
                None => groups.push(DependencyGroup {
                    name: DEV_GROUP.to_string(),
                    optional: false,
                    dependencies: legacy,
                }),
            }
        }

        for group in &groups {
            check_unique_names(group)?;
            if group.name != MAIN_GROUP {
                if let Some(dep) = group.dependencies.iter().find(|d| d.optional) {
                    return Err(PoiseError::Manifest {
                        message: format!(
                            "dependency '{}' in group '{}' is optional; only main dependencies can be optional",
                            dep.name, group.name
                        ),
                    });
                }
            }
        }

        let extras = validate_extras(&poetry.extras, &groups[0])?;

        let build_system = raw
            .build_system
            .map(|bs| -> Result<BuildSystem, PoiseError> {
                let requires = bs
                    .requires
                    .iter()
                    .map(|r| BuildRequirement::parse(r))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(BuildSystem {
                    requires,
                    backend: bs.build_backend,
                })
            })
            .transpose()?;

        if let Some(bs) = &build_system {
            if !bs.backend_is_resolvable() {
                return Err(PoiseError::Manifest {
                    message: format!(
                        "build-backend '{}' is not provided by any build-system requirement",
                        bs.backend.as_deref().unwrap_or_default()
                    ),
                });
            }
        } else {
            tracing::warn!("pyproject.toml has no [build-system] table");
        }

        Ok(Self {
            project,
            groups,
            extras,
            build_system,
        })
    }

    pub fn group(&self, name: &str) -> Option<&DependencyGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn main(&self) -> &DependencyGroup {
        &self.groups[0]
    }

    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|g| g.name.as_str())
    }

    /// The project's own interpreter constraint (the `python` main dependency).
    pub fn python_constraint(&self) -> Option<&Constraint> {
        self.main()
            .dependencies
            .iter()
            .find(|d| d.name.as_str() == "python")
            .map(|d| &d.constraint)
    }

    /// SHA-256 over a canonical rendering of everything that affects
    /// resolution: groups, descriptors and extras. Declaration order does
    /// not matter.
    pub fn content_hash(&self) -> String {
        let groups: BTreeMap<&str, (bool, BTreeMap<&str, &PackageDescriptor>)> = self
            .groups
            .iter()
            .map(|g| {
                let deps = g
                    .dependencies
                    .iter()
                    .map(|d| (d.name.as_str(), d))
                    .collect();
                (g.name.as_str(), (g.optional, deps))
            })
            .collect();
        let canonical = serde_json::json!({
            "groups": groups,
            "extras": self.extras,
        });
        poise_util::hash::sha256_hex([canonical.to_string().as_bytes()])
    }
}

fn descriptors(table: &toml::Table, group: &str) -> Result<Vec<PackageDescriptor>, PoiseError> {
    table
        .iter()
        .map(|(raw_name, value)| {
            let dep: Dependency = value.clone().try_into().map_err(|e| PoiseError::Parse {
                message: format!("dependency '{raw_name}' in group '{group}': {e}"),
            })?;
            PackageDescriptor::from_dependency(raw_name, &dep, group)
        })
        .collect()
}

fn check_unique_names(group: &DependencyGroup) -> Result<(), PoiseError> {
    let mut seen = BTreeSet::new();
    for dep in &group.dependencies {
        if !seen.insert(dep.name.as_str()) {
            return Err(PoiseError::Manifest {
                message: format!(
                    "package '{}' is declared more than once in group '{}'",
                    dep.name, group.name
                ),
            });
        }
    }
    Ok(())
}

fn validate_extras(
    raw: &BTreeMap<String, Vec<String>>,
    main: &DependencyGroup,
) -> Result<BTreeMap<String, Vec<PackageName>>, PoiseError> {
    let mut extras = BTreeMap::new();
    let mut referenced = BTreeSet::new();

    for (extra, members) in raw {
        let mut names = Vec::with_capacity(members.len());
        for member in members {
            let member_name = PackageName::new(member)?;
            let declared = main.dependencies.iter().find(|d| d.name == member_name);
            match declared {
                Some(d) if d.optional => {}
                Some(_) => {
                    return Err(PoiseError::Manifest {
                        message: format!(
                            "extra '{extra}' lists '{member_name}', which is not marked optional"
                        ),
                    })
                }
                None => {
                    return Err(PoiseError::Manifest {
                        message: format!(
                            "extra '{extra}' lists '{member_name}', which is not a main dependency"
                        ),
                    })
                }
            }
            referenced.insert(member_name.clone());
            names.push(member_name);
        }
        extras.insert(name::normalize(extra), names);
    }

    for dep in main.dependencies.iter().filter(|d| d.optional) {
        if !referenced.contains(&dep.name) {
            tracing::warn!(
                "optional dependency '{}' is not enabled by any extra and will never be resolved",
                dep.name
            );
        }
    }

    Ok(extras)
}
