use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use poise_util::errors::PoiseError;

use crate::constraint::Constraint;
use crate::name::{self, PackageName};

/// Group holding the project's runtime dependencies.
pub const MAIN_GROUP: &str = "main";
/// Group that legacy `[tool.poetry.dev-dependencies]` entries land in.
pub const DEV_GROUP: &str = "dev";

/// A dependency specification as written in `pyproject.toml` or an index file.
///
/// Supports both shorthand (`"^1.2"`) and detailed forms
/// (`{ version = "^1.2", extras = ["standard"] }`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Dependency {
    Short(String),
    Detailed(DetailedDependency),
}

/// A dependency with an explicit version constraint and optional metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DetailedDependency {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub extras: Vec<String>,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub allow_prereleases: bool,
    #[serde(default)]
    pub python: Option<String>,
    #[serde(default)]
    pub markers: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub git: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// A validated dependency declaration: the unit the resolver works with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageDescriptor {
    pub name: PackageName,
    pub constraint: Constraint,
    pub extras: BTreeSet<String>,
    pub group: String,
    pub optional: bool,
    pub allow_prereleases: bool,
    pub python: Option<Constraint>,
}

impl PackageDescriptor {
    /// A plain registry requirement with no extras or flags.
    pub fn new(name: PackageName, constraint: Constraint, group: &str) -> Self {
        Self {
            name,
            constraint,
            extras: BTreeSet::new(),
            group: group.to_string(),
            optional: false,
            allow_prereleases: false,
            python: None,
        }
    }

    /// Validate a raw [`Dependency`] declared under `raw_name` in `group`.
    pub fn from_dependency(raw_name: &str, dep: &Dependency, group: &str) -> Result<Self, PoiseError> {
        let name = PackageName::new(raw_name)?;
        let with_context = |e: PoiseError| PoiseError::Parse {
            message: format!("dependency '{raw_name}' in group '{group}': {e}"),
        };

        match dep {
            Dependency::Short(constraint) => {
                let constraint = Constraint::parse(constraint).map_err(with_context)?;
                Ok(Self::new(name, constraint, group))
            }
            Dependency::Detailed(d) => {
                if let Some(source) = d.path.as_ref().or(d.git.as_ref()).or(d.url.as_ref()) {
                    return Err(PoiseError::Parse {
                        message: format!(
                            "dependency '{raw_name}' uses an unsupported source '{source}': only registry dependencies can be resolved"
                        ),
                    });
                }
                if let Some(markers) = &d.markers {
                    tracing::debug!("ignoring environment markers '{markers}' on '{raw_name}'");
                }
                let constraint = match &d.version {
                    Some(v) => Constraint::parse(v).map_err(with_context)?,
                    None => Constraint::any(),
                };
                let python = d
                    .python
                    .as_deref()
                    .map(Constraint::parse)
                    .transpose()
                    .map_err(with_context)?;
                Ok(Self {
                    name,
                    constraint,
                    extras: d.extras.iter().map(|e| name::normalize(e)).collect(),
                    group: group.to_string(),
                    optional: d.optional,
                    allow_prereleases: d.allow_prereleases,
                    python,
                })
            }
        }
    }
}
