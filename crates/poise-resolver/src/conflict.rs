//! Dependency conflict detection and resolution reporting.

use std::fmt;

use poise_core::constraint::Constraint;
use poise_core::name::PackageName;
use poise_core::version::Version;

/// Who asked for a requirement.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Source {
    /// The project manifest itself.
    Root,
    /// A selected release of another package.
    Package { name: PackageName, version: Version },
}

/// One incoming constraint on a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub source: Source,
    pub constraint: Constraint,
}

/// A report of every conflict met while searching, in the order found.
#[derive(Debug, Default, Clone)]
pub struct ConflictReport {
    pub conflicts: Vec<VersionConflict>,
}

/// A reason a branch of the search was abandoned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionConflict {
    pub package: PackageName,
    pub kind: ConflictKind,
    /// Every requirement on `package` at the time of the conflict.
    pub requirements: Vec<Requirement>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictKind {
    /// The incoming ranges share no version.
    Disjoint,
    /// A new requirement excludes the version already selected.
    Excludes { selected: Version },
    /// The ranges overlap but the registry has no release inside them.
    NoMatchingVersion { available: Vec<Version> },
    /// The registry does not know the package, or the selected release.
    Missing { message: String },
}

impl ConflictReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a conflict. The same conflict reached from several branches is kept once.
    pub fn add(&mut self, conflict: VersionConflict) {
        if !self.conflicts.contains(&conflict) {
            self.conflicts.push(conflict);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conflicts.len()
    }

    pub fn has_disjoint(&self) -> bool {
        self.conflicts
            .iter()
            .any(|c| c.kind == ConflictKind::Disjoint)
    }

    /// Only the conflicts of the given shape.
    pub fn disjoint(&self) -> impl Iterator<Item = &VersionConflict> {
        self.conflicts
            .iter()
            .filter(|c| c.kind == ConflictKind::Disjoint)
    }

    /// Conflicts where the registry had nothing to offer.
    pub fn unmatched(&self) -> impl Iterator<Item = &VersionConflict> {
        self.conflicts.iter().filter(|c| {
            matches!(
                c.kind,
                ConflictKind::NoMatchingVersion { .. } | ConflictKind::Missing { .. }
            )
        })
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Root => f.write_str("<root>"),
            Source::Package { name, version } => write!(f, "{name} {version}"),
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} requires {}", self.source, self.constraint)
    }
}

impl fmt::Display for ConflictReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.conflicts.is_empty() {
            return write!(f, "No version conflicts.");
        }
        writeln!(f, "Version conflicts ({}):", self.conflicts.len())?;
        for c in &self.conflicts {
            writeln!(f, "  {c}")?;
        }
        Ok(())
    }
}

impl fmt::Display for VersionConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reqs = self
            .requirements
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        match &self.kind {
            ConflictKind::Disjoint => {
                write!(f, "{}: no version satisfies all of: {reqs}", self.package)
            }
            ConflictKind::Excludes { selected } => {
                write!(f, "{} {selected} was selected but {reqs}", self.package)
            }
            ConflictKind::NoMatchingVersion { available } => {
                let available = if available.is_empty() {
                    "none".to_string()
                } else {
                    available
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(", ")
                };
                write!(
                    f,
                    "{}: no release matches {reqs} (available: {available})",
                    self.package
                )
            }
            ConflictKind::Missing { message } => {
                let sources = self
                    .requirements
                    .iter()
                    .map(|r| r.source.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{message} (required by {sources})")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(source: Source, constraint: &str) -> Requirement {
        Requirement {
            source,
            constraint: Constraint::parse(constraint).unwrap(),
        }
    }

    fn pkg(name: &str, version: &str) -> Source {
        Source::Package {
            name: PackageName::new(name).unwrap(),
            version: Version::parse(version).unwrap(),
        }
    }

    #[test]
    fn empty_report() {
        let report = ConflictReport::new();
        assert!(report.is_empty());
        assert_eq!(report.len(), 0);
        assert_eq!(report.to_string(), "No version conflicts.");
    }

    #[test]
    fn disjoint_names_every_source() {
        let mut report = ConflictReport::new();
        report.add(VersionConflict {
            package: PackageName::new("anyio").unwrap(),
            kind: ConflictKind::Disjoint,
            requirements: vec![
                req(pkg("starlette", "0.27.0"), "^1.0.0"),
                req(pkg("httpx", "0.24.1"), "^2.0.0"),
            ],
        });
        assert!(report.has_disjoint());
        let s = report.to_string();
        assert!(s.starts_with("Version conflicts (1):"));
        assert!(s.contains("starlette 0.27.0 requires ^1.0.0"));
        assert!(s.contains("httpx 0.24.1 requires ^2.0.0"));
    }

    #[test]
    fn duplicate_conflicts_kept_once() {
        let conflict = VersionConflict {
            package: PackageName::new("python").unwrap(),
            kind: ConflictKind::NoMatchingVersion {
                available: vec![Version::new(3, 10, 0)],
            },
            requirements: vec![req(Source::Root, "^3.11")],
        };
        let mut report = ConflictReport::new();
        report.add(conflict.clone());
        report.add(conflict);
        assert_eq!(report.len(), 1);
        assert_eq!(report.unmatched().count(), 1);
        assert!(!report.has_disjoint());
        assert!(report
            .to_string()
            .contains("python: no release matches <root> requires ^3.11 (available: 3.10.0)"));
    }
}
