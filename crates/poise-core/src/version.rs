//! Package version parsing and ordering.
//!
//! Versions are backed by semver. Parsing is lenient in the ways Python
//! package metadata needs:
//! - Missing components are zero: `3.11` is `3.11.0`
//! - A leading `v` is ignored
//! - PEP 440 compact pre-release tags are accepted and normalized to semver:
//!   `1.0b2` becomes `1.0.0-b.2`, `2.0rc1` becomes `2.0.0-rc.1`
//!
//! Post-releases, dev-releases and local labels (`1.0+cpu`) have no ordering
//! semver can express and are rejected.

use std::fmt;
use std::str::FromStr;

use semver::{BuildMetadata, Prerelease};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use poise_util::errors::PoiseError;

/// A parsed package version.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version(semver::Version);

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self(semver::Version::new(major, minor, patch))
    }

    /// Parse a version string, padding missing components with zero.
    pub fn parse(input: &str) -> Result<Self, PoiseError> {
        parse_with_precision(input).map(|(v, _)| v)
    }

    pub fn major(&self) -> u64 {
        self.0.major
    }

    pub fn minor(&self) -> u64 {
        self.0.minor
    }

    pub fn patch(&self) -> u64 {
        self.0.patch
    }

    pub fn is_prerelease(&self) -> bool {
        !self.0.pre.is_empty()
    }

    pub fn as_semver(&self) -> &semver::Version {
        &self.0
    }

    pub(crate) fn bump_major(&self) -> Result<Self, PoiseError> {
        Ok(Self::new(self.bumped(self.0.major)?, 0, 0))
    }

    pub(crate) fn bump_minor(&self) -> Result<Self, PoiseError> {
        Ok(Self::new(self.0.major, self.bumped(self.0.minor)?, 0))
    }

    pub(crate) fn bump_patch(&self) -> Result<Self, PoiseError> {
        Ok(Self::new(self.0.major, self.0.minor, self.bumped(self.0.patch)?))
    }

    fn bumped(&self, component: u64) -> Result<u64, PoiseError> {
        component.checked_add(1).ok_or_else(|| PoiseError::Parse {
            message: format!("version '{self}' has no upper bound: component {component} is too large"),
        })
    }
}

/// Parse a version and report how many release components were written.
///
/// `^1.2` and `^1.2.0` have different upper bounds, so constraint parsing
/// needs the precision as well as the padded value.
pub(crate) fn parse_with_precision(input: &str) -> Result<(Version, usize), PoiseError> {
    let invalid = |reason: &str| PoiseError::Parse {
        message: format!("invalid version '{input}': {reason}"),
    };

    let trimmed = input.trim();
    let trimmed = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);
    if trimmed.is_empty() {
        return Err(invalid("empty version"));
    }

    if trimmed.contains('+') {
        return Err(invalid("local version labels are not supported"));
    }
    let release_end = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(trimmed.len());
    let (release, suffix) = trimmed.split_at(release_end);
    // `1.0.b2` puts the separator dot on the release side
    let (release, suffix) = match release.strip_suffix('.') {
        Some(r) if !suffix.is_empty() => (r, suffix),
        _ => (release, suffix),
    };

    let mut parts = [0u64; 3];
    let mut count = 0;
    for component in release.split('.') {
        if component.is_empty() {
            return Err(invalid("empty version component"));
        }
        if count == 3 {
            return Err(invalid("more than three release components"));
        }
        parts[count] = component
            .parse()
            .map_err(|_| invalid("version component out of range"))?;
        count += 1;
    }

    let mut version = semver::Version::new(parts[0], parts[1], parts[2]);
    if !suffix.is_empty() {
        version.pre = parse_prerelease(suffix).map_err(|reason| invalid(&reason))?;
    }

    Ok((Version(version), count))
}

fn parse_prerelease(suffix: &str) -> Result<Prerelease, String> {
    if let Some(semver_pre) = suffix.strip_prefix('-') {
        if semver_pre.chars().next().is_some_and(|c| c.is_ascii_alphabetic()) {
            return pep440_prerelease(semver_pre)
                .or_else(|_| Prerelease::new(semver_pre).map_err(|e| e.to_string()));
        }
        return Prerelease::new(semver_pre).map_err(|e| e.to_string());
    }
    let compact = suffix.trim_start_matches(|c: char| c == '.' || c == '_');
    pep440_prerelease(compact)
}

fn pep440_prerelease(text: &str) -> Result<Prerelease, String> {
    let lower = text.to_ascii_lowercase();
    let tag_end = lower
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(lower.len());
    let (tag, rest) = lower.split_at(tag_end);
    let tag = match tag {
        "a" | "alpha" => "a",
        "b" | "beta" => "b",
        "c" | "rc" | "pre" | "preview" => "rc",
        "post" | "rev" | "r" => return Err("post-releases are not supported".to_string()),
        "dev" => return Err("dev-releases are not supported".to_string()),
        _ => return Err(format!("unknown pre-release tag '{text}'")),
    };
    let number = rest.trim_start_matches(|c: char| c == '.' || c == '-' || c == '_');
    let number: u64 = if number.is_empty() {
        0
    } else {
        number
            .parse()
            .map_err(|_| format!("invalid pre-release number in '{text}'"))?
    };
    Prerelease::new(&format!("{tag}.{number}")).map_err(|e| e.to_string())
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Version {
    type Err = PoiseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<semver::Version> for Version {
    fn from(v: semver::Version) -> Self {
        // build metadata would otherwise take part in Eq and Ord
        Self(semver::Version {
            build: BuildMetadata::EMPTY,
            ..v
        })
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Version::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_missing_components() {
        assert_eq!(Version::parse("3.11").unwrap(), Version::new(3, 11, 0));
        assert_eq!(Version::parse("3").unwrap(), Version::new(3, 0, 0));
    }

    #[test]
    fn reports_precision() {
        assert_eq!(parse_with_precision("1.2").unwrap().1, 2);
        assert_eq!(parse_with_precision("1.2.3").unwrap().1, 3);
        assert_eq!(parse_with_precision("0").unwrap().1, 1);
    }

    #[test]
    fn pep440_prerelease_tags() {
        assert_eq!(Version::parse("1.0b2").unwrap().to_string(), "1.0.0-b.2");
        assert_eq!(Version::parse("2.0rc1").unwrap().to_string(), "2.0.0-rc.1");
        assert_eq!(Version::parse("1.0.0a").unwrap().to_string(), "1.0.0-a.0");
        assert_eq!(Version::parse("1.0.beta.3").unwrap().to_string(), "1.0.0-b.3");
        assert!(Version::parse("1.0b2").unwrap().is_prerelease());
    }

    #[test]
    fn semver_prerelease_normalized() {
        let v = Version::parse("1.0.0-beta.2").unwrap();
        assert_eq!(v.to_string(), "1.0.0-b.2");
        let v = Version::parse("1.0.0-0.3.7").unwrap();
        assert_eq!(v.to_string(), "1.0.0-0.3.7");
    }

    #[test]
    fn prerelease_orders_before_release() {
        let a = Version::parse("1.0a1").unwrap();
        let b = Version::parse("1.0b1").unwrap();
        let rc = Version::parse("1.0rc1").unwrap();
        let rel = Version::parse("1.0").unwrap();
        assert!(a < b);
        assert!(b < rc);
        assert!(rc < rel);
    }

    #[test]
    fn rejects_garbage() {
        assert!(Version::parse("").is_err());
        assert!(Version::parse("1..2").is_err());
        assert!(Version::parse("1.2.3.4").is_err());
        assert!(Version::parse("abc").is_err());
        assert!(Version::parse("1.0.post1").is_err());
        assert!(Version::parse("1.0.dev2").is_err());
    }

    #[test]
    fn local_labels_rejected() {
        let err = Version::parse("1.0.0+cpu").unwrap_err();
        assert!(err.to_string().contains("local version labels"));
        let from_semver = Version::from(semver::Version::parse("1.0.0+cpu").unwrap());
        assert_eq!(from_semver, Version::new(1, 0, 0));
        assert_eq!(from_semver.to_string(), "1.0.0");
    }

    #[test]
    fn leading_v_ignored() {
        assert_eq!(Version::parse("v2.1").unwrap(), Version::new(2, 1, 0));
    }

    #[test]
    fn bumps() {
        let v = Version::new(1, 2, 3);
        assert_eq!(v.bump_major().unwrap(), Version::new(2, 0, 0));
        assert_eq!(v.bump_minor().unwrap(), Version::new(1, 3, 0));
        assert_eq!(v.bump_patch().unwrap(), Version::new(1, 2, 4));
    }

    #[test]
    fn bump_overflow_is_an_error() {
        let v = Version::new(u64::MAX, u64::MAX, u64::MAX);
        assert!(matches!(v.bump_major(), Err(PoiseError::Parse { .. })));
        assert!(matches!(v.bump_minor(), Err(PoiseError::Parse { .. })));
        assert!(matches!(v.bump_patch(), Err(PoiseError::Parse { .. })));
        assert!(Version::new(1, u64::MAX, 0).bump_major().is_ok());
    }
}
