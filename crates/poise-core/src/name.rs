//! Package and extra names.
//!
//! Names compare in their normalized form: lowercase, with every run of
//! `-`, `_` and `.` collapsed to a single `-`. `Flask_SQLAlchemy` and
//! `flask-sqlalchemy` are the same package.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use poise_util::errors::PoiseError;

/// A validated, normalized package name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PackageName(String);

impl PackageName {
    pub fn new(raw: &str) -> Result<Self, PoiseError> {
        validate(raw)?;
        Ok(Self(normalize(raw)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Normalize a package or extra name without validating it.
pub fn normalize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_separator = false;
    for ch in raw.trim().chars() {
        if matches!(ch, '-' | '_' | '.') {
            if !in_separator {
                out.push('-');
                in_separator = true;
            }
        } else {
            out.push(ch.to_ascii_lowercase());
            in_separator = false;
        }
    }
    out
}

fn validate(raw: &str) -> Result<(), PoiseError> {
    let name = raw.trim();
    let valid_char = |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.');
    let starts_ok = name.chars().next().is_some_and(|c| c.is_ascii_alphanumeric());
    let ends_ok = name.chars().last().is_some_and(|c| c.is_ascii_alphanumeric());
    if starts_ok && ends_ok && name.chars().all(valid_char) {
        Ok(())
    } else {
        Err(PoiseError::Parse {
            message: format!("invalid package name '{raw}'"),
        })
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for PackageName {
    type Err = PoiseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl std::borrow::Borrow<str> for PackageName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl Serialize for PackageName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for PackageName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        PackageName::new(&raw).map_err(serde::de::Error::custom)
    }
}
