//! Version constraints: Poetry-style range expressions parsed into sets of
//! disjoint intervals.
//!
//! Supported forms: `*`, `^1.2.3`, `~1.2`, `~=1.2`, `1.2.*`, `==1.2.3`,
//! `!=1.2.3`, `>=`, `>`, `<=`, `<`, bare versions (exact), comma or whitespace
//! separated intersections and `||` unions.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use poise_util::errors::PoiseError;

use crate::version::{parse_with_precision, Version};

/// One end of an interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bound {
    Unbounded,
    Included(Version),
    Excluded(Version),
}

impl Bound {
    fn version(&self) -> Option<&Version> {
        match self {
            Bound::Unbounded => None,
            Bound::Included(v) | Bound::Excluded(v) => Some(v),
        }
    }
}

/// Order two lower bounds by where the interval starts.
fn cmp_lower(a: &Bound, b: &Bound) -> Ordering {
    match (a, b) {
        (Bound::Unbounded, Bound::Unbounded) => Ordering::Equal,
        (Bound::Unbounded, _) => Ordering::Less,
        (_, Bound::Unbounded) => Ordering::Greater,
        (Bound::Included(x), Bound::Included(y)) | (Bound::Excluded(x), Bound::Excluded(y)) => {
            x.cmp(y)
        }
        (Bound::Included(x), Bound::Excluded(y)) => x.cmp(y).then(Ordering::Less),
        (Bound::Excluded(x), Bound::Included(y)) => x.cmp(y).then(Ordering::Greater),
    }
}

/// Order two upper bounds by where the interval ends.
fn cmp_upper(a: &Bound, b: &Bound) -> Ordering {
    match (a, b) {
        (Bound::Unbounded, Bound::Unbounded) => Ordering::Equal,
        (Bound::Unbounded, _) => Ordering::Greater,
        (_, Bound::Unbounded) => Ordering::Less,
        (Bound::Included(x), Bound::Included(y)) | (Bound::Excluded(x), Bound::Excluded(y)) => {
            x.cmp(y)
        }
        (Bound::Included(x), Bound::Excluded(y)) => x.cmp(y).then(Ordering::Greater),
        (Bound::Excluded(x), Bound::Included(y)) => x.cmp(y).then(Ordering::Less),
    }
}

/// A contiguous range of versions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interval {
    pub lower: Bound,
    pub upper: Bound,
}

impl Interval {
    pub fn new(lower: Bound, upper: Bound) -> Self {
        Self { lower, upper }
    }

    pub fn any() -> Self {
        Self::new(Bound::Unbounded, Bound::Unbounded)
    }

    pub fn exact(version: Version) -> Self {
        Self::new(Bound::Included(version.clone()), Bound::Included(version))
    }

    /// `[lower, upper)`, the shape of caret, tilde and wildcard ranges.
    pub fn half_open(lower: Version, upper: Version) -> Self {
        Self::new(Bound::Included(lower), Bound::Excluded(upper))
    }

    pub fn is_empty(&self) -> bool {
        match (&self.lower, &self.upper) {
            (Bound::Unbounded, _) | (_, Bound::Unbounded) => false,
            (Bound::Included(lo), Bound::Included(hi)) => lo > hi,
            (lo, hi) => match (lo.version(), hi.version()) {
                (Some(lo), Some(hi)) => lo >= hi,
                _ => false,
            },
        }
    }

    pub fn contains(&self, version: &Version) -> bool {
        let above_lower = match &self.lower {
            Bound::Unbounded => true,
            Bound::Included(lo) => version >= lo,
            Bound::Excluded(lo) => version > lo,
        };
        let below_upper = match &self.upper {
            Bound::Unbounded => true,
            Bound::Included(hi) => version <= hi,
            Bound::Excluded(hi) => version < hi,
        };
        above_lower && below_upper
    }

    fn intersect(&self, other: &Interval) -> Interval {
        let lower = if cmp_lower(&self.lower, &other.lower) == Ordering::Less {
            other.lower.clone()
        } else {
            self.lower.clone()
        };
        let upper = if cmp_upper(&self.upper, &other.upper) == Ordering::Greater {
            other.upper.clone()
        } else {
            self.upper.clone()
        };
        Interval { lower, upper }
    }

    /// Whether `next` (which starts no earlier than `self`) touches or
    /// overlaps `self`, so the two can be merged.
    fn connects(&self, next: &Interval) -> bool {
        match (self.upper.version(), next.lower.version()) {
            (None, _) | (_, None) => true,
            (Some(hi), Some(lo)) => match lo.cmp(hi) {
                Ordering::Less => true,
                Ordering::Greater => false,
                Ordering::Equal => !matches!(
                    (&self.upper, &next.lower),
                    (Bound::Excluded(_), Bound::Excluded(_))
                ),
            },
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.lower, &self.upper) {
            (Bound::Unbounded, Bound::Unbounded) => f.write_str("*"),
            (Bound::Included(lo), Bound::Included(hi)) if lo == hi => write!(f, "=={lo}"),
            (lower, upper) => {
                let lower = match lower {
                    Bound::Unbounded => None,
                    Bound::Included(v) => Some(format!(">={v}")),
                    Bound::Excluded(v) => Some(format!(">{v}")),
                };
                let upper = match upper {
                    Bound::Unbounded => None,
                    Bound::Included(v) => Some(format!("<={v}")),
                    Bound::Excluded(v) => Some(format!("<{v}")),
                };
                let parts: Vec<String> = lower.into_iter().chain(upper).collect();
                f.write_str(&parts.join(","))
            }
        }
    }
}

/// A normalized union of disjoint, sorted, non-empty intervals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionSet {
    intervals: Vec<Interval>,
}

impl VersionSet {
    pub fn any() -> Self {
        Self {
            intervals: vec![Interval::any()],
        }
    }

    pub fn empty() -> Self {
        Self {
            intervals: Vec::new(),
        }
    }

    pub fn exact(version: Version) -> Self {
        Self {
            intervals: vec![Interval::exact(version)],
        }
    }

    /// Build a set from arbitrary intervals, dropping empty ones and merging
    /// overlapping or adjacent ones.
    pub fn from_intervals(intervals: impl IntoIterator<Item = Interval>) -> Self {
        let mut items: Vec<Interval> = intervals.into_iter().filter(|i| !i.is_empty()).collect();
        items.sort_by(|a, b| cmp_lower(&a.lower, &b.lower));

        let mut merged: Vec<Interval> = Vec::with_capacity(items.len());
        for item in items {
            match merged.last_mut() {
                Some(last) if last.connects(&item) => {
                    if cmp_upper(&item.upper, &last.upper) == Ordering::Greater {
                        last.upper = item.upper;
                    }
                }
                _ => merged.push(item),
            }
        }
        Self { intervals: merged }
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn is_any(&self) -> bool {
        matches!(
            self.intervals.as_slice(),
            [Interval {
                lower: Bound::Unbounded,
                upper: Bound::Unbounded
            }]
        )
    }

    pub fn contains(&self, version: &Version) -> bool {
        self.intervals.iter().any(|i| i.contains(version))
    }

    pub fn intersect(&self, other: &VersionSet) -> VersionSet {
        let mut pieces = Vec::new();
        for a in &self.intervals {
            for b in &other.intervals {
                pieces.push(a.intersect(b));
            }
        }
        VersionSet::from_intervals(pieces)
    }

    pub fn union(&self, other: &VersionSet) -> VersionSet {
        VersionSet::from_intervals(
            self.intervals
                .iter()
                .chain(other.intervals.iter())
                .cloned(),
        )
    }
}

impl fmt::Display for VersionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.intervals.is_empty() {
            return f.write_str("<empty>");
        }
        let parts: Vec<String> = self.intervals.iter().map(|i| i.to_string()).collect();
        f.write_str(&parts.join(" || "))
    }
}

/// A parsed version constraint, keeping the text it was written as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    raw: String,
    set: VersionSet,
    mentions_prerelease: bool,
}

impl Constraint {
    pub fn any() -> Self {
        Self {
            raw: "*".to_string(),
            set: VersionSet::any(),
            mentions_prerelease: false,
        }
    }

    pub fn exact(version: Version) -> Self {
        Self {
            raw: format!("=={version}"),
            mentions_prerelease: version.is_prerelease(),
            set: VersionSet::exact(version),
        }
    }

    /// Parse a constraint expression. A constraint that no version can
    /// satisfy is rejected.
    pub fn parse(input: &str) -> Result<Self, PoiseError> {
        let raw = input.trim();
        let mut mentions_prerelease = false;
        let mut set = VersionSet::empty();

        let normalized = raw.replace("||", "|");
        for alternative in normalized.split('|') {
            let alt = parse_conjunction(raw, alternative, &mut mentions_prerelease)?;
            set = set.union(&alt);
        }

        if set.is_empty() {
            return Err(PoiseError::Parse {
                message: format!("constraint '{raw}' matches no version"),
            });
        }

        Ok(Self {
            raw: if raw.is_empty() { "*".to_string() } else { raw.to_string() },
            set,
            mentions_prerelease,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn set(&self) -> &VersionSet {
        &self.set
    }

    pub fn is_any(&self) -> bool {
        self.set.is_any()
    }

    pub fn contains(&self, version: &Version) -> bool {
        self.set.contains(version)
    }

    /// Whether `version` satisfies this constraint under the pre-release
    /// policy: pre-releases only match when allowed or named by the
    /// constraint itself.
    pub fn allows(&self, version: &Version, allow_prereleases: bool) -> bool {
        if version.is_prerelease() && !(allow_prereleases || self.mentions_prerelease) {
            return false;
        }
        self.set.contains(version)
    }

    pub fn mentions_prerelease(&self) -> bool {
        self.mentions_prerelease
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl std::str::FromStr for Constraint {
    type Err = PoiseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Constraint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for Constraint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Constraint::parse(&raw).map_err(serde::de::Error::custom)
    }
}

const OPERATORS: [&str; 10] = ["~=", "==", "!=", ">=", "<=", "^", "~", ">", "<", "="];

fn parse_conjunction(
    whole: &str,
    text: &str,
    mentions_prerelease: &mut bool,
) -> Result<VersionSet, PoiseError> {
    let mut set = VersionSet::any();
    let mut saw_clause = false;

    for piece in text.split(',') {
        // Operators may be separated from their version by whitespace: `>= 1.2 < 2`
        let mut clauses: Vec<String> = Vec::new();
        let mut pending_op: Option<&str> = None;
        for token in piece.split_whitespace() {
            if OPERATORS.contains(&token) {
                if pending_op.is_some() {
                    return Err(bad_constraint(whole, "operator without a version"));
                }
                pending_op = Some(token);
            } else if let Some(op) = pending_op.take() {
                clauses.push(format!("{op}{token}"));
            } else {
                clauses.push(token.to_string());
            }
        }
        if pending_op.is_some() {
            return Err(bad_constraint(whole, "operator without a version"));
        }

        for clause in clauses {
            saw_clause = true;
            set = set.intersect(&parse_clause(whole, &clause, mentions_prerelease)?);
        }
    }

    if !saw_clause && !whole.is_empty() {
        return Err(bad_constraint(whole, "empty alternative"));
    }
    Ok(set)
}

fn parse_clause(
    whole: &str,
    clause: &str,
    mentions_prerelease: &mut bool,
) -> Result<VersionSet, PoiseError> {
    if clause == "*" {
        return Ok(VersionSet::any());
    }

    let (op, rest) = OPERATORS
        .iter()
        .find_map(|op| clause.strip_prefix(op).map(|rest| (*op, rest.trim())))
        .unwrap_or(("", clause));

    if let Some(prefix) = rest.strip_suffix(".*").or(if rest == "*" { Some("") } else { None }) {
        let range = wildcard(whole, prefix)?;
        return match op {
            "" | "==" | "=" => Ok(range),
            "!=" => Ok(complement(&range)),
            _ => Err(bad_constraint(whole, "wildcards only combine with == and !=")),
        };
    }

    let (version, precision) = parse_with_precision(rest)?;
    if version.is_prerelease() {
        *mentions_prerelease = true;
    }

    let set = match op {
        "" | "==" | "=" => VersionSet::exact(version),
        "!=" => VersionSet::from_intervals([
            Interval::new(Bound::Unbounded, Bound::Excluded(version.clone())),
            Interval::new(Bound::Excluded(version), Bound::Unbounded),
        ]),
        ">=" => VersionSet::from_intervals([Interval::new(
            Bound::Included(version),
            Bound::Unbounded,
        )]),
        ">" => VersionSet::from_intervals([Interval::new(
            Bound::Excluded(version),
            Bound::Unbounded,
        )]),
        "<=" => VersionSet::from_intervals([Interval::new(
            Bound::Unbounded,
            Bound::Included(version),
        )]),
        "<" => VersionSet::from_intervals([Interval::new(
            Bound::Unbounded,
            Bound::Excluded(version),
        )]),
        "^" => {
            let upper = caret_upper(&version, precision)?;
            VersionSet::from_intervals([Interval::half_open(version, upper)])
        }
        "~" => {
            let upper = if precision == 1 {
                version.bump_major()?
            } else {
                version.bump_minor()?
            };
            VersionSet::from_intervals([Interval::half_open(version, upper)])
        }
        "~=" => {
            let upper = match precision {
                1 => {
                    return Err(bad_constraint(
                        whole,
                        "~= needs at least two version components",
                    ))
                }
                2 => version.bump_major()?,
                _ => version.bump_minor()?,
            };
            VersionSet::from_intervals([Interval::half_open(version, upper)])
        }
        _ => return Err(bad_constraint(whole, "unknown operator")),
    };
    Ok(set)
}

/// Upper bound of a caret range: bump the leftmost non-zero component that
/// was written, or the last written one when all are zero.
fn caret_upper(version: &Version, precision: usize) -> Result<Version, PoiseError> {
    if version.major() > 0 || precision == 1 {
        version.bump_major()
    } else if version.minor() > 0 || precision == 2 {
        version.bump_minor()
    } else {
        version.bump_patch()
    }
}

fn wildcard(whole: &str, prefix: &str) -> Result<VersionSet, PoiseError> {
    if prefix.is_empty() {
        return Ok(VersionSet::any());
    }
    let (version, precision) = parse_with_precision(prefix)?;
    if version.is_prerelease() {
        return Err(bad_constraint(whole, "wildcards cannot carry a pre-release tag"));
    }
    let upper = match precision {
        1 => version.bump_major()?,
        2 => version.bump_minor()?,
        _ => return Err(bad_constraint(whole, "wildcard after a full version")),
    };
    Ok(VersionSet::from_intervals([Interval::half_open(
        version, upper,
    )]))
}

fn complement(set: &VersionSet) -> VersionSet {
    let mut pieces = Vec::new();
    let mut cursor = Bound::Unbounded;
    for interval in set.intervals() {
        let upper = match &interval.lower {
            Bound::Unbounded => None,
            Bound::Included(v) => Some(Bound::Excluded(v.clone())),
            Bound::Excluded(v) => Some(Bound::Included(v.clone())),
        };
        if let Some(upper) = upper {
            pieces.push(Interval::new(cursor.clone(), upper));
        }
        cursor = match &interval.upper {
            Bound::Unbounded => return VersionSet::from_intervals(pieces),
            Bound::Included(v) => Bound::Excluded(v.clone()),
            Bound::Excluded(v) => Bound::Included(v.clone()),
        };
    }
    pieces.push(Interval::new(cursor, Bound::Unbounded));
    VersionSet::from_intervals(pieces)
}

fn bad_constraint(whole: &str, reason: &str) -> PoiseError {
    PoiseError::Parse {
        message: format!("invalid constraint '{whole}': {reason}"),
    }
}
