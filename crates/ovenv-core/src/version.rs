//! Dotted version identifiers with numeric ordering
//!
//! Odoo releases ("17.0") and Python interpreters ("3.10.4") are identified
//! by plain dotted release numbers. Comparing them lexically gives wrong
//! answers (`"10.0" < "9.0"` as strings), so this module parses them into
//! numeric segments and compares componentwise.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// A parsed dotted version identifier.
///
/// Only release segments are modelled: every dot-separated component must be
/// a non-negative integer. Missing trailing components compare as zero, so
/// `3.10` equals `3.10.0`. Equality and hashing follow the same padded
/// comparison as [`Ord`].
#[derive(Debug, Clone)]
pub struct Version {
    segments: Vec<u64>,
}

impl Version {
    /// Parse a dotted version string, returning `None` when any component
    /// is not a plain non-negative integer.
    pub fn parse(s: &str) -> Option<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return None;
        }
        let segments = trimmed
            .split('.')
            .map(|part| part.parse::<u64>().ok())
            .collect::<Option<Vec<u64>>>()?;
        Some(Self { segments })
    }

    /// The release segments of this version.
    pub fn segments(&self) -> &[u64] {
        &self.segments
    }

    /// The smallest version excluded by a compatible-release clause
    /// anchored at `self`: the second-to-last segment bumped by one with
    /// everything after it dropped (`1.4.5` -> `1.5`, `2.2` -> `3`).
    ///
    /// Returns `None` for single-segment versions, which cannot anchor a
    /// compatible-release clause.
    pub fn compatible_release_bound(&self) -> Option<Self> {
        if self.segments.len() < 2 {
            return None;
        }
        let mut segments = self.segments[..self.segments.len() - 1].to_vec();
        if let Some(last) = segments.last_mut() {
            *last += 1;
        }
        Some(Self { segments })
    }

    /// The version with its last segment bumped by one: the exclusive upper
    /// bound of a `==X.Y.*` wildcard anchored at `X.Y` (`2.1` -> `2.2`).
    pub fn bumped_last(&self) -> Self {
        let mut segments = self.segments.clone();
        if let Some(last) = segments.last_mut() {
            *last += 1;
        }
        Self { segments }
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Trailing zero segments do not participate in comparison, so they
        // must not participate in the hash either.
        let significant = self
            .segments
            .iter()
            .rposition(|&segment| segment != 0)
            .map_or(0, |i| i + 1);
        self.segments[..significant].hash(state);
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        for i in 0..len {
            let a = self.segments.get(i).copied().unwrap_or(0);
            let b = other.segments.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => {}
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for Version {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or(())
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for segment in &self.segments {
            if !first {
                write!(f, ".")?;
            }
            write!(f, "{}", segment)?;
            first = false;
        }
        Ok(())
    }
}
