//! Requirement line parsing and version specifier sets
//!
//! Parses the common shape of a requirements-file line:
//!
//! ```text
//! name[extra1,extra2] >=1.0, <2.0 ; python_version < "3.8"
//! ```
//!
//! This is not a full PEP 508 implementation. URL requirements
//! (`name @ https://...`) and other exotic forms are rejected so that the
//! line processor can fall back to emitting them verbatim.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};
use crate::version::Version;

/// Leading package name, as in the permissive fallback pattern.
static NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*").expect("valid regex"));

/// One comparison clause of a specifier set.
static CLAUSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(===|==|!=|<=|>=|~=|<|>)\s*([A-Za-z0-9!+*._-]+)$").expect("valid regex")
});

/// Normalize a package name per the registry convention: case-fold and
/// collapse runs of `-`, `_` and `.` into a single `-`.
pub fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_was_sep = false;
    for ch in name.trim().chars() {
        if matches!(ch, '-' | '_' | '.') {
            if !last_was_sep {
                out.push('-');
            }
            last_was_sep = true;
        } else {
            out.push(ch.to_ascii_lowercase());
            last_was_sep = false;
        }
    }
    out
}

/// A version comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    /// `~=`, compatible release
    Compatible,
    /// `===`, arbitrary string equality
    Arbitrary,
}

impl CompareOp {
    fn parse(op: &str) -> Option<Self> {
        match op {
            "<" => Some(Self::Lt),
            "<=" => Some(Self::Le),
            ">" => Some(Self::Gt),
            ">=" => Some(Self::Ge),
            "==" => Some(Self::Eq),
            "!=" => Some(Self::Ne),
            "~=" => Some(Self::Compatible),
            "===" => Some(Self::Arbitrary),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Compatible => "~=",
            Self::Arbitrary => "===",
        }
    }
}

/// One version constraint clause, e.g. `>=1.0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Specifier {
    pub op: CompareOp,
    /// Raw version text as written, possibly with a trailing `.*` wildcard.
    pub version: String,
}

impl Specifier {
    fn is_wildcard(&self) -> bool {
        self.version.ends_with(".*")
    }

    /// The clause version parsed as a dotted release, wildcard suffix
    /// stripped. `None` for non-release versions (`1.0b1`, local tags).
    fn release(&self) -> Option<Version> {
        let text = self.version.strip_suffix(".*").unwrap_or(&self.version);
        Version::parse(text)
    }
}

impl fmt::Display for Specifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.op.as_str(), self.version)
    }
}

/// An ordered conjunction of specifier clauses. Empty means "any version".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecifierSet {
    clauses: Vec<Specifier>,
}

/// Lower/upper release bounds implied by a specifier set, used for range
/// containment checks. `None` on a side means unbounded.
#[derive(Debug, Default)]
struct Bounds {
    lower: Option<(Version, bool)>,
    upper: Option<(Version, bool)>,
    /// Set when an `==` clause pins an exact release.
    exact: Option<Version>,
    /// A clause whose version could not be read as a release; bounds
    /// derived from the rest are unreliable for containment proofs.
    opaque: bool,
}

impl SpecifierSet {
    /// Parse a comma-separated specifier set, e.g. `>=1.0, <2.0`.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        // PEP 508 permits wrapping the whole set in parentheses.
        let trimmed = trimmed
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
            .map_or(trimmed, str::trim);
        if trimmed.is_empty() {
            return Ok(Self::default());
        }
        let mut clauses = Vec::new();
        for part in trimmed.split(',') {
            let part = part.trim();
            let captures = CLAUSE.captures(part).ok_or_else(|| {
                Error::invalid_requirement(text, format!("bad specifier clause '{part}'"))
            })?;
            let (_, [op, version]) = captures.extract();
            let op = CompareOp::parse(op)
                .ok_or_else(|| Error::invalid_requirement(text, "unknown comparator"))?;
            clauses.push(Specifier {
                op,
                version: version.to_string(),
            });
        }
        Ok(Self { clauses })
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn clauses(&self) -> &[Specifier] {
        &self.clauses
    }

    /// Whether every version satisfying `self` also satisfies `other`.
    ///
    /// Conservative: when containment cannot be proven (wildcards mixed with
    /// odd clauses, unparseable versions), the answer is `false`. An empty
    /// `self` ("any version") is only contained in an empty `other`.
    pub fn is_subset_of(&self, other: &SpecifierSet) -> bool {
        let bounds = self.bounds();
        other.clauses.iter().all(|clause| bounds.implies(clause))
    }

    fn bounds(&self) -> Bounds {
        let mut bounds = Bounds::default();
        for clause in &self.clauses {
            let Some(version) = clause.release() else {
                bounds.opaque = true;
                continue;
            };
            match clause.op {
                CompareOp::Gt => bounds.raise_lower(version, false),
                CompareOp::Ge => bounds.raise_lower(version, true),
                CompareOp::Lt => bounds.drop_upper(version, false),
                CompareOp::Le => bounds.drop_upper(version, true),
                CompareOp::Eq if !clause.is_wildcard() => {
                    bounds.raise_lower(version.clone(), true);
                    bounds.drop_upper(version.clone(), true);
                    bounds.exact = Some(version);
                }
                CompareOp::Eq => {
                    // ==X.Y.* confines to [X.Y, X.Y+1)
                    let limit = version.bumped_last();
                    bounds.raise_lower(version, true);
                    bounds.drop_upper(limit, false);
                }
                CompareOp::Compatible => {
                    if let Some(limit) = version.compatible_release_bound() {
                        bounds.raise_lower(version, true);
                        bounds.drop_upper(limit, false);
                    } else {
                        bounds.opaque = true;
                    }
                }
                // Exclusions and arbitrary equality do not tighten bounds.
                CompareOp::Ne | CompareOp::Arbitrary => {}
            }
        }
        bounds
    }
}

impl Bounds {
    fn raise_lower(&mut self, version: Version, inclusive: bool) {
        let tighter = match &self.lower {
            None => true,
            Some((current, current_inclusive)) => {
                version > *current || (version == *current && *current_inclusive && !inclusive)
            }
        };
        if tighter {
            self.lower = Some((version, inclusive));
        }
    }

    fn drop_upper(&mut self, version: Version, inclusive: bool) {
        let tighter = match &self.upper {
            None => true,
            Some((current, current_inclusive)) => {
                version < *current || (version == *current && *current_inclusive && !inclusive)
            }
        };
        if tighter {
            self.upper = Some((version, inclusive));
        }
    }

    /// Whether every version inside these bounds satisfies `clause`.
    fn implies(&self, clause: &Specifier) -> bool {
        let Some(version) = clause.release() else {
            return false;
        };
        match clause.op {
            CompareOp::Ge if !clause.is_wildcard() => self.at_least(&version, true),
            CompareOp::Gt => self.at_least(&version, false),
            CompareOp::Le if !clause.is_wildcard() => self.at_most(&version, true),
            CompareOp::Lt => self.at_most(&version, false),
            CompareOp::Eq if !clause.is_wildcard() => {
                self.exact.as_ref() == Some(&version)
                    || (self.at_least(&version, true) && self.at_most(&version, true))
            }
            CompareOp::Eq => {
                // ==X.Y.* confines to [X.Y, X.Y+1).
                let limit = version.bumped_last();
                self.at_least(&version, true) && self.at_most(&limit, false)
            }
            CompareOp::Compatible => match version.compatible_release_bound() {
                Some(limit) => self.at_least(&version, true) && self.at_most(&limit, false),
                None => false,
            },
            CompareOp::Ne => self.excludes(&version),
            _ => false,
        }
    }

    /// Bounds guarantee every contained version is `>= version` (inclusive)
    /// or `> version` (exclusive).
    fn at_least(&self, version: &Version, inclusive: bool) -> bool {
        if self.opaque {
            return false;
        }
        match &self.lower {
            None => false,
            Some((lower, lower_inclusive)) => {
                *lower > *version
                    || (*lower == *version && (inclusive || !*lower_inclusive))
            }
        }
    }

    fn at_most(&self, version: &Version, inclusive: bool) -> bool {
        if self.opaque {
            return false;
        }
        match &self.upper {
            None => false,
            Some((upper, upper_inclusive)) => {
                *upper < *version
                    || (*upper == *version && (inclusive || !*upper_inclusive))
            }
        }
    }

    /// Bounds guarantee `version` lies outside the contained range.
    fn excludes(&self, version: &Version) -> bool {
        if self.opaque {
            return false;
        }
        let below = matches!(&self.lower, Some((lower, inclusive))
            if *version < *lower || (*version == *lower && !*inclusive));
        let above = matches!(&self.upper, Some((upper, inclusive))
            if *version > *upper || (*version == *upper && !*inclusive));
        below || above
    }
}

impl fmt::Display for SpecifierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for clause in &self.clauses {
            if !first {
                write!(f, ",")?;
            }
            write!(f, "{}", clause)?;
            first = false;
        }
        Ok(())
    }
}

/// A named package dependency with an optional version specifier, optional
/// extras and an optional marker expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub name: String,
    pub extras: Vec<String>,
    pub specifiers: SpecifierSet,
    pub marker: Option<String>,
}

impl Requirement {
    /// Parse a requirement expression.
    ///
    /// Accepts `name`, `name[extras]`, `name<specifiers>` and a trailing
    /// `; marker`. Rejects anything it cannot account for in full, such as
    /// URL requirements.
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        let (body, marker) = match line.split_once(';') {
            Some((body, marker)) => (body.trim(), Some(marker.trim().to_string())),
            None => (line, None),
        };
        let marker = marker.filter(|m| !m.is_empty());

        let name_match = NAME
            .find(body)
            .ok_or_else(|| Error::invalid_requirement(line, "missing package name"))?;
        let name = name_match.as_str().to_string();
        let mut rest = body[name_match.end()..].trim_start();

        let mut extras = Vec::new();
        if let Some(after_bracket) = rest.strip_prefix('[') {
            let (inside, after) = after_bracket
                .split_once(']')
                .ok_or_else(|| Error::invalid_requirement(line, "unterminated extras"))?;
            extras = inside
                .split(',')
                .map(|extra| extra.trim().to_string())
                .filter(|extra| !extra.is_empty())
                .collect();
            rest = after.trim_start();
        }

        let specifiers = SpecifierSet::parse(rest)?;
        Ok(Self {
            name,
            extras,
            specifiers,
            marker,
        })
    }

    /// The normalized name used for "same package" comparisons.
    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name)
    }

    /// The line emitted into the installable set: name plus specifiers,
    /// marker and extras stripped.
    pub fn install_line(&self) -> String {
        format!("{}{}", self.name, self.specifiers)
    }
}

/// Extract a bare package name from a line that does not parse as a formal
/// requirement (e.g. a manifest-style dependency string).
pub fn permissive_name(line: &str) -> Option<&str> {
    NAME.find(line.trim()).map(|m| m.as_str())
}
