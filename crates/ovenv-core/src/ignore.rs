//! Specifier-aware ignore lists
//!
//! Users exclude packages from the merged requirement set with
//! comma-separated specs such as `--ignore-from-odoo-requirements
//! "gevent,greenlet>=1.0"`. A literal comma inside one entry's specifier can
//! be kept by escaping it with a backslash: `gevent>=21.0\,<22.0`.

use std::collections::HashMap;

use crate::marker::{TargetEnv, evaluate_marker};
use crate::requirement::{Requirement, SpecifierSet, normalize_name, permissive_name};

/// Normalized package name mapped to the version constraints under which it
/// is excluded. An entry with an empty specifier set always excludes,
/// regardless of the requirement's own version.
#[derive(Debug, Default)]
pub struct IgnoreList {
    rules: HashMap<String, Vec<SpecifierSet>>,
}

impl IgnoreList {
    /// Build an ignore list from raw comma-joined spec strings.
    ///
    /// Each raw string is split on unescaped commas, then parsed as a
    /// requirement expression. Entries whose marker does not match the
    /// target environment are dropped silently; entries that fail to parse
    /// are reported and dropped, never aborting the run.
    pub fn build(raw_specs: &[String], env: &TargetEnv) -> Self {
        let mut list = Self::default();
        for raw in raw_specs {
            for entry in split_escaped(raw) {
                let entry = entry.trim();
                if entry.is_empty() {
                    continue;
                }
                match Requirement::parse(entry) {
                    Ok(req) => {
                        if let Some(marker) = &req.marker
                            && !evaluate_marker(marker, env)
                        {
                            continue;
                        }
                        list.rules
                            .entry(req.normalized_name())
                            .or_default()
                            .push(req.specifiers);
                    }
                    Err(err) => {
                        tracing::warn!("invalid requirement in ignore list: {err}");
                    }
                }
            }
        }
        list
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Whether a formally parsed requirement is excluded: its name matches
    /// and either the matching entry has no specifier, or the requirement's
    /// specifier range is fully contained in the entry's range.
    pub fn is_ignored(&self, req: &Requirement) -> bool {
        let Some(rules) = self.rules.get(&req.normalized_name()) else {
            return false;
        };
        rules.iter().any(|rule| {
            rule.is_empty()
                || (!req.specifiers.is_empty() && req.specifiers.is_subset_of(rule))
        })
    }

    /// Whether a non-conformant line is excluded by bare name. No
    /// specifier-subset check is possible for such lines.
    pub fn is_ignored_name(&self, line: &str) -> bool {
        permissive_name(line)
            .map(normalize_name)
            .is_some_and(|name| self.rules.contains_key(&name))
    }

    /// The exclusion rules, sorted by name, for verbose reporting.
    pub fn entries(&self) -> Vec<(&str, &[SpecifierSet])> {
        let mut entries: Vec<_> = self
            .rules
            .iter()
            .map(|(name, rules)| (name.as_str(), rules.as_slice()))
            .collect();
        entries.sort_by_key(|(name, _)| *name);
        entries
    }
}

/// Split on commas, honouring backslash escapes: `a\,b,c` -> `["a,b", "c"]`.
fn split_escaped(raw: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some(',') => current.push(','),
                Some(other) => {
                    current.push('\\');
                    current.push(other);
                }
                None => current.push('\\'),
            },
            ',' => {
                parts.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    parts.push(current);
    parts
}
