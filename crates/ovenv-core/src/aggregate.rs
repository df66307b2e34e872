//! Requirement source aggregation
//!
//! Fans out across every configured requirement source, routes each
//! candidate line through marker and ignore filtering, and appends the
//! surviving lines to one shared output sink. The sink is a plain
//! `io::Write` so the caller decides where the merged set lands (a
//! temporary file handed to the installer, a buffer in tests).
//!
//! No cross-source deduplication happens here: if two sources declare the
//! same package with compatible specifiers, both lines are emitted and the
//! installer reconciles or rejects the conflict.

use std::io::Write;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::ignore::IgnoreList;
use crate::manifest;
use crate::marker::{TargetEnv, evaluate_marker};
use crate::requirement::Requirement;

/// The requirement sources gathered for one invocation, in processing
/// order: core file, addons-dir files, inline extras, extra file, addon
/// manifests.
#[derive(Debug, Default)]
pub struct RequirementSources {
    /// The Odoo core `requirements.txt`, when it exists and is enabled.
    pub core_file: Option<PathBuf>,
    /// `requirements.txt` files found directly in addons directories.
    pub addons_files: Vec<PathBuf>,
    /// Inline extra requirement strings from the command line or a preset.
    pub inline_extras: Vec<String>,
    /// An externally supplied extra requirements file.
    pub extra_file: Option<PathBuf>,
    /// Addon `__manifest__.py` files whose `external_dependencies.python`
    /// lists should be installed.
    pub manifest_files: Vec<PathBuf>,
}

/// Process one candidate requirement line.
///
/// Blank and pure-comment lines are skipped without being counted. Lines
/// that parse as formal requirements (after trailing-comment removal) are
/// marker-gated and checked against the ignore rules by specifier
/// containment, then emitted without their marker. Lines that do not parse
/// (bare manifest-style names, URL requirements) fall back to an ignore
/// check by name only and are otherwise emitted verbatim, untouched: a `#`
/// there may be a URL fragment rather than a comment.
///
/// Returns whether a line was emitted.
pub fn process_line(
    raw: &str,
    ignore: &IgnoreList,
    env: &TargetEnv,
    out: &mut impl Write,
) -> Result<bool> {
    let line = raw.trim();
    let stripped = line.split('#').next().unwrap_or("").trim();
    if stripped.is_empty() {
        return Ok(false);
    }

    match Requirement::parse(stripped) {
        Ok(req) => {
            if let Some(marker) = &req.marker
                && !evaluate_marker(marker, env)
            {
                return Ok(false);
            }
            if ignore.is_ignored(&req) {
                return Ok(false);
            }
            writeln!(out, "{}", req.install_line())
                .map_err(|e| Error::io("<requirements buffer>", e))?;
            Ok(true)
        }
        Err(_) => {
            if ignore.is_ignored_name(stripped) {
                return Ok(false);
            }
            writeln!(out, "{line}").map_err(|e| Error::io("<requirements buffer>", e))?;
            Ok(true)
        }
    }
}

/// Aggregate every source into `out`, returning the number of emitted lines.
///
/// Sources are read sequentially in the fixed order documented on
/// [`RequirementSources`]. Requirement files that have disappeared since
/// discovery produce an error; manifest files that fail literal parsing are
/// reported and skipped.
pub fn aggregate(
    sources: &RequirementSources,
    ignore: &IgnoreList,
    env: &TargetEnv,
    out: &mut impl Write,
) -> Result<usize> {
    let mut count = 0;

    let mut files = Vec::new();
    files.extend(sources.core_file.iter());
    files.extend(sources.addons_files.iter());
    for path in files {
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        for line in content.lines() {
            if process_line(line, ignore, env, out)? {
                count += 1;
            }
        }
    }

    for line in &sources.inline_extras {
        if process_line(line, ignore, env, out)? {
            count += 1;
        }
    }

    if let Some(path) = &sources.extra_file {
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        for line in content.lines() {
            if process_line(line, ignore, env, out)? {
                count += 1;
            }
        }
    }

    for path in &sources.manifest_files {
        let deps = match manifest::external_python_dependencies(path) {
            Ok(deps) => deps,
            Err(err) => {
                tracing::warn!("skipping manifest: {err}");
                continue;
            }
        };
        for dep in deps {
            if process_line(&dep, ignore, env, out)? {
                count += 1;
            }
        }
    }

    Ok(count)
}
