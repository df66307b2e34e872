//! The `create` provisioning flow: resolve the interpreter, create the
//! environment with uv, aggregate requirements into a temporary file,
//! install, and run staged extra commands in between.

use std::io::Write;
use std::path::Path;
use std::sync::LazyLock;

use colored::Colorize;
use ovenv_core::{IgnoreList, RequirementSources, TargetEnv, Version, aggregate, find_manifest_files};
use regex::Regex;
use tempfile::NamedTempFile;
use tracing::warn;

use crate::error::{CliError, Result};
use crate::hooks::{Stage, run_stage};
use crate::installer::{CommandRunner, UvInstaller};
use crate::options::{CreateOptions, default_python_for};

/// Interpreters older than this cannot run any supported Odoo series.
const MIN_SUPPORTED_PYTHON: &str = "3.7";

/// Matches `MIN_PY_VERSION = (3, 10)` in Odoo's top-level `__init__.py`.
static MIN_PY_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"MIN_PY_VERSION\s*=\s*\(\s*(\d+)\s*,\s*(\d+)\s*\)").expect("valid regex")
});

/// Provision a virtual environment from fully resolved options.
pub fn run_create(opts: &CreateOptions) -> Result<()> {
    let python_version = resolve_python_version(opts);

    if let Some(requested) = &python_version {
        ensure_supported_python(requested)?;
    }

    let mut env = TargetEnv::for_platform(&opts.odoo_version);
    if let Some(python_version) = &python_version {
        env = env.with_python_version(python_version);
    }

    let runner = CommandRunner::new(opts.verbose, opts.dry_run);
    let installer = UvInstaller::new(runner);

    println!(
        "Creating virtual environment for Odoo {} in {}",
        opts.odoo_version.bold(),
        opts.venv_dir.display().to_string().bold()
    );
    installer.create_environment(&opts.venv_dir, python_version.as_deref())?;
    run_stage(
        Stage::AfterVenv,
        &opts.extra_commands,
        &env,
        &opts.venv_dir,
        installer.runner(),
    )?;

    install_requirements(opts, &env, &installer)?;
    run_stage(
        Stage::AfterRequirements,
        &opts.extra_commands,
        &env,
        &opts.venv_dir,
        installer.runner(),
    )?;

    if opts.install_odoo {
        if opts.odoo_dir.is_dir() || opts.dry_run {
            println!("Installing Odoo from {}", opts.odoo_dir.display());
            installer.install_editable(&opts.odoo_dir, &opts.venv_dir)?;
            run_stage(
                Stage::AfterOdooInstall,
                &opts.extra_commands,
                &env,
                &opts.venv_dir,
                installer.runner(),
            )?;
        } else {
            return Err(CliError::user(format!(
                "Odoo source directory not found: {} (pass --odoo-dir or --install-odoo false)",
                opts.odoo_dir.display()
            )));
        }
    }

    println!(
        "{} Virtual environment ready at {}",
        "✓".green(),
        opts.venv_dir.display()
    );
    Ok(())
}

/// Pick the interpreter version: the explicit flag wins, then the
/// `MIN_PY_VERSION` pin in the Odoo checkout, then the per-series default.
fn resolve_python_version(opts: &CreateOptions) -> Option<String> {
    if let Some(explicit) = &opts.python_version {
        return Some(explicit.clone());
    }
    if let Some(pinned) = scan_min_py_version(&opts.odoo_dir) {
        if opts.verbose {
            println!("Using Python {pinned} pinned by the Odoo source tree");
        }
        return Some(pinned);
    }
    default_python_for(&opts.odoo_version).map(String::from)
}

/// Read `MIN_PY_VERSION` from `<odoo_dir>/odoo/__init__.py`, when present.
fn scan_min_py_version(odoo_dir: &Path) -> Option<String> {
    let init = odoo_dir.join("odoo").join("__init__.py");
    let content = std::fs::read_to_string(init).ok()?;
    let caps = MIN_PY_VERSION.captures(&content)?;
    Some(format!("{}.{}", &caps[1], &caps[2]))
}

fn ensure_supported_python(requested: &str) -> Result<()> {
    let minimum: Version = MIN_SUPPORTED_PYTHON.parse().expect("valid constant");
    match requested.parse::<Version>() {
        Ok(version) if version < minimum => Err(CliError::UnsupportedPython {
            requested: requested.to_string(),
            minimum: MIN_SUPPORTED_PYTHON.to_string(),
        }),
        _ => Ok(()),
    }
}

/// Gather every enabled requirement source, aggregate them into a temporary
/// file, and install from it when anything survived filtering. The
/// temporary file is removed when this returns.
fn install_requirements(
    opts: &CreateOptions,
    env: &TargetEnv,
    installer: &UvInstaller,
) -> Result<()> {
    let sources = gather_sources(opts);
    let ignore = build_ignore_list(opts, env);

    if opts.verbose && !ignore.is_empty() {
        println!("Ignoring packages:");
        for (name, rules) in ignore.entries() {
            let versions: Vec<String> = rules
                .iter()
                .map(|set| {
                    if set.is_empty() {
                        "all versions".to_string()
                    } else {
                        set.to_string()
                    }
                })
                .collect();
            println!("  {} ({})", name, versions.join(", "));
        }
    }

    let mut merged = NamedTempFile::new()?;
    let count = aggregate(&sources, &ignore, env, &mut merged)?;
    if count == 0 {
        if opts.verbose {
            println!("No requirements to install");
        }
        return Ok(());
    }
    merged.flush()?;

    if opts.verbose {
        println!("Installing {count} requirements:");
        let emitted = std::fs::read_to_string(merged.path())?;
        for line in emitted.lines() {
            println!("  {line}");
        }
    }
    installer.install_from_file(merged.path(), &opts.venv_dir)
}

fn gather_sources(opts: &CreateOptions) -> RequirementSources {
    let mut sources = RequirementSources {
        inline_extras: opts.extra_requirements.clone(),
        extra_file: opts.extra_requirements_file.clone(),
        ..Default::default()
    };

    if opts.install_odoo_requirements {
        let core = opts.odoo_dir.join("requirements.txt");
        if core.is_file() {
            sources.core_file = Some(core);
        } else {
            warn!(path = %core.display(), "Odoo requirements file not found, skipping");
        }
    }

    if opts.install_addons_dirs_requirements {
        sources.addons_files = opts
            .addons_paths
            .iter()
            .map(|dir| dir.join("requirements.txt"))
            .filter(|path| path.is_file())
            .collect();
    }

    if opts.install_addons_manifests_requirements {
        sources.manifest_files = find_manifest_files(&opts.addons_paths);
    }

    sources
}

fn build_ignore_list(opts: &CreateOptions, env: &TargetEnv) -> IgnoreList {
    let raw: Vec<String> = [
        &opts.ignore_from_odoo_requirements,
        &opts.ignore_from_addons_dirs_requirements,
        &opts.ignore_from_addons_manifests_requirements,
    ]
    .into_iter()
    .flatten()
    .cloned()
    .collect();
    IgnoreList::build(&raw, env)
}
