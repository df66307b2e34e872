//! Three-tier option resolution: built-in defaults, preset fields, then
//! explicit command-line flags, in that fixed order.
//!
//! Every overridable `CreateArgs` field is an `Option`, so "was this set
//! explicitly" is tracked in the type rather than in hidden parser state:
//! `Some` came from the user and wins outright, `None` falls through to the
//! preset (when one was named) and finally to the built-in default.

use std::path::PathBuf;

use ovenv_presets::{ExtraCommand, Preset};

use crate::cli::CreateArgs;

/// The default interpreter series per Odoo release, used when
/// `--python-version` is not given and the Odoo checkout does not pin one.
/// Minor versions can still be forced via `--python-version`.
pub fn default_python_for(odoo_version: &str) -> Option<&'static str> {
    match odoo_version {
        "12.0" | "13.0" => Some("3.7"),
        "14.0" | "15.0" => Some("3.8"),
        "16.0" | "17.0" | "18.0" | "19.0" => Some("3.10"),
        _ => None,
    }
}

/// Fully resolved options for one `create` invocation.
///
/// `python_version` is still `None` here when the user did not force one;
/// the provisioning flow fills it in from the Odoo checkout or from
/// [`default_python_for`] before the environment is created.
#[derive(Debug, Clone)]
pub struct CreateOptions {
    pub odoo_version: String,
    pub python_version: Option<String>,
    pub venv_dir: PathBuf,
    pub odoo_dir: PathBuf,
    pub addons_paths: Vec<PathBuf>,
    pub install_odoo: bool,
    pub install_odoo_requirements: bool,
    pub ignore_from_odoo_requirements: Option<String>,
    pub install_addons_dirs_requirements: bool,
    pub ignore_from_addons_dirs_requirements: Option<String>,
    pub install_addons_manifests_requirements: bool,
    pub ignore_from_addons_manifests_requirements: Option<String>,
    pub extra_requirements_file: Option<PathBuf>,
    pub extra_requirements: Vec<String>,
    pub extra_commands: Vec<ExtraCommand>,
    pub verbose: bool,
    pub dry_run: bool,
}

impl CreateOptions {
    /// Resolve options from CLI arguments layered over an optional preset.
    pub fn resolve(args: &CreateArgs, preset: Option<&Preset>, verbose: bool) -> Self {
        let preset = preset.cloned().unwrap_or_default();

        let odoo_dir = args
            .odoo_dir
            .clone()
            .map(expand_home)
            .unwrap_or_else(|| default_odoo_dir(&args.odoo_version));

        let addons_paths = args
            .addons_path
            .as_deref()
            .map(split_paths)
            .unwrap_or_default();

        let extra_requirement = args
            .extra_requirement
            .clone()
            .or_else(|| preset.extra_requirement.clone());
        let extra_requirements = extra_requirement
            .as_deref()
            .map(|joined| {
                joined
                    .split(',')
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            odoo_version: args.odoo_version.clone(),
            python_version: args.python_version.clone(),
            venv_dir: expand_home(args.venv_dir.clone()),
            odoo_dir,
            addons_paths,
            install_odoo: args.install_odoo.or(preset.install_odoo).unwrap_or(true),
            install_odoo_requirements: args
                .install_odoo_requirements
                .or(preset.install_odoo_requirements)
                .unwrap_or(true),
            ignore_from_odoo_requirements: args
                .ignore_from_odoo_requirements
                .clone()
                .or(preset.ignore_from_odoo_requirements),
            install_addons_dirs_requirements: args
                .install_addons_dirs_requirements
                .or(preset.install_addons_dirs_requirements)
                .unwrap_or(false),
            ignore_from_addons_dirs_requirements: args
                .ignore_from_addons_dirs_requirements
                .clone()
                .or(preset.ignore_from_addons_dirs_requirements),
            install_addons_manifests_requirements: args
                .install_addons_manifests_requirements
                .or(preset.install_addons_manifests_requirements)
                .unwrap_or(false),
            ignore_from_addons_manifests_requirements: args
                .ignore_from_addons_manifests_requirements
                .clone()
                .or(preset.ignore_from_addons_manifests_requirements),
            extra_requirements_file: args
                .extra_requirements_file
                .clone()
                .or_else(|| preset.extra_requirements_file.clone().map(PathBuf::from))
                .map(expand_home),
            extra_requirements,
            extra_commands: preset.extra_commands.unwrap_or_default(),
            verbose,
            dry_run: args.dry_run,
        }
    }
}

fn default_odoo_dir(odoo_version: &str) -> PathBuf {
    let relative = PathBuf::from("code/odoo/odoo").join(odoo_version);
    match dirs::home_dir() {
        Some(home) => home.join(relative),
        None => relative,
    }
}

fn split_paths(joined: &str) -> Vec<PathBuf> {
    joined
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| expand_home(PathBuf::from(part)))
        .collect()
}

/// Expand a leading `~` to the home directory, as shells would.
fn expand_home(path: PathBuf) -> PathBuf {
    let Some(text) = path.to_str() else {
        return path;
    };
    if let Some(rest) = text.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    path
}
