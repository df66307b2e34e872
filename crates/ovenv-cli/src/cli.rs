//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// odoo-venv - Provision Python virtual environments for Odoo
#[derive(Parser, Debug)]
#[command(name = "ovenv")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Create a virtual environment to run Odoo
    ///
    /// Examples:
    ///   ovenv create 18.0
    ///   ovenv create 16.0 --preset oca --addons-path ./addons
    ///   ovenv create 13.0 -p 3.7 --venv-dir ~/.venvs/odoo13
    Create(CreateArgs),

    /// List available presets
    ListPresets,
}

/// Options for the `create` command.
///
/// Boolean toggles and optional strings are tri-state on purpose: a flag
/// left unset falls back to the named preset's value (when `--preset` is
/// given) and then to the built-in default. An explicitly passed flag
/// always wins.
#[derive(Args, Debug, Clone, Default)]
pub struct CreateArgs {
    /// Odoo version, e.g: 18.0
    pub odoo_version: String,

    /// Specify Python version
    #[arg(short = 'p', long)]
    pub python_version: Option<String>,

    /// Path to create the virtual environment
    #[arg(long, default_value = "./.venv")]
    pub venv_dir: PathBuf,

    /// Path to Odoo source code
    #[arg(long)]
    pub odoo_dir: Option<PathBuf>,

    /// Comma-separated list of addons paths
    #[arg(long)]
    pub addons_path: Option<String>,

    /// Use a preset of options; other flags override preset values
    #[arg(long)]
    pub preset: Option<String>,

    /// Install Odoo in editable mode
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub install_odoo: Option<bool>,

    /// Install packages from Odoo's requirements.txt
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub install_odoo_requirements: Option<bool>,

    /// Comma-separated list of packages to ignore from Odoo's requirements.txt
    #[arg(long)]
    pub ignore_from_odoo_requirements: Option<String>,

    /// Install requirements.txt found in addons paths
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub install_addons_dirs_requirements: Option<bool>,

    /// Comma-separated list of packages to ignore from addons paths' requirements.txt
    #[arg(long)]
    pub ignore_from_addons_dirs_requirements: Option<String>,

    /// Install requirements from addons' manifests
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub install_addons_manifests_requirements: Option<bool>,

    /// Comma-separated list of packages to ignore from addons' manifests
    #[arg(long)]
    pub ignore_from_addons_manifests_requirements: Option<String>,

    /// Path to an extra requirements file
    #[arg(long)]
    pub extra_requirements_file: Option<PathBuf>,

    /// Comma-separated list of extra packages to install
    #[arg(long)]
    pub extra_requirement: Option<String>,

    /// Print commands without executing them
    #[arg(long)]
    pub dry_run: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_parses_minimal_invocation() {
        let cli = Cli::parse_from(["ovenv", "create", "18.0"]);
        let Commands::Create(args) = cli.command else {
            panic!("expected create command");
        };
        assert_eq!(args.odoo_version, "18.0");
        assert_eq!(args.venv_dir, PathBuf::from("./.venv"));
        assert!(args.install_odoo.is_none());
    }

    #[test]
    fn test_boolean_flag_without_value_means_true() {
        let cli = Cli::parse_from(["ovenv", "create", "16.0", "--install-addons-dirs-requirements"]);
        let Commands::Create(args) = cli.command else {
            panic!("expected create command");
        };
        assert_eq!(args.install_addons_dirs_requirements, Some(true));
    }

    #[test]
    fn test_boolean_flag_accepts_explicit_false() {
        let cli = Cli::parse_from(["ovenv", "create", "16.0", "--install-odoo", "false"]);
        let Commands::Create(args) = cli.command else {
            panic!("expected create command");
        };
        assert_eq!(args.install_odoo, Some(false));
    }
}
