//! odoo-venv CLI
//!
//! The command-line interface for provisioning Odoo virtual environments.

mod cli;
mod error;
mod hooks;
mod installer;
mod options;
mod provision;

use clap::Parser;
use colored::Colorize;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use cli::{Cli, Commands, CreateArgs};
use error::Result;
use options::CreateOptions;
use ovenv_presets::{Preset, PresetStore};

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing if verbose
    if cli.verbose {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .with_target(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .expect("Failed to set tracing subscriber");
    }

    match cli.command {
        Commands::Create(args) => cmd_create(args, cli.verbose),
        Commands::ListPresets => cmd_list_presets(),
    }
}

fn cmd_create(args: CreateArgs, verbose: bool) -> Result<()> {
    let preset = match &args.preset {
        Some(name) => Some(load_preset(name)?),
        None => None,
    };
    let opts = CreateOptions::resolve(&args, preset.as_ref(), verbose);
    provision::run_create(&opts)
}

fn load_preset(name: &str) -> Result<Preset> {
    let store = preset_store()?;
    store.ensure_initialized()?;
    let preset = store.get(name)?;
    println!("{} preset {}", "Applying".green().bold(), name.bold());
    Ok(preset)
}

fn cmd_list_presets() -> Result<()> {
    let store = preset_store()?;
    store.ensure_initialized()?;
    let presets = store.load()?;
    for (name, preset) in presets {
        match preset.description {
            Some(description) => println!("{}: {}", name.bold(), description),
            None => println!("{}", name.bold()),
        }
    }
    Ok(())
}

fn preset_store() -> Result<PresetStore> {
    let root = PresetStore::default_root().ok_or_else(|| {
        error::CliError::user("could not determine a user data directory for presets")
    })?;
    Ok(PresetStore::new(root))
}
