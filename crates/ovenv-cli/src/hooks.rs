//! Staged post-step hook commands
//!
//! Presets can attach extra commands to fixed points in the provisioning
//! sequence: after the venv is created, after requirements are installed,
//! and after Odoo itself is installed. Each command can carry a marker
//! condition and per-command environment overrides. A failing hook aborts
//! the whole run.

use std::fmt;
use std::path::Path;

use colored::Colorize;
use ovenv_core::{TargetEnv, evaluate_marker};
use ovenv_presets::ExtraCommand;

use crate::error::Result;
use crate::installer::CommandRunner;

/// A fixed point in the provisioning sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// After the virtual environment is created. Commands without an
    /// explicit `stage` run here.
    AfterVenv,
    /// After the merged requirement set is installed.
    AfterRequirements,
    /// After Odoo is installed in editable mode.
    AfterOdooInstall,
}

impl Stage {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "after_venv" => Some(Self::AfterVenv),
            "after_requirements" => Some(Self::AfterRequirements),
            "after_odoo_install" => Some(Self::AfterOdooInstall),
            _ => None,
        }
    }

    pub fn all_names() -> &'static [&'static str] {
        &["after_venv", "after_requirements", "after_odoo_install"]
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AfterVenv => write!(f, "after_venv"),
            Self::AfterRequirements => write!(f, "after_requirements"),
            Self::AfterOdooInstall => write!(f, "after_odoo_install"),
        }
    }
}

/// Whether a command entry applies to the given stage, warning about
/// unrecognized stage names on the first entry only so a bad preset does
/// not repeat the warning once per stage invocation.
fn matches_stage(command: &ExtraCommand, index: usize, stage: Stage) -> bool {
    match &command.stage {
        None => stage == Stage::AfterVenv,
        Some(name) => match Stage::parse(name) {
            Some(declared) => declared == stage,
            None => {
                if index == 0 {
                    tracing::warn!(
                        "extra_command[{index}]: unknown stage '{name}' (valid: {})",
                        Stage::all_names().join(", ")
                    );
                }
                false
            }
        },
    }
}

/// Run all configured extra commands that apply to `stage`, in list order.
///
/// Skipped entries (wrong stage, non-matching `when` marker, malformed
/// command field) never abort; a command that executes and exits non-zero
/// does, after its command line, condition and environment overrides have
/// been printed.
pub fn run_stage(
    stage: Stage,
    commands: &[ExtraCommand],
    env: &TargetEnv,
    venv_dir: &Path,
    runner: &CommandRunner,
) -> Result<()> {
    for (index, command) in commands.iter().enumerate() {
        if !matches_stage(command, index, stage) {
            continue;
        }

        let when = command.when.as_deref().unwrap_or("");
        if !evaluate_marker(when, env) {
            continue;
        }

        let Some(argv) = command.argv() else {
            tracing::warn!("extra_command[{index}]: missing or invalid 'command' field, skipping");
            continue;
        };

        let extra_env = command.env_strings();
        if runner.verbose {
            println!("\n  {} Running extra command (stage: {stage})", "▸".cyan());
            if !when.is_empty() {
                println!("     Condition: {}", when.cyan());
            }
            if !extra_env.is_empty() {
                let env_text: Vec<String> = extra_env
                    .iter()
                    .map(|(key, value)| format!("{key}={value}"))
                    .collect();
                println!("     Environment: {}", env_text.join(" ").cyan());
            }
        }

        if let Err(err) = runner.run(&argv, Some(venv_dir), &extra_env) {
            eprintln!(
                "\n  {} Extra command failed at stage '{stage}':",
                "✗".red()
            );
            eprintln!("    Command: {}", argv.join(" ").red());
            if !when.is_empty() {
                eprintln!("    Condition: {}", when.red());
            }
            if !extra_env.is_empty() {
                let env_text: Vec<String> = extra_env
                    .iter()
                    .map(|(key, value)| format!("{key}={value}"))
                    .collect();
                eprintln!("    Environment: {}", env_text.join(" ").red());
            }
            return Err(err);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn env() -> TargetEnv {
        let mut env = TargetEnv::new();
        env.set("odoo_version", "17.0");
        env
    }

    fn runner() -> CommandRunner {
        CommandRunner::new(false, false)
    }

    fn touch_command(marker: &Path, stage: Option<&str>, when: Option<&str>) -> ExtraCommand {
        ExtraCommand {
            command: Some(toml::Value::Array(vec![
                toml::Value::String("sh".into()),
                toml::Value::String("-c".into()),
                toml::Value::String(format!("echo ran > '{}'", marker.display())),
            ])),
            when: when.map(String::from),
            stage: stage.map(String::from),
            env: None,
        }
    }

    #[test]
    fn test_stage_parse_roundtrip() {
        for name in Stage::all_names() {
            let stage = Stage::parse(name).unwrap();
            assert_eq!(stage.to_string(), *name);
        }
        assert_eq!(Stage::parse("after_install"), None);
    }

    #[test]
    fn test_unset_stage_runs_only_at_default_stage() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("marker");
        let commands = vec![touch_command(&marker, None, None)];

        run_stage(
            Stage::AfterRequirements,
            &commands,
            &env(),
            dir.path(),
            &runner(),
        )
        .unwrap();
        assert!(!marker.exists());

        run_stage(Stage::AfterVenv, &commands, &env(), dir.path(), &runner()).unwrap();
        assert!(marker.exists());
    }

    #[test]
    fn test_explicit_stage_matches_exactly() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("marker");
        let commands = vec![touch_command(&marker, Some("after_odoo_install"), None)];

        run_stage(Stage::AfterVenv, &commands, &env(), dir.path(), &runner()).unwrap();
        assert!(!marker.exists());

        run_stage(
            Stage::AfterOdooInstall,
            &commands,
            &env(),
            dir.path(),
            &runner(),
        )
        .unwrap();
        assert!(marker.exists());
    }

    #[test]
    fn test_misspelled_stage_never_runs() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("marker");
        let commands = vec![touch_command(&marker, Some("after_venv_typo"), None)];

        for stage in [Stage::AfterVenv, Stage::AfterRequirements, Stage::AfterOdooInstall] {
            run_stage(stage, &commands, &env(), dir.path(), &runner()).unwrap();
        }
        assert!(!marker.exists());
    }

    #[test]
    fn test_when_marker_gates_execution() {
        let dir = TempDir::new().unwrap();
        let skipped = dir.path().join("skipped");
        let ran = dir.path().join("ran");
        let commands = vec![
            touch_command(&skipped, None, Some("odoo_version < '14.0'")),
            touch_command(&ran, None, Some("odoo_version >= '14.0'")),
        ];

        run_stage(Stage::AfterVenv, &commands, &env(), dir.path(), &runner()).unwrap();
        assert!(!skipped.exists());
        assert!(ran.exists());
    }

    #[test]
    fn test_malformed_command_skipped_without_abort() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("marker");
        let commands = vec![
            ExtraCommand {
                command: Some(toml::Value::String("not a list".into())),
                when: None,
                stage: None,
                env: None,
            },
            touch_command(&marker, None, None),
        ];

        run_stage(Stage::AfterVenv, &commands, &env(), dir.path(), &runner()).unwrap();
        assert!(marker.exists());
    }

    #[test]
    fn test_failing_command_aborts_run() {
        let dir = TempDir::new().unwrap();
        let after = dir.path().join("after");
        let commands = vec![
            ExtraCommand {
                command: Some(toml::Value::Array(vec![
                    toml::Value::String("sh".into()),
                    toml::Value::String("-c".into()),
                    toml::Value::String("exit 1".into()),
                ])),
                when: None,
                stage: None,
                env: None,
            },
            touch_command(&after, None, None),
        ];

        let result = run_stage(Stage::AfterVenv, &commands, &env(), dir.path(), &runner());
        assert!(result.is_err());
        assert!(!after.exists());
    }

    #[test]
    fn test_per_command_env_overrides_applied() {
        let dir = TempDir::new().unwrap();
        let capture = dir.path().join("capture");
        let mut env_overrides = std::collections::BTreeMap::new();
        env_overrides.insert("HOOK_LABEL".to_string(), toml::Value::String("x1".into()));
        let commands = vec![ExtraCommand {
            command: Some(toml::Value::Array(vec![
                toml::Value::String("sh".into()),
                toml::Value::String("-c".into()),
                toml::Value::String(format!("echo \"$HOOK_LABEL\" > '{}'", capture.display())),
            ])),
            when: None,
            stage: None,
            env: Some(env_overrides),
        }];

        run_stage(Stage::AfterVenv, &commands, &env(), dir.path(), &runner()).unwrap();
        assert_eq!(std::fs::read_to_string(&capture).unwrap().trim(), "x1");
    }
}
