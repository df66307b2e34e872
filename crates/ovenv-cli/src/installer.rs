//! Subprocess execution and the uv installer contract
//!
//! All provisioning work that touches the outside world goes through
//! [`CommandRunner`]: commands run synchronously, inherit the process
//! environment with the target venv's `bin` directory prepended to `PATH`
//! and `VIRTUAL_ENV` set, and a non-zero exit is fatal with stderr
//! surfaced. In dry-run mode commands are printed and skipped.

use std::collections::BTreeMap;
use std::path::Path;
use std::process::Command;

use colored::Colorize;

use crate::error::{CliError, Result};

/// Runs argument vectors as blocking subprocesses.
#[derive(Debug, Clone, Copy)]
pub struct CommandRunner {
    pub verbose: bool,
    pub dry_run: bool,
}

impl CommandRunner {
    pub fn new(verbose: bool, dry_run: bool) -> Self {
        Self { verbose, dry_run }
    }

    /// Execute an argument vector.
    ///
    /// When `venv_dir` is given, the subprocess sees the venv activated:
    /// `<venv>/bin` first on `PATH` and `VIRTUAL_ENV` set. `extra_env`
    /// entries override both.
    pub fn run(
        &self,
        argv: &[String],
        venv_dir: Option<&Path>,
        extra_env: &BTreeMap<String, String>,
    ) -> Result<()> {
        let display = argv.join(" ");
        if self.verbose {
            println!("  {} Running: {}", "→".blue(), display.blue());
        }
        if self.dry_run {
            return Ok(());
        }

        let (program, args) = argv.split_first().ok_or_else(|| CliError::CommandFailed {
            command: display.clone(),
        })?;

        let mut command = Command::new(program);
        command.args(args);
        if let Some(venv_dir) = venv_dir {
            let bin_dir = venv_dir.join(if cfg!(windows) { "Scripts" } else { "bin" });
            let path = std::env::var_os("PATH").unwrap_or_default();
            let mut search_path = bin_dir.into_os_string();
            search_path.push(if cfg!(windows) { ";" } else { ":" });
            search_path.push(path);
            command.env("PATH", search_path);
            command.env("VIRTUAL_ENV", venv_dir);
        }
        command.envs(extra_env);

        let output = command.output().map_err(|_| CliError::CommandNotFound {
            command: program.clone(),
        })?;

        if !output.status.success() {
            eprintln!("{}", String::from_utf8_lossy(&output.stderr));
            return Err(CliError::CommandFailed { command: display });
        }
        Ok(())
    }
}

/// The external installer, invoked per its documented command-line
/// contract. Everything beyond these three calls (resolution, wheels,
/// caching) is uv's problem.
#[derive(Debug, Clone, Copy)]
pub struct UvInstaller {
    runner: CommandRunner,
}

impl UvInstaller {
    pub fn new(runner: CommandRunner) -> Self {
        Self { runner }
    }

    /// The underlying runner, for callers that execute non-uv commands.
    pub fn runner(&self) -> &CommandRunner {
        &self.runner
    }

    /// `uv venv <path> [--python <version>]`
    pub fn create_environment(&self, venv_dir: &Path, python_version: Option<&str>) -> Result<()> {
        let mut argv = vec!["uv".to_string(), "venv".to_string()];
        argv.push(venv_dir.display().to_string());
        if let Some(version) = python_version {
            argv.push("--python".to_string());
            argv.push(version.to_string());
        }
        self.runner.run(&argv, None, &BTreeMap::new())
    }

    /// `uv pip install -r <requirements-file>`
    pub fn install_from_file(&self, requirements_file: &Path, venv_dir: &Path) -> Result<()> {
        let argv = vec![
            "uv".to_string(),
            "pip".to_string(),
            "install".to_string(),
            "-r".to_string(),
            requirements_file.display().to_string(),
        ];
        self.runner.run(&argv, Some(venv_dir), &BTreeMap::new())
    }

    /// `uv pip install -e file://<source>#egg=odoo`
    pub fn install_editable(&self, odoo_dir: &Path, venv_dir: &Path) -> Result<()> {
        let argv = vec![
            "uv".to_string(),
            "pip".to_string(),
            "install".to_string(),
            "-e".to_string(),
            format!("file://{}#egg=odoo", odoo_dir.display()),
        ];
        self.runner.run(&argv, Some(venv_dir), &BTreeMap::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_dry_run_executes_nothing() {
        let runner = CommandRunner::new(false, true);
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("marker");
        let argv = vec![
            "sh".to_string(),
            "-c".to_string(),
            format!("echo ran > '{}'", marker.display()),
        ];
        runner.run(&argv, None, &BTreeMap::new()).unwrap();
        assert!(!marker.exists());
    }

    #[test]
    fn test_nonzero_exit_is_fatal() {
        let runner = CommandRunner::new(false, false);
        let argv = vec!["sh".to_string(), "-c".to_string(), "exit 3".to_string()];
        let err = runner.run(&argv, None, &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, CliError::CommandFailed { .. }));
    }

    #[test]
    fn test_missing_program_reported_as_not_found() {
        let runner = CommandRunner::new(false, false);
        let argv = vec!["definitely-not-a-real-program-xyz".to_string()];
        let err = runner.run(&argv, None, &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, CliError::CommandNotFound { .. }));
    }

    #[test]
    fn test_venv_environment_injected() {
        let venv = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let capture = out.path().join("env.txt");
        let runner = CommandRunner::new(false, false);
        let argv = vec![
            "sh".to_string(),
            "-c".to_string(),
            format!("echo \"$VIRTUAL_ENV:$PATH\" > '{}'", capture.display()),
        ];
        runner
            .run(&argv, Some(venv.path()), &BTreeMap::new())
            .unwrap();
        let content = std::fs::read_to_string(&capture).unwrap();
        assert!(content.starts_with(&venv.path().display().to_string()));
        assert!(content.contains("bin"));
    }

    #[test]
    fn test_extra_env_overrides() {
        let out = TempDir::new().unwrap();
        let capture = out.path().join("env.txt");
        let mut extra = BTreeMap::new();
        extra.insert("OVENV_TEST_FLAG".to_string(), "on".to_string());
        let runner = CommandRunner::new(false, false);
        let argv = vec![
            "sh".to_string(),
            "-c".to_string(),
            format!("echo \"$OVENV_TEST_FLAG\" > '{}'", capture.display()),
        ];
        runner.run(&argv, None, &extra).unwrap();
        assert_eq!(std::fs::read_to_string(&capture).unwrap().trim(), "on");
    }
}
