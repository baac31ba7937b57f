//! Sanctioned command execution layer.
//!
//! Every external tool the provisioner touches (`apt-get`, `curl`, `getent`,
//! `sha256sum`, ...) is reached through the [`CommandRunner`] trait. This is
//! the ONLY place allowed to spawn processes; components receive a
//! `&dyn CommandRunner` so orchestration logic is testable with fakes
//! instead of real package managers or network access.
//!
//! # Dry-run contract
//!
//! `run` is for read-only queries and always executes, so previews stay
//! realistic. `apply` is for mutations and is skipped (logged only) when
//! dry-run is enabled.

use anyhow::{Context, Result};
use log::{debug, info};
use std::process::{Command, Stdio};

/// Captured output from an external command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Standard output from the command.
    pub stdout: String,
    /// Standard error from the command.
    pub stderr: String,
    /// Exit code (None if terminated by signal).
    pub exit_code: Option<i32>,
    /// Whether the command exited successfully (exit code 0).
    pub success: bool,
}

impl CommandOutput {
    /// A synthetic success, used for skipped dry-run mutations.
    pub fn skipped() -> Self {
        Self {
            stdout: String::new(),
            stderr: String::new(),
            exit_code: Some(0),
            success: true,
        }
    }

    /// Check that the command succeeded and return an error if not.
    pub fn ensure_success(&self, context: &str) -> Result<&Self> {
        if self.success {
            Ok(self)
        } else {
            let code = self.exit_code.unwrap_or(-1);
            anyhow::bail!(
                "{} failed with exit code {}: {}",
                context,
                code,
                self.stderr.trim()
            )
        }
    }

    /// Standard output with surrounding whitespace removed.
    pub fn stdout_trimmed(&self) -> &str {
        self.stdout.trim()
    }
}

/// Capability for running external commands.
pub trait CommandRunner {
    /// Execute a read-only query. Always runs, even in dry-run mode.
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput>;

    /// Execute a query with a working directory (checksum verification
    /// resolves artifact names relative to the scratch directory).
    /// Process-spawning implementations must honor `dir`.
    fn run_in(&self, dir: &std::path::Path, program: &str, args: &[&str]) -> Result<CommandOutput> {
        let _ = dir;
        self.run(program, args)
    }

    /// Execute a mutating command with extra environment variables.
    /// Skipped in dry-run mode.
    fn apply_with_env(
        &self,
        program: &str,
        args: &[&str],
        env: &[(&str, &str)],
    ) -> Result<CommandOutput>;

    /// Execute a mutating command. Skipped in dry-run mode.
    fn apply(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        self.apply_with_env(program, args, &[])
    }

    /// Whether mutations are being skipped.
    fn is_dry_run(&self) -> bool {
        false
    }
}

/// The real runner: spawns processes and captures their output.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    dry_run: bool,
}

impl SystemRunner {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    fn execute(&self, program: &str, args: &[&str], env: &[(&str, &str)]) -> Result<CommandOutput> {
        debug!("exec: {} {:?}", program, args);

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for (key, value) in env {
            cmd.env(key, value);
        }

        let output = cmd
            .output()
            .with_context(|| format!("Failed to spawn command: {}", program))?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code(),
            success: output.status.success(),
        })
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        self.execute(program, args, &[])
    }

    fn run_in(&self, dir: &std::path::Path, program: &str, args: &[&str]) -> Result<CommandOutput> {
        debug!("exec (in {}): {} {:?}", dir.display(), program, args);
        let output = Command::new(program)
            .args(args)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .with_context(|| format!("Failed to spawn command: {}", program))?;
        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code(),
            success: output.status.success(),
        })
    }

    fn apply_with_env(
        &self,
        program: &str,
        args: &[&str],
        env: &[(&str, &str)],
    ) -> Result<CommandOutput> {
        if self.dry_run {
            info!("dry-run: skipping {} {}", program, args.join(" "));
            return Ok(CommandOutput::skipped());
        }
        self.execute(program, args, env)
    }

    fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_captures_stdout() {
        let runner = SystemRunner::new(false);
        let out = runner.run("echo", &["hello"]).unwrap();
        assert!(out.success);
        assert_eq!(out.stdout_trimmed(), "hello");
    }

    #[test]
    fn test_run_reports_failure() {
        let runner = SystemRunner::new(false);
        let out = runner.run("false", &[]).unwrap();
        assert!(!out.success);
        assert!(out.ensure_success("false").is_err());
    }

    #[test]
    fn test_dry_run_skips_apply_but_not_run() {
        let runner = SystemRunner::new(true);

        let applied = runner.apply("false", &[]).unwrap();
        assert!(applied.success, "dry-run apply should be a synthetic success");

        let queried = runner.run("echo", &["real"]).unwrap();
        assert_eq!(queried.stdout_trimmed(), "real", "queries still execute");
    }

    #[test]
    fn test_apply_with_env_passes_environment() {
        let runner = SystemRunner::new(false);
        let out = runner
            .apply_with_env("sh", &["-c", "printf %s \"$PROVISION_PROBE\""], &[("PROVISION_PROBE", "on")])
            .unwrap();
        assert_eq!(out.stdout, "on");
    }
}
