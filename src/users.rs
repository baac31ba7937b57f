//! Non-root user selection and shell configuration.
//!
//! Account lookups go through `getent` so the orchestration stays testable;
//! group membership changes go through the standard user tools.

use log::{debug, info};
use std::io::Write;

use crate::config::Paths;
use crate::error::Result;
use crate::exec::CommandRunner;
use crate::types::UserSpec;

/// Candidate account names probed for `automatic`, in priority order.
const CANDIDATE_ACCOUNTS: &[&str] = &["vscode", "node", "codespace"];

/// Whether an account exists.
pub fn account_exists(runner: &dyn CommandRunner, name: &str) -> bool {
    runner
        .run("getent", &["passwd", name])
        .map(|output| output.success)
        .unwrap_or(false)
}

/// Name of the account with the given numeric uid, if any.
fn account_with_uid(runner: &dyn CommandRunner, uid: u32) -> Option<String> {
    let uid_str = uid.to_string();
    let output = runner.run("getent", &["passwd", &uid_str]).ok()?;
    if !output.success {
        return None;
    }
    output
        .stdout
        .lines()
        .next()?
        .split(':')
        .next()
        .map(str::to_string)
        .filter(|name| !name.is_empty())
}

/// Resolve the requested user to a concrete account name.
///
/// `automatic` probes the candidate list, then uid 1000; a named account
/// that does not exist falls back to root, as does `none`.
pub fn resolve_username(runner: &dyn CommandRunner, spec: &UserSpec) -> String {
    let resolved = match spec {
        UserSpec::Auto => CANDIDATE_ACCOUNTS
            .iter()
            .find(|name| account_exists(runner, name))
            .map(|name| name.to_string())
            .or_else(|| account_with_uid(runner, 1000))
            .unwrap_or_else(|| "root".to_string()),
        UserSpec::Root => "root".to_string(),
        UserSpec::Named(name) => {
            if account_exists(runner, name) {
                name.clone()
            } else {
                "root".to_string()
            }
        }
    };
    debug!("resolved user '{}' from request '{}'", resolved, spec);
    resolved
}

/// Create the `docker` group if missing and add the user to it.
///
/// No-op for root: the superuser already reaches the daemon socket.
pub fn configure_docker_group(runner: &dyn CommandRunner, username: &str) -> Result<()> {
    if username == "root" {
        debug!("user is root, skipping docker group configuration");
        return Ok(());
    }
    let group_exists = runner
        .run("getent", &["group", "docker"])
        .map(|output| output.success)
        .unwrap_or(false);
    if !group_exists {
        info!("creating docker group");
        runner
            .apply("groupadd", &["docker"])?
            .ensure_success("groupadd docker")?;
    }
    info!("adding {} to docker group", username);
    runner
        .apply("usermod", &["-aG", "docker", username])?
        .ensure_success("usermod -aG docker")?;
    Ok(())
}

/// Append an environment export to every existing shell rc file,
/// idempotently: files already carrying the line are left alone, missing
/// files are skipped.
pub fn append_rc_exports(paths: &Paths, line: &str, dry_run: bool) -> Result<()> {
    for rc_file in &paths.rc_files {
        let contents = match std::fs::read_to_string(rc_file) {
            Ok(contents) => contents,
            Err(_) => {
                debug!("rc file {} not present, skipping", rc_file.display());
                continue;
            }
        };
        if contents.lines().any(|existing| existing.trim() == line) {
            debug!("{} already contains export, skipping", rc_file.display());
            continue;
        }
        if dry_run {
            info!("dry-run: would append '{}' to {}", line, rc_file.display());
            continue;
        }
        let mut file = std::fs::OpenOptions::new().append(true).open(rc_file)?;
        writeln!(file, "{}", line)?;
        info!("appended engine export to {}", rc_file.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn paths_with_rc(dir: &std::path::Path) -> Paths {
        let mut paths = Paths::rooted_at(dir);
        paths.rc_files = vec![dir.join("bash.bashrc"), dir.join("zsh/zshrc")];
        paths
    }

    #[test]
    fn test_append_rc_exports_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths_with_rc(dir.path());
        let rc = PathBuf::from(&paths.rc_files[0]);
        std::fs::write(&rc, "# system rc\n").unwrap();

        append_rc_exports(&paths, "export DOCKER_BUILDKIT=1", false).unwrap();
        append_rc_exports(&paths, "export DOCKER_BUILDKIT=1", false).unwrap();

        let contents = std::fs::read_to_string(&rc).unwrap();
        assert_eq!(
            contents.matches("export DOCKER_BUILDKIT=1").count(),
            1,
            "repeated runs must not duplicate the export"
        );
    }

    #[test]
    fn test_append_rc_exports_skips_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths_with_rc(dir.path());
        // Neither rc file exists; nothing to do, nothing to fail
        append_rc_exports(&paths, "export DOCKER_BUILDKIT=1", false).unwrap();
        assert!(!paths.rc_files[0].exists());
    }

    #[test]
    fn test_append_rc_exports_dry_run_leaves_files_alone() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths_with_rc(dir.path());
        let rc = PathBuf::from(&paths.rc_files[0]);
        std::fs::write(&rc, "# system rc\n").unwrap();

        append_rc_exports(&paths, "export DOCKER_BUILDKIT=1", true).unwrap();
        let contents = std::fs::read_to_string(&rc).unwrap();
        assert!(!contents.contains("DOCKER_BUILDKIT"));
    }
}
