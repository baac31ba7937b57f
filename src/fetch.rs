//! Release-artifact downloads, checksum verification, tag listing, and the
//! best-effort settings fetch.
//!
//! Network transfers shell out to `curl` and `git`; verification shells out
//! to `sha256sum -c` so the checksum tool's own non-zero exit propagates as
//! provisioning failure. Artifacts land in a per-process scratch directory
//! and are only moved into place after verification succeeds.

use log::{debug, info, warn};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use crate::error::{ProvisionError, Result};
use crate::exec::CommandRunner;

pub struct Fetcher<'a> {
    runner: &'a dyn CommandRunner,
    scratch: PathBuf,
}

impl<'a> Fetcher<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        // Unique per instance so concurrent runs never share scratch space
        static SEQ: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(0);
        let seq = SEQ.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let scratch =
            std::env::temp_dir().join(format!("dind-setup-{}-{}", std::process::id(), seq));
        Self { runner, scratch }
    }

    /// Fetcher with an explicit scratch directory (tests).
    pub fn with_scratch(runner: &'a dyn CommandRunner, scratch: PathBuf) -> Self {
        Self { runner, scratch }
    }

    /// Download a URL to a destination path.
    pub fn download(&self, url: &str, dest: &Path) -> Result<()> {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        debug!("downloading {}", url);
        let dest_str = dest.to_string_lossy();
        self.runner
            .run("curl", &["-fsSL", "-o", &dest_str, url])?
            .ensure_success("curl")?;
        Ok(())
    }

    /// Download an artifact and its co-published checksum file into the
    /// scratch directory, verify, and return the verified artifact path.
    ///
    /// On mismatch nothing reaches a final location; the artifact stays in
    /// scratch and is removed with it.
    pub fn download_verified(
        &self,
        artifact_url: &str,
        checksum_url: &str,
        filename: &str,
    ) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.scratch)?;
        let artifact = self.scratch.join(filename);
        let checksum = self.scratch.join(format!("{}.sha256", filename));

        self.download(artifact_url, &artifact)?;
        self.download(checksum_url, &checksum)?;

        let checksum_name = format!("{}.sha256", filename);
        let verify = self
            .runner
            .run_in(&self.scratch, "sha256sum", &["-c", &checksum_name])?;
        if !verify.success {
            return Err(ProvisionError::verification(format!(
                "checksum mismatch for {}: {}",
                filename,
                verify.stderr.trim()
            )));
        }
        info!("verified checksum for {}", filename);
        Ok(artifact)
    }

    /// Move a verified artifact into its final location with the given mode.
    pub fn install_file(&self, src: &Path, dest: &Path, mode: u32) -> Result<()> {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // rename fails across filesystems (scratch is usually a tmpfs)
        if std::fs::rename(src, dest).is_err() {
            std::fs::copy(src, dest)?;
            let _ = std::fs::remove_file(src);
        }
        std::fs::set_permissions(dest, std::fs::Permissions::from_mode(mode))?;
        info!("installed {}", dest.display());
        Ok(())
    }

    /// List tag refs of a remote source repository.
    pub fn list_remote_tags(&self, repo_url: &str) -> Result<Vec<String>> {
        let output = self.runner.run("git", &["ls-remote", "--tags", repo_url])?;
        output.ensure_success("git ls-remote")?;
        Ok(output
            .stdout
            .lines()
            .filter_map(|line| line.split_whitespace().nth(1))
            .map(str::to_string)
            .collect())
    }

    /// Best-effort settings/metadata fetch; any failure is logged and
    /// tolerated.
    pub fn fetch_settings(&self, url: &str) -> Option<serde_json::Value> {
        let output = match self.runner.run("curl", &["-fsSL", url]) {
            Ok(output) if output.success => output,
            Ok(output) => {
                warn!(
                    "settings download from {} failed (exit {:?}), continuing",
                    url, output.exit_code
                );
                return None;
            }
            Err(err) => {
                warn!("settings download from {} failed: {}, continuing", url, err);
                return None;
            }
        };
        match serde_json::from_str(&output.stdout) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!("settings payload was not valid JSON: {}, continuing", err);
                None
            }
        }
    }

    /// Remove the scratch directory. Failures are ignored.
    pub fn cleanup(&self) {
        let _ = std::fs::remove_dir_all(&self.scratch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::SystemRunner;
    use std::io::Write;

    #[test]
    fn test_install_file_sets_mode_and_moves() {
        let runner = SystemRunner::new(false);
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Fetcher::with_scratch(&runner, dir.path().join("scratch"));

        let src = dir.path().join("artifact");
        std::fs::File::create(&src)
            .unwrap()
            .write_all(b"#!/bin/sh\n")
            .unwrap();
        let dest = dir.path().join("bin/docker-compose");

        fetcher.install_file(&src, &dest, 0o755).unwrap();
        assert!(!src.exists());
        let mode = std::fs::metadata(&dest).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn test_verification_failure_with_real_sha256sum() {
        let runner = SystemRunner::new(false);
        let dir = tempfile::tempdir().unwrap();
        let scratch = dir.path().to_path_buf();
        std::fs::write(scratch.join("artifact"), b"corrupted contents").unwrap();
        // Digest of different contents
        std::fs::write(
            scratch.join("artifact.sha256"),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855  artifact\n",
        )
        .unwrap();

        let verify = runner
            .run_in(&scratch, "sha256sum", &["-c", "artifact.sha256"])
            .unwrap();
        assert!(!verify.success, "mismatched digest must fail verification");
    }
}
