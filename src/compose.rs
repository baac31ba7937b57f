//! Compose tooling installation.
//!
//! Three independently requested units: the v2 CLI plugin, the v1
//! standalone binary, and the compose-switch shim. Versions resolve against
//! the source repositories' tag lists; prebuilt artifacts are checksum
//! verified before install. When both v1 and the switch are present, the
//! switch wins the `docker-compose` name through the alternatives registry
//! and the v1 binary stays reachable under `docker-compose-v1`.

use log::{debug, info};
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

use crate::apt::AptClient;
use crate::config::Paths;
use crate::error::Result;
use crate::exec::CommandRunner;
use crate::fetch::Fetcher;
use crate::resolver::{extract_versions, resolve_release_tag};
use crate::types::{Architecture, VersionSpec};

const COMPOSE_REPO: &str = "https://github.com/docker/compose";
const COMPOSE_SWITCH_REPO: &str = "https://github.com/docker/compose-switch";

/// Priority of the switch shim in the alternatives registry.
const SWITCH_PRIORITY: &str = "99";
/// Priority of the renamed v1 binary.
const V1_PRIORITY: &str = "1";

pub struct ComposeInstaller<'a> {
    runner: &'a dyn CommandRunner,
    fetcher: &'a Fetcher<'a>,
    paths: &'a Paths,
    arch: Architecture,
    dry_run: bool,
}

impl<'a> ComposeInstaller<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        fetcher: &'a Fetcher<'a>,
        paths: &'a Paths,
        arch: Architecture,
        dry_run: bool,
    ) -> Self {
        Self {
            runner,
            fetcher,
            paths,
            arch,
            dry_run,
        }
    }

    fn v1_binary(&self) -> PathBuf {
        self.paths.local_bin.join("docker-compose")
    }

    fn v1_renamed(&self) -> PathBuf {
        self.paths.local_bin.join("docker-compose-v1")
    }

    fn switch_binary(&self) -> PathBuf {
        self.paths.local_bin.join("compose-switch")
    }

    /// Resolve a request against a repository's tags.
    fn resolve(&self, subject: &str, spec: &VersionSpec, repo: &str) -> Result<String> {
        let tags = self.fetcher.list_remote_tags(repo)?;
        let candidates = extract_versions(&tags, "v", '.');
        resolve_release_tag(subject, spec, &candidates)
    }

    /// Install the compose v2 CLI plugin.
    pub fn install_plugin(&self, spec: &VersionSpec) -> Result<()> {
        if spec.is_skip() {
            debug!("compose plugin not requested, skipping");
            return Ok(());
        }
        let plugin_path = self.paths.cli_plugins_dir.join("docker-compose");
        if plugin_path.exists() {
            info!("compose plugin already installed, skipping");
            return Ok(());
        }

        let version = self.resolve("docker-compose plugin", spec, COMPOSE_REPO)?;
        if self.dry_run {
            info!("dry-run: would install compose plugin {}", version);
            return Ok(());
        }

        let filename = format!("docker-compose-linux-{}", self.arch.compose_suffix());
        let artifact_url = format!(
            "{}/releases/download/v{}/{}",
            COMPOSE_REPO, version, filename
        );
        let checksum_url = format!("{}.sha256", artifact_url);
        let artifact = self
            .fetcher
            .download_verified(&artifact_url, &checksum_url, &filename)?;
        self.fetcher.install_file(&artifact, &plugin_path, 0o755)?;
        info!("installed compose plugin {}", version);
        Ok(())
    }

    /// Install the compose v1 standalone binary.
    ///
    /// On the reference architecture a checksummed release binary is
    /// downloaded; elsewhere installation falls back to pip, which has no
    /// equivalent verification.
    pub fn install_v1(&self, apt: &mut AptClient, spec: &VersionSpec) -> Result<()> {
        if spec.is_skip() {
            debug!("compose v1 not requested, skipping");
            return Ok(());
        }
        if self.v1_binary().exists() || self.v1_renamed().exists() {
            info!("compose v1 already installed, skipping");
            return Ok(());
        }

        if self.arch.has_compose_v1_binary() {
            let version = self.resolve("docker-compose v1", spec, COMPOSE_REPO)?;
            if self.dry_run {
                info!("dry-run: would install compose v1 {}", version);
                return Ok(());
            }
            let filename = "docker-compose-Linux-x86_64";
            let artifact_url = format!(
                "{}/releases/download/{}/{}",
                COMPOSE_REPO, version, filename
            );
            let checksum_url = format!("{}.sha256", artifact_url);
            let artifact = self
                .fetcher
                .download_verified(&artifact_url, &checksum_url, filename)?;
            self.fetcher
                .install_file(&artifact, &self.v1_binary(), 0o755)?;
            info!("installed compose v1 {}", version);
        } else {
            // The pip channel has no tag list or checksum to pin against
            if self.dry_run {
                info!("dry-run: would install compose v1 via pip");
                return Ok(());
            }
            apt.ensure_packages(&["python3-minimal", "python3-pip"])?;
            self.runner
                .apply(
                    "pip3",
                    &["install", "--disable-pip-version-check", "--no-cache-dir", "docker-compose"],
                )?
                .ensure_success("pip3 install docker-compose")?;
            info!("installed compose v1 via pip");
        }
        Ok(())
    }

    /// Install the compose-switch shim.
    ///
    /// The project publishes no checksum file; the transfer tool's own
    /// failure handling is the only verification.
    pub fn install_switch(&self, spec: &VersionSpec) -> Result<()> {
        if spec.is_skip() {
            debug!("compose-switch not requested, skipping");
            return Ok(());
        }
        let switch_path = self.switch_binary();
        if switch_path.exists() {
            info!("compose-switch already installed, skipping");
            return Ok(());
        }

        let version = self.resolve("compose-switch", spec, COMPOSE_SWITCH_REPO)?;
        if self.dry_run {
            info!("dry-run: would install compose-switch {}", version);
            return Ok(());
        }

        let artifact_url = format!(
            "{}/releases/download/v{}/docker-compose-linux-{}",
            COMPOSE_SWITCH_REPO, version, self.arch
        );
        self.fetcher.download(&artifact_url, &switch_path)?;
        std::fs::set_permissions(&switch_path, std::fs::Permissions::from_mode(0o755))?;
        info!("installed compose-switch {}", version);
        Ok(())
    }

    /// Register the switch and the renamed v1 binary in the alternatives
    /// registry, switch first.
    ///
    /// Only applies when both units are present; the v1 binary is renamed
    /// out of the way so the alternatives link owns the command name.
    pub fn register_alternatives(&self) -> Result<()> {
        if self.v1_renamed().exists() {
            debug!("alternatives already registered, skipping");
            return Ok(());
        }
        if !self.switch_binary().exists() || !self.v1_binary().exists() {
            debug!("switch and v1 not both present, skipping alternatives registration");
            return Ok(());
        }
        if self.dry_run {
            info!("dry-run: would register docker-compose alternatives");
            return Ok(());
        }

        std::fs::rename(self.v1_binary(), self.v1_renamed())?;

        let link = self.v1_binary();
        let link_str = link.to_string_lossy();
        let switch_str = self.switch_binary().to_string_lossy().to_string();
        let renamed_str = self.v1_renamed().to_string_lossy().to_string();

        self.runner
            .apply(
                "update-alternatives",
                &[
                    "--install",
                    &link_str,
                    "docker-compose",
                    &switch_str,
                    SWITCH_PRIORITY,
                ],
            )?
            .ensure_success("update-alternatives (compose-switch)")?;
        self.runner
            .apply(
                "update-alternatives",
                &[
                    "--install",
                    &link_str,
                    "docker-compose",
                    &renamed_str,
                    V1_PRIORITY,
                ],
            )?
            .ensure_success("update-alternatives (docker-compose-v1)")?;
        info!("registered compose-switch as the docker-compose alternative");
        Ok(())
    }
}
