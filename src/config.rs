//! Immutable provisioning configuration.
//!
//! All inputs (positional arguments, environment toggles, optional JSON
//! config file) resolve once at startup into a [`ProvisionConfig`] that is
//! passed by reference to every component — no ambient environment reads
//! past this point. [`Paths`] carries every filesystem touch point so tests
//! can redirect the whole tree into a temporary directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cli::Cli;
use crate::error::{ProvisionError, Result};
use crate::types::{EngineEdition, UserSpec, VersionSpec};

/// Provisioning configuration that can be saved/loaded as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionConfig {
    /// Configure a non-root user for engine access
    pub enable_nonroot: bool,
    /// Which account to configure
    pub username: UserSpec,
    /// Engine/CLI package family
    pub edition: EngineEdition,
    /// Engine and CLI version selector (`none` is not valid here)
    pub engine_version: VersionSpec,
    /// Compose v2 CLI plugin version selector
    pub compose_plugin_version: VersionSpec,
    /// compose-switch shim version selector
    pub compose_switch_version: VersionSpec,
    /// Compose v1 standalone version selector
    pub compose_v1_version: VersionSpec,
    /// Append the engine environment export to shell rc files
    pub update_rc: bool,
    /// Log mutations instead of performing them
    #[serde(skip)]
    pub dry_run: bool,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            enable_nonroot: true,
            username: UserSpec::Auto,
            edition: EngineEdition::Moby,
            engine_version: VersionSpec::Latest,
            compose_plugin_version: VersionSpec::Latest,
            compose_switch_version: VersionSpec::Latest,
            compose_v1_version: VersionSpec::Pinned("1".to_string()),
            update_rc: true,
            dry_run: false,
        }
    }
}

impl ProvisionConfig {
    /// Build the configuration from parsed CLI arguments.
    ///
    /// With `--config`, the file supplies every value and the positionals
    /// are ignored. `UPDATE_RC` comes from the environment (defaults on);
    /// `--dry-run` always comes from the flag.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => Self::load_from_file(path)?,
            None => Self {
                enable_nonroot: parse_bool("enable-nonroot", &cli.enable_nonroot)?,
                username: cli.username.parse()?,
                edition: if parse_bool("use-moby", &cli.use_moby)? {
                    EngineEdition::Moby
                } else {
                    EngineEdition::DockerCe
                },
                engine_version: cli.engine_version.parse()?,
                compose_plugin_version: cli.compose_version.parse()?,
                compose_switch_version: cli.compose_switch_version.parse()?,
                compose_v1_version: cli.compose_v1_version.parse()?,
                update_rc: update_rc_from_env(),
                dry_run: false,
            },
        };
        config.dry_run = cli.dry_run;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ProvisionError::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&contents).map_err(|e| {
            ProvisionError::config(format!("failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Validate cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        if self.engine_version.is_skip() {
            return Err(ProvisionError::config(
                "engine version cannot be 'none'; use 'latest' or a version",
            ));
        }
        Ok(())
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(ProvisionError::config(format!(
            "{} must be 'true' or 'false', got '{}'",
            name, other
        ))),
    }
}

fn update_rc_from_env() -> bool {
    match std::env::var("UPDATE_RC") {
        Ok(value) => !value.trim().eq_ignore_ascii_case("false"),
        Err(_) => true,
    }
}

/// Every filesystem location the provisioner touches.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Generated init script; its existence is the setup-completed marker
    pub sentinel: PathBuf,
    /// CLI plugin directory for the compose v2 plugin
    pub cli_plugins_dir: PathBuf,
    /// Destination for compose v1 and compose-switch binaries
    pub local_bin: PathBuf,
    /// apt source-list fragment directory
    pub apt_sources_dir: PathBuf,
    /// Keyring directory for repository signing keys
    pub keyring_dir: PathBuf,
    /// apt package index cache; emptiness triggers a refresh
    pub apt_lists_dir: PathBuf,
    /// Distribution identity file
    pub os_release: PathBuf,
    /// Shell rc files appended with the engine environment export
    pub rc_files: Vec<PathBuf>,
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            sentinel: PathBuf::from("/usr/local/share/docker-init.sh"),
            cli_plugins_dir: PathBuf::from("/usr/local/lib/docker/cli-plugins"),
            local_bin: PathBuf::from("/usr/local/bin"),
            apt_sources_dir: PathBuf::from("/etc/apt/sources.list.d"),
            keyring_dir: PathBuf::from("/usr/share/keyrings"),
            apt_lists_dir: PathBuf::from("/var/lib/apt/lists"),
            os_release: PathBuf::from("/etc/os-release"),
            rc_files: vec![
                PathBuf::from("/etc/bash.bashrc"),
                PathBuf::from("/etc/zsh/zshrc"),
            ],
        }
    }
}

impl Paths {
    /// Relocate every path under `root`. Used by tests to provision into a
    /// temporary directory instead of the live filesystem.
    pub fn rooted_at(root: &Path) -> Self {
        let defaults = Self::default();
        let reroot = |p: &Path| root.join(p.strip_prefix("/").unwrap_or(p));
        Self {
            sentinel: reroot(&defaults.sentinel),
            cli_plugins_dir: reroot(&defaults.cli_plugins_dir),
            local_bin: reroot(&defaults.local_bin),
            apt_sources_dir: reroot(&defaults.apt_sources_dir),
            keyring_dir: reroot(&defaults.keyring_dir),
            apt_lists_dir: reroot(&defaults.apt_lists_dir),
            os_release: reroot(&defaults.os_release),
            rc_files: defaults.rc_files.iter().map(|p| reroot(p)).collect(),
        }
    }
}
