//! Command-line argument surface.
//!
//! The positional contract mirrors the feature-install convention this tool
//! is invoked with from image build files: seven ordered string tokens, each
//! defaulted, parsed into typed configuration immediately after clap.

use clap::Parser;
use std::path::PathBuf;

/// Installs and configures a container engine inside a base image so
/// containers can run nested containers.
#[derive(Parser, Debug)]
#[command(name = "dind-setup")]
#[command(about = "Provision a container engine for nested-container use")]
#[command(version)]
pub struct Cli {
    /// Configure a non-root user for engine access (true/false)
    #[arg(value_name = "ENABLE_NONROOT", default_value = "true")]
    pub enable_nonroot: String,

    /// Account to configure (auto/automatic, none, or a literal name)
    #[arg(value_name = "USERNAME", default_value = "automatic")]
    pub username: String,

    /// Install the open-source engine family instead of Docker CE (true/false)
    #[arg(value_name = "USE_MOBY", default_value = "true")]
    pub use_moby: String,

    /// Engine/CLI version (latest, lts, stable, or a version prefix)
    #[arg(value_name = "ENGINE_VERSION", default_value = "latest")]
    pub engine_version: String,

    /// Compose v2 plugin version (latest, a version prefix, or none)
    #[arg(value_name = "COMPOSE_VERSION", default_value = "latest")]
    pub compose_version: String,

    /// compose-switch version (latest, a version prefix, or none)
    #[arg(value_name = "COMPOSE_SWITCH_VERSION", default_value = "latest")]
    pub compose_switch_version: String,

    /// Compose v1 standalone version (a version prefix or none)
    #[arg(value_name = "COMPOSE_V1_VERSION", default_value = "1")]
    pub compose_v1_version: String,

    /// Load all values from a JSON configuration file (positionals ignored)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write the resolved configuration to a JSON file and exit
    #[arg(long)]
    pub save_config: Option<PathBuf>,

    /// Dry-run mode: show what would be executed without making changes.
    ///
    /// In this mode, mutating commands and file writes are skipped and
    /// logged. Read-only queries (architecture, account lookups, version
    /// listings) still execute so the preview is realistic.
    #[arg(long)]
    pub dry_run: bool,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_the_positional_contract() {
        let cli = Cli::parse_from(["dind-setup"]);
        assert_eq!(cli.enable_nonroot, "true");
        assert_eq!(cli.username, "automatic");
        assert_eq!(cli.use_moby, "true");
        assert_eq!(cli.engine_version, "latest");
        assert_eq!(cli.compose_version, "latest");
        assert_eq!(cli.compose_switch_version, "latest");
        assert_eq!(cli.compose_v1_version, "1");
        assert!(!cli.dry_run);
    }

    #[test]
    fn test_positionals_in_order() {
        let cli = Cli::parse_from([
            "dind-setup", "true", "auto", "true", "latest", "none", "none", "none",
        ]);
        assert_eq!(cli.username, "auto");
        assert_eq!(cli.compose_version, "none");
        assert_eq!(cli.compose_v1_version, "none");
    }

    #[test]
    fn test_dry_run_flag() {
        let cli = Cli::parse_from(["dind-setup", "--dry-run"]);
        assert!(cli.dry_run);
    }
}
