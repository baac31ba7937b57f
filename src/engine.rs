//! Engine and CLI installation.
//!
//! Configures the package repository for the chosen family, resolves the
//! requested version against the repository's own listing, and installs the
//! daemon and client pinned to the resolved versions. Both packages must
//! resolve before either installs; a partial resolution is a hard error,
//! never a silent fallback.

use log::info;

use crate::apt::AptClient;
use crate::config::{Paths, ProvisionConfig};
use crate::error::Result;
use crate::exec::CommandRunner;
use crate::fetch::Fetcher;
use crate::repo::engine_repository;
use crate::resolver::resolve_package_version;
use crate::sanity::{self, OsRelease};
use crate::types::{Architecture, EngineEdition};

/// Packages required before any repository or download step.
const PREREQUISITES: &[&str] = &[
    "apt-transport-https",
    "ca-certificates",
    "curl",
    "gnupg2",
    "dirmngr",
];

/// Install the engine/CLI family at the requested version.
pub fn install_engine(
    runner: &dyn CommandRunner,
    apt: &mut AptClient,
    fetcher: &Fetcher,
    config: &ProvisionConfig,
    os: &OsRelease,
    arch: Architecture,
    paths: &Paths,
) -> Result<()> {
    if sanity::binary_exists(runner, "docker") {
        info!("engine already installed, skipping");
        return Ok(());
    }

    apt.ensure_packages(PREREQUISITES)?;

    let repo = engine_repository(config.edition, os, arch, paths);
    if repo.configure(runner, fetcher, config.dry_run)? {
        // The new source is invisible until the index is refreshed
        apt.refresh()?;
    }

    let engine_pkg = config.edition.engine_package();
    let cli_pkg = config.edition.cli_package();

    let engine_version = resolve_package_version(
        engine_pkg,
        &config.engine_version,
        &apt.available_versions(engine_pkg)?,
    )?;
    let cli_version = resolve_package_version(
        cli_pkg,
        &config.engine_version,
        &apt.available_versions(cli_pkg)?,
    )?;
    info!(
        "resolved {}={}, {}={}",
        engine_pkg, engine_version, cli_pkg, cli_version
    );

    apt.install_pinned(&[(cli_pkg, &cli_version), (engine_pkg, &engine_version)])?;

    if config.edition == EngineEdition::Moby {
        apt.ensure_packages(&["moby-buildx"])?;
        // Not published for every distribution
        apt.try_install("moby-compose")?;
    }

    Ok(())
}
