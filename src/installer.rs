//! Provisioning orchestration.
//!
//! One sequential pass, fail-fast: the first unhandled failure aborts the
//! run with no rollback (the tool targets disposable build contexts).
//! Network calls are classified here, in one place: the settings fetch is
//! best-effort; everything else (key fetch, index refresh, artifact and
//! checksum downloads, tag listing) is essential and fatal on failure.

use log::{debug, info};

use crate::apt::AptClient;
use crate::compose::ComposeInstaller;
use crate::config::{Paths, ProvisionConfig};
use crate::engine;
use crate::error::Result;
use crate::exec::CommandRunner;
use crate::fetch::Fetcher;
use crate::init_script;
use crate::sanity;
use crate::users;

/// Optional provisioning metadata; absence never fails a build.
const SETTINGS_URL: &str = "https://aka.ms/devcontainers/provision-settings.json";

/// Environment export appended to shell rc files.
const RC_EXPORT: &str = "export DOCKER_BUILDKIT=1";

/// Run the full provisioning sequence.
pub fn provision(config: &ProvisionConfig, paths: &Paths, runner: &dyn CommandRunner) -> Result<()> {
    // Architecture rejection happens before any package operation
    let arch = sanity::detect_architecture(runner)?;
    let os = sanity::detect_os_release(&paths.os_release)?;
    info!(
        "provisioning {} engine on {}/{} ({})",
        config.edition, os.id, os.codename, arch
    );

    let fetcher = Fetcher::new(runner);
    let result = run_steps(config, paths, runner, &fetcher, arch, &os);
    fetcher.cleanup();
    result
}

fn run_steps(
    config: &ProvisionConfig,
    paths: &Paths,
    runner: &dyn CommandRunner,
    fetcher: &Fetcher,
    arch: crate::types::Architecture,
    os: &sanity::OsRelease,
) -> Result<()> {
    if let Some(settings) = fetcher.fetch_settings(SETTINGS_URL) {
        debug!("provisioning settings: {}", settings);
    }

    let mut apt = AptClient::new(runner, paths.apt_lists_dir.clone());

    engine::install_engine(runner, &mut apt, fetcher, config, os, arch, paths)?;

    let any_compose = !config.compose_plugin_version.is_skip()
        || !config.compose_switch_version.is_skip()
        || !config.compose_v1_version.is_skip();
    if any_compose {
        // Tag listings need git
        apt.ensure_packages(&["git"])?;
        let compose = ComposeInstaller::new(runner, fetcher, paths, arch, config.dry_run);
        compose.install_plugin(&config.compose_plugin_version)?;
        compose.install_v1(&mut apt, &config.compose_v1_version)?;
        compose.install_switch(&config.compose_switch_version)?;
        compose.register_alternatives()?;
    }

    if init_script::sentinel_exists(paths) {
        info!("init script already present, setup previously completed");
        return Ok(());
    }

    let username = users::resolve_username(runner, &config.username);
    if config.enable_nonroot {
        if config.dry_run {
            info!("dry-run: would configure docker group for {}", username);
        } else {
            users::configure_docker_group(runner, &username)?;
        }
    }

    if config.update_rc {
        users::append_rc_exports(paths, RC_EXPORT, config.dry_run)?;
    }

    init_script::install(runner, paths, &username, config.dry_run)?;

    info!("provisioning complete");
    Ok(())
}
