//! Package index client.
//!
//! Wraps the system package tooling behind one struct: lazy index refresh
//! (at most once per run, only when the cache directory is empty),
//! per-package existence checks via dpkg, preference-ordered version
//! listings via `apt-cache madison`, and pinned installs.

use log::{debug, info, warn};
use std::path::PathBuf;

use crate::error::Result;
use crate::exec::CommandRunner;

/// Frontend marker supplied to every apt invocation.
const APT_ENV: &[(&str, &str)] = &[("DEBIAN_FRONTEND", "noninteractive")];

pub struct AptClient<'a> {
    runner: &'a dyn CommandRunner,
    lists_dir: PathBuf,
    refreshed: bool,
}

impl<'a> AptClient<'a> {
    pub fn new(runner: &'a dyn CommandRunner, lists_dir: PathBuf) -> Self {
        Self {
            runner,
            lists_dir,
            refreshed: false,
        }
    }

    /// Refresh the package index if the cache directory is empty.
    ///
    /// Runs at most once per provisioning run, never unconditionally, to
    /// avoid redundant network calls across repeated invocations.
    pub fn update_if_needed(&mut self) -> Result<()> {
        if self.refreshed {
            return Ok(());
        }
        let cache_populated = std::fs::read_dir(&self.lists_dir)
            .map(|mut entries| entries.next().is_some())
            .unwrap_or(false);
        if cache_populated {
            debug!("package index cache already populated, skipping update");
        } else {
            info!("refreshing package index");
            self.runner
                .apply_with_env("apt-get", &["update"], APT_ENV)?
                .ensure_success("apt-get update")?;
        }
        self.refreshed = true;
        Ok(())
    }

    /// Refresh the package index unconditionally, used after adding a new
    /// package source that an existing cache cannot know about.
    pub fn refresh(&mut self) -> Result<()> {
        info!("refreshing package index");
        self.runner
            .apply_with_env("apt-get", &["update"], APT_ENV)?
            .ensure_success("apt-get update")?;
        self.refreshed = true;
        Ok(())
    }

    /// Whether a package is already installed.
    pub fn is_installed(&self, package: &str) -> bool {
        self.runner
            .run("dpkg", &["-s", package])
            .map(|output| output.success)
            .unwrap_or(false)
    }

    /// Install any of the given packages that are not already present.
    pub fn ensure_packages(&mut self, packages: &[&str]) -> Result<()> {
        let missing: Vec<&str> = packages
            .iter()
            .copied()
            .filter(|pkg| !self.is_installed(pkg))
            .collect();
        if missing.is_empty() {
            debug!("packages already installed: {}", packages.join(" "));
            return Ok(());
        }
        self.update_if_needed()?;
        info!("installing packages: {}", missing.join(" "));
        let mut args = vec!["-y", "install", "--no-install-recommends"];
        args.extend_from_slice(&missing);
        self.runner
            .apply_with_env("apt-get", &args, APT_ENV)?
            .ensure_success("apt-get install")?;
        Ok(())
    }

    /// Best-effort install of an optional package; unavailability is logged
    /// and tolerated.
    pub fn try_install(&mut self, package: &str) -> Result<()> {
        if self.is_installed(package) {
            return Ok(());
        }
        self.update_if_needed()?;
        let output = self.runner.apply_with_env(
            "apt-get",
            &["-y", "install", "--no-install-recommends", package],
            APT_ENV,
        )?;
        if !output.success {
            warn!("optional package {} is not available, skipping", package);
        }
        Ok(())
    }

    /// Available versions of a package, most preferred first, as reported
    /// by `apt-cache madison`.
    pub fn available_versions(&self, package: &str) -> Result<Vec<String>> {
        let output = self.runner.run("apt-cache", &["madison", package])?;
        output.ensure_success("apt-cache madison")?;
        Ok(parse_madison(&output.stdout))
    }

    /// Install packages pinned to exact versions (`pkg=version`).
    pub fn install_pinned(&mut self, pins: &[(&str, &str)]) -> Result<()> {
        self.update_if_needed()?;
        let pinned: Vec<String> = pins
            .iter()
            .map(|(pkg, version)| format!("{}={}", pkg, version))
            .collect();
        info!("installing pinned packages: {}", pinned.join(" "));
        let mut args = vec!["-y", "install", "--no-install-recommends"];
        args.extend(pinned.iter().map(String::as_str));
        self.runner
            .apply_with_env("apt-get", &args, APT_ENV)?
            .ensure_success("apt-get install (pinned)")?;
        Ok(())
    }
}

/// Parse `apt-cache madison` output into version strings, preserving the
/// tool's own preference order.
///
/// Lines look like `moby-engine | 20.10.6+azure-1 | https://... amd64 Packages`.
fn parse_madison(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter_map(|line| {
            let mut fields = line.split('|');
            let _package = fields.next()?;
            Some(fields.next()?.trim().to_string())
        })
        .filter(|version| !version.is_empty())
        .collect()
}
