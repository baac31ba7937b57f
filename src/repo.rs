//! apt repository configuration for the engine package families.
//!
//! Each family ships from its own repository with its own signing key:
//! the open-source engine from the vendor package host, Docker CE from the
//! upstream download host. Entries are keyed by distribution id, codename,
//! and architecture.

use log::{debug, info};
use std::path::PathBuf;

use crate::config::Paths;
use crate::error::Result;
use crate::exec::CommandRunner;
use crate::fetch::Fetcher;
use crate::sanity::OsRelease;
use crate::types::{Architecture, EngineEdition};

/// A package repository: signing key plus source-list entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AptRepository {
    pub key_url: String,
    pub keyring_path: PathBuf,
    pub list_path: PathBuf,
    pub entry: String,
}

/// Build the repository definition for the chosen engine family.
pub fn engine_repository(
    edition: EngineEdition,
    os: &OsRelease,
    arch: Architecture,
    paths: &Paths,
) -> AptRepository {
    match edition {
        EngineEdition::Moby => {
            let keyring = paths.keyring_dir.join("microsoft.gpg");
            AptRepository {
                key_url: "https://packages.microsoft.com/keys/microsoft.asc".to_string(),
                entry: format!(
                    "deb [arch={} signed-by={}] https://packages.microsoft.com/repos/microsoft-{}-{}-prod {} main",
                    arch,
                    keyring.display(),
                    os.id,
                    os.codename,
                    os.codename
                ),
                keyring_path: keyring,
                list_path: paths.apt_sources_dir.join("microsoft.list"),
            }
        }
        EngineEdition::DockerCe => {
            let keyring = paths.keyring_dir.join("docker-archive-keyring.gpg");
            AptRepository {
                key_url: format!("https://download.docker.com/linux/{}/gpg", os.id),
                entry: format!(
                    "deb [arch={} signed-by={}] https://download.docker.com/linux/{} {} stable",
                    arch,
                    keyring.display(),
                    os.id,
                    os.codename
                ),
                keyring_path: keyring,
                list_path: paths.apt_sources_dir.join("docker.list"),
            }
        }
    }
}

impl AptRepository {
    /// Install the signing key and source-list entry.
    ///
    /// Returns true when the source list changed (the package index must be
    /// refreshed before the new repository is visible). Already-configured
    /// repositories are left untouched.
    pub fn configure(
        &self,
        runner: &dyn CommandRunner,
        fetcher: &Fetcher,
        dry_run: bool,
    ) -> Result<bool> {
        let current = std::fs::read_to_string(&self.list_path).ok();
        if current.as_deref().map(str::trim) == Some(self.entry.as_str()) {
            debug!("repository already configured: {}", self.list_path.display());
            return Ok(false);
        }
        if dry_run {
            info!("dry-run: would configure repository {}", self.entry);
            return Ok(false);
        }

        let key_asc = self.keyring_path.with_extension("asc");
        fetcher.download(&self.key_url, &key_asc)?;
        let key_asc_str = key_asc.to_string_lossy();
        let keyring_str = self.keyring_path.to_string_lossy();
        runner
            .apply("gpg", &["--dearmor", "--yes", "-o", &keyring_str, &key_asc_str])?
            .ensure_success("gpg --dearmor")?;
        let _ = std::fs::remove_file(&key_asc);

        if let Some(parent) = self.list_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.list_path, format!("{}\n", self.entry))?;
        info!("configured repository: {}", self.entry);
        Ok(true)
    }
}
