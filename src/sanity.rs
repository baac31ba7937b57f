//! Pre-flight checks for the provisioning environment.
//!
//! Verifies the environment before any package operation:
//! - Running with root privileges (EUID 0)
//! - Supported CPU architecture
//! - Host distribution id and codename (selects the package repository)
//!
//! Privilege and architecture failures are fatal with exit code 1 before
//! anything is installed.

use std::path::Path;

use log::debug;

use crate::error::{ProvisionError, Result};
use crate::exec::CommandRunner;
use crate::types::Architecture;

/// Distribution identity parsed from `/etc/os-release`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsRelease {
    /// Lowercase distribution id (`ubuntu`, `debian`)
    pub id: String,
    /// Release codename (`focal`, `bullseye`)
    pub codename: String,
}

/// Check if running as root (EUID 0).
pub fn is_running_as_root() -> bool {
    // Using nix crate for reliable EUID check
    nix::unistd::geteuid().is_root()
}

/// Fail unless running as root.
pub fn require_root() -> Result<()> {
    if is_running_as_root() {
        Ok(())
    } else {
        Err(ProvisionError::precondition(
            "this tool must be run as root (use sudo)",
        ))
    }
}

/// Check if a binary is available in PATH.
pub fn binary_exists(runner: &dyn CommandRunner, name: &str) -> bool {
    runner
        .run("which", &[name])
        .map(|output| output.success)
        .unwrap_or(false)
}

/// Detect the host architecture via dpkg, rejecting unsupported tokens.
pub fn detect_architecture(runner: &dyn CommandRunner) -> Result<Architecture> {
    let output = runner.run("dpkg", &["--print-architecture"])?;
    output.ensure_success("dpkg --print-architecture")?;
    let arch = Architecture::from_dpkg(output.stdout_trimmed())?;
    debug!("detected architecture: {}", arch);
    Ok(arch)
}

/// Parse distribution id and codename from an os-release file.
pub fn detect_os_release(path: &Path) -> Result<OsRelease> {
    let contents = std::fs::read_to_string(path)?;
    parse_os_release(&contents).ok_or_else(|| {
        ProvisionError::precondition(format!(
            "could not determine distribution from {}",
            path.display()
        ))
    })
}

fn parse_os_release(contents: &str) -> Option<OsRelease> {
    let mut id = None;
    let mut codename = None;
    for line in contents.lines() {
        let line = line.trim();
        if let Some(value) = line.strip_prefix("ID=") {
            id = Some(unquote(value).to_ascii_lowercase());
        } else if let Some(value) = line.strip_prefix("VERSION_CODENAME=") {
            codename = Some(unquote(value).to_string());
        }
    }
    Some(OsRelease {
        id: id?,
        codename: codename?,
    })
}

fn unquote(value: &str) -> &str {
    value.trim().trim_matches('"')
}
