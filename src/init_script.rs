//! Init-wrapper generation.
//!
//! The container entrypoint script ships as a versioned template resource
//! with explicit placeholder substitution, validated independently of the
//! provisioning logic. The installed file's existence doubles as the
//! setup-completed sentinel: re-running the provisioner short-circuits user
//! configuration and regeneration.

use log::info;
use std::os::unix::fs::PermissionsExt;

use crate::config::Paths;
use crate::error::{ProvisionError, Result};
use crate::exec::CommandRunner;

const TEMPLATE: &str = include_str!("../templates/docker-init.sh.in");

/// Where the generated script sends daemon output.
const DAEMON_LOG: &str = "/tmp/dockerd.log";
/// Resolver suffix identifying the cloud-internal DNS quirk.
const CLOUD_DNS_SUFFIX: &str = "internal.cloudapp.net";
/// Host resolver address injected when the quirk is present.
const CLOUD_DNS_OVERRIDE: &str = "168.63.129.16";

/// Whether a previous run already completed setup.
pub fn sentinel_exists(paths: &Paths) -> bool {
    paths.sentinel.exists()
}

/// Render the init script from its template.
///
/// Fails if any `@PLACEHOLDER@` survives substitution, so template drift is
/// caught at provision time rather than container start.
pub fn render() -> Result<String> {
    let rendered = TEMPLATE
        .replace("@DAEMON_LOG@", DAEMON_LOG)
        .replace("@DNS_SUFFIX@", CLOUD_DNS_SUFFIX)
        .replace("@DNS_OVERRIDE@", CLOUD_DNS_OVERRIDE);
    if let Some(placeholder) = find_placeholder(&rendered) {
        return Err(ProvisionError::config(format!(
            "init script template has an unresolved placeholder: {}",
            placeholder
        )));
    }
    Ok(rendered)
}

/// Write the rendered script to the sentinel path, executable, owned by the
/// resolved user and the root group.
pub fn install(
    runner: &dyn CommandRunner,
    paths: &Paths,
    owner: &str,
    dry_run: bool,
) -> Result<()> {
    let script = render()?;
    if dry_run {
        info!(
            "dry-run: would write init script to {} owned by {}:root",
            paths.sentinel.display(),
            owner
        );
        return Ok(());
    }
    if let Some(parent) = paths.sentinel.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&paths.sentinel, script)?;
    std::fs::set_permissions(&paths.sentinel, std::fs::Permissions::from_mode(0o755))?;

    let owner_spec = format!("{}:root", owner);
    let sentinel_str = paths.sentinel.to_string_lossy();
    runner
        .apply("chown", &[&owner_spec, &sentinel_str])?
        .ensure_success("chown init script")?;
    info!("wrote init script to {}", paths.sentinel.display());
    Ok(())
}

/// First `@UPPER_SNAKE@` token in the text, if any.
fn find_placeholder(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let mut start = None;
    for (i, &b) in bytes.iter().enumerate() {
        match (start, b) {
            (None, b'@') => start = Some(i),
            (Some(s), b'@') => {
                if i > s + 1 {
                    return Some(&text[s..=i]);
                }
                start = Some(i);
            }
            (Some(_), b'A'..=b'Z' | b'_') => {}
            (Some(_), _) => start = None,
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_resolves_every_placeholder() {
        let script = render().unwrap();
        assert!(!script.contains("@DAEMON_LOG@"));
        assert!(!script.contains("@DNS_SUFFIX@"));
        assert!(!script.contains("@DNS_OVERRIDE@"));
        assert!(script.contains("/tmp/dockerd.log"));
        assert!(script.contains("internal.cloudapp.net"));
        assert!(script.contains("--dns 168.63.129.16"));
    }

    #[test]
    fn test_rendered_script_contract() {
        let script = render().unwrap();
        assert!(script.starts_with("#!/bin/sh"));
        // Daemon backgrounded, caller's command takes the foreground
        assert!(script.contains("dockerd"));
        assert!(script.contains("exec \"$@\""));
        // Delegation only behind the unified-hierarchy probe
        assert!(script.contains("cgroup.controllers"));
        assert!(script.contains("cgroup.subtree_control"));
        // Privilege escalation only when not already root
        assert!(script.contains("id -u"));
        assert!(script.contains("sudo"));
    }

    #[test]
    fn test_find_placeholder() {
        assert_eq!(find_placeholder("plain text"), None);
        assert_eq!(find_placeholder("a @LEFT_OVER@ token"), Some("@LEFT_OVER@"));
        // Shell @ usage is not a placeholder
        assert_eq!(find_placeholder("exec \"$@\""), None);
        assert_eq!(find_placeholder("user@host"), None);
    }
}
