//! Type-safe configuration tokens for the provisioner.
//!
//! This module replaces stringly-typed inputs with proper Rust enums that
//! provide compile-time validation and exhaustive matching. The positional
//! CLI surface stays stringly (that is its contract); everything past the
//! parse boundary uses these types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use strum::{Display, EnumIter, EnumString};

use crate::error::{ProvisionError, Result};

/// CPU architecture of the host, as reported by `dpkg --print-architecture`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Architecture {
    #[strum(serialize = "amd64")]
    Amd64,
    #[strum(serialize = "arm64")]
    Arm64,
}

impl Architecture {
    /// Parse a dpkg architecture token, rejecting anything unsupported
    /// before any installation step runs.
    pub fn from_dpkg(token: &str) -> Result<Self> {
        token.trim().parse().map_err(|_| {
            ProvisionError::precondition(format!(
                "unsupported architecture '{}' (supported: amd64, arm64)",
                token.trim()
            ))
        })
    }

    /// Architecture suffix used by compose release artifacts.
    pub fn compose_suffix(&self) -> &'static str {
        match self {
            Self::Amd64 => "x86_64",
            Self::Arm64 => "aarch64",
        }
    }

    /// Whether compose v1 ships a prebuilt, checksummed binary for this
    /// architecture. Other architectures fall back to pip.
    pub fn has_compose_v1_binary(&self) -> bool {
        matches!(self, Self::Amd64)
    }
}

/// Which engine/CLI package family to install
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
pub enum EngineEdition {
    /// Open-source Moby packages from the vendor repository
    #[default]
    #[strum(serialize = "moby")]
    Moby,
    /// Docker CE packages from the upstream repository
    #[strum(serialize = "docker-ce")]
    DockerCe,
}

impl EngineEdition {
    /// Daemon package name for this family.
    pub fn engine_package(&self) -> &'static str {
        match self {
            Self::Moby => "moby-engine",
            Self::DockerCe => "docker-ce",
        }
    }

    /// Client package name for this family.
    pub fn cli_package(&self) -> &'static str {
        match self {
            Self::Moby => "moby-cli",
            Self::DockerCe => "docker-ce-cli",
        }
    }
}

/// A requested version for an installable unit.
///
/// Spellings accepted on the CLI: `latest`/`lts`/`stable`/`current` all mean
/// "newest available", `none` means "skip this unit entirely", anything else
/// is a pin that may be a full version or a prefix (`1.2` matches `1.2.3`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum VersionSpec {
    Latest,
    Skip,
    Pinned(String),
}

impl VersionSpec {
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skip)
    }
}

impl FromStr for VersionSpec {
    type Err = ProvisionError;

    fn from_str(s: &str) -> Result<Self> {
        let token = s.trim();
        if token.is_empty() {
            return Err(ProvisionError::config("empty version selector"));
        }
        Ok(match token.to_ascii_lowercase().as_str() {
            "latest" | "lts" | "stable" | "current" => Self::Latest,
            "none" => Self::Skip,
            _ => Self::Pinned(token.to_string()),
        })
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => write!(f, "latest"),
            Self::Skip => write!(f, "none"),
            Self::Pinned(v) => write!(f, "{}", v),
        }
    }
}

impl TryFrom<String> for VersionSpec {
    type Error = ProvisionError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<VersionSpec> for String {
    fn from(spec: VersionSpec) -> Self {
        spec.to_string()
    }
}

/// The requested non-root user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum UserSpec {
    /// Search the candidate account list, then uid 1000, then root
    Auto,
    /// No non-root user; operate as root
    Root,
    /// A specific account name (falls back to root if it does not exist)
    Named(String),
}

impl FromStr for UserSpec {
    type Err = ProvisionError;

    fn from_str(s: &str) -> Result<Self> {
        let token = s.trim();
        if token.is_empty() {
            return Err(ProvisionError::config("empty username selector"));
        }
        Ok(match token.to_ascii_lowercase().as_str() {
            "auto" | "automatic" => Self::Auto,
            "none" | "root" => Self::Root,
            _ => Self::Named(token.to_string()),
        })
    }
}

impl fmt::Display for UserSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "automatic"),
            Self::Root => write!(f, "none"),
            Self::Named(name) => write!(f, "{}", name),
        }
    }
}

impl TryFrom<String> for UserSpec {
    type Error = ProvisionError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<UserSpec> for String {
    fn from(spec: UserSpec) -> Self {
        spec.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_architecture_compose_suffix() {
        assert_eq!(Architecture::Amd64.compose_suffix(), "x86_64");
        assert_eq!(Architecture::Arm64.compose_suffix(), "aarch64");
    }

    #[test]
    fn test_architecture_from_dpkg() {
        assert_eq!(Architecture::from_dpkg("amd64\n").unwrap(), Architecture::Amd64);
        assert_eq!(Architecture::from_dpkg("arm64").unwrap(), Architecture::Arm64);

        let err = Architecture::from_dpkg("s390x").unwrap_err();
        assert!(matches!(err, ProvisionError::Precondition(_)));
        assert!(err.to_string().contains("s390x"));
    }

    #[test]
    fn test_engine_edition_packages() {
        assert_eq!(EngineEdition::Moby.engine_package(), "moby-engine");
        assert_eq!(EngineEdition::Moby.cli_package(), "moby-cli");
        assert_eq!(EngineEdition::DockerCe.engine_package(), "docker-ce");
        assert_eq!(EngineEdition::DockerCe.cli_package(), "docker-ce-cli");
    }

    #[test]
    fn test_version_spec_parsing() {
        assert_eq!("latest".parse::<VersionSpec>().unwrap(), VersionSpec::Latest);
        assert_eq!("lts".parse::<VersionSpec>().unwrap(), VersionSpec::Latest);
        assert_eq!("stable".parse::<VersionSpec>().unwrap(), VersionSpec::Latest);
        assert_eq!("current".parse::<VersionSpec>().unwrap(), VersionSpec::Latest);
        assert_eq!("none".parse::<VersionSpec>().unwrap(), VersionSpec::Skip);
        assert_eq!(
            "20.10".parse::<VersionSpec>().unwrap(),
            VersionSpec::Pinned("20.10".to_string())
        );
        assert!("".parse::<VersionSpec>().is_err());
    }

    #[test]
    fn test_user_spec_parsing() {
        assert_eq!("auto".parse::<UserSpec>().unwrap(), UserSpec::Auto);
        assert_eq!("automatic".parse::<UserSpec>().unwrap(), UserSpec::Auto);
        assert_eq!("none".parse::<UserSpec>().unwrap(), UserSpec::Root);
        assert_eq!(
            "vscode".parse::<UserSpec>().unwrap(),
            UserSpec::Named("vscode".to_string())
        );
    }
}
