//! dind-setup library
//!
//! Core functionality for provisioning a container engine inside a base
//! image so containers can run nested containers: typed configuration,
//! version resolution, package and artifact installation, user setup, and
//! generation of the container-entry init script.

pub mod apt;
pub mod cli;
pub mod compose;
pub mod config;
pub mod engine;
pub mod error;
pub mod exec;
pub mod fetch;
pub mod init_script;
pub mod installer;
pub mod repo;
pub mod resolver;
pub mod sanity;
pub mod types;
pub mod users;

// Re-export main types for convenience
pub use cli::Cli;
pub use config::{Paths, ProvisionConfig};
pub use error::{ProvisionError, Result};
pub use exec::{CommandOutput, CommandRunner, SystemRunner};
pub use installer::provision;
pub use resolver::{compare_versions, extract_versions, resolve_package_version, resolve_release_tag};
pub use sanity::{OsRelease, detect_architecture, detect_os_release, require_root};
pub use types::{Architecture, EngineEdition, UserSpec, VersionSpec};
