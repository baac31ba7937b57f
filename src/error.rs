//! Error handling for the provisioner.
//!
//! Provides centralized error handling with proper error types using thiserror.
//! All fatal conditions map to exit code 1: the tool runs in a disposable
//! build context where failure means "rebuild from scratch", not "repair in
//! place", so a single code is the whole contract.

use thiserror::Error;

/// Main error type for the provisioner
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// IO errors (file operations, scratch directories, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Precondition failures (not superuser, unsupported architecture)
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Configuration errors (loading, parsing, validation)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Version resolution failures, carrying the full candidate list so the
    /// operator can correct the request
    #[error("No version of {subject} matches '{requested}'; available: [{}]", .candidates.join(", "))]
    Resolution {
        subject: String,
        requested: String,
        candidates: Vec<String>,
    },

    /// Artifact verification failures (checksum mismatch)
    #[error("Verification failed: {0}")]
    Verification(String),

    /// System errors (external commands, processes)
    #[error("System error: {0}")]
    System(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors bubbling out of the command execution layer
    #[error(transparent)]
    External(#[from] anyhow::Error),
}

/// Result type alias for provisioning operations
pub type Result<T> = std::result::Result<T, ProvisionError>;

// Convenient error constructors
impl ProvisionError {
    /// Create a precondition error
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a version resolution error
    pub fn resolution(
        subject: impl Into<String>,
        requested: impl Into<String>,
        candidates: Vec<String>,
    ) -> Self {
        Self::Resolution {
            subject: subject.into(),
            requested: requested.into(),
            candidates,
        }
    }

    /// Create a verification error
    pub fn verification(msg: impl Into<String>) -> Self {
        Self::Verification(msg.into())
    }

    /// Create a system error
    pub fn system(msg: impl Into<String>) -> Self {
        Self::System(msg.into())
    }

    /// Exit code for this error.
    ///
    /// Every fatal condition exits 1; no other codes are used.
    pub fn exit_code(&self) -> i32 {
        1
    }
}
