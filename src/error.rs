//! Error taxonomy shared by the installer and the launcher.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Project page pointed to by build-from-source hints.
pub const PROJECT_URL: &str = "https://github.com/avikalpa/codex-litellm";

/// Why a fetch failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkCause {
    /// Final response had a non-success, non-redirect status.
    Status(u16),
    /// Redirect status without a usable `Location` header.
    MissingLocation(u16),
    /// The redirect chain exceeded the hop limit.
    TooManyRedirects(usize),
    /// DNS, TLS, connection or body-stream failure.
    Transport(String),
}

impl fmt::Display for NetworkCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkCause::Status(code) => write!(f, "HTTP status {}", code),
            NetworkCause::MissingLocation(code) => {
                write!(f, "HTTP status {} redirect without a Location header", code)
            }
            NetworkCause::TooManyRedirects(max) => {
                write!(f, "more than {} redirects", max)
            }
            NetworkCause::Transport(msg) => write!(f, "{}", msg),
        }
    }
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("no prebuilt binary for platform/arch combination {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    #[error("request for {url} failed: {cause}")]
    Network { url: String, cause: NetworkCause },

    #[error("malformed checksum record: {reason}")]
    MalformedChecksum { reason: String },

    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("failed to extract {}: {reason}", archive.display())]
    Extraction { archive: PathBuf, reason: String },

    #[error("compiled binary not found at {}", path.display())]
    BinaryNotFound { path: PathBuf },

    #[error("failed to start {}: {source}", path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BootstrapError {
    /// Process exit status used when this error ends the program.
    ///
    /// Follows the shell convention for "command not found" (127) and
    /// "found but not executable" (126).
    pub fn exit_code(&self) -> i32 {
        match self {
            BootstrapError::BinaryNotFound { .. } => 127,
            BootstrapError::Spawn { .. } => 126,
            _ => 1,
        }
    }

    /// A follow-up the user can take to resolve the error.
    pub fn remediation(&self) -> String {
        match self {
            BootstrapError::UnsupportedPlatform { .. } => {
                format!("Please build from source instead: {}", PROJECT_URL)
            }
            BootstrapError::Network { .. } => {
                "Check your network connection and re-run `codex-litellm-install`.".to_string()
            }
            BootstrapError::MalformedChecksum { .. } | BootstrapError::ChecksumMismatch { .. } => {
                format!(
                    "The download may be corrupted or tampered with. Re-run \
                     `codex-litellm-install`; if this persists, report it at {}.",
                    PROJECT_URL
                )
            }
            BootstrapError::Extraction { .. } => format!(
                "Re-run `codex-litellm-install`, or build manually with ./build.sh from {}.",
                PROJECT_URL
            ),
            BootstrapError::BinaryNotFound { .. } => format!(
                "Did the install step complete successfully? Re-run `codex-litellm-install`, \
                 or build manually with ./build.sh from {}.",
                PROJECT_URL
            ),
            BootstrapError::Spawn { .. } => {
                "Check the binary's permissions, or re-run `codex-litellm-install`.".to_string()
            }
        }
    }
}

/// Finds the typed error inside an `anyhow` chain.
pub fn find_bootstrap_error(err: &anyhow::Error) -> Option<&BootstrapError> {
    err.chain().find_map(|e| e.downcast_ref::<BootstrapError>())
}
