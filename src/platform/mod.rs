//! Platform resolution.
//!
//! Maps the host's reported operating system and CPU architecture to the
//! identifier used in release artifact names and install directories.
//! [`SUPPORTED_TARGETS`] is the only place that knows which hosts have a
//! prebuilt binary: the installer and the launcher both resolve through it.

use std::fmt;

use crate::error::BootstrapError;

/// Name of the tool binary shipped inside every release archive.
pub const TOOL_NAME: &str = "codex-litellm";

/// One row of the supported-target table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    /// Operating system name as reported by `std::env::consts::OS`.
    pub os: &'static str,
    /// CPU architecture as reported by `std::env::consts::ARCH`.
    pub arch: &'static str,
    id: &'static str,
    exe_suffix: &'static str,
}

/// Every host with a published prebuilt artifact.
///
/// Keys must match the runtime-reported strings exactly; no aliasing is done.
pub const SUPPORTED_TARGETS: &[Target] = &[
    Target {
        os: "linux",
        arch: "x86_64",
        id: "linux-x64",
        exe_suffix: "",
    },
    Target {
        os: "android",
        arch: "aarch64",
        id: "android-arm64",
        exe_suffix: "",
    },
];

impl Target {
    /// Identifier used in artifact names and as the install subdirectory.
    pub fn id(&self) -> &'static str {
        self.id
    }

    /// File name of the installed binary, including any executable suffix.
    pub fn binary_name(&self) -> String {
        format!("{}{}", TOOL_NAME, self.exe_suffix)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id)
    }
}

/// Looks up the target for an exact `(os, arch)` pair.
pub fn resolve(os: &str, arch: &str) -> Result<Target, BootstrapError> {
    SUPPORTED_TARGETS
        .iter()
        .find(|t| t.os == os && t.arch == arch)
        .copied()
        .ok_or_else(|| BootstrapError::UnsupportedPlatform {
            os: os.to_string(),
            arch: arch.to_string(),
        })
}

/// Host platform information
#[derive(Debug, Clone, PartialEq)]
pub struct Platform {
    pub os: String,
    pub arch: String,
}

impl Platform {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// Detect the current platform
    pub fn detect() -> Self {
        Self::new(std::env::consts::OS, std::env::consts::ARCH)
    }

    pub fn resolve(&self) -> Result<Target, BootstrapError> {
        resolve(&self.os, &self.arch)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}
