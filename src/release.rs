//! Naming and addressing of release artifacts.

use crate::platform::{TOOL_NAME, Target};

/// Extension of every published archive.
pub const ARCHIVE_EXTENSION: &str = "tar.gz";

/// Extension appended to an archive URL to get its detached checksum.
pub const CHECKSUM_EXTENSION: &str = "sha256";

/// The archive and detached checksum published for one `(tag, target)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseArtifact {
    base_url: String,
    tag: String,
    target: Target,
}

impl ReleaseArtifact {
    pub fn new(base_url: &str, tag: &str, target: Target) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            tag: tag.to_string(),
            target,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn target(&self) -> Target {
        self.target
    }

    /// `codex-litellm-<id>.tar.gz`
    pub fn archive_name(&self) -> String {
        format!("{}-{}.{}", TOOL_NAME, self.target.id(), ARCHIVE_EXTENSION)
    }

    /// `codex-litellm-<id>.tar.gz.sha256`
    pub fn checksum_name(&self) -> String {
        format!("{}.{}", self.archive_name(), CHECKSUM_EXTENSION)
    }

    /// `<base>/<tag>/<archive-name>`
    pub fn archive_url(&self) -> String {
        format!("{}/{}/{}", self.base_url, self.tag, self.archive_name())
    }

    /// The archive URL suffixed with `.sha256`.
    pub fn checksum_url(&self) -> String {
        format!("{}.{}", self.archive_url(), CHECKSUM_EXTENSION)
    }
}
