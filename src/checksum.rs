//! Detached SHA-256 checksum records and archive verification.
//!
//! A record is whitespace-delimited text in `sha256sum` format: the first
//! token is the lowercase hex digest, an optional second token names the
//! file it was computed for. Anything after that is ignored.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, warn};
use sha2::{Digest, Sha256};

use crate::error::BootstrapError;
use crate::runtime::Runtime;

/// Length of a hex-encoded SHA-256 digest.
const SHA256_HEX_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumRecord {
    pub digest: String,
    pub file_name: Option<String>,
}

impl ChecksumRecord {
    pub fn parse(contents: &str) -> Result<Self, BootstrapError> {
        let mut tokens = contents.split_whitespace();

        let digest = tokens.next().ok_or_else(|| BootstrapError::MalformedChecksum {
            reason: "checksum file is empty".to_string(),
        })?;

        if digest.len() != SHA256_HEX_LEN || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(BootstrapError::MalformedChecksum {
                reason: format!("'{}' is not a SHA-256 hex digest", digest),
            });
        }

        // `sha256sum -b` marks binary mode with a leading '*'
        let file_name = tokens
            .next()
            .map(|name| name.trim_start_matches('*').to_string());

        Ok(Self {
            digest: digest.to_string(),
            file_name,
        })
    }
}

/// Computes the SHA-256 of everything readable from `path`, as lowercase hex.
#[tracing::instrument(skip(runtime))]
pub fn compute_sha256<R: Runtime>(runtime: &R, path: &Path) -> Result<String> {
    let mut file = runtime
        .open(path)
        .with_context(|| format!("Failed to open file for checksum: {}", path.display()))?;

    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = file
            .read(&mut buffer)
            .with_context(|| format!("Failed to read file for checksum: {}", path.display()))?;

        if bytes_read == 0 {
            break;
        }

        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Verifies the complete file at `archive_path` against `record`.
///
/// Digests are compared as case-sensitive hex strings.
#[tracing::instrument(skip(runtime))]
pub fn verify<R: Runtime>(
    runtime: &R,
    archive_path: &Path,
    archive_name: &str,
    record: &ChecksumRecord,
) -> Result<()> {
    if let Some(name) = &record.file_name
        && name != archive_name
    {
        warn!(
            "Checksum record names '{}' but the archive is '{}'; verifying digest anyway",
            name, archive_name
        );
    }

    let actual = compute_sha256(runtime, archive_path)?;
    debug!("sha256 expected {} actual {}", record.digest, actual);

    if actual != record.digest {
        return Err(BootstrapError::ChecksumMismatch {
            expected: record.digest.clone(),
            actual,
        }
        .into());
    }

    Ok(())
}
