use crate::runtime::Runtime;
use anyhow::{Context, Result, bail};
use flate2::read::GzDecoder;
use log::debug;
use std::path::Path;
use tar::Archive;

use super::ArchiveExtractor;

/// Extractor for .tar.gz / .tgz archives
pub struct TarGzExtractor;

impl ArchiveExtractor for TarGzExtractor {
    fn can_handle(&self, archive_path: &Path) -> bool {
        let name = archive_path.to_string_lossy().to_lowercase();
        name.ends_with(".tar.gz") || name.ends_with(".tgz")
    }

    #[tracing::instrument(skip(self, runtime))]
    fn extract<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive_path: &Path,
        extract_to: &Path,
    ) -> Result<()> {
        debug!("Extracting tar.gz archive to {:?}...", extract_to);
        let file = runtime
            .open(archive_path)
            .with_context(|| format!("Failed to open archive at {:?}", archive_path))?;

        let mut archive = Archive::new(GzDecoder::new(file));
        let mut unpacked = 0usize;

        for entry in archive
            .entries()
            .with_context(|| format!("Failed to read archive {:?}", archive_path))?
        {
            let mut entry = entry.context("Failed to read tar entry")?;
            let entry_path = entry
                .path()
                .context("Invalid entry path in archive")?
                .into_owned();

            // unpack_in refuses entries that would land outside extract_to
            let inside = entry
                .unpack_in(extract_to)
                .with_context(|| format!("Failed to extract {:?}", entry_path))?;
            if !inside {
                debug!("Skipping entry outside destination: {:?}", entry_path);
                continue;
            }

            debug!("Extracted {:?}", entry_path);
            unpacked += 1;
        }

        if unpacked == 0 {
            bail!("Archive appears to be empty.");
        }

        Ok(())
    }
}
