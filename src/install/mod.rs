use anyhow::{Context, Result};
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::{
    archive::{ArchiveExtractor, TarGzExtractor},
    checksum::{self, ChecksumRecord},
    cleanup::{self, CleanupGuard, SharedCleanupContext},
    config::{SKIP_DOWNLOAD_ENV, Settings},
    download::{Fetch, HttpFetcher},
    error::BootstrapError,
    http::HttpClient,
    platform::{Platform, Target},
    release::ReleaseArtifact,
    runtime::{RealRuntime, Runtime},
};

mod lock;

pub use lock::InstallLock;

/// Mode given to the installed binary.
pub const BINARY_MODE: u32 = 0o755;

/// Prefix of the per-run scratch directory under the system temp dir.
const TEMP_PREFIX: &str = "codex-litellm-";

/// How an install run ended without error.
#[derive(Debug, Clone, PartialEq)]
pub enum InstallOutcome {
    /// `CODEX_LITELLM_SKIP_DOWNLOAD=1`; nothing was touched.
    Skipped,
    /// No prebuilt artifact exists for the host.
    Unsupported(Platform),
    Installed { target: Target, binary: PathBuf },
}

/// `<root>/<id>`: the directory holding the extracted release for `target`.
pub fn install_dir(root: &Path, target: Target) -> PathBuf {
    root.join(target.id())
}

/// Installed binary location for `target` under `root`.
pub fn binary_path(root: &Path, target: Target) -> PathBuf {
    install_dir(root, target).join(target.binary_name())
}

fn staging_dir(root: &Path, target: Target) -> PathBuf {
    root.join(format!(".{}.staging", target.id()))
}

/// Installs with the real filesystem, HTTP client and tar.gz extractor.
#[tracing::instrument(skip(settings))]
pub async fn install(settings: &Settings) -> Result<InstallOutcome> {
    let http_client = HttpClient::with_defaults()?;
    let installer = Installer::new(
        RealRuntime,
        HttpFetcher::new(RealRuntime, http_client),
        TarGzExtractor,
    );
    installer.install(settings).await
}

pub struct Installer<R: Runtime, F: Fetch, E: ArchiveExtractor> {
    pub runtime: R,
    pub fetcher: F,
    pub extractor: E,
}

impl<R: Runtime + 'static, F: Fetch, E: ArchiveExtractor> Installer<R, F, E> {
    #[tracing::instrument(skip(runtime, fetcher, extractor))]
    pub fn new(runtime: R, fetcher: F, extractor: E) -> Self {
        Self {
            runtime,
            fetcher,
            extractor,
        }
    }

    /// Runs the acquisition pipeline, removing partial state on Ctrl-C.
    #[tracing::instrument(skip(self, settings))]
    pub async fn install(&self, settings: &Settings) -> Result<InstallOutcome> {
        if settings.skip_download {
            println!(
                "Skipping codex-litellm binary download ({}=1).",
                SKIP_DOWNLOAD_ENV
            );
            return Ok(InstallOutcome::Skipped);
        }

        let target = match settings.platform.resolve() {
            Ok(target) => target,
            Err(e) => {
                debug!("{}", e);
                return Ok(InstallOutcome::Unsupported(settings.platform.clone()));
            }
        };

        let cleanup_ctx = cleanup::new_shared();
        let cleanup_ctx_clone = Arc::clone(&cleanup_ctx);

        let ctrl_c_handler = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\nInterrupted, cleaning up...");
                cleanup::lock(&cleanup_ctx_clone).cleanup();
                std::process::exit(130);
            }
        });

        let result = self.ensure_installed(settings, target, &cleanup_ctx).await;

        ctrl_c_handler.abort();

        let binary = result?;
        println!("   installed {} {}", target, binary.display());
        Ok(InstallOutcome::Installed { target, binary })
    }

    /// Fetches, verifies and extracts the release for `target`.
    ///
    /// The destination is only written after the checksum matched, and only
    /// appears once the staged tree is complete.
    #[tracing::instrument(skip(self, settings, cleanup_ctx))]
    pub async fn ensure_installed(
        &self,
        settings: &Settings,
        target: Target,
        cleanup_ctx: &SharedCleanupContext,
    ) -> Result<PathBuf> {
        let artifact = ReleaseArtifact::new(&settings.base_url, &settings.release_tag, target);
        let archive_name = artifact.archive_name();

        let temp_dir = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempdir_in(self.runtime.temp_dir())
            .context("Failed to create temporary directory")?;
        let _temp_guard = CleanupGuard::new(cleanup_ctx, temp_dir.path().to_path_buf());

        let archive_path = temp_dir.path().join(&archive_name);
        let checksum_path = temp_dir.path().join(artifact.checksum_name());

        println!(" downloading {} {}", archive_name, artifact.tag());
        self.fetcher
            .fetch(&artifact.archive_url(), &archive_path)
            .await?;
        self.fetcher
            .fetch(&artifact.checksum_url(), &checksum_path)
            .await?;

        println!("   verifying {}", archive_name);
        let contents = self
            .runtime
            .read_to_string(&checksum_path)
            .with_context(|| format!("Failed to read checksum file {:?}", checksum_path))?;
        let record = ChecksumRecord::parse(&contents)?;
        checksum::verify(&self.runtime, &archive_path, &archive_name, &record)?;

        println!("  installing {} {}", target, artifact.tag());
        let root = &settings.install_root;
        self.runtime
            .create_dir_all(root)
            .with_context(|| format!("Failed to create install root at {:?}", root))?;
        let _lock = InstallLock::acquire(root, target).await?;

        self.stage(root, target, &archive_path, cleanup_ctx)
    }

    /// Extracts into a staging directory beside the destination, then renames
    /// it into place. On failure neither directory is left behind. The caller
    /// holds the install lock.
    fn stage(
        &self,
        root: &Path,
        target: Target,
        archive_path: &Path,
        cleanup_ctx: &SharedCleanupContext,
    ) -> Result<PathBuf> {
        let dest = install_dir(root, target);
        let staging = staging_dir(root, target);

        self.remove_if_present(&dest)?;
        self.remove_if_present(&staging)?;

        debug!("Creating staging directory: {:?}", staging);
        self.runtime
            .create_dir_all(&staging)
            .with_context(|| format!("Failed to create staging directory at {:?}", staging))?;
        let _staging_guard = CleanupGuard::new(cleanup_ctx, staging.clone());

        let result = self.populate(&staging, target, archive_path).and_then(|()| {
            self.runtime
                .rename(&staging, &dest)
                .with_context(|| format!("Failed to move {:?} into place at {:?}", staging, dest))
        });

        if let Err(e) = result {
            debug!("Install failed, cleaning up staging directory: {:?}", staging);
            let _ = self.runtime.remove_dir_all(&staging);
            return Err(e);
        }

        info!("Installed {} into {:?}", target, dest);
        Ok(dest.join(target.binary_name()))
    }

    fn populate(&self, staging: &Path, target: Target, archive_path: &Path) -> Result<()> {
        let extraction_error = |reason: String| BootstrapError::Extraction {
            archive: archive_path.to_path_buf(),
            reason,
        };

        if !self.extractor.can_handle(archive_path) {
            return Err(extraction_error("unsupported archive format".to_string()).into());
        }

        self.extractor
            .extract(&self.runtime, archive_path, staging)
            .map_err(|e| extraction_error(format!("{:#}", e)))?;

        let binary = staging.join(target.binary_name());
        if !self.runtime.exists(&binary) {
            return Err(
                extraction_error(format!("archive does not contain {}", target.binary_name()))
                    .into(),
            );
        }

        self.runtime
            .set_permissions(&binary, BINARY_MODE)
            .with_context(|| format!("Failed to make {:?} executable", binary))?;
        Ok(())
    }

    fn remove_if_present(&self, path: &Path) -> Result<()> {
        if self.runtime.exists(path) {
            debug!("Removing previous contents at {:?}", path);
            self.runtime
                .remove_dir_all(path)
                .with_context(|| format!("Failed to remove {:?}", path))?;
        }
        Ok(())
    }
}
