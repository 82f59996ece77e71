//! Advisory lock serialising installers that write the same target.
//!
//! On Unix this is an exclusive `flock(2)` on `<root>/.<id>.lock`, released
//! when the [`InstallLock`] is dropped or the process dies. Elsewhere only
//! the lock file is created.

use anyhow::{Context, Result};
use log::debug;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

#[cfg(unix)]
use log::info;
#[cfg(unix)]
use nix::{
    errno::Errno,
    fcntl::{Flock, FlockArg},
};

use crate::platform::Target;

#[cfg(unix)]
const LOCK_POLL_INTERVAL: std::time::Duration = std::time::Duration::from_millis(100);

pub struct InstallLock {
    path: PathBuf,
    #[cfg(unix)]
    _flock: Flock<File>,
    #[cfg(not(unix))]
    _file: File,
}

impl InstallLock {
    /// Lock file path for `target` under `root`.
    pub fn path_for(root: &Path, target: Target) -> PathBuf {
        root.join(format!(".{}.lock", target.id()))
    }

    /// Waits until the lock for `target` is held. `root` must exist.
    ///
    /// Contention is polled with a non-blocking `flock` so the wait never
    /// parks a runtime thread.
    #[tracing::instrument]
    pub async fn acquire(root: &Path, target: Target) -> Result<Self> {
        let path = Self::path_for(root, target);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .with_context(|| format!("Failed to open lock file {:?}", path))?;

        #[cfg(unix)]
        {
            let mut file = file;
            let mut announced = false;
            let flock = loop {
                match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
                    Ok(flock) => break flock,
                    Err((returned, Errno::EWOULDBLOCK)) => {
                        if !announced {
                            info!("Waiting for another install of {} to finish...", target);
                            announced = true;
                        }
                        file = returned;
                        tokio::time::sleep(LOCK_POLL_INTERVAL).await;
                    }
                    Err((_, errno)) => {
                        anyhow::bail!("Failed to lock {:?}: {}", path, errno);
                    }
                }
            };
            debug!("Acquired install lock {:?}", path);
            Ok(Self {
                path,
                _flock: flock,
            })
        }

        #[cfg(not(unix))]
        {
            debug!("Advisory locking unavailable; created {:?}", path);
            Ok(Self { path, _file: file })
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
