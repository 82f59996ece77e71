use crate::http::HttpClient;
use crate::runtime::Runtime;
use anyhow::{Context, Result};
use async_trait::async_trait;
use log::info;
use std::path::Path;

/// Fetches a URL into a local file.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Downloads `url` to `dest`, returning the number of bytes written.
    /// `dest` is complete and closed when this returns `Ok`.
    async fn fetch(&self, url: &str, dest: &Path) -> Result<u64>;
}

/// [`Fetch`] implementation backed by [`HttpClient`], writing through the runtime.
pub struct HttpFetcher<R: Runtime> {
    runtime: R,
    http_client: HttpClient,
}

impl<R: Runtime> HttpFetcher<R> {
    pub fn new(runtime: R, http_client: HttpClient) -> Self {
        Self {
            runtime,
            http_client,
        }
    }
}

#[async_trait]
impl<R: Runtime> Fetch for HttpFetcher<R> {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<u64> {
        download_file(&self.runtime, url, dest, &self.http_client).await
    }
}

/// Streams `url` into `dest`, creating the file only once the final response
/// has arrived.
#[tracing::instrument(skip(runtime, http_client))]
pub async fn download_file<R: Runtime>(
    runtime: &R,
    url: &str,
    dest: &Path,
    http_client: &HttpClient,
) -> Result<u64> {
    info!("Fetching {}", url);

    let bytes = http_client
        .download_file(url, || {
            runtime
                .create_file(dest)
                .with_context(|| format!("Failed to create download file at {:?}", dest))
        })
        .await?;

    info!("Download complete ({} bytes).", bytes);
    Ok(bytes)
}
