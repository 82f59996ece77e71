//! HTTP client that follows redirects itself and streams bodies to a writer.

use anyhow::{Context, Result};
use log::debug;
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use reqwest::{Client, Response};
use std::io::Write;
use std::time::Duration;

use crate::error::{BootstrapError, NetworkCause};

/// Maximum number of redirects followed for a single download.
pub const MAX_REDIRECTS: usize = 10;

/// Timeout for establishing a connection, in seconds.
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Longest silence tolerated between two reads of a response, in seconds.
/// A slow transfer that keeps delivering bytes is never cut off.
pub const READ_TIMEOUT_SECS: u64 = 60;

/// HTTP client for release downloads.
///
/// The wrapped reqwest client must not follow redirects on its own
/// ([`HttpClient::with_defaults`] builds one with `Policy::none()`); every hop
/// goes through [`HttpClient::get_following_redirects`] so the hop limit and
/// error reporting live in one place.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    max_redirects: usize,
}

impl HttpClient {
    /// Creates a new HTTP client wrapping the given reqwest Client.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            max_redirects: MAX_REDIRECTS,
        }
    }

    /// Builds a client with rustls, default timeouts and automatic redirects disabled.
    pub fn with_defaults() -> Result<Self> {
        Self::with_timeouts(
            Duration::from_secs(CONNECT_TIMEOUT_SECS),
            Duration::from_secs(READ_TIMEOUT_SECS),
        )
    }

    /// Like [`HttpClient::with_defaults`] with explicit timeouts. `read` bounds
    /// each idle gap, not the transfer as a whole.
    pub fn with_timeouts(connect: Duration, read: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("codex-litellm-installer/", env!("CARGO_PKG_VERSION")))
            .redirect(Policy::none())
            .connect_timeout(connect)
            .read_timeout(read)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self::new(client))
    }

    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    /// Downloads `url` into the writer produced by `create_writer`.
    ///
    /// The writer is created only once the final (non-redirect) response has
    /// arrived, so nothing from a redirect hop is ever written. Returns the
    /// number of bytes written.
    #[tracing::instrument(skip(self, create_writer))]
    pub async fn download_file<W, F>(&self, url: &str, create_writer: F) -> Result<u64>
    where
        W: Write,
        F: FnOnce() -> Result<W>,
    {
        debug!("Downloading file from {}...", url);

        let mut response = self.get_following_redirects(url).await?;
        let final_url = response.url().to_string();

        let mut writer = create_writer()?;
        let mut downloaded_bytes: u64 = 0;

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| transport_error(&final_url, &e))?
        {
            writer
                .write_all(&chunk)
                .context("Failed to write chunk to file")?;
            downloaded_bytes += chunk.len() as u64;
        }
        writer.flush().context("Failed to flush downloaded file")?;

        debug!(
            "Downloaded {:.2} MB",
            downloaded_bytes as f64 / (1024.0 * 1024.0)
        );

        Ok(downloaded_bytes)
    }

    /// Issues a GET and follows 3xx responses until a success status.
    #[tracing::instrument(skip(self))]
    pub async fn get_following_redirects(&self, url: &str) -> Result<Response, BootstrapError> {
        let mut current = url.to_string();

        for hop in 0..=self.max_redirects {
            let response = self
                .client
                .get(&current)
                .send()
                .await
                .map_err(|e| transport_error(&current, &e))?;

            let status = response.status();

            if status.is_redirection() {
                let next = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|value| value.to_str().ok())
                    .and_then(|location| response.url().join(location).ok());

                let Some(next) = next else {
                    return Err(BootstrapError::Network {
                        url: current,
                        cause: NetworkCause::MissingLocation(status.as_u16()),
                    });
                };

                debug!(
                    "Redirect {}/{} ({}): {} -> {}",
                    hop + 1,
                    self.max_redirects,
                    status.as_u16(),
                    current,
                    next
                );
                current = next.to_string();
                continue;
            }

            if !status.is_success() {
                return Err(BootstrapError::Network {
                    url: current,
                    cause: NetworkCause::Status(status.as_u16()),
                });
            }

            return Ok(response);
        }

        Err(BootstrapError::Network {
            url: url.to_string(),
            cause: NetworkCause::TooManyRedirects(self.max_redirects),
        })
    }
}

/// Flattens a reqwest error and its sources into a transport failure.
fn transport_error(url: &str, error: &reqwest::Error) -> BootstrapError {
    let mut message = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    BootstrapError::Network {
        url: url.to_string(),
        cause: NetworkCause::Transport(message),
    }
}
