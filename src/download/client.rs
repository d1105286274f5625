//! HTTP client wrapper and the resumable document downloader.
//!
//! One [`HttpClient`] is built per run and shared by the search pages, the
//! login flow and the document downloads, so connection pooling and the
//! cookie jar span the whole crawl.

use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use reqwest::cookie::Jar;
use reqwest::header::HeaderMap;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::constants::{CHUNK_SIZE, CONNECT_TIMEOUT_SECS, MIN_COMPLETE_BYTES, READ_TIMEOUT_SECS};
use super::error::DownloadError;
use crate::orchestrator::CancelFlag;
use crate::user_agent::{BROWSER_USER_AGENT, browser_headers};

/// Transport settings for the shared HTTP client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// TCP/TLS connect timeout.
    pub connect_timeout: Duration,
    /// Whole-request timeout, body included.
    pub read_timeout: Duration,
    /// User-Agent header value.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::with_timeouts(CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }
}

impl ClientConfig {
    /// Browser identity with explicit timeouts in seconds.
    #[must_use]
    pub fn with_timeouts(connect_timeout_secs: u64, read_timeout_secs: u64) -> Self {
        Self {
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            read_timeout: Duration::from_secs(read_timeout_secs),
            user_agent: BROWSER_USER_AGENT.to_string(),
        }
    }
}

/// What a successful [`HttpClient::try_download`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// A complete-looking file was already on disk; nothing was fetched.
    AlreadyPresent {
        /// Size of the existing file.
        bytes: u64,
    },
    /// The body was streamed to disk.
    Fetched {
        /// Bytes written.
        bytes: u64,
    },
}

impl DownloadOutcome {
    /// Size of the file on disk.
    #[must_use]
    pub fn bytes(self) -> u64 {
        match self {
            Self::AlreadyPresent { bytes } | Self::Fetched { bytes } => bytes,
        }
    }

    /// Returns true if the document was fetched during this call.
    #[must_use]
    pub fn was_fetched(self) -> bool {
        matches!(self, Self::Fetched { .. })
    }
}

/// HTTP client with browser headers, a cookie jar and streaming downloads.
///
/// Cheap to clone; clones share the connection pool and cookies.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::ClientBuild`] if the TLS backend or
    /// configuration is rejected by the builder.
    #[instrument(level = "debug", skip(config), fields(
        connect_ms = config.connect_timeout.as_millis(),
        read_ms = config.read_timeout.as_millis()
    ))]
    pub fn new(config: &ClientConfig) -> Result<Self, DownloadError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.read_timeout)
            .gzip(true)
            .user_agent(config.user_agent.as_str())
            .default_headers(browser_headers())
            .cookie_provider(Arc::new(Jar::default()))
            .build()
            .map_err(|source| DownloadError::ClientBuild { source })?;
        Ok(Self { client })
    }

    /// Returns the underlying reqwest client for page and API requests.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Downloads `url` to `dest`, returning whether the file is now in place.
    ///
    /// Failures are logged here and never propagated; see
    /// [`try_download`](Self::try_download) for the typed variant.
    #[instrument(skip(self, headers, cancel), fields(url = %url, dest = %dest.display()))]
    pub async fn download(
        &self,
        url: &str,
        dest: &Path,
        headers: &HeaderMap,
        cancel: &CancelFlag,
    ) -> bool {
        match self.try_download(url, dest, headers, cancel).await {
            Ok(_) => true,
            Err(error) if error.is_cancelled() => {
                info!("download skipped, run cancelled");
                false
            }
            Err(error) => {
                warn!(error = %error, "download failed");
                false
            }
        }
    }

    /// Downloads `url` to `dest` with `headers` merged into the request.
    ///
    /// 1. Cancellation is checked first; a cancelled run starts no transfer.
    /// 2. An existing file larger than [`MIN_COMPLETE_BYTES`] short-circuits.
    /// 3. Otherwise the body is streamed to `dest`. On any later error,
    ///    including a failed request or cancellation observed between
    ///    chunks, whatever sits at `dest` is removed.
    ///
    /// # Errors
    ///
    /// Returns a [`DownloadError`] describing the first failure.
    pub async fn try_download(
        &self,
        url: &str,
        dest: &Path,
        headers: &HeaderMap,
        cancel: &CancelFlag,
    ) -> Result<DownloadOutcome, DownloadError> {
        if cancel.is_cancelled() {
            return Err(DownloadError::cancelled(url));
        }

        if let Some(bytes) = existing_complete_size(dest).await {
            debug!(bytes, "already downloaded, skipping fetch");
            return Ok(DownloadOutcome::AlreadyPresent { bytes });
        }

        // Anything still at `dest` is a truncated leftover.
        let response = match self.open(url, headers).await {
            Ok(response) => response,
            Err(error) => {
                remove_partial(dest).await;
                return Err(error);
            }
        };

        let mut file = File::create(dest)
            .await
            .map_err(|e| DownloadError::io(dest, e))?;

        let result = stream_to_file(&mut file, response, url, dest, cancel).await;
        drop(file);

        match result {
            Ok(bytes) => {
                info!(bytes, "download complete");
                Ok(DownloadOutcome::Fetched { bytes })
            }
            Err(error) => {
                remove_partial(dest).await;
                Err(error)
            }
        }
    }

    /// Sends the GET and rejects non-success statuses before any byte is written.
    async fn open(
        &self,
        url: &str,
        headers: &HeaderMap,
    ) -> Result<reqwest::Response, DownloadError> {
        Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;

        let response = self
            .client
            .get(url)
            .headers(headers.clone())
            .send()
            .await
            .map_err(|e| DownloadError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::http_status(url, status.as_u16()));
        }
        Ok(response)
    }
}

/// Returns the size of `path` if it exists and exceeds [`MIN_COMPLETE_BYTES`].
async fn existing_complete_size(path: &Path) -> Option<u64> {
    let metadata = tokio::fs::metadata(path).await.ok()?;
    (metadata.is_file() && metadata.len() > MIN_COMPLETE_BYTES).then_some(metadata.len())
}

/// Best-effort removal of a partially written file.
async fn remove_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "removed partial file"),
        Err(error) if error.kind() == ErrorKind::NotFound => {}
        Err(error) => {
            warn!(path = %path.display(), error = %error, "could not remove partial file");
        }
    }
}

/// Streams the response body into `file`, returning bytes written.
async fn stream_to_file(
    file: &mut File,
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
    cancel: &CancelFlag,
) -> Result<u64, DownloadError> {
    let mut writer = BufWriter::with_capacity(CHUNK_SIZE, file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        if cancel.is_cancelled() {
            debug!(bytes_written, "cancellation observed mid-stream");
            return Err(DownloadError::cancelled(url));
        }

        let chunk = chunk_result.map_err(|e| DownloadError::from_reqwest(url, e))?;
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(file_path, e))?;
        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(file_path, e))?;

    Ok(bytes_written)
}
