//! Fetching provider dumps over HTTP
//!
//! A download never overwrites anything: the destination must not exist and
//! its directory must. The body is streamed into a temporary file next to the
//! destination and moved into place only once it is complete.

use crate::retry::{retrying, RetryError, RetryPolicy};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use pantry_common::DestinationError;
use reqwest::StatusCode;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error(transparent)]
    Destination(#[from] DestinationError),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status} from {url}")]
    UnexpectedStatus { url: String, status: StatusCode },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to move download into {}: {source}", .path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Download cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, DownloadError>;

/// One file to fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
    pub destination: PathBuf,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            destination: destination.into(),
        }
    }
}

pub struct Downloader {
    client: reqwest::Client,
    policy: RetryPolicy,
    show_progress: bool,
}

impl Downloader {
    pub fn new(policy: RetryPolicy) -> Self {
        Self::with_client(reqwest::Client::new(), policy)
    }

    pub fn with_client(client: reqwest::Client, policy: RetryPolicy) -> Self {
        Self {
            client,
            policy,
            show_progress: false,
        }
    }

    /// Draw a progress bar while receiving bytes
    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Download `url` to `destination`, retrying transient failures
    pub async fn download(&self, url: &str, destination: &Path, cancel: &CancellationToken) -> Result<PathBuf> {
        DestinationError::check_new_file(destination)?;
        info!(url, destination = %destination.display(), "Starting download");

        let staged = retrying(&self.policy, cancel, || self.fetch_once(url, destination, cancel))
            .await
            .map_err(|e| match e {
                RetryError::Cancelled => DownloadError::Cancelled,
                RetryError::Operation(e) => e,
            })?;

        staged
            .persist_noclobber(destination)
            .map_err(|e| DownloadError::Persist {
                path: destination.to_path_buf(),
                source: e.error,
            })?;

        info!(destination = %destination.display(), "Download complete");
        Ok(destination.to_path_buf())
    }

    /// Run several downloads concurrently.
    ///
    /// Each download retries on its own; results are in request order.
    pub async fn download_all(
        &self,
        requests: &[DownloadRequest],
        cancel: &CancellationToken,
    ) -> Vec<Result<PathBuf>> {
        futures::future::join_all(
            requests
                .iter()
                .map(|request| self.download(&request.url, &request.destination, cancel)),
        )
        .await
    }

    async fn fetch_once(&self, url: &str, destination: &Path, cancel: &CancellationToken) -> Result<NamedTempFile> {
        let response = self.client.get(url).send().await?;
        if response.status() != StatusCode::OK {
            return Err(DownloadError::UnexpectedStatus {
                url: url.to_string(),
                status: response.status(),
            });
        }

        let directory = destination
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut staged = NamedTempFile::new_in(directory)?;
        debug!(path = %staged.path().display(), "Staging download");

        let progress = self.progress_bar(response.content_length(), destination);
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            if cancel.is_cancelled() {
                progress.abandon();
                return Err(DownloadError::Cancelled);
            }
            let chunk = chunk?;
            staged.write_all(&chunk)?;
            progress.inc(chunk.len() as u64);
        }
        staged.as_file_mut().sync_all()?;
        progress.finish_and_clear();

        debug!(url, bytes = progress.position(), "Body received");
        Ok(staged)
    }

    fn progress_bar(&self, total: Option<u64>, destination: &Path) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let bar = match total {
            Some(total) => ProgressBar::new(total),
            None => ProgressBar::new_spinner(),
        };
        let style = ProgressStyle::default_bar()
            .template("{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({eta})")
            .map(|style| style.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        let name = destination
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        bar.set_message(format!("Downloading {}", name));
        bar
    }
}
