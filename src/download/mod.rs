//! Clip download service.
//!
//! Streams a remote clip to a `.part` file next to its destination, then
//! renames into place so an interrupted transfer never leaves a truncated
//! file at the final path. Transient failures are retried with backoff;
//! the caller decides what an exhausted download means for the batch.

pub mod error;
pub mod paths;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

pub use error::DownloadError;

use crate::feed::TOKEN_AUTH_HEADER;
use crate::retry::{self, RetryAction, RetryPolicy};
use crate::types::Credentials;

/// Retrieves a single remote resource to a local path.
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn download(
        &self,
        credentials: &Credentials,
        address: &str,
        destination: &Path,
    ) -> Result<(), DownloadError>;
}

/// HTTP downloader against the camera-cloud service.
pub struct HttpDownloader {
    client: Client,
    retry: RetryPolicy,
}

impl HttpDownloader {
    pub fn new(retry: RetryPolicy) -> Self {
        Self {
            client: Client::new(),
            retry,
        }
    }

    /// Single download attempt: stream the body into the `.part` file, then
    /// rename to the destination.
    async fn attempt(
        &self,
        url: &str,
        token: &str,
        destination: &Path,
        part_path: &Path,
    ) -> Result<(), DownloadError> {
        let path_str = destination.display().to_string();

        let response = self
            .client
            .get(url)
            .header(TOKEN_AUTH_HEADER, token)
            .send()
            .await
            .map_err(|e| DownloadError::Http {
                source: e,
                path: path_str.clone(),
            })?;

        if !response.status().is_success() {
            return Err(DownloadError::HttpStatus {
                status: response.status().as_u16(),
                path: path_str,
            });
        }

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(part_path)
            .await?;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| DownloadError::Http {
                source: e,
                path: path_str.clone(),
            })?;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        drop(file);

        fs::rename(part_path, destination).await?;

        Ok(())
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(
        &self,
        credentials: &Credentials,
        address: &str,
        destination: &Path,
    ) -> Result<(), DownloadError> {
        let url = clip_url(credentials, address);
        let part_path = part_path(destination);

        retry::with_backoff(
            &self.retry,
            |e: &DownloadError| {
                if e.is_retryable() {
                    RetryAction::Retry
                } else {
                    RetryAction::Abort
                }
            },
            || async {
                // Each attempt starts from scratch; a leftover partial file
                // would otherwise be renamed into place truncated.
                let _ = fs::remove_file(&part_path).await;
                self.attempt(&url, &credentials.token, destination, &part_path)
                    .await
            },
        )
        .await
        .map_err(|e| DownloadError::RetriesExhausted {
            retries: self.retry.max_retries,
            path: destination.display().to_string(),
            last_error: e.to_string(),
        })
    }
}

/// Absolute URL for a clip address relative to the credential host.
fn clip_url(credentials: &Credentials, address: &str) -> String {
    let sep = if address.starts_with('/') { "" } else { "/" };
    format!(
        "https://{}:{}{}{}",
        credentials.host, credentials.port, sep, address
    )
}

/// Sibling `.part` path for a destination.
fn part_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "download".into());
    name.push(".part");
    destination.with_file_name(name)
}
