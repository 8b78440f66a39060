//! Media fetcher collaborator.
//!
//! The engine hands new avatar and attachment URLs to a [`MediaFetcher`] and
//! records the returned local path. Failures never fail the owning sync.

pub mod sizes;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::http::{HttpError, HttpRequest, HttpTransport};
use crate::retry::{RetryPolicy, retry_while};

pub use sizes::{SizeRule, SizeVariant};

/// Hex characters of the URL hash used as the directory below the host.
const HASH_PREFIX_LEN: usize = 8;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("invalid media url {url}")]
    InvalidUrl { url: String },

    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("HTTP {status} downloading {url}")]
    Status { url: String, status: u16 },

    #[error("unexpected content type {content_type:?} for {url}")]
    ContentType {
        url: String,
        content_type: Option<String>,
    },

    #[error("could not write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DownloadError {
    /// Whether another attempt could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            DownloadError::Http(_) => true,
            DownloadError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Downloads a remote file into local storage.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Fetch `url`, rejecting bodies whose content type is not in `acceptable`.
    async fn download(&self, url: &str, acceptable: &[&str]) -> Result<PathBuf, DownloadError>;
}

/// Where `url` is stored below `root`: `<root>/<host>/<hash prefix>/<filename>`.
pub fn storage_path(root: &Path, url: &str) -> Result<PathBuf, DownloadError> {
    let parsed = url::Url::parse(url).map_err(|_| DownloadError::InvalidUrl {
        url: url.to_string(),
    })?;
    let host = parsed.host_str().ok_or_else(|| DownloadError::InvalidUrl {
        url: url.to_string(),
    })?;

    let digest = Sha256::digest(url.as_bytes());
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();

    let filename = parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .unwrap_or("file");

    Ok(root
        .join(host)
        .join(&hex[..HASH_PREFIX_LEN])
        .join(filename))
}

/// Fetcher that downloads over an [`HttpTransport`] into a directory tree.
pub struct HttpMediaFetcher {
    transport: Arc<dyn HttpTransport>,
    root: PathBuf,
    retry: RetryPolicy,
}

impl HttpMediaFetcher {
    pub fn new(transport: Arc<dyn HttpTransport>, root: impl Into<PathBuf>) -> Self {
        Self {
            transport,
            root: root.into(),
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn fetch_once(&self, url: &str, acceptable: &[&str]) -> Result<Vec<u8>, DownloadError> {
        let response = self.transport.send(HttpRequest::get(url)).await?;
        if !response.is_success() {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status: response.status,
            });
        }

        let content_type = response.content_type().map(str::to_ascii_lowercase);
        match content_type.as_deref() {
            Some(ct) if acceptable.iter().any(|a| a.eq_ignore_ascii_case(ct)) => {}
            _ => {
                return Err(DownloadError::ContentType {
                    url: url.to_string(),
                    content_type,
                });
            }
        }

        Ok(response.body)
    }
}

#[async_trait]
impl MediaFetcher for HttpMediaFetcher {
    async fn download(&self, url: &str, acceptable: &[&str]) -> Result<PathBuf, DownloadError> {
        let path = storage_path(&self.root, url)?;

        let body = retry_while(
            &self.retry,
            || self.fetch_once(url, acceptable),
            DownloadError::is_transient,
            url,
        )
        .await?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| DownloadError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        tokio::fs::write(&path, &body)
            .await
            .map_err(|source| DownloadError::Io {
                path: path.clone(),
                source,
            })?;

        tracing::debug!(url, path = %path.display(), bytes = body.len(), "downloaded media");
        Ok(path)
    }
}
