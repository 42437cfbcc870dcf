use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;

use crate::models::config::TlsConfig;

/// Default end-to-end timeout for one download
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors produced while downloading a file
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// CA bundle file could not be read
    #[error("Failed to read CA certificate file '{path}': {source}")]
    CaCertRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// CA bundle file is not valid PEM
    #[error("Invalid CA certificate file '{path}': {source}")]
    CaCertInvalid {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    /// HTTP client could not be constructed
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    /// Request failed before or while reading the response
    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Server answered with a non-success status
    #[error("Server returned {status} for {url}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    /// Destination file could not be created or written
    #[error("Failed to write '{path}': {source}")]
    FileWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Downloaded file could not be read back
    #[error("Failed to read '{path}': {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Downloaded file is not a JSON document
    #[error("'{path}' is not valid JSON: {source}")]
    JsonParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// HTTPS file downloader.
///
/// Follows redirects and verifies the server certificate; a configured CA
/// bundle replaces the built-in roots rather than extending them.
#[derive(Debug, Clone, Default)]
pub struct FileDownloader {
    ca_cert_file: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl FileDownloader {
    /// Create a downloader with the built-in trust roots and default timeout
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a downloader honoring the configured CA bundle
    pub fn from_config(tls: &TlsConfig) -> Self {
        let mut downloader = Self::new();
        if let Some(path) = &tls.ca_cert_file {
            downloader = downloader.with_ca_cert_file(path);
        }
        downloader
    }

    /// Verify servers against a PEM bundle instead of the built-in roots
    #[must_use]
    pub fn with_ca_cert_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.ca_cert_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Override the download timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Download `url` to `destination`, streaming the body to disk.
    ///
    /// Returns the number of bytes written.
    pub async fn download_file(
        &self,
        url: &str,
        destination: &Path,
    ) -> Result<u64, DownloadError> {
        let client = self.build_client()?;

        log::debug!("Downloading {} to {}", url, destination.display());
        let response = client
            .get(url)
            .send()
            .await
            .map_err(|source| DownloadError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::HttpStatus {
                url: url.to_string(),
                status,
            });
        }

        let write_err = |source| DownloadError::FileWrite {
            path: destination.display().to_string(),
            source,
        };
        let mut file = tokio::fs::File::create(destination).await.map_err(write_err)?;

        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|source| DownloadError::Request {
                url: url.to_string(),
                source,
            })?;
            file.write_all(&chunk).await.map_err(write_err)?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(write_err)?;

        log::debug!("Downloaded {} bytes from {}", written, url);
        Ok(written)
    }

    fn build_client(&self) -> Result<reqwest::Client, DownloadError> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout.unwrap_or(DEFAULT_DOWNLOAD_TIMEOUT));

        if let Some(path) = &self.ca_cert_file {
            let display = path.display().to_string();
            let pem = std::fs::read(path).map_err(|source| DownloadError::CaCertRead {
                path: display.clone(),
                source,
            })?;
            let cert = reqwest::Certificate::from_pem(&pem).map_err(|source| {
                DownloadError::CaCertInvalid {
                    path: display,
                    source,
                }
            })?;
            builder = builder
                .tls_built_in_root_certs(false)
                .add_root_certificate(cert);
        }

        builder.build().map_err(DownloadError::ClientBuild)
    }
}

/// Read a file and parse it as JSON.
///
/// Used to confirm a downloaded layout file is well formed before anything
/// else consumes it.
pub fn parse_json_file(path: &Path) -> Result<serde_json::Value, DownloadError> {
    let display = path.display().to_string();
    let content = std::fs::read_to_string(path).map_err(|source| DownloadError::FileRead {
        path: display.clone(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| DownloadError::JsonParse {
        path: display,
        source,
    })
}
