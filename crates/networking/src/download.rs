//! File downloads
//!
//! Provides:
//! - Deterministic destination paths derived from the file URL
//! - Streaming to a per-call `.part` file with receive progress
//! - Rename into place on success, removal of the partial file on failure
//!
//! Concurrent downloads of the same URL each write their own partial file;
//! the last one to finish replaces the destination.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use sha2::{Digest, Sha256};
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::config::join_route;
use crate::error::{NetworkError, NetworkErrorCause, Result};
use crate::progress::{report, Progress, ProgressCallback};

/// Suffix of in-progress download files
pub const PARTIAL_SUFFIX: &str = ".part";

/// Handle to a completed download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    /// Local path of the file
    pub path: PathBuf,
    /// Bytes written
    pub bytes: u64,
}

/// Resolve an absolute or base-relative file URL
pub fn resolve_url(base_url: &str, file_url: &str) -> Result<Url> {
    let url = Url::parse(file_url)
        .or_else(|_| Url::parse(&join_route(base_url, file_url)))
        .map_err(|e| NetworkErrorCause::InvalidUrl(format!("{}: {}", file_url, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(NetworkErrorCause::InvalidUrl(format!("unsupported scheme {}", scheme)).into()),
    }
}

/// Local path a URL downloads to
///
/// The same URL always maps to the same path: the last path segment,
/// prefixed with a short hash of the full URL so different URLs sharing a
/// file name do not collide.
pub fn download_path(dir: &Path, url: &Url) -> PathBuf {
    let name = url
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(sanitize)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "download".to_string());

    let digest = Sha256::digest(url.as_str().as_bytes());
    dir.join(format!("{}-{}", hex::encode(&digest[..8]), name))
}

/// Create a fresh partial file next to `destination`
///
/// The file is removed when the returned path is dropped unless it has
/// been persisted.
pub fn partial_file(destination: &Path) -> std::io::Result<TempPath> {
    let dir = destination.parent().unwrap_or_else(|| Path::new("."));
    let prefix = destination
        .file_name()
        .map(|name| format!("{}.", name.to_string_lossy()))
        .unwrap_or_default();

    let file = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(PARTIAL_SUFFIX)
        .tempfile_in(dir)?;
    Ok(file.into_temp_path())
}

fn sanitize(segment: &str) -> String {
    segment
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect()
}

fn local_error(path: &Path, e: std::io::Error) -> NetworkErrorCause {
    NetworkErrorCause::LocalFile(format!("{}: {}", path.display(), e))
}

/// Stream a successful response body into a new partial file
///
/// Returns the partial file and the number of bytes written. Dropping the
/// returned path deletes the file.
pub(crate) async fn write_body(
    response: reqwest::Response,
    destination: &Path,
    progress: Option<&ProgressCallback>,
) -> Result<(TempPath, u64)> {
    let status = response.status();
    if !status.is_success() {
        return Err(NetworkErrorCause::Status(status.as_u16()).into());
    }

    if let Some(parent) = destination.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| local_error(parent, e))?;
    }

    let temp_path = partial_file(destination).map_err(|e| local_error(destination, e))?;
    let total = response.content_length();
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .truncate(true)
        .open(&temp_path)
        .await
        .map_err(|e| local_error(&temp_path, e))?;

    let mut written = 0u64;
    let mut stream = response.bytes_stream();
    report(progress, Progress::receive(0, total));

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk)
            .await
            .map_err(|e| local_error(&temp_path, e))?;
        written += chunk.len() as u64;
        report(progress, Progress::receive(written, total));
    }

    file.flush().await.map_err(|e| local_error(&temp_path, e))?;
    Ok((temp_path, written))
}

/// Move a finished partial file onto `destination`, replacing any file there
pub(crate) fn persist(temp_path: TempPath, destination: &Path) -> Result<()> {
    temp_path
        .persist(destination)
        .map_err(|e| NetworkError::from(local_error(destination, e.error)))
}
