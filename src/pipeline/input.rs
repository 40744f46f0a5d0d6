//! Input resolution: turn a user-supplied path or URL into named bytes.
//!
//! The pipeline itself only ever sees `(bytes, name)`; this module is how
//! the CLI gets there. Local files are checked for existence and read
//! permission before being read whole; URLs are downloaded with a timeout
//! and named after the last path segment.

use crate::error::ConvertError;
use std::path::PathBuf;
use tracing::{debug, info};

/// A source file loaded into memory.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// File name including extension, without directories.
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load the input from a local path or an HTTP(S) URL.
pub async fn load_source(input: &str, timeout_secs: u64) -> Result<SourceFile, ConvertError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(input).await
    }
}

async fn read_local(path_str: &str) -> Result<SourceFile, ConvertError> {
    let path = PathBuf::from(path_str);

    if !path.is_file() {
        return Err(ConvertError::FileNotFound { path });
    }

    let bytes = match tokio::fs::read(&path).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ConvertError::PermissionDenied { path });
        }
        Err(_) => return Err(ConvertError::FileNotFound { path }),
    };

    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path_str)
        .to_string();

    debug!("Read local file {} ({} bytes)", path.display(), bytes.len());
    Ok(SourceFile { name, bytes })
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<SourceFile, ConvertError> {
    info!("Downloading source from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ConvertError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let map_err = |e: reqwest::Error| {
        if e.is_timeout() {
            ConvertError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            ConvertError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    };

    let response = client.get(url).send().await.map_err(map_err)?;

    if !response.status().is_success() {
        return Err(ConvertError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response.bytes().await.map_err(map_err)?;
    info!("Downloaded {} bytes", bytes.len());

    Ok(SourceFile {
        name: extract_filename(url),
        bytes: bytes.to_vec(),
    })
}

/// Extract a file name from the URL path, falling back to `"download"`.
///
/// The fallback has no extension, so selecting it will be rejected for every
/// kind; callers that know better can rename the file.
fn extract_filename(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "download".to_string()
}
