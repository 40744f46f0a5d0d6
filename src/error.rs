//! Error types for the fileflip library.
//!
//! A single enum, [`ConvertError`], covers every failure the pipeline can
//! produce. The pipeline itself never returns these from `convert()`: they
//! are caught at that boundary and folded into a `Failed` file state with
//! the error's display text as the user-facing message. Only the ambient
//! entry points (source loading, saving artifacts, config validation)
//! return `Err(ConvertError)` directly.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the fileflip library.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Selection errors ──────────────────────────────────────────────────
    /// File name extension is outside the accepted set for the conversion kind.
    #[error("Invalid file type '{name}' for {kind}. Accepted extensions: {}", .accepted.join(", "))]
    InvalidExtension {
        name: String,
        kind: String,
        accepted: Vec<&'static str>,
    },

    // ── Image errors ──────────────────────────────────────────────────────
    /// Source bytes could not be decoded as an image.
    #[error("Could not decode image: {detail}")]
    ImageDecode { detail: String },

    /// The encoder failed or produced no output.
    #[error("Could not encode image as {format}: {detail}")]
    ImageEncode { format: String, detail: String },

    // ── Document errors ───────────────────────────────────────────────────
    /// PDF header/xref/page tree could not be read.
    #[error("Invalid PDF: {detail}")]
    PdfParse { detail: String },

    /// Building or serialising the output PDF failed.
    #[error("Could not write PDF: {detail}")]
    PdfWrite { detail: String },

    /// Building the DOCX package failed.
    #[error("Could not write DOCX: {detail}")]
    DocxWrite { detail: String },

    // ── Remote errors ─────────────────────────────────────────────────────
    /// Non-success response or transport failure from the conversion service.
    ///
    /// `status` is `None` when no HTTP response was received at all.
    #[error("Remote conversion failed{}: {detail}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    RemoteConversion { status: Option<u16>, detail: String },

    /// The conversion service did not answer within the configured timeout.
    #[error("Remote conversion timed out after {secs}s")]
    Timeout { secs: u64 },

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'")]
    PermissionDenied { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not write a downloaded artifact to disk.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Something went wrong during conversion: {0}")]
    Unknown(String),
}

impl ConvertError {
    /// Whether a repeat attempt of the same remote call could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ConvertError::Timeout { .. } => true,
            ConvertError::RemoteConversion { status: None, .. } => true,
            ConvertError::RemoteConversion {
                status: Some(code), ..
            } => matches!(code, 502 | 503 | 504),
            _ => false,
        }
    }
}
