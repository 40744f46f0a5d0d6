//! Download artifacts: converted bytes plus the name and MIME type to save
//! them under.

use crate::error::ConvertError;
use crate::format::{file_stem, ConversionKind};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// A converted file ready to be saved.
#[derive(Debug, Clone, Serialize)]
pub struct DownloadArtifact {
    /// `"{source stem}.{target extension}"`.
    pub file_name: String,
    pub mime_type: String,
    #[serde(skip)]
    pub bytes: Arc<[u8]>,
}

impl DownloadArtifact {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Write the artifact into `dir` under its sanitised file name.
    ///
    /// The bytes go to a temp file in the same directory which is then
    /// renamed into place, so a partially written file is never visible.
    pub fn save_in(&self, dir: &Path) -> Result<PathBuf, ConvertError> {
        let path = dir.join(secure_file_name(&self.file_name));
        let write_err = |source: std::io::Error| ConvertError::OutputWriteFailed {
            path: path.clone(),
            source,
        };

        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(&self.bytes).map_err(write_err)?;
        tmp.persist(&path).map_err(|e| write_err(e.error))?;

        info!("Saved {} ({} bytes)", path.display(), self.bytes.len());
        Ok(path)
    }
}

/// Output naming convention: original name without extension, plus the
/// kind's lowercase target extension.
pub fn output_file_name(source_name: &str, kind: ConversionKind) -> String {
    format!("{}.{}", file_stem(source_name), kind.target_extension())
}

static RE_UNSAFE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]+").unwrap());

/// Reduce a file name to a safe, path-free form.
///
/// Path components are dropped, runs of unsafe characters become `_`, and
/// leading dots are stripped so the result can never be hidden or escape
/// the target directory. An empty result falls back to `"download"`.
pub fn secure_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned = RE_UNSAFE.replace_all(base.trim(), "_");
    let cleaned = cleaned.trim_start_matches('.').trim_matches('_');
    if cleaned.is_empty() {
        "download".to_string()
    } else {
        cleaned.to_string()
    }
}
