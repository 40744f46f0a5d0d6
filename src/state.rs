//! File-session state: the single record the pipeline mutates.

use crate::format::ConversionKind;
use crate::resource::Handle;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Where the active file is in its conversion lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// No file selected.
    Idle,
    /// File accepted, waiting for `convert()`.
    Ready,
    /// A conversion is in flight.
    Converting,
    /// Output available for download.
    Converted,
    /// Selection or the last conversion attempt failed.
    Failed,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Idle => "idle",
            Status::Ready => "ready",
            Status::Converting => "converting",
            Status::Converted => "converted",
            Status::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// The active file. At most one exists per pipeline.
///
/// Invariants maintained by [`crate::ConversionPipeline`]:
/// * `output` is `Some` iff `status == Converted`
/// * `error` is `Some` iff `status == Failed`
/// * `preview` is `Some` iff the selection was accepted
#[derive(Debug)]
pub(crate) struct FileState {
    /// Distinguishes this session from any that replace it while a
    /// conversion is in flight.
    pub id: u64,
    pub kind: ConversionKind,
    pub source_bytes: Arc<[u8]>,
    pub source_name: String,
    pub preview: Option<Handle>,
    pub output: Option<Handle>,
    pub status: Status,
    pub error: Option<String>,
}

impl FileState {
    /// `false` when the file was rejected at selection time.
    pub fn accepted(&self) -> bool {
        self.preview.is_some()
    }

    pub fn snapshot(&self) -> FileSnapshot {
        FileSnapshot {
            kind: self.kind,
            source_name: self.source_name.clone(),
            source_len: self.source_bytes.len(),
            status: self.status,
            error: self.error.clone(),
            preview: self.preview,
            output: self.output,
        }
    }
}

/// Read-only copy of the active file's state, for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileSnapshot {
    pub kind: ConversionKind,
    pub source_name: String,
    pub source_len: usize,
    pub status: Status,
    pub error: Option<String>,
    pub preview: Option<Handle>,
    pub output: Option<Handle>,
}

impl FileSnapshot {
    /// Name the converted file will be saved under.
    pub fn output_name(&self) -> String {
        crate::output::output_file_name(&self.source_name, self.kind)
    }
}
