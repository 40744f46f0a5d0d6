//! Observer trait for file-session lifecycle events.
//!
//! Inject an [`Arc<dyn PipelineObserver>`] via
//! [`crate::config::PipelineConfigBuilder::observer`] to be told when a file
//! is selected, when a conversion starts and how it ends, and when the
//! session is cleared. The CLI uses this to drive its spinner; a UI layer can
//! use it to re-render.
//!
//! # Example
//!
//! ```rust
//! use fileflip::{ConversionKind, PipelineConfig, PipelineObserver};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingObserver {
//!     converted: AtomicUsize,
//! }
//!
//! impl PipelineObserver for CountingObserver {
//!     fn on_conversion_complete(&self, name: &str, _kind: ConversionKind, output_len: usize) {
//!         self.converted.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{name}: {output_len} bytes");
//!     }
//! }
//!
//! let config = PipelineConfig::builder()
//!     .observer(Arc::new(CountingObserver { converted: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use crate::format::ConversionKind;
use crate::state::Status;
use std::sync::Arc;

/// Called by the pipeline as the active file moves through its states.
///
/// The pipeline never holds its state lock while calling an observer, so
/// implementations may read pipeline state from inside a callback. All
/// methods default to no-ops.
pub trait PipelineObserver: Send + Sync {
    /// A file was selected; `status` is `Ready` or `Failed`.
    fn on_file_selected(&self, name: &str, kind: ConversionKind, status: Status) {
        let _ = (name, kind, status);
    }

    /// A conversion attempt is starting.
    fn on_conversion_start(&self, name: &str, kind: ConversionKind) {
        let _ = (name, kind);
    }

    /// A conversion attempt produced `output_len` bytes.
    fn on_conversion_complete(&self, name: &str, kind: ConversionKind, output_len: usize) {
        let _ = (name, kind, output_len);
    }

    /// A conversion attempt failed with a user-facing message.
    fn on_conversion_error(&self, name: &str, kind: ConversionKind, error: &str) {
        let _ = (name, kind, error);
    }

    /// The session was cleared.
    fn on_cleared(&self) {}
}

/// A no-op observer.
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type Observer = Arc<dyn PipelineObserver>;
