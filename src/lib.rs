//! # fileflip
//!
//! Convert a single file between PDF and DOCX, or between JPG and PNG,
//! entirely in memory.
//!
//! The crate is built around [`ConversionPipeline`], which holds at most one
//! active file and exposes four operations: select a file, convert it,
//! download the result, and clear. Every transient buffer the pipeline
//! hands out is a [`Handle`] owned by a [`ResourceTracker`] and released
//! when its file is replaced or cleared.
//!
//! ## Pipeline Overview
//!
//! ```text
//! bytes + name + kind
//!  │
//!  ├─ 1. Select   validate extension against the kind → Ready | Failed
//!  ├─ 2. Convert  route by kind:
//!  │               JPG ⇄ PNG   decode → RGBA surface → encode (quality 95)
//!  │               PDF → DOCX  page count → placeholder flow document → zip package
//!  │               DOCX → PDF  lossy UTF-8 text → word-wrap → paginate → PDF
//!  │               (document kinds go to a remote service when one is configured)
//!  ├─ 3. Download "{stem}.{target}" with the target MIME type
//!  └─ 4. Clear    release every handle, back to Idle
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fileflip::{ConversionKind, ConversionPipeline, PipelineConfig, Status};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pipeline = ConversionPipeline::new(PipelineConfig::default())?;
//!     let bytes = std::fs::read("notes.txt")?;
//!
//!     pipeline.select_file(bytes, "notes.txt", ConversionKind::FlowDocToPdf);
//!     match pipeline.convert().await {
//!         Status::Converted => {
//!             let artifact = pipeline.download().expect("output after Converted");
//!             artifact.save_in(std::path::Path::new("."))?;
//!         }
//!         _ => eprintln!("{:?}", pipeline.snapshot().and_then(|s| s.error)),
//!     }
//!     pipeline.clear();
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `fileflip` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod format;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod resource;
pub mod state;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PageGeometry, PipelineConfig, PipelineConfigBuilder};
pub use convert::ConversionPipeline;
pub use error::ConvertError;
pub use format::{mime_type, ConversionKind};
pub use output::DownloadArtifact;
pub use pipeline::flowdoc::{Block, BlockKind, FlowDocument};
pub use pipeline::image::{ImageCodec, ImageCrateCodec, ImageTarget, PixelSurface};
pub use pipeline::input::{load_source, SourceFile};
pub use pipeline::remote::{HttpRemoteConverter, RemoteConverter};
pub use progress::{NoopObserver, Observer, PipelineObserver};
pub use resource::{Blob, Handle, HandleStats, ResourceTracker};
pub use state::{FileSnapshot, Status};
