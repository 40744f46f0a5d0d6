//! Transform stages used by [`crate::ConversionPipeline`].
//!
//! Each submodule implements one transform, with no shared state. Keeping
//! stages separate makes each independently testable and lets the pipeline
//! route between local and remote backends without touching the transforms.
//!
//! ## Routing
//!
//! ```text
//! JpgToPng / PngToJpg ──▶ image      (decode → RGBA surface → encode)
//! PdfToFlowDoc        ──▶ flowdoc    (page count → placeholder blocks → DOCX)
//!                     └─▶ remote     (when a conversion service is configured)
//! FlowDocToPdf        ──▶ paginate   (word-wrap → pages → PDF)
//!                     └─▶ remote
//! ```
//!
//! 1. [`image`]: raster re-encoding behind the `ImageCodec` trait
//! 2. [`flowdoc`]: PDF page tree → flow document → WordprocessingML package
//! 3. [`paginate`]: text layout and PDF serialisation; widths from [`metrics`]
//! 4. [`remote`]: HTTP client for the external conversion service
//! 5. [`input`]: load a local path or URL into named bytes (CLI only)

pub mod flowdoc;
pub mod image;
pub mod input;
pub mod metrics;
pub mod paginate;
pub mod remote;
