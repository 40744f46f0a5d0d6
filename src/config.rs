//! Configuration types for the conversion pipeline.
//!
//! All pipeline behaviour is controlled through [`PipelineConfig`], built via
//! its [`PipelineConfigBuilder`]. Collaborators that are normally swapped in
//! tests (image codec, remote converter, observer) are injected here too, so
//! a pipeline is fully described by its config.

use crate::error::ConvertError;
use crate::pipeline::image::ImageCodec;
use crate::pipeline::remote::RemoteConverter;
use crate::progress::PipelineObserver;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Configuration for a [`crate::ConversionPipeline`].
///
/// # Example
/// ```rust
/// use fileflip::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .jpeg_quality(90)
///     .remote_timeout_secs(30)
///     .build()
///     .unwrap();
/// assert_eq!(config.jpeg_quality, 90);
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// JPEG quality for lossy targets, 1–100. Default: 95.
    pub jpeg_quality: u8,

    /// Page geometry and type sizes for text → PDF output.
    pub page: PageGeometry,

    /// URL of the remote conversion service, e.g. `http://localhost:5000/convert`.
    ///
    /// When set (and `remote` is not), document kinds are sent there instead
    /// of being converted locally.
    pub remote_endpoint: Option<String>,

    /// Pre-constructed remote converter. Takes precedence over `remote_endpoint`.
    pub remote: Option<Arc<dyn RemoteConverter>>,

    /// Per-request timeout for the remote service in seconds. Default: 60.
    pub remote_timeout_secs: u64,

    /// Extra attempts after a transient remote failure. Default: 0.
    pub remote_max_retries: u32,

    /// Initial retry delay in milliseconds (exponential backoff). Default: 500.
    pub retry_backoff_ms: u64,

    /// Image codec. If None, uses [`crate::pipeline::image::ImageCrateCodec`].
    pub image_codec: Option<Arc<dyn ImageCodec>>,

    /// Lifecycle observer (progress reporting).
    pub observer: Option<Arc<dyn PipelineObserver>>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: 95,
            page: PageGeometry::default(),
            remote_endpoint: None,
            remote: None,
            remote_timeout_secs: 60,
            remote_max_retries: 0,
            retry_backoff_ms: 500,
            image_codec: None,
            observer: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("jpeg_quality", &self.jpeg_quality)
            .field("page", &self.page)
            .field("remote_endpoint", &self.remote_endpoint)
            .field("remote", &self.remote.as_ref().map(|_| "<dyn RemoteConverter>"))
            .field("remote_timeout_secs", &self.remote_timeout_secs)
            .field("remote_max_retries", &self.remote_max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("image_codec", &self.image_codec.as_ref().map(|_| "<dyn ImageCodec>"))
            .field("observer", &self.observer.as_ref().map(|_| "<dyn PipelineObserver>"))
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }

    /// Whether document kinds are delegated to a remote service.
    pub fn uses_remote(&self) -> bool {
        self.remote.is_some() || self.remote_endpoint.is_some()
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn jpeg_quality(mut self, q: u8) -> Self {
        self.config.jpeg_quality = q.clamp(1, 100);
        self
    }

    pub fn page(mut self, page: PageGeometry) -> Self {
        self.config.page = page;
        self
    }

    pub fn remote_endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.remote_endpoint = Some(url.into());
        self
    }

    pub fn remote(mut self, remote: Arc<dyn RemoteConverter>) -> Self {
        self.config.remote = Some(remote);
        self
    }

    pub fn remote_timeout_secs(mut self, secs: u64) -> Self {
        self.config.remote_timeout_secs = secs;
        self
    }

    pub fn remote_max_retries(mut self, n: u32) -> Self {
        self.config.remote_max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn image_codec(mut self, codec: Arc<dyn ImageCodec>) -> Self {
        self.config.image_codec = Some(codec);
        self
    }

    pub fn observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.config.observer = Some(observer);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, ConvertError> {
        let c = &self.config;
        if c.remote_timeout_secs == 0 {
            return Err(ConvertError::InvalidConfig(
                "Remote timeout must be ≥ 1 second".into(),
            ));
        }
        if let Some(ref url) = c.remote_endpoint {
            if !crate::pipeline::input::is_url(url) {
                return Err(ConvertError::InvalidConfig(format!(
                    "Remote endpoint must be an HTTP/HTTPS URL, got '{url}'"
                )));
            }
        }
        c.page.validate()?;
        Ok(self.config)
    }
}

// ── Page geometry ────────────────────────────────────────────────────────

/// Page size, margins and type sizes for text → PDF pagination.
///
/// All values are PDF points (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    /// Default: 595.28 (A4).
    pub width: f32,
    /// Default: 841.89 (A4).
    pub height: f32,
    /// Left, right, top and bottom margin. Default: 50.
    pub margin: f32,
    /// Vertical advance per text line. Default: 20.
    pub line_height: f32,
    /// Title font size. Default: 16.
    pub title_size: f32,
    /// Body font size. Default: 12.
    pub body_size: f32,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self {
            width: 595.28,
            height: 841.89,
            margin: 50.0,
            line_height: 20.0,
            title_size: 16.0,
            body_size: 12.0,
        }
    }
}

impl PageGeometry {
    /// Horizontal space available for text.
    pub fn usable_width(&self) -> f32 {
        self.width - 2.0 * self.margin
    }

    /// Cursor position of the first line on a fresh page.
    pub fn top(&self) -> f32 {
        self.height - self.margin
    }

    fn validate(&self) -> Result<(), ConvertError> {
        if self.usable_width() <= 0.0 || self.top() <= self.margin {
            return Err(ConvertError::InvalidConfig(format!(
                "Page {}×{} leaves no room inside a {} margin",
                self.width, self.height, self.margin
            )));
        }
        if self.line_height <= 0.0 || self.body_size <= 0.0 || self.title_size <= 0.0 {
            return Err(ConvertError::InvalidConfig(
                "Line height and font sizes must be positive".into(),
            ));
        }
        Ok(())
    }
}
