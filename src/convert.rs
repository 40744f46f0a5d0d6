//! The conversion pipeline: one active file, four operations.
//!
//! [`ConversionPipeline`] owns the single [`FileState`] and the
//! [`ResourceTracker`] that backs its handles. Callers drive it with
//! [`select_file`](ConversionPipeline::select_file),
//! [`convert`](ConversionPipeline::convert),
//! [`download`](ConversionPipeline::download) and
//! [`clear`](ConversionPipeline::clear), and render whatever
//! [`snapshot`](ConversionPipeline::snapshot) reports.
//!
//! ## State machine
//!
//! ```text
//!            select (ok)            convert            ok
//!   Idle ───────────────▶ Ready ───────────▶ Converting ───▶ Converted
//!     │  select (bad ext)                        │ err
//!     └───────────────────────────▶ Failed ◀─────┘
//! ```
//!
//! `Failed` and `Converted` accept a new `select_file` or `clear`; `Ready`,
//! `Converted` and conversion-time `Failed` accept another `convert`.
//!
//! ## Errors never escape
//!
//! Every conversion-time error is caught at the `convert()` boundary and
//! stored as the file's error message. Callers observe state, never errors.
//!
//! ## Concurrency
//!
//! All methods take `&self`. State sits behind a mutex that is never held
//! across an `.await`; a busy flag turns a second concurrent `convert()` into
//! a no-op. A conversion whose file was cleared or replaced while it ran
//! drops its result without registering anything.

use crate::config::PipelineConfig;
use crate::error::ConvertError;
use crate::format::{extension_of, file_stem, mime_type, ConversionKind, OCTET_STREAM};
use crate::output::{output_file_name, DownloadArtifact};
use crate::pipeline::image::{convert_image, ImageCodec, ImageCrateCodec, ImageTarget};
use crate::pipeline::remote::{HttpRemoteConverter, RemoteConverter};
use crate::pipeline::{flowdoc, paginate};
use crate::resource::{Blob, HandleStats, ResourceTracker};
use crate::state::{FileSnapshot, FileState, Status};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, info, warn};

/// Preview shown for document kinds, which have no renderable source.
pub const DOCUMENT_PLACEHOLDER: &[u8] = br##"<svg xmlns="http://www.w3.org/2000/svg" width="96" height="128" viewBox="0 0 96 128"><path d="M8 4h56l24 24v96H8z" fill="#f4f4f5" stroke="#71717a" stroke-width="4"/><path d="M64 4v24h24" fill="none" stroke="#71717a" stroke-width="4"/><path d="M24 56h48M24 72h48M24 88h32" stroke="#a1a1aa" stroke-width="6"/></svg>"##;

/// Upper bound on a single retry delay.
const MAX_BACKOFF_MS: u64 = 60_000;

/// MIME type of a selected file, from its extension.
fn source_mime(name: &str) -> &'static str {
    extension_of(name).map_or(OCTET_STREAM, |ext| mime_type(&ext))
}

struct Inner {
    tracker: ResourceTracker,
    session: Option<FileState>,
    next_id: u64,
}

impl Inner {
    /// Drop the active file, releasing both of its handles.
    fn retire_session(&mut self) -> bool {
        match self.session.take() {
            Some(state) => {
                self.tracker.release(state.preview);
                self.tracker.release(state.output);
                debug!("Retired session {} ('{}')", state.id, state.source_name);
                true
            }
            None => false,
        }
    }

    fn status(&self) -> Status {
        self.session.as_ref().map_or(Status::Idle, |s| s.status)
    }
}

/// Everything a conversion needs, copied out of the state lock.
struct Job {
    id: u64,
    kind: ConversionKind,
    bytes: Arc<[u8]>,
    name: String,
}

struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Single-file conversion pipeline.
///
/// # Example
/// ```rust,no_run
/// use fileflip::{ConversionKind, ConversionPipeline, PipelineConfig, Status};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let pipeline = ConversionPipeline::new(PipelineConfig::default())?;
/// let png = std::fs::read("photo.png")?;
///
/// pipeline.select_file(png, "photo.png", ConversionKind::PngToJpg);
/// if pipeline.convert().await == Status::Converted {
///     let artifact = pipeline.download().expect("converted output");
///     artifact.save_in(std::path::Path::new("."))?;
/// }
/// pipeline.clear();
/// # Ok(())
/// # }
/// ```
pub struct ConversionPipeline {
    config: PipelineConfig,
    codec: Arc<dyn ImageCodec>,
    remote: Option<Arc<dyn RemoteConverter>>,
    inner: Mutex<Inner>,
    busy: AtomicBool,
}

impl ConversionPipeline {
    /// Build a pipeline, resolving the image codec and remote backend.
    pub fn new(config: PipelineConfig) -> Result<Self, ConvertError> {
        let codec = config
            .image_codec
            .clone()
            .unwrap_or_else(|| Arc::new(ImageCrateCodec));
        let remote = resolve_remote(&config)?;
        if remote.is_some() {
            info!("Document kinds will use the remote conversion service");
        }

        Ok(Self {
            config,
            codec,
            remote,
            inner: Mutex::new(Inner {
                tracker: ResourceTracker::new(),
                session: None,
                next_id: 1,
            }),
            busy: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Operations ──────────────────────────────────────────────────────

    /// Make `bytes` (named `name`) the active file for `kind`.
    ///
    /// Any previous file is retired first. A name whose extension is not
    /// accepted by `kind` yields a `Failed` file carrying a message that
    /// lists the accepted extensions; no transform runs.
    pub fn select_file(
        &self,
        bytes: impl Into<Arc<[u8]>>,
        name: impl Into<String>,
        kind: ConversionKind,
    ) -> Status {
        let bytes = bytes.into();
        let name = name.into();

        let status = {
            let mut inner = self.lock();
            inner.retire_session();
            let id = inner.next_id;
            inner.next_id += 1;

            let (preview, status, error) = if kind.accepts(&name) {
                let preview = if kind.is_image() {
                    inner.tracker.register(bytes.clone(), source_mime(&name))
                } else {
                    inner.tracker.register(DOCUMENT_PLACEHOLDER, "image/svg+xml")
                };
                info!("Selected '{}' ({} bytes) for {}", name, bytes.len(), kind);
                (Some(preview), Status::Ready, None)
            } else {
                let err = ConvertError::InvalidExtension {
                    name: name.clone(),
                    kind: kind.label().to_string(),
                    accepted: kind.accepted_extensions().to_vec(),
                };
                warn!("{}", err);
                (None, Status::Failed, Some(err.to_string()))
            };

            inner.session = Some(FileState {
                id,
                kind,
                source_bytes: bytes,
                source_name: name.clone(),
                preview,
                output: None,
                status,
                error,
            });
            status
        };

        if let Some(ref obs) = self.config.observer {
            obs.on_file_selected(&name, kind, status);
        }
        status
    }

    /// Convert the active file and return the resulting status.
    ///
    /// No-op (returning the current status) when there is no file, when the
    /// file was rejected at selection, or when another conversion is already
    /// in flight.
    pub async fn convert(&self) -> Status {
        let Some(_busy) = BusyGuard::acquire(&self.busy) else {
            warn!("convert() called while a conversion is in flight; ignored");
            return self.status();
        };

        let job = {
            let mut inner = self.lock();
            let Inner {
                tracker, session, ..
            } = &mut *inner;
            let Some(state) = session.as_mut() else {
                debug!("convert() with no file selected");
                return Status::Idle;
            };
            if !state.accepted() {
                debug!("convert() on rejected file '{}'", state.source_name);
                return state.status;
            }

            // An output handle only exists while Converted.
            if let Some(output) = state.output.take() {
                tracker.release(output);
                // The image preview showed that output; point it back at the source.
                if state.kind.is_image() {
                    tracker.release(state.preview.take());
                    let mime = source_mime(&state.source_name);
                    state.preview = Some(tracker.register(state.source_bytes.clone(), mime));
                }
            }
            state.status = Status::Converting;
            state.error = None;

            Job {
                id: state.id,
                kind: state.kind,
                bytes: state.source_bytes.clone(),
                name: state.source_name.clone(),
            }
        };

        info!("Converting '{}' ({})", job.name, job.kind);
        if let Some(ref obs) = self.config.observer {
            obs.on_conversion_start(&job.name, job.kind);
        }

        let start = Instant::now();
        let result = self.run(&job).await;
        let elapsed_ms = start.elapsed().as_millis();

        let outcome = {
            let mut inner = self.lock();
            let Inner {
                tracker, session, ..
            } = &mut *inner;
            let Some(state) = session.as_mut().filter(|s| s.id == job.id) else {
                warn!("Discarding result for '{}': file was cleared or replaced", job.name);
                return session.as_ref().map_or(Status::Idle, |s| s.status);
            };

            match result {
                Ok(bytes) => {
                    let len = bytes.len();
                    let bytes: Arc<[u8]> = Arc::from(bytes);
                    let mime = mime_type(job.kind.target_extension());

                    state.output = Some(tracker.register(bytes.clone(), mime));
                    if job.kind.is_image() {
                        tracker.release(state.preview.take());
                        state.preview = Some(tracker.register(bytes, mime));
                    }
                    state.status = Status::Converted;
                    info!("Converted '{}' → {} bytes in {}ms", job.name, len, elapsed_ms);
                    Ok(len)
                }
                Err(e) => {
                    let message = e.to_string();
                    warn!("Conversion of '{}' failed after {}ms: {}", job.name, elapsed_ms, message);
                    state.status = Status::Failed;
                    state.error = Some(message.clone());
                    Err(message)
                }
            }
        };

        if let Some(ref obs) = self.config.observer {
            match &outcome {
                Ok(len) => obs.on_conversion_complete(&job.name, job.kind, *len),
                Err(message) => obs.on_conversion_error(&job.name, job.kind, message),
            }
        }

        if outcome.is_ok() {
            Status::Converted
        } else {
            Status::Failed
        }
    }

    /// The converted file, ready to be saved. `None` unless `Converted`.
    pub fn download(&self) -> Option<DownloadArtifact> {
        let inner = self.lock();
        let state = inner.session.as_ref()?;
        let blob = inner.tracker.get(state.output?)?;

        Some(DownloadArtifact {
            file_name: output_file_name(&state.source_name, state.kind),
            mime_type: mime_type(state.kind.target_extension()).to_string(),
            bytes: blob.bytes.clone(),
        })
    }

    /// Release every handle and return to `Idle`. Safe to call repeatedly.
    pub fn clear(&self) {
        let cleared = self.lock().retire_session();
        if cleared {
            info!("Cleared active file");
            if let Some(ref obs) = self.config.observer {
                obs.on_cleared();
            }
        }
    }

    // ── Read access ─────────────────────────────────────────────────────

    pub fn status(&self) -> Status {
        self.lock().status()
    }

    /// Copy of the active file's state, or `None` when idle.
    pub fn snapshot(&self) -> Option<FileSnapshot> {
        self.lock().session.as_ref().map(FileState::snapshot)
    }

    /// The preview buffer: source image, converted image, or the document
    /// placeholder.
    pub fn preview(&self) -> Option<Blob> {
        let inner = self.lock();
        let handle = inner.session.as_ref()?.preview?;
        inner.tracker.get(handle).cloned()
    }

    /// The preview as a `data:` URL.
    pub fn preview_data_url(&self) -> Option<String> {
        let inner = self.lock();
        let handle = inner.session.as_ref()?.preview?;
        inner.tracker.data_url(handle)
    }

    pub fn is_converting(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Handle register/release counters.
    pub fn handle_stats(&self) -> HandleStats {
        self.lock().tracker.stats()
    }

    // ── Routing ─────────────────────────────────────────────────────────

    async fn run(&self, job: &Job) -> Result<Vec<u8>, ConvertError> {
        let quality = self.config.jpeg_quality;
        match (job.kind, &self.remote) {
            (ConversionKind::JpgToPng, _) => {
                convert_image(self.codec.clone(), job.bytes.clone(), ImageTarget::Png, quality).await
            }
            (ConversionKind::PngToJpg, _) => {
                convert_image(self.codec.clone(), job.bytes.clone(), ImageTarget::Jpeg, quality)
                    .await
            }
            (_, Some(remote)) => self.run_remote(remote.as_ref(), job).await,
            (ConversionKind::PdfToFlowDoc, None) => {
                flowdoc::pdf_to_docx(job.bytes.clone(), file_stem(&job.name)).await
            }
            (ConversionKind::FlowDocToPdf, None) => {
                paginate::text_to_pdf(job.bytes.clone(), file_stem(&job.name), self.config.page)
                    .await
            }
        }
    }

    /// One remote call per attempt, each bounded by the configured timeout.
    /// Only transient failures are retried, with exponential backoff.
    async fn run_remote(
        &self,
        remote: &dyn RemoteConverter,
        job: &Job,
    ) -> Result<Vec<u8>, ConvertError> {
        let secs = self.config.remote_timeout_secs;
        let mut attempt = 0u32;

        loop {
            let call = remote.convert_document(job.bytes.clone(), job.name.clone(), job.kind);
            let result = match timeout(Duration::from_secs(secs), call).await {
                Ok(r) => r,
                Err(_) => Err(ConvertError::Timeout { secs }),
            };

            match result {
                Err(e) if e.is_transient() && attempt < self.config.remote_max_retries => {
                    attempt += 1;
                    let backoff = backoff_delay_ms(self.config.retry_backoff_ms, attempt);
                    warn!(
                        "Remote attempt {}/{} for '{}' failed: {}; retrying in {}ms",
                        attempt,
                        self.config.remote_max_retries.saturating_add(1),
                        job.name,
                        e,
                        backoff
                    );
                    sleep(Duration::from_millis(backoff)).await;
                }
                other => return other,
            }
        }
    }
}

impl std::fmt::Debug for ConversionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversionPipeline")
            .field("config", &self.config)
            .field("status", &self.status())
            .field("busy", &self.is_converting())
            .finish()
    }
}

/// Delay before retry number `attempt` (1-based): `base_ms * 2^(attempt-1)`,
/// saturating, capped at [`MAX_BACKOFF_MS`].
fn backoff_delay_ms(base_ms: u64, attempt: u32) -> u64 {
    let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
    base_ms.saturating_mul(factor).min(MAX_BACKOFF_MS)
}

/// Pick the remote backend: an injected converter wins over an endpoint URL.
fn resolve_remote(
    config: &PipelineConfig,
) -> Result<Option<Arc<dyn RemoteConverter>>, ConvertError> {
    if let Some(ref remote) = config.remote {
        return Ok(Some(remote.clone()));
    }
    match config.remote_endpoint {
        Some(ref url) => {
            let client = HttpRemoteConverter::new(url.clone(), config.remote_timeout_secs)?;
            Ok(Some(Arc::new(client)))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipeline() -> ConversionPipeline {
        ConversionPipeline::new(PipelineConfig::default()).unwrap()
    }

    #[test]
    fn starts_idle() {
        let p = pipeline();
        assert_eq!(p.status(), Status::Idle);
        assert!(p.snapshot().is_none());
        assert!(p.download().is_none());
        assert_eq!(p.handle_stats(), HandleStats::default());
    }

    #[test]
    fn document_selection_uses_placeholder_preview() {
        let p = pipeline();
        assert_eq!(
            p.select_file(b"%PDF-1.4".to_vec(), "a.pdf", ConversionKind::PdfToFlowDoc),
            Status::Ready
        );
        let preview = p.preview().unwrap();
        assert_eq!(preview.mime_type, "image/svg+xml");
        assert_eq!(&*preview.bytes, DOCUMENT_PLACEHOLDER);
        assert!(p.preview_data_url().unwrap().starts_with("data:image/svg+xml;base64,"));
    }

    #[test]
    fn image_selection_previews_source_bytes() {
        let p = pipeline();
        p.select_file(vec![1u8, 2, 3], "x.JPEG", ConversionKind::JpgToPng);
        let preview = p.preview().unwrap();
        assert_eq!(preview.mime_type, "image/jpeg");
        assert_eq!(&*preview.bytes, &[1, 2, 3]);
    }

    #[test]
    fn rejected_selection_registers_nothing() {
        let p = pipeline();
        let status = p.select_file(vec![0u8; 8], "report.txt", ConversionKind::PdfToFlowDoc);
        assert_eq!(status, Status::Failed);
        let snap = p.snapshot().unwrap();
        assert!(snap.error.unwrap().contains(".pdf"));
        assert!(snap.preview.is_none());
        assert_eq!(p.handle_stats().registered, 0);
    }

    #[tokio::test]
    async fn convert_without_file_is_noop() {
        let p = pipeline();
        assert_eq!(p.convert().await, Status::Idle);
        assert!(!p.is_converting());
    }

    #[tokio::test]
    async fn convert_rejected_file_is_noop() {
        let p = pipeline();
        p.select_file(vec![0u8; 8], "a.gif", ConversionKind::PngToJpg);
        assert_eq!(p.convert().await, Status::Failed);
        assert_eq!(p.handle_stats().registered, 0);
    }

    #[test]
    fn busy_guard_is_exclusive() {
        let flag = AtomicBool::new(false);
        let first = BusyGuard::acquire(&flag);
        assert!(first.is_some());
        assert!(BusyGuard::acquire(&flag).is_none());
        drop(first);
        assert!(BusyGuard::acquire(&flag).is_some());
    }

    #[test]
    fn backoff_doubles_then_caps() {
        assert_eq!(backoff_delay_ms(500, 1), 500);
        assert_eq!(backoff_delay_ms(500, 3), 2_000);
        assert_eq!(backoff_delay_ms(500, 20), MAX_BACKOFF_MS);
        assert_eq!(backoff_delay_ms(u64::MAX, 2), MAX_BACKOFF_MS);
        assert_eq!(backoff_delay_ms(0, 70), 0);
        assert_eq!(backoff_delay_ms(1, u32::MAX), MAX_BACKOFF_MS);
    }

    #[test]
    fn endpoint_builds_http_remote() {
        let config = PipelineConfig::builder()
            .remote_endpoint("http://localhost:5000/convert")
            .build()
            .unwrap();
        assert!(resolve_remote(&config).unwrap().is_some());
        assert!(resolve_remote(&PipelineConfig::default()).unwrap().is_none());
    }
}
