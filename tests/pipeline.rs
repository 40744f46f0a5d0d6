//! Integration tests for the local conversion paths.
//!
//! Everything runs in memory: fixtures are generated with `image` and
//! `lopdf`, and outputs are read back the same way.
//!
//! Run with:
//!   cargo test --test pipeline -- --nocapture

mod common;

use common::*;
use fileflip::{
    ConversionKind, ConversionPipeline, PipelineConfig, PipelineObserver, Status,
};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

fn pipeline() -> ConversionPipeline {
    init_tracing();
    ConversionPipeline::new(PipelineConfig::default()).unwrap()
}

/// registered − released must equal the live count, and the live count must
/// equal the handles the active file actually holds.
fn assert_handles_balanced(p: &ConversionPipeline, context: &str) {
    let stats = p.handle_stats();
    assert_eq!(
        stats.registered - stats.released,
        stats.live as u64,
        "[{context}] counters disagree: {stats:?}"
    );
    let held = p
        .snapshot()
        .map_or(0, |s| s.preview.is_some() as usize + s.output.is_some() as usize);
    assert_eq!(stats.live, held, "[{context}] leaked handles: {stats:?}");
}

// ── Selection ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn wrong_extension_fails_for_every_kind_without_transforming() {
    let codec = Arc::new(CountingCodec::default());
    let remote = ScriptedRemote::new(vec![]);
    let config = PipelineConfig::builder()
        .image_codec(codec.clone())
        .remote(remote.clone())
        .build()
        .unwrap();
    let p = ConversionPipeline::new(config).unwrap();

    for kind in ConversionKind::ALL {
        let status = p.select_file(vec![0u8; 16], "archive.zip", kind);
        assert_eq!(status, Status::Failed, "{kind}");

        let err = p.snapshot().unwrap().error.unwrap();
        for ext in kind.accepted_extensions() {
            assert!(err.contains(ext), "[{kind}] '{err}' should list {ext}");
        }

        // convert on a rejected file stays put
        assert_eq!(p.convert().await, Status::Failed);
        assert!(p.download().is_none());
        assert_handles_balanced(&p, &format!("rejected {kind}"));
    }

    assert_eq!(codec.calls.load(Ordering::SeqCst), 0);
    assert_eq!(remote.calls(), 0);
    assert_eq!(p.handle_stats().registered, 0);
}

#[tokio::test]
async fn text_file_for_pdf_to_docx_is_rejected() {
    let p = pipeline();
    assert_eq!(
        p.select_file(b"hello".to_vec(), "report.txt", ConversionKind::PdfToFlowDoc),
        Status::Failed
    );
    let snap = p.snapshot().unwrap();
    assert!(snap.error.as_deref().unwrap().contains(".pdf"));
    assert!(snap.output.is_none());
}

#[test]
fn extension_check_ignores_case() {
    let p = pipeline();
    assert_eq!(
        p.select_file(png_bytes(2, 2), "SHOT.PNG", ConversionKind::PngToJpg),
        Status::Ready
    );
    assert_eq!(
        p.select_file(vec![1u8], "Photo.JpEg", ConversionKind::JpgToPng),
        Status::Ready
    );
}

// ── Images ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn png_to_jpg_and_back_preserves_dimensions() {
    let p = pipeline();
    p.select_file(png_bytes(64, 48), "diagram.png", ConversionKind::PngToJpg);
    assert_eq!(p.convert().await, Status::Converted);

    let jpg = p.download().unwrap();
    assert_eq!(jpg.file_name, "diagram.jpg");
    assert_eq!(jpg.mime_type, "image/jpeg");
    assert_eq!(&jpg.bytes[..2], &[0xFF, 0xD8]);

    p.select_file(jpg.bytes.clone(), jpg.file_name.clone(), ConversionKind::JpgToPng);
    assert_eq!(p.convert().await, Status::Converted);

    let png = p.download().unwrap();
    assert_eq!(png.file_name, "diagram.png");
    assert_eq!(png.mime_type, "image/png");
    let decoded = image::load_from_memory(&png.bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (64, 48));
    assert_handles_balanced(&p, "after round trip");
}

#[tokio::test]
async fn image_preview_follows_converted_output() {
    let p = pipeline();
    let source = png_bytes(8, 8);
    p.select_file(source.clone(), "icon.png", ConversionKind::PngToJpg);
    assert_eq!(&*p.preview().unwrap().bytes, source.as_slice());

    p.convert().await;
    let preview = p.preview().unwrap();
    let artifact = p.download().unwrap();
    assert_eq!(preview.mime_type, "image/jpeg");
    assert_eq!(&*preview.bytes, &*artifact.bytes);
    assert!(p.preview_data_url().unwrap().starts_with("data:image/jpeg;base64,"));
}

#[tokio::test]
async fn failed_reconversion_restores_source_preview() {
    init_tracing();
    let config = PipelineConfig::builder()
        .image_codec(Arc::new(FailingAfterCodec::new(1)))
        .build()
        .unwrap();
    let p = ConversionPipeline::new(config).unwrap();
    let source = png_bytes(8, 8);
    p.select_file(source.clone(), "icon.png", ConversionKind::PngToJpg);

    assert_eq!(p.convert().await, Status::Converted);
    assert_eq!(p.preview().unwrap().mime_type, "image/jpeg");

    assert_eq!(p.convert().await, Status::Failed);
    let preview = p.preview().unwrap();
    assert_eq!(preview.mime_type, "image/png");
    assert_eq!(&*preview.bytes, source.as_slice());
    assert!(p.download().is_none());
    assert!(p.snapshot().unwrap().error.unwrap().contains("encoder unavailable"));
    assert_eq!(p.handle_stats().live, 1);
    assert_handles_balanced(&p, "failed reconversion");
}

#[tokio::test]
async fn undecodable_image_fails_with_message() {
    let p = pipeline();
    p.select_file(b"not an image".to_vec(), "broken.jpg", ConversionKind::JpgToPng);
    assert_eq!(p.convert().await, Status::Failed);

    let snap = p.snapshot().unwrap();
    assert!(snap.error.unwrap().to_lowercase().contains("decode"));
    assert!(p.download().is_none());
    assert_handles_balanced(&p, "decode failure");
}

// ── Documents ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn three_page_pdf_becomes_placeholder_docx() {
    let p = pipeline();
    p.select_file(blank_pdf(3), "quarterly.pdf", ConversionKind::PdfToFlowDoc);
    assert_eq!(p.convert().await, Status::Converted);

    let artifact = p.download().unwrap();
    assert_eq!(artifact.file_name, "quarterly.docx");
    assert_eq!(
        artifact.mime_type,
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
    );
    assert_eq!(
        docx_paragraphs(&artifact.bytes),
        vec![
            "quarterly",
            "Page 1",
            "[Content of page 1]",
            "Page 2",
            "[Content of page 2]",
            "Page 3",
            "[Content of page 3]",
        ]
    );
}

#[tokio::test]
async fn garbage_pdf_fails_and_can_be_replaced() {
    let p = pipeline();
    p.select_file(b"definitely not a pdf".to_vec(), "bad.pdf", ConversionKind::PdfToFlowDoc);
    assert_eq!(p.convert().await, Status::Failed);
    assert!(p.snapshot().unwrap().error.is_some());

    p.select_file(blank_pdf(1), "good.pdf", ConversionKind::PdfToFlowDoc);
    assert_eq!(p.status(), Status::Ready);
    assert!(p.snapshot().unwrap().error.is_none());
    assert_eq!(p.convert().await, Status::Converted);
    assert_handles_balanced(&p, "after replacement");
}

#[tokio::test]
async fn short_text_becomes_single_page_pdf() {
    let p = pipeline();
    p.select_file(
        b"Hello world\n\nThis is a test".to_vec(),
        "notes.txt",
        ConversionKind::FlowDocToPdf,
    );
    assert_eq!(p.convert().await, Status::Converted);

    let artifact = p.download().unwrap();
    assert_eq!(artifact.file_name, "notes.pdf");
    assert_eq!(artifact.mime_type, "application/pdf");
    assert!(artifact.bytes.starts_with(b"%PDF"));

    let pages = pdf_page_texts(&artifact.bytes);
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0], vec!["notes", "Hello world", "This is a test"]);
}

#[tokio::test]
async fn long_text_spills_onto_more_pages() {
    let text: String = (1..=120).map(|i| format!("Line number {i}\n")).collect();
    let p = pipeline();
    p.select_file(text.into_bytes(), "long.docx", ConversionKind::FlowDocToPdf);
    assert_eq!(p.convert().await, Status::Converted);

    let pages = pdf_page_texts(&p.download().unwrap().bytes);
    assert!(pages.len() > 1, "expected several pages, got {}", pages.len());
    assert_eq!(pages[0][0], "long");

    let body: Vec<&String> = pages.iter().flatten().skip(1).collect();
    assert_eq!(body.len(), 120);
    assert_eq!(body.first().unwrap().as_str(), "Line number 1");
    assert_eq!(body.last().unwrap().as_str(), "Line number 120");
}

// ── Lifecycle ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn clear_is_idempotent_and_releases_everything() {
    let p = pipeline();
    p.clear();
    assert_eq!(p.status(), Status::Idle);

    p.select_file(png_bytes(4, 4), "a.png", ConversionKind::PngToJpg);
    p.convert().await;
    assert_eq!(p.handle_stats().live, 2);

    p.clear();
    p.clear();
    assert_eq!(p.status(), Status::Idle);
    assert!(p.snapshot().is_none());
    assert!(p.download().is_none());
    assert!(p.preview().is_none());

    let stats = p.handle_stats();
    assert_eq!(stats.live, 0);
    assert_eq!(stats.registered, stats.released);
}

#[tokio::test]
async fn handle_accounting_holds_across_a_session() {
    let p = pipeline();

    p.select_file(png_bytes(4, 4), "one.png", ConversionKind::PngToJpg);
    assert_handles_balanced(&p, "select image");
    p.convert().await;
    assert_handles_balanced(&p, "convert image");
    p.convert().await;
    assert_handles_balanced(&p, "reconvert image");

    p.select_file(blank_pdf(2), "two.pdf", ConversionKind::PdfToFlowDoc);
    assert_handles_balanced(&p, "replace with document");
    p.convert().await;
    assert_handles_balanced(&p, "convert document");

    p.select_file(vec![0u8], "three.gif", ConversionKind::JpgToPng);
    assert_handles_balanced(&p, "rejected selection");

    p.clear();
    assert_handles_balanced(&p, "cleared");
    assert_eq!(p.handle_stats().live, 0);
}

#[tokio::test]
async fn saved_download_lands_under_the_output_name() {
    let dir = tempfile::tempdir().unwrap();
    let p = pipeline();
    p.select_file(b"Saved text".to_vec(), "../../etc/memo.txt", ConversionKind::FlowDocToPdf);
    p.convert().await;

    let artifact = p.download().unwrap();
    let path = artifact.save_in(dir.path()).unwrap();
    assert_eq!(path.parent().unwrap(), dir.path());
    assert_eq!(path.file_name().unwrap(), "memo.pdf");
    assert_eq!(std::fs::read(&path).unwrap(), artifact.bytes.to_vec());
}

// ── Observer ─────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl PipelineObserver for Recorder {
    fn on_file_selected(&self, name: &str, _kind: ConversionKind, status: Status) {
        self.events.lock().unwrap().push(format!("select {name} {status}"));
    }
    fn on_conversion_start(&self, name: &str, _kind: ConversionKind) {
        self.events.lock().unwrap().push(format!("start {name}"));
    }
    fn on_conversion_complete(&self, name: &str, _kind: ConversionKind, _output_len: usize) {
        self.events.lock().unwrap().push(format!("done {name}"));
    }
    fn on_conversion_error(&self, name: &str, _kind: ConversionKind, _error: &str) {
        self.events.lock().unwrap().push(format!("error {name}"));
    }
    fn on_cleared(&self) {
        self.events.lock().unwrap().push("cleared".into());
    }
}

#[tokio::test]
async fn observer_sees_each_transition() {
    let recorder = Arc::new(Recorder::default());
    let config = PipelineConfig::builder().observer(recorder.clone()).build().unwrap();
    let p = ConversionPipeline::new(config).unwrap();

    p.select_file(png_bytes(2, 2), "ok.png", ConversionKind::PngToJpg);
    p.convert().await;
    p.select_file(b"junk".to_vec(), "bad.png", ConversionKind::PngToJpg);
    p.convert().await;
    p.clear();
    p.clear();

    assert_eq!(
        *recorder.events.lock().unwrap(),
        vec![
            "select ok.png ready",
            "start ok.png",
            "done ok.png",
            "select bad.png ready",
            "start bad.png",
            "error bad.png",
            "cleared",
        ]
    );
}
