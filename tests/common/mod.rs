//! Shared helpers for the integration tests: in-memory fixtures, fake
//! collaborators, and readers for the produced PDF/DOCX bytes.

#![allow(dead_code)]

use fileflip::{ConversionKind, ConvertError, ImageCodec, ImageCrateCodec, ImageTarget, PixelSurface, RemoteConverter};
use futures::future::BoxFuture;
use image::{ImageFormat, Rgba, RgbaImage};
use lopdf::{dictionary, Document, Object, Stream};
use regex::Regex;
use std::collections::VecDeque;
use std::io::{Cursor, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Notify};

/// Route `tracing` output to the test harness. Honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ── Fixtures ─────────────────────────────────────────────────────────────────

pub fn png_bytes(w: u32, h: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(w, h, |x, y| Rgba([(x % 256) as u8, (y % 256) as u8, 200, 255]));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png).unwrap();
    buf
}

/// A structurally valid PDF with `pages` empty pages.
pub fn blank_pdf(pages: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let kids: Vec<Object> = (0..pages)
        .map(|_| {
            let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            })
            .into()
        })
        .collect();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(pages as i64),
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(612),
                Object::Integer(792),
            ],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

// ── Output readers ───────────────────────────────────────────────────────────

/// Strings drawn with `Tj` on each page, in page order.
pub fn pdf_page_texts(bytes: &[u8]) -> Vec<Vec<String>> {
    let doc = Document::load_mem(bytes).expect("output should be a readable PDF");
    doc.get_pages()
        .values()
        .map(|&page_id| {
            let raw = doc.get_page_content(page_id).unwrap();
            let content = lopdf::content::Content::decode(&raw).unwrap();
            content
                .operations
                .iter()
                .filter(|op| op.operator == "Tj")
                .filter_map(|op| match op.operands.first() {
                    Some(Object::String(bytes, _)) => Some(String::from_utf8_lossy(bytes).into_owned()),
                    _ => None,
                })
                .collect()
        })
        .collect()
}

/// Paragraph texts of a DOCX package, in document order.
pub fn docx_paragraphs(bytes: &[u8]) -> Vec<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("output should be a zip");
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .unwrap()
        .read_to_string(&mut xml)
        .unwrap();
    let re = Regex::new(r#"<w:t xml:space="preserve">(.*?)</w:t>"#).unwrap();
    re.captures_iter(&xml).map(|c| c[1].to_string()).collect()
}

// ── Fake collaborators ───────────────────────────────────────────────────────

/// Image codec that counts calls and delegates to the real one.
#[derive(Default)]
pub struct CountingCodec {
    pub calls: AtomicUsize,
}

impl ImageCodec for CountingCodec {
    fn decode(&self, bytes: &[u8]) -> Result<PixelSurface, ConvertError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        ImageCrateCodec.decode(bytes)
    }

    fn encode(&self, surface: &PixelSurface, target: ImageTarget, quality: u8) -> Result<Vec<u8>, ConvertError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        ImageCrateCodec.encode(surface, target, quality)
    }
}

/// Image codec whose encoder works `ok_encodes` times, then fails.
pub struct FailingAfterCodec {
    ok_encodes: AtomicUsize,
}

impl FailingAfterCodec {
    pub fn new(ok_encodes: usize) -> Self {
        Self {
            ok_encodes: AtomicUsize::new(ok_encodes),
        }
    }
}

impl ImageCodec for FailingAfterCodec {
    fn decode(&self, bytes: &[u8]) -> Result<PixelSurface, ConvertError> {
        ImageCrateCodec.decode(bytes)
    }

    fn encode(&self, surface: &PixelSurface, target: ImageTarget, quality: u8) -> Result<Vec<u8>, ConvertError> {
        let left = self.ok_encodes.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        match left {
            Ok(_) => ImageCrateCodec.encode(surface, target, quality),
            Err(_) => Err(ConvertError::ImageEncode {
                format: target.name().to_string(),
                detail: "encoder unavailable".into(),
            }),
        }
    }
}

/// Remote converter that replays a fixed script of responses.
#[derive(Default)]
pub struct ScriptedRemote {
    pub calls: AtomicUsize,
    pub kinds: Mutex<Vec<ConversionKind>>,
    responses: Mutex<VecDeque<Result<Vec<u8>, ConvertError>>>,
}

impl ScriptedRemote {
    pub fn new(responses: Vec<Result<Vec<u8>, ConvertError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            ..Default::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RemoteConverter for ScriptedRemote {
    fn convert_document(
        &self,
        _bytes: Arc<[u8]>,
        _file_name: String,
        kind: ConversionKind,
    ) -> BoxFuture<'_, Result<Vec<u8>, ConvertError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.kinds.lock().unwrap().push(kind);
        let next = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ConvertError::Unknown("script exhausted".into())));
        Box::pin(async move { next })
    }
}

/// Remote converter that blocks until released, then succeeds.
pub struct GatedRemote {
    pub gate: Arc<Notify>,
    pub output: Vec<u8>,
}

impl RemoteConverter for GatedRemote {
    fn convert_document(
        &self,
        _bytes: Arc<[u8]>,
        _file_name: String,
        _kind: ConversionKind,
    ) -> BoxFuture<'_, Result<Vec<u8>, ConvertError>> {
        let gate = self.gate.clone();
        let output = self.output.clone();
        Box::pin(async move {
            gate.notified().await;
            Ok(output)
        })
    }
}

/// Remote converter that never answers.
pub struct HangingRemote;

impl RemoteConverter for HangingRemote {
    fn convert_document(
        &self,
        _bytes: Arc<[u8]>,
        _file_name: String,
        _kind: ConversionKind,
    ) -> BoxFuture<'_, Result<Vec<u8>, ConvertError>> {
        Box::pin(futures::future::pending())
    }
}

// ── HTTP stub ────────────────────────────────────────────────────────────────

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn request_complete(buf: &[u8]) -> bool {
    let Some(header_end) = find(buf, b"\r\n\r\n") else {
        return false;
    };
    let head = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
    let content_length = head
        .lines()
        .find_map(|l| l.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok());
    match content_length {
        Some(len) => buf.len() >= header_end + 4 + len,
        None => buf.ends_with(b"0\r\n\r\n"),
    }
}

/// Serve exactly one HTTP request with a canned response.
///
/// Returns the endpoint URL and a receiver for the raw request bytes.
pub async fn stub_server(
    status_line: &'static str,
    content_type: &'static str,
    body: Vec<u8>,
) -> (String, oneshot::Receiver<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut chunk = [0u8; 8192];
        loop {
            let n = sock.read(&mut chunk).await.unwrap_or(0);
            if n == 0 {
                break;
            }
            request.extend_from_slice(&chunk[..n]);
            if request_complete(&request) {
                break;
            }
        }

        let head = format!(
            "HTTP/1.1 {status_line}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        sock.write_all(head.as_bytes()).await.unwrap();
        sock.write_all(&body).await.unwrap();
        sock.shutdown().await.ok();
        let _ = tx.send(request);
    });

    (format!("http://{addr}/convert"), rx)
}
