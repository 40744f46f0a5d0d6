//! Flow text → PDF: greedy word-wrap and pagination, then serialisation.
//!
//! Layout and serialisation are separate steps. [`layout_text`] is a pure
//! function from text to positioned lines, which is where all the
//! interesting behaviour lives; [`render_pdf`] only turns those lines into
//! PDF objects with `lopdf`.
//!
//! ## Layout rules
//!
//! * Source lines that are empty after trimming are dropped.
//! * The title is drawn once at the top of the first page; the cursor then
//!   advances two line heights.
//! * Each source line is wrapped greedily at the body size: a word is
//!   appended while the candidate line fits the usable width, otherwise the
//!   accumulated line is flushed and the word starts a new one.
//! * A word wider than the usable width is never split; it is drawn alone
//!   and overflows the right margin.
//! * Before every draw, a cursor at or below the bottom margin starts a new
//!   page.
//! * Half a line height separates consecutive source lines.

use crate::config::PageGeometry;
use crate::error::ConvertError;
use crate::pipeline::metrics::text_width;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::sync::Arc;
use tracing::debug;

/// Which font a line is set in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextStyle {
    /// Times-Bold at the title size.
    Title,
    /// Times-Roman at the body size.
    Body,
}

/// A single line of text at its baseline position.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub style: TextStyle,
}

/// One output page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LaidOutPage {
    pub lines: Vec<PlacedLine>,
}

impl LaidOutPage {
    /// Text of the body lines, in drawing order.
    pub fn body_lines(&self) -> Vec<&str> {
        self.lines
            .iter()
            .filter(|l| l.style == TextStyle::Body)
            .map(|l| l.text.as_str())
            .collect()
    }
}

struct Cursor<'a> {
    geometry: &'a PageGeometry,
    pages: Vec<LaidOutPage>,
    y: f32,
}

impl Cursor<'_> {
    fn draw(&mut self, text: &str, style: TextStyle) {
        let line = PlacedLine {
            text: text.to_string(),
            x: self.geometry.margin,
            y: self.y,
            style,
        };
        if let Some(page) = self.pages.last_mut() {
            page.lines.push(line);
        }
    }

    fn emit_body(&mut self, text: &str) {
        if self.y <= self.geometry.margin {
            self.pages.push(LaidOutPage::default());
            self.y = self.geometry.top();
        }
        self.draw(text, TextStyle::Body);
        self.y -= self.geometry.line_height;
    }
}

/// Lay `text` out onto pages under `title`.
///
/// Always returns at least one page (the title page).
pub fn layout_text(text: &str, title: &str, geometry: &PageGeometry) -> Vec<LaidOutPage> {
    let usable = geometry.usable_width();
    let mut cursor = Cursor {
        geometry,
        pages: vec![LaidOutPage::default()],
        y: geometry.top(),
    };

    cursor.draw(title, TextStyle::Title);
    cursor.y -= 2.0 * geometry.line_height;

    let text = text.strip_prefix('\u{FEFF}').unwrap_or(text);
    for source_line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let mut current = String::new();

        for word in source_line.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };

            if !current.is_empty() && text_width(&candidate, geometry.body_size) > usable {
                cursor.emit_body(&current);
                current = word.to_string();
            } else {
                current = candidate;
            }
        }

        if !current.is_empty() {
            cursor.emit_body(&current);
        }
        cursor.y -= geometry.line_height / 2.0;
    }

    cursor.pages
}

/// Serialise laid-out pages to PDF bytes.
pub fn render_pdf(
    pages: &[LaidOutPage],
    geometry: &PageGeometry,
    title: &str,
) -> Result<Vec<u8>, ConvertError> {
    let write_err = |e: lopdf::Error| ConvertError::PdfWrite {
        detail: e.to_string(),
    };

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let body_font = standard_font(&mut doc, "Times-Roman");
    let title_font = standard_font(&mut doc, "Times-Bold");
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => body_font,
            "F2" => title_font,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for page in pages {
        let mut operations = Vec::with_capacity(page.lines.len() * 5);
        for line in &page.lines {
            let (font, size) = match line.style {
                TextStyle::Title => ("F2", geometry.title_size),
                TextStyle::Body => ("F1", geometry.body_size),
            };
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec![font.into(), size.into()]));
            operations.push(Operation::new("Td", vec![line.x.into(), line.y.into()]));
            operations.push(Operation::new(
                "Tj",
                vec![Object::String(win_ansi(&line.text), StringFormat::Literal)],
            ));
            operations.push(Operation::new("ET", vec![]));
        }

        let content = Content { operations }.encode().map_err(write_err)?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(count),
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                geometry.width.into(),
                geometry.height.into(),
            ],
        }),
    );

    let info_id = doc.add_object(dictionary! {
        "Title" => Object::String(win_ansi(title), StringFormat::Literal),
        "Producer" => Object::string_literal("fileflip"),
    });
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);
    doc.compress();

    let mut out = Vec::new();
    doc.save_to(&mut out).map_err(|e| ConvertError::PdfWrite {
        detail: e.to_string(),
    })?;
    Ok(out)
}

fn standard_font(doc: &mut Document, base: &str) -> ObjectId {
    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base,
        "Encoding" => "WinAnsiEncoding",
    })
}

/// Encode text for a WinAnsi-encoded base-14 font. Unmappable → `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\t' => b' ',
            ' '..='~' => c as u8,
            '\u{A0}'..='\u{FF}' => c as u32 as u8,
            '\u{20AC}' => 0x80,
            '\u{2026}' => 0x85,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            _ => b'?',
        })
        .collect()
}

/// Decode `bytes` as (lossy) UTF-8 text and paginate it into a PDF titled
/// `title`. Runs on the blocking pool.
pub async fn text_to_pdf(
    bytes: Arc<[u8]>,
    title: String,
    geometry: PageGeometry,
) -> Result<Vec<u8>, ConvertError> {
    tokio::task::spawn_blocking(move || {
        let text = String::from_utf8_lossy(&bytes);
        let pages = layout_text(&text, &title, &geometry);
        debug!("Laid out {} page(s) for '{}'", pages.len(), title);
        render_pdf(&pages, &geometry, &title)
    })
    .await
    .map_err(|e| ConvertError::Unknown(format!("PDF layout task panicked: {e}")))?
}
