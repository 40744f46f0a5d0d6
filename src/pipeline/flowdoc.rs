//! PDF → flow document → DOCX package.
//!
//! Only the page tree is read: page content is never decoded. Each page
//! becomes a pair of placeholder paragraphs under a title taken from the
//! source file name. The resulting [`FlowDocument`] is then written out as a
//! minimal WordprocessingML package with `zip`.

use crate::error::ConvertError;
use quick_xml::escape::escape;
use std::io::{Cursor, Write};
use std::sync::Arc;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Paragraph-level block kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Title,
    Paragraph,
}

/// A single paragraph of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    pub text: String,
}

impl Block {
    pub fn title(text: impl Into<String>) -> Self {
        Self {
            kind: BlockKind::Title,
            text: text.into(),
        }
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Self {
            kind: BlockKind::Paragraph,
            text: text.into(),
        }
    }
}

/// Ordered sequence of paragraph blocks, independent of any binary format.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowDocument {
    pub blocks: Vec<Block>,
}

impl FlowDocument {
    /// Placeholder document for a PDF with `page_count` pages.
    pub fn placeholder(title: &str, page_count: usize) -> Self {
        let mut blocks = Vec::with_capacity(1 + 2 * page_count);
        blocks.push(Block::title(title));
        for i in 0..page_count {
            blocks.push(Block::paragraph(format!("Page {}", i + 1)));
            blocks.push(Block::paragraph(format!("[Content of page {}]", i + 1)));
        }
        Self { blocks }
    }

    /// Texts of all blocks, in order.
    pub fn texts(&self) -> Vec<&str> {
        self.blocks.iter().map(|b| b.text.as_str()).collect()
    }
}

/// Count the pages of a PDF.
pub fn pdf_page_count(bytes: &[u8]) -> Result<usize, ConvertError> {
    if bytes.len() < 4 || &bytes[..4] != b"%PDF" {
        let magic: Vec<u8> = bytes.iter().take(4).copied().collect();
        return Err(ConvertError::PdfParse {
            detail: format!("missing %PDF header (first bytes: {magic:?})"),
        });
    }

    let doc = lopdf::Document::load_mem(bytes).map_err(|e| ConvertError::PdfParse {
        detail: e.to_string(),
    })?;
    Ok(doc.get_pages().len())
}

/// Build the flow document for a PDF.
pub fn pdf_to_flow_document(bytes: &[u8], title: &str) -> Result<FlowDocument, ConvertError> {
    let pages = pdf_page_count(bytes)?;
    debug!("PDF '{}' has {} page(s)", title, pages);
    Ok(FlowDocument::placeholder(title, pages))
}

// ── DOCX package ─────────────────────────────────────────────────────────

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const DOCUMENT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/></w:style><w:style w:type="paragraph" w:styleId="Title"><w:name w:val="Title"/><w:basedOn w:val="Normal"/><w:pPr><w:spacing w:after="240"/></w:pPr><w:rPr><w:b/><w:sz w:val="40"/></w:rPr></w:style></w:styles>"#;

fn document_xml(doc: &FlowDocument) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>"#,
    );
    for block in &doc.blocks {
        xml.push_str("<w:p>");
        if block.kind == BlockKind::Title {
            xml.push_str(r#"<w:pPr><w:pStyle w:val="Title"/></w:pPr>"#);
        }
        xml.push_str(r#"<w:r><w:t xml:space="preserve">"#);
        xml.push_str(&escape(block.text.as_str()));
        xml.push_str("</w:t></w:r></w:p>");
    }
    xml.push_str("</w:body></w:document>");
    xml
}

/// Serialise a flow document as a DOCX package.
pub fn write_docx(doc: &FlowDocument) -> Result<Vec<u8>, ConvertError> {
    let zip_err = |e: zip::result::ZipError| ConvertError::DocxWrite {
        detail: e.to_string(),
    };
    let io_err = |e: std::io::Error| ConvertError::DocxWrite {
        detail: e.to_string(),
    };

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let opts = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let document = document_xml(doc);
    let parts: [(&str, &str); 5] = [
        ("[Content_Types].xml", CONTENT_TYPES),
        ("_rels/.rels", PACKAGE_RELS),
        ("word/_rels/document.xml.rels", DOCUMENT_RELS),
        ("word/styles.xml", STYLES),
        ("word/document.xml", &document),
    ];
    for (name, body) in parts {
        zip.start_file(name, opts).map_err(zip_err)?;
        zip.write_all(body.as_bytes()).map_err(io_err)?;
    }

    let cursor = zip.finish().map_err(zip_err)?;
    Ok(cursor.into_inner())
}

/// PDF bytes → DOCX bytes. Runs on the blocking pool.
pub async fn pdf_to_docx(bytes: Arc<[u8]>, title: String) -> Result<Vec<u8>, ConvertError> {
    tokio::task::spawn_blocking(move || {
        let doc = pdf_to_flow_document(&bytes, &title)?;
        write_docx(&doc)
    })
    .await
    .map_err(|e| ConvertError::Unknown(format!("DOCX task panicked: {e}")))?
}
