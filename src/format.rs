//! Format registry: the static table behind every [`ConversionKind`].
//!
//! Each kind fixes the accepted input extensions, the single output
//! extension, and (through [`mime_type`]) the MIME type attached to the
//! downloaded artifact. Nothing here is mutable.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Generic MIME type for extensions the registry does not know.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// The four supported conversions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConversionKind {
    /// PDF → DOCX (flow document).
    #[serde(rename = "pdf-to-docx")]
    PdfToFlowDoc,
    /// DOCX / plain text → PDF.
    #[serde(rename = "docx-to-pdf")]
    FlowDocToPdf,
    /// JPEG → PNG.
    JpgToPng,
    /// PNG → JPEG.
    PngToJpg,
}

impl ConversionKind {
    pub const ALL: [ConversionKind; 4] = [
        ConversionKind::PdfToFlowDoc,
        ConversionKind::FlowDocToPdf,
        ConversionKind::JpgToPng,
        ConversionKind::PngToJpg,
    ];

    /// Lowercase extensions (with leading dot) a source file must carry.
    pub fn accepted_extensions(self) -> &'static [&'static str] {
        match self {
            ConversionKind::PdfToFlowDoc => &[".pdf"],
            ConversionKind::FlowDocToPdf => &[".docx", ".txt"],
            ConversionKind::JpgToPng => &[".jpg", ".jpeg"],
            ConversionKind::PngToJpg => &[".png"],
        }
    }

    /// Output extension, without the leading dot.
    pub fn target_extension(self) -> &'static str {
        match self {
            ConversionKind::PdfToFlowDoc => "docx",
            ConversionKind::FlowDocToPdf => "pdf",
            ConversionKind::JpgToPng => "png",
            ConversionKind::PngToJpg => "jpg",
        }
    }

    /// `true` for the two raster image kinds.
    pub fn is_image(self) -> bool {
        matches!(self, ConversionKind::JpgToPng | ConversionKind::PngToJpg)
    }

    /// Tag used on the wire when talking to the remote conversion service.
    pub fn wire_tag(self) -> &'static str {
        match self {
            ConversionKind::PdfToFlowDoc => "pdf-to-docx",
            ConversionKind::FlowDocToPdf => "docx-to-pdf",
            ConversionKind::JpgToPng => "jpg-to-png",
            ConversionKind::PngToJpg => "png-to-jpg",
        }
    }

    /// Human-readable label, e.g. "PDF to DOCX".
    pub fn label(self) -> &'static str {
        match self {
            ConversionKind::PdfToFlowDoc => "PDF to DOCX",
            ConversionKind::FlowDocToPdf => "DOCX to PDF",
            ConversionKind::JpgToPng => "JPG to PNG",
            ConversionKind::PngToJpg => "PNG to JPG",
        }
    }

    /// Whether `name`'s extension (case-insensitive) is accepted by this kind.
    pub fn accepts(self, name: &str) -> bool {
        match extension_of(name) {
            Some(ext) => self.accepted_extensions().contains(&ext.as_str()),
            None => false,
        }
    }
}

impl fmt::Display for ConversionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ConversionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        ConversionKind::ALL
            .into_iter()
            .find(|k| k.wire_tag() == needle)
            .ok_or_else(|| {
                let known: Vec<&str> = ConversionKind::ALL.iter().map(|k| k.wire_tag()).collect();
                format!("unknown conversion kind '{s}' (expected one of: {})", known.join(", "))
            })
    }
}

/// Lowercased extension of `name` with a leading dot, if it has one.
pub fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(|e| format!(".{}", e.to_lowercase()))
}

/// File name without its final extension ("report.final.pdf" → "report.final").
pub fn file_stem(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name)
        .to_string()
}

/// MIME type for an extension (leading dot optional). Unknown → octet-stream.
pub fn mime_type(extension: &str) -> &'static str {
    match extension.trim_start_matches('.').to_lowercase().as_str() {
        "pdf" => "application/pdf",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "txt" => "text/plain",
        "svg" => "image/svg+xml",
        _ => OCTET_STREAM,
    }
}
