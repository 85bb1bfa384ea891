//! Document text sources.
//!
//! Formats are detected from magic bytes, never from the uploaded file name.

use crate::error::ExtractionError;

/// Supported document formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    PlainText,
}

impl DocumentFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::PlainText => "plain_text",
        }
    }
}

const PDF_MAGIC: &[u8] = b"%PDF-";

/// PDF readers accept junk before the header within the first KiB
const PDF_HEADER_WINDOW: usize = 1024;

/// Detect document format from magic bytes
pub fn detect_format(bytes: &[u8]) -> DocumentFormat {
    let head = &bytes[..bytes.len().min(PDF_HEADER_WINDOW)];
    if head.windows(PDF_MAGIC.len()).any(|w| w == PDF_MAGIC) {
        DocumentFormat::Pdf
    } else {
        DocumentFormat::PlainText
    }
}

/// Turns document bytes into text
pub trait TextSource: Send + Sync {
    fn read_text(&self, bytes: &[u8]) -> Result<String, ExtractionError>;
}

/// PDF text layer, pages joined with newlines
pub struct PdfTextSource;

impl TextSource for PdfTextSource {
    fn read_text(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
            .map_err(|e| ExtractionError::PdfParsing(e.to_string()))?;

        log::debug!("PDF text layer read: {} page(s)", pages.len());

        let mut text = String::new();
        for page in pages.iter().filter(|p| !p.is_empty()) {
            text.push_str(page);
            text.push('\n');
        }
        Ok(text)
    }
}

/// UTF-8 plain text
pub struct PlainTextSource;

impl TextSource for PlainTextSource {
    fn read_text(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|e| ExtractionError::Encoding(e.to_string()))
    }
}

/// Read a document's text, dispatching on its detected format.
///
/// Fails with `NoText` when the document yields nothing but whitespace.
pub fn read_document_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let format = detect_format(bytes);
    let text = match format {
        DocumentFormat::Pdf => PdfTextSource.read_text(bytes)?,
        DocumentFormat::PlainText => PlainTextSource.read_text(bytes)?,
    };

    if text.trim().is_empty() {
        log::warn!("No text found in {} document ({} bytes)", format.as_str(), bytes.len());
        return Err(ExtractionError::NoText);
    }

    Ok(text)
}
