//! PDF text extraction

use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Parsed document with extracted text and metadata
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    /// Extracted text content
    pub content: String,
    /// SHA-256 hash of the raw file bytes
    pub content_hash: String,
    /// Total pages in the PDF
    pub total_pages: Option<u32>,
}

/// PDF file parser
pub struct PdfParser;

impl PdfParser {
    /// Parse a PDF file from raw bytes
    ///
    /// Only `.pdf` filenames are accepted; extraction runs on a helper thread
    /// with a timeout because some PDFs with pathological fonts hang the
    /// extractor.
    pub fn parse(filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        let extension = filename.rsplit('.').next().unwrap_or("").to_lowercase();
        if extension != "pdf" {
            return Err(Error::UnsupportedFileType(format!(
                "{} - only PDF files are allowed",
                extension
            )));
        }

        let content = Self::extract_with_timeout(filename, data)?;

        let content = cleanup_pdf_text(&content);
        let content = content
            .replace('\0', "")
            .lines()
            .map(|l| l.trim_end())
            .collect::<Vec<_>>()
            .join("\n");

        if content.trim().is_empty() {
            return Err(Error::file_parse(
                filename,
                "No text content could be extracted from PDF",
            ));
        }

        let content_hash = hex::encode(Sha256::digest(data));

        let total_pages = match lopdf::Document::load_mem(data) {
            Ok(doc) => Some(doc.get_pages().len() as u32),
            Err(_) => None,
        };

        Ok(ParsedDocument {
            content,
            content_hash,
            total_pages,
        })
    }

    /// Extract PDF text with a sync timeout to prevent hangs on problematic fonts
    fn extract_with_timeout(filename: &str, data: &[u8]) -> Result<String> {
        use std::sync::mpsc;
        use std::thread;
        use std::time::Duration;

        let data_vec = data.to_vec();
        let (tx, rx) = mpsc::channel();

        let handle = thread::spawn(move || {
            let result = pdf_extract::extract_text_from_mem(&data_vec);
            let _ = tx.send(result);
        });

        match rx.recv_timeout(Duration::from_secs(60)) {
            Ok(Ok(text)) => {
                let _ = handle.join();
                Ok(text)
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(Error::file_parse(filename, e.to_string()))
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                // The extraction thread cannot be killed; it is left to finish
                // on its own while the request fails.
                tracing::error!("PDF extraction timeout after 60s for '{}'", filename);
                Err(Error::file_parse(filename, "PDF extraction timed out"))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                Err(Error::file_parse(filename, "PDF extraction thread crashed"))
            }
        }
    }
}

/// Replace typographic characters and ligatures that PDF fonts produce with
/// plain ASCII equivalents
fn cleanup_pdf_text(text: &str) -> String {
    text.replace('\u{2010}', "-") // hyphen
        .replace('\u{2011}', "-") // non-breaking hyphen
        .replace('\u{2013}', "-") // en dash
        .replace('\u{2014}', "--") // em dash
        .replace('\u{2018}', "'") // left single quote
        .replace('\u{2019}', "'") // right single quote
        .replace('\u{201C}', "\"") // left double quote
        .replace('\u{201D}', "\"") // right double quote
        .replace('\u{2022}', "* ") // bullet
        .replace('\u{2026}', "...") // ellipsis
        .replace('\u{00A0}', " ") // non-breaking space
        .replace('\u{FB00}', "ff")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{FB03}', "ffi")
        .replace('\u{FB04}', "ffl")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_pdf_extension_is_rejected() {
        let err = PdfParser::parse("notes.txt", b"hello").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFileType(_)));

        let err = PdfParser::parse("archive.zip", b"PK").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFileType(_)));
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        // Garbage bytes still fail, but past the extension check
        let err = PdfParser::parse("REPORT.PDF", b"not a pdf").unwrap_err();
        assert!(matches!(err, Error::FileParse { .. }));
    }

    #[test]
    fn invalid_pdf_bytes_are_a_parse_error() {
        let err = PdfParser::parse("broken.pdf", b"definitely not a pdf").unwrap_err();
        match err {
            Error::FileParse { filename, .. } => assert_eq!(filename, "broken.pdf"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn cleanup_replaces_typographic_characters() {
        let text = "caf\u{2019}s \u{201C}policy\u{201D} \u{2013} e\u{FB03}cient\u{2026}";
        let cleaned = cleanup_pdf_text(text);
        assert_eq!(cleaned, "caf's \"policy\" - efficient...");
    }

    #[test]
    fn cleanup_preserves_regular_text() {
        let text = "Plain ASCII stays as-is.";
        assert_eq!(cleanup_pdf_text(text), text);
    }
}
