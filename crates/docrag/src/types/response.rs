//! Response types for the RAG endpoints

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::document::{Chunk, Document};

/// Maximum snippet length carried in a citation
const SNIPPET_MAX_CHARS: usize = 280;

/// Canned answer when no document has been uploaded yet
pub const NO_DOCUMENT_ANSWER: &str = "Please upload a PDF first.";

/// Canned answer when retrieval finds nothing relevant
pub const NOT_FOUND_ANSWER: &str = "Not found in document.";

/// Citation from a source chunk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    /// Chunk ID
    pub chunk_id: Uuid,
    /// Document ID
    pub document_id: Uuid,
    /// Source filename
    pub filename: String,
    /// Page number (if known)
    pub page_number: Option<u32>,
    /// Snippet from the source chunk
    pub snippet: String,
    /// Similarity score (0.0-1.0)
    pub similarity_score: f32,
}

impl Citation {
    /// Create a citation from a chunk and similarity score
    pub fn from_chunk(chunk: &Chunk, similarity_score: f32) -> Self {
        Self {
            chunk_id: chunk.id,
            document_id: chunk.document_id,
            filename: chunk.source.filename.clone(),
            page_number: chunk.source.page_number,
            snippet: truncate_snippet(&chunk.content, SNIPPET_MAX_CHARS),
            similarity_score,
        }
    }
}

/// Response from `POST /upload`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Document id exposed to clients (the uploaded filename)
    pub doc_id: String,
    /// Internal document id
    pub id: Uuid,
    /// Total pages in the PDF
    pub total_pages: Option<u32>,
    /// Number of chunks indexed
    pub total_chunks: u32,
    /// File size in bytes
    pub file_size: u64,
    /// SHA-256 hash of the file contents
    pub content_hash: String,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

impl UploadResponse {
    /// Build the response for a freshly indexed document
    pub fn from_document(doc: &Document, processing_time_ms: u64) -> Self {
        Self {
            doc_id: doc.filename.clone(),
            id: doc.id,
            total_pages: doc.total_pages,
            total_chunks: doc.total_chunks,
            file_size: doc.file_size,
            content_hash: doc.content_hash.clone(),
            processing_time_ms,
        }
    }
}

/// Response from `POST /ask`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    /// Generated answer
    pub answer: String,
    /// Citations with source snippets
    pub citations: Vec<Citation>,
    /// Number of chunks retrieved for context
    pub chunks_retrieved: usize,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

impl AskResponse {
    /// Create a response with a generated answer
    pub fn new(answer: String, citations: Vec<Citation>, processing_time_ms: u64) -> Self {
        Self {
            answer,
            chunks_retrieved: citations.len(),
            citations,
            processing_time_ms,
        }
    }

    /// Response when no document has been uploaded yet
    pub fn no_document(processing_time_ms: u64) -> Self {
        Self {
            answer: NO_DOCUMENT_ANSWER.to_string(),
            citations: Vec::new(),
            chunks_retrieved: 0,
            processing_time_ms,
        }
    }

    /// Response when retrieval returned no relevant chunks
    pub fn not_found(processing_time_ms: u64) -> Self {
        Self {
            answer: NOT_FOUND_ANSWER.to_string(),
            citations: Vec::new(),
            chunks_retrieved: 0,
            processing_time_ms,
        }
    }
}

/// Response from `POST /summarize`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryResponse {
    /// Generated summary
    pub summary: String,
    /// Number of chunks used as context
    pub chunks_used: usize,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

impl SummaryResponse {
    /// Create a response with a generated summary
    pub fn new(summary: String, chunks_used: usize, processing_time_ms: u64) -> Self {
        Self {
            summary,
            chunks_used,
            processing_time_ms,
        }
    }

    /// Response when no document has been uploaded yet
    pub fn no_document(processing_time_ms: u64) -> Self {
        Self {
            summary: NO_DOCUMENT_ANSWER.to_string(),
            chunks_used: 0,
            processing_time_ms,
        }
    }
}

/// Truncate a snippet to a maximum length, preferring word boundaries
fn truncate_snippet(snippet: &str, max_len: usize) -> String {
    if snippet.len() <= max_len {
        return snippet.to_string();
    }

    let mut end = max_len;
    while end > 0 && !snippet.is_char_boundary(end) {
        end -= 1;
    }

    if let Some(pos) = snippet[..end].rfind(' ') {
        return format!("{}...", &snippet[..pos]);
    }

    format!("{}...", &snippet[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::document::ChunkSource;

    fn sample_chunk(content: &str) -> Chunk {
        Chunk::new(
            Uuid::new_v4(),
            content.to_string(),
            ChunkSource {
                filename: "report.pdf".to_string(),
                page_number: Some(3),
            },
            0,
            content.len(),
            0,
        )
    }

    #[test]
    fn citation_carries_source_info() {
        let chunk = sample_chunk("The warranty covers two years of normal use.");
        let citation = Citation::from_chunk(&chunk, 0.82);

        assert_eq!(citation.filename, "report.pdf");
        assert_eq!(citation.page_number, Some(3));
        assert_eq!(citation.snippet, chunk.content);
        assert!((citation.similarity_score - 0.82).abs() < f32::EPSILON);
    }

    #[test]
    fn long_snippets_are_truncated_at_word_boundary() {
        let long = "word ".repeat(200);
        let chunk = sample_chunk(&long);
        let citation = Citation::from_chunk(&chunk, 0.5);

        assert!(citation.snippet.len() <= SNIPPET_MAX_CHARS + 3);
        assert!(citation.snippet.ends_with("..."));
    }

    #[test]
    fn truncate_respects_utf8_boundaries() {
        let text = "é".repeat(300);
        let truncated = truncate_snippet(&text, 5);
        assert!(truncated.ends_with("..."));
        // must not panic and must remain valid UTF-8 (guaranteed by String)
    }

    #[test]
    fn canned_responses_use_expected_answers() {
        assert_eq!(AskResponse::no_document(1).answer, "Please upload a PDF first.");
        assert_eq!(AskResponse::not_found(1).answer, "Not found in document.");
        assert_eq!(
            SummaryResponse::no_document(1).summary,
            "Please upload a PDF first."
        );
    }
}
