//! Document and chunk types with source tracking

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An ingested document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique document id
    pub id: Uuid,
    /// Original filename as uploaded
    pub filename: String,
    /// SHA-256 hash of the raw file bytes
    pub content_hash: String,
    /// File size in bytes
    pub file_size: u64,
    /// Total pages in the source PDF
    pub total_pages: Option<u32>,
    /// Number of chunks created from the document
    pub total_chunks: u32,
    /// Ingestion timestamp
    pub ingested_at: chrono::DateTime<chrono::Utc>,
}

impl Document {
    /// Create a new document record
    pub fn new(filename: String, content_hash: String, file_size: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            filename,
            content_hash,
            file_size,
            total_pages: None,
            total_chunks: 0,
            ingested_at: chrono::Utc::now(),
        }
    }
}

/// Source information attached to a chunk for citations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkSource {
    /// Filename the chunk came from
    pub filename: String,
    /// Page number (1-indexed), when known
    pub page_number: Option<u32>,
}

/// A chunk of document text with its embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique chunk id
    pub id: Uuid,
    /// Owning document id
    pub document_id: Uuid,
    /// Chunk text
    pub content: String,
    /// Embedding vector (empty until embedded)
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub embedding: Vec<f32>,
    /// Source information
    pub source: ChunkSource,
    /// Character offset of the chunk start in the document text
    pub char_start: usize,
    /// Character offset of the chunk end in the document text
    pub char_end: usize,
    /// Position of the chunk within the document
    pub chunk_index: u32,
}

impl Chunk {
    /// Create a new chunk without an embedding
    pub fn new(
        document_id: Uuid,
        content: String,
        source: ChunkSource,
        char_start: usize,
        char_end: usize,
        chunk_index: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            content,
            embedding: Vec::new(),
            source,
            char_start,
            char_end,
            chunk_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_document_has_fresh_id_and_no_chunks() {
        let a = Document::new("report.pdf".to_string(), "abc123".to_string(), 1024);
        let b = Document::new("report.pdf".to_string(), "abc123".to_string(), 1024);
        assert_ne!(a.id, b.id);
        assert_eq!(a.total_chunks, 0);
        assert!(a.total_pages.is_none());
    }

    #[test]
    fn chunk_serializes_without_embedding() {
        let doc = Document::new("report.pdf".to_string(), "abc".to_string(), 10);
        let chunk = Chunk::new(
            doc.id,
            "some text".to_string(),
            ChunkSource {
                filename: doc.filename.clone(),
                page_number: None,
            },
            0,
            9,
            0,
        );

        let json = serde_json::to_value(&chunk).unwrap();
        assert!(json.get("embedding").is_none());
        assert_eq!(json["content"], "some text");
    }
}
