//! Vector store over the current document's chunks
//!
//! One store holds one document. Uploads build a fresh store and swap it into
//! the application state, so there is no delete path; dropping the old store
//! frees the previous index.

use std::collections::HashMap;

use docrag_core::{HnswParams, IndexOptions, SearchQuery, VectorEntry, VectorIndex};

use crate::config::IndexConfig;
use crate::error::{Error, Result};
use crate::types::{Chunk, Document};

/// Search result with chunk and similarity
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The retrieved chunk
    pub chunk: Chunk,
    /// Similarity score (0.0-1.0, higher is better)
    pub similarity: f32,
}

/// Vector store wrapper for docrag-core
pub struct VectorStore {
    /// Underlying vector index
    index: VectorIndex,
    /// Chunk records, positionally aligned with insertion order
    chunks: Vec<Chunk>,
    /// Chunk id to position lookup
    positions: HashMap<String, usize>,
    /// The indexed document
    document: Document,
}

impl std::fmt::Debug for VectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorStore")
            .field("len", &self.index.len())
            .field("chunks", &self.chunks.len())
            .field("document", &self.document)
            .finish()
    }
}

impl VectorStore {
    /// Build a store from embedded chunks
    pub fn build(
        config: &IndexConfig,
        dimensions: usize,
        document: Document,
        chunks: Vec<Chunk>,
    ) -> Result<Self> {
        let options = IndexOptions {
            dimensions,
            metric: Default::default(),
            hnsw: HnswParams {
                m: config.hnsw_m,
                ef_construction: config.hnsw_ef_construction,
                ef_search: config.hnsw_ef_search,
                max_elements: chunks.len().max(16),
            },
        };

        let index = VectorIndex::new(options)?;
        let mut positions = HashMap::with_capacity(chunks.len());

        for (i, chunk) in chunks.iter().enumerate() {
            if chunk.embedding.is_empty() {
                return Err(Error::embedding(format!(
                    "chunk {} of '{}' has no embedding",
                    chunk.chunk_index, document.filename
                )));
            }

            index.insert(VectorEntry::new(
                chunk.id.to_string(),
                chunk.embedding.clone(),
            ))?;
            positions.insert(chunk.id.to_string(), i);
        }

        tracing::info!(
            "Vector store built: {} chunks from '{}'",
            chunks.len(),
            document.filename
        );

        Ok(Self {
            index,
            chunks,
            positions,
            document,
        })
    }

    /// Search for the chunks most similar to a query embedding
    pub fn search(&self, query_embedding: &[f32], top_k: usize) -> Result<Vec<SearchResult>> {
        let hits = self
            .index
            .search(SearchQuery::new(query_embedding.to_vec(), top_k))?;

        let mut results = Vec::with_capacity(hits.len());
        for hit in hits {
            if let Some(&pos) = self.positions.get(&hit.id) {
                // cosine distance in [0, 2] -> similarity in [0, 1]
                let similarity = 1.0 - hit.score.min(2.0) / 2.0;
                results.push(SearchResult {
                    chunk: self.chunks[pos].clone(),
                    similarity,
                });
            }
        }

        results.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(top_k);

        Ok(results)
    }

    /// The document this store indexes
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Number of indexed chunks
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the store holds no chunks
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChunkSource;

    fn embedded_chunk(doc: &Document, index: u32, content: &str, embedding: Vec<f32>) -> Chunk {
        let mut chunk = Chunk::new(
            doc.id,
            content.to_string(),
            ChunkSource {
                filename: doc.filename.clone(),
                page_number: None,
            },
            0,
            content.len(),
            index,
        );
        chunk.embedding = embedding;
        chunk
    }

    fn sample_store() -> VectorStore {
        let doc = Document::new("report.pdf".to_string(), "hash".to_string(), 100);
        let chunks = vec![
            embedded_chunk(&doc, 0, "chunk about cats", vec![1.0, 0.0, 0.0]),
            embedded_chunk(&doc, 1, "chunk about dogs", vec![0.0, 1.0, 0.0]),
            embedded_chunk(&doc, 2, "chunk about kittens", vec![0.95, 0.05, 0.0]),
        ];
        VectorStore::build(&IndexConfig::default(), 3, doc, chunks).unwrap()
    }

    #[test]
    fn search_returns_most_similar_first() {
        let store = sample_store();
        let results = store.search(&[1.0, 0.0, 0.0], 2).unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.content, "chunk about cats");
        assert_eq!(results[1].chunk.content, "chunk about kittens");
        assert!(results[0].similarity >= results[1].similarity);
    }

    #[test]
    fn similarity_is_bounded() {
        let store = sample_store();
        for result in store.search(&[0.5, 0.5, 0.0], 3).unwrap() {
            assert!((0.0..=1.0).contains(&result.similarity));
        }
    }

    #[test]
    fn chunks_without_embeddings_are_rejected() {
        let doc = Document::new("report.pdf".to_string(), "hash".to_string(), 100);
        let chunk = Chunk::new(
            doc.id,
            "no embedding".to_string(),
            ChunkSource {
                filename: doc.filename.clone(),
                page_number: None,
            },
            0,
            12,
            0,
        );

        let err = VectorStore::build(&IndexConfig::default(), 3, doc, vec![chunk]).unwrap_err();
        assert!(matches!(err, Error::Embedding(_)));
    }

    #[test]
    fn store_reports_its_document() {
        let store = sample_store();
        assert_eq!(store.document().filename, "report.pdf");
        assert_eq!(store.len(), 3);
        assert!(!store.is_empty());
    }
}
