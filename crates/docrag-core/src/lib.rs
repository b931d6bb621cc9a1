//! docrag-core: in-memory vector index with HNSW approximate nearest-neighbor search
//!
//! Provides the index layer for the docrag RAG service: typed entries with string
//! ids and optional JSON metadata, cosine/euclidean/inner-product metrics, and
//! k-nearest-neighbor queries. The index lives entirely in memory and is rebuilt
//! by its consumer whenever the underlying corpus changes.

pub mod error;
pub mod index;
pub mod types;

pub use error::{IndexError, Result};
pub use index::VectorIndex;
pub use types::{DistanceMetric, HnswParams, IndexOptions, SearchHit, SearchQuery, VectorEntry};
