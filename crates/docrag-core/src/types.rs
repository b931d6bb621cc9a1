//! Core types for the vector index

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Distance metric used for similarity search
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Cosine distance (1 - cosine similarity)
    #[default]
    Cosine,
    /// Euclidean (L2) distance
    Euclidean,
    /// Inner product distance
    InnerProduct,
}

/// HNSW graph parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HnswParams {
    /// Connections per layer
    pub m: usize,
    /// Candidate list size during construction
    pub ef_construction: usize,
    /// Candidate list size during search
    pub ef_search: usize,
    /// Maximum number of elements the graph is sized for
    pub max_elements: usize,
}

impl Default for HnswParams {
    fn default() -> Self {
        Self {
            m: 16,
            ef_construction: 200,
            ef_search: 100,
            max_elements: 100_000,
        }
    }
}

/// Options for creating a [`crate::VectorIndex`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexOptions {
    /// Vector dimensionality
    pub dimensions: usize,
    /// Distance metric
    #[serde(default)]
    pub metric: DistanceMetric,
    /// HNSW parameters
    #[serde(default)]
    pub hnsw: HnswParams,
}

impl IndexOptions {
    /// Options with the given dimensionality and defaults for everything else
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            metric: DistanceMetric::default(),
            hnsw: HnswParams::default(),
        }
    }
}

/// A single entry to insert into the index
#[derive(Debug, Clone)]
pub struct VectorEntry {
    /// Caller-assigned id
    pub id: String,
    /// Embedding vector
    pub vector: Vec<f32>,
    /// Optional metadata attached to the entry
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

impl VectorEntry {
    /// Create an entry without metadata
    pub fn new(id: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            vector,
            metadata: None,
        }
    }

    /// Attach metadata to the entry
    pub fn with_metadata(mut self, metadata: HashMap<String, serde_json::Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// A k-nearest-neighbor query
#[derive(Debug, Clone)]
pub struct SearchQuery {
    /// Query vector
    pub vector: Vec<f32>,
    /// Number of neighbors to return
    pub k: usize,
    /// Override for the search-time candidate list size
    pub ef_search: Option<usize>,
}

impl SearchQuery {
    /// Query for the `k` nearest neighbors of `vector`
    pub fn new(vector: Vec<f32>, k: usize) -> Self {
        Self {
            vector,
            k,
            ef_search: None,
        }
    }
}

/// A single search result
#[derive(Debug, Clone)]
pub struct SearchHit {
    /// Entry id
    pub id: String,
    /// Distance to the query under the index metric (lower is closer)
    pub score: f32,
    /// Metadata stored with the entry
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}
