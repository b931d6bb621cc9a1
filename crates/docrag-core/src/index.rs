//! HNSW-backed vector index

use std::collections::HashMap;

use hnsw_rs::prelude::*;
use parking_lot::RwLock;

use crate::error::{IndexError, Result};
use crate::types::{DistanceMetric, IndexOptions, SearchHit, SearchQuery, VectorEntry};

/// Number of layers in the HNSW graph
const NB_LAYERS: usize = 16;

/// Metric-specialized HNSW graph
enum Graph {
    Cosine(Hnsw<'static, f32, DistCosine>),
    Euclidean(Hnsw<'static, f32, DistL2>),
    InnerProduct(Hnsw<'static, f32, DistDot>),
}

impl Graph {
    fn build(options: &IndexOptions) -> Self {
        let p = &options.hnsw;
        match options.metric {
            DistanceMetric::Cosine => Self::Cosine(Hnsw::new(
                p.m,
                p.max_elements,
                NB_LAYERS,
                p.ef_construction,
                DistCosine {},
            )),
            DistanceMetric::Euclidean => Self::Euclidean(Hnsw::new(
                p.m,
                p.max_elements,
                NB_LAYERS,
                p.ef_construction,
                DistL2 {},
            )),
            DistanceMetric::InnerProduct => Self::InnerProduct(Hnsw::new(
                p.m,
                p.max_elements,
                NB_LAYERS,
                p.ef_construction,
                DistDot {},
            )),
        }
    }

    fn insert(&self, vector: &Vec<f32>, data_id: usize) {
        match self {
            Self::Cosine(h) => h.insert((vector, data_id)),
            Self::Euclidean(h) => h.insert((vector, data_id)),
            Self::InnerProduct(h) => h.insert((vector, data_id)),
        }
    }

    fn search(&self, vector: &[f32], k: usize, ef: usize) -> Vec<Neighbour> {
        match self {
            Self::Cosine(h) => h.search(vector, k, ef),
            Self::Euclidean(h) => h.search(vector, k, ef),
            Self::InnerProduct(h) => h.search(vector, k, ef),
        }
    }
}

/// Stored entry bookkeeping, addressed by HNSW data id (insertion position)
struct StoredEntry {
    id: String,
    metadata: Option<HashMap<String, serde_json::Value>>,
}

/// In-memory vector index with approximate nearest-neighbor search
///
/// Entries are append-only; consumers that need to drop data rebuild the
/// whole index instead. All contents are lost when the index is dropped.
pub struct VectorIndex {
    options: IndexOptions,
    graph: RwLock<Graph>,
    entries: RwLock<Vec<StoredEntry>>,
    ids: RwLock<HashMap<String, usize>>,
}

impl VectorIndex {
    /// Create an empty index
    pub fn new(options: IndexOptions) -> Result<Self> {
        if options.dimensions == 0 {
            return Err(IndexError::InvalidOptions(
                "dimensions must be non-zero".to_string(),
            ));
        }
        if options.hnsw.m == 0 || options.hnsw.max_elements == 0 {
            return Err(IndexError::InvalidOptions(
                "hnsw m and max_elements must be non-zero".to_string(),
            ));
        }

        tracing::debug!(
            dimensions = options.dimensions,
            metric = ?options.metric,
            m = options.hnsw.m,
            "creating vector index"
        );

        let graph = Graph::build(&options);

        Ok(Self {
            options,
            graph: RwLock::new(graph),
            entries: RwLock::new(Vec::new()),
            ids: RwLock::new(HashMap::new()),
        })
    }

    /// Insert an entry
    pub fn insert(&self, entry: VectorEntry) -> Result<()> {
        self.check_vector(&entry.vector)?;

        let mut ids = self.ids.write();
        if ids.contains_key(&entry.id) {
            return Err(IndexError::DuplicateId(entry.id));
        }

        let mut entries = self.entries.write();
        let data_id = entries.len();

        self.graph.write().insert(&entry.vector, data_id);

        ids.insert(entry.id.clone(), data_id);
        entries.push(StoredEntry {
            id: entry.id,
            metadata: entry.metadata,
        });

        Ok(())
    }

    /// Search for the nearest neighbors of a query vector
    ///
    /// Results are ordered by ascending distance. Returns fewer than `k` hits
    /// when the index holds fewer entries.
    pub fn search(&self, query: SearchQuery) -> Result<Vec<SearchHit>> {
        self.check_vector(&query.vector)?;

        if query.k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        // ef must be at least k for the search to return k candidates
        let ef = query
            .ef_search
            .unwrap_or(self.options.hnsw.ef_search)
            .max(query.k);

        let neighbours = self.graph.read().search(&query.vector, query.k, ef);

        let entries = self.entries.read();
        let hits = neighbours
            .into_iter()
            .filter_map(|n| {
                entries.get(n.d_id).map(|e| SearchHit {
                    id: e.id.clone(),
                    score: n.distance,
                    metadata: e.metadata.clone(),
                })
            })
            .collect();

        Ok(hits)
    }

    /// Number of entries in the index
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the index holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Vector dimensionality the index was created with
    pub fn dimensions(&self) -> usize {
        self.options.dimensions
    }

    /// Look up an entry's metadata by id
    pub fn metadata(&self, id: &str) -> Option<HashMap<String, serde_json::Value>> {
        let ids = self.ids.read();
        let data_id = *ids.get(id)?;
        self.entries.read().get(data_id)?.metadata.clone()
    }

    fn check_vector(&self, vector: &[f32]) -> Result<()> {
        if vector.is_empty() {
            return Err(IndexError::EmptyVector);
        }
        if vector.len() != self.options.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.options.dimensions,
                got: vector.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_index() -> VectorIndex {
        let mut options = IndexOptions::new(3);
        options.hnsw.max_elements = 64;
        VectorIndex::new(options).unwrap()
    }

    #[test]
    fn insert_and_search_nearest() {
        let index = small_index();
        index
            .insert(VectorEntry::new("a", vec![1.0, 0.0, 0.0]))
            .unwrap();
        index
            .insert(VectorEntry::new("b", vec![0.0, 1.0, 0.0]))
            .unwrap();
        index
            .insert(VectorEntry::new("c", vec![0.9, 0.1, 0.0]))
            .unwrap();

        let hits = index
            .search(SearchQuery::new(vec![1.0, 0.0, 0.0], 2))
            .unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "a");
        assert_eq!(hits[1].id, "c");
        assert!(hits[0].score <= hits[1].score);
    }

    #[test]
    fn search_empty_index_returns_nothing() {
        let index = small_index();
        let hits = index
            .search(SearchQuery::new(vec![1.0, 0.0, 0.0], 5))
            .unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let index = small_index();
        let err = index
            .insert(VectorEntry::new("a", vec![1.0, 0.0]))
            .unwrap_err();
        assert!(matches!(
            err,
            IndexError::DimensionMismatch {
                expected: 3,
                got: 2
            }
        ));

        let err = index
            .search(SearchQuery::new(vec![1.0; 4], 1))
            .unwrap_err();
        assert!(matches!(err, IndexError::DimensionMismatch { .. }));
    }

    #[test]
    fn empty_vector_is_rejected() {
        let index = small_index();
        let err = index.insert(VectorEntry::new("a", vec![])).unwrap_err();
        assert!(matches!(err, IndexError::EmptyVector));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let index = small_index();
        index
            .insert(VectorEntry::new("a", vec![1.0, 0.0, 0.0]))
            .unwrap();
        let err = index
            .insert(VectorEntry::new("a", vec![0.0, 1.0, 0.0]))
            .unwrap_err();
        assert!(matches!(err, IndexError::DuplicateId(_)));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn metadata_round_trip() {
        let index = small_index();
        let mut meta = HashMap::new();
        meta.insert("chunk_index".to_string(), serde_json::json!(7));

        index
            .insert(VectorEntry::new("a", vec![0.0, 0.0, 1.0]).with_metadata(meta))
            .unwrap();

        let hits = index
            .search(SearchQuery::new(vec![0.0, 0.0, 1.0], 1))
            .unwrap();
        assert_eq!(hits.len(), 1);
        let meta = hits[0].metadata.as_ref().unwrap();
        assert_eq!(meta["chunk_index"], serde_json::json!(7));

        assert_eq!(
            index.metadata("a").unwrap()["chunk_index"],
            serde_json::json!(7)
        );
        assert!(index.metadata("missing").is_none());
    }

    #[test]
    fn zero_max_elements_is_invalid() {
        let mut options = IndexOptions::new(3);
        options.hnsw.max_elements = 0;
        assert!(matches!(
            VectorIndex::new(options),
            Err(IndexError::InvalidOptions(_))
        ));
    }
}
