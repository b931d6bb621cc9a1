//! docrag: retrieval-augmented document Q&A over HTTP
//!
//! Upload a PDF, ask questions about it, or summarize it. Uploads are parsed,
//! chunked, embedded with a local ONNX sentence-embedding model, and indexed
//! into an in-memory vector store; questions retrieve the most similar chunks
//! and feed them to a local text-generation model. The index holds a single
//! document and is replaced on every upload.

pub mod config;
pub mod embeddings;
pub mod error;
pub mod generation;
pub mod hub;
pub mod ingestion;
pub mod retrieval;
pub mod server;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use types::{
    document::{Chunk, ChunkSource, Document},
    request::{AskRequest, SummarizeRequest},
    response::{AskResponse, Citation, SummaryResponse, UploadResponse},
};

/// Re-export docrag-core for consumers that need the raw index
pub use docrag_core;
