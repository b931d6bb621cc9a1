//! Core types for the RAG service

pub mod document;
pub mod request;
pub mod response;

pub use document::{Chunk, ChunkSource, Document};
pub use request::{AskRequest, SummarizeRequest};
pub use response::{AskResponse, Citation, SummaryResponse, UploadResponse};
