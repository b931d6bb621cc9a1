//! Route handlers for the RAG server

pub mod ask;
pub mod summarize;
pub mod upload;
