//! Local text embeddings

mod onnx;

pub use onnx::{cosine_similarity, OnnxEmbedder};
