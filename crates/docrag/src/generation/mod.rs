//! Answer generation: local ONNX model inference and prompt assembly

mod engine;
mod prompt;

pub use engine::{fetch_model_files, ModelFiles, ModelKind, ModelSpec, TextGenerator};
pub use prompt::PromptBuilder;
