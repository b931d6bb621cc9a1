//! ONNX-based embedding generation
//!
//! Runs a sentence-transformers model (all-MiniLM-L6-v2 by default) locally
//! through ONNX Runtime: tokenize, forward pass, mean pooling over the
//! attention mask, L2 normalization.

use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use std::path::Path;
use tokenizers::Tokenizer;

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};
use crate::hub;

/// ONNX-based text embedder
pub struct OnnxEmbedder {
    /// ONNX Runtime session
    session: Session,
    /// HuggingFace tokenizer
    tokenizer: Tokenizer,
    /// Embedding dimensions
    dimensions: usize,
    /// Maximum sequence length
    max_length: usize,
    /// Batch size
    batch_size: usize,
}

impl OnnxEmbedder {
    /// Create a new embedder, fetching model artifacts if they are not cached
    pub async fn new(config: &EmbeddingConfig) -> Result<Self> {
        tracing::info!("Initializing ONNX embedder with model: {}", config.model);

        let repo = format!("sentence-transformers/{}", config.model);
        let dir = hub::model_dir(&config.cache_dir, &repo);

        let model_path = dir.join("model.onnx");
        let tokenizer_path = dir.join("tokenizer.json");

        hub::ensure_file(&hub::hub_url(&repo, "onnx/model.onnx"), &model_path).await?;
        hub::ensure_file(&hub::hub_url(&repo, "tokenizer.json"), &tokenizer_path).await?;

        Self::from_files(&model_path, &tokenizer_path, config)
    }

    /// Load an embedder from already-downloaded artifacts
    pub fn from_files(
        model_path: &Path,
        tokenizer_path: &Path,
        config: &EmbeddingConfig,
    ) -> Result<Self> {
        let session = Session::builder()
            .map_err(|e| Error::embedding(format!("failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| Error::embedding(format!("failed to set optimization level: {}", e)))?
            .with_intra_threads(4)
            .map_err(|e| Error::embedding(format!("failed to set threads: {}", e)))?
            .commit_from_file(model_path)
            .map_err(|e| Error::embedding(format!("failed to load model: {}", e)))?;

        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| Error::embedding(format!("failed to load tokenizer: {}", e)))?;

        tracing::info!("ONNX embedder ready ({} dims)", config.dimensions);

        Ok(Self {
            session,
            tokenizer,
            dimensions: config.dimensions,
            max_length: config.max_length,
            batch_size: config.batch_size,
        })
    }

    /// Get embedding dimensions
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Embed a single text
    pub fn embed_one(&mut self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed_batch(&[text])?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| Error::embedding("empty embedding result"))
    }

    /// Embed multiple texts
    pub fn embed_batch(&mut self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut all_embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            all_embeddings.extend(self.run_batch(batch)?);
        }

        Ok(all_embeddings)
    }

    fn run_batch(&mut self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let batch_size = texts.len();

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| Error::embedding(format!("tokenization failed: {}", e)))?;

        // Right-pad every sequence to the longest in the batch, capped at
        // max_length.
        let seq_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0)
            .min(self.max_length)
            .max(1);

        let mut input_ids = vec![0i64; batch_size * seq_len];
        let mut attention_mask = vec![0i64; batch_size * seq_len];
        let mut token_type_ids = vec![0i64; batch_size * seq_len];

        for (row, encoding) in encodings.iter().enumerate() {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            let types = encoding.get_type_ids();
            let len = ids.len().min(seq_len);

            for col in 0..len {
                input_ids[row * seq_len + col] = ids[col] as i64;
                attention_mask[row * seq_len + col] = mask[col] as i64;
                token_type_ids[row * seq_len + col] = types[col] as i64;
            }
        }

        let shape = vec![batch_size, seq_len];
        let input_ids_tensor = Tensor::from_array((shape.clone(), input_ids.into_boxed_slice()))
            .map_err(|e| Error::embedding(format!("input tensor creation failed: {}", e)))?;
        let mask_tensor =
            Tensor::from_array((shape.clone(), attention_mask.clone().into_boxed_slice()))
                .map_err(|e| Error::embedding(format!("mask tensor creation failed: {}", e)))?;
        let type_tensor = Tensor::from_array((shape, token_type_ids.into_boxed_slice()))
            .map_err(|e| Error::embedding(format!("type tensor creation failed: {}", e)))?;

        let inputs = vec![
            ("input_ids", input_ids_tensor.into_dyn()),
            ("attention_mask", mask_tensor.into_dyn()),
            ("token_type_ids", type_tensor.into_dyn()),
        ];

        let outputs = self
            .session
            .run(inputs)
            .map_err(|e| Error::embedding(format!("inference failed: {}", e)))?;

        // The model's token embeddings come back as last_hidden_state.
        let collected: Vec<_> = outputs.iter().collect();
        let output = collected
            .iter()
            .find(|(name, _)| *name == "last_hidden_state")
            .or_else(|| collected.first())
            .map(|(_, value)| value)
            .ok_or_else(|| Error::embedding("model produced no outputs"))?;

        let (tensor_shape, tensor_data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| Error::embedding(format!("failed to extract tensor: {}", e)))?;

        let dims: Vec<usize> = tensor_shape.iter().map(|&d| d as usize).collect();
        let hidden_size = dims.get(2).copied().unwrap_or(self.dimensions);

        Ok(pool_embeddings(
            tensor_data,
            &attention_mask,
            batch_size,
            seq_len,
            hidden_size,
        ))
    }
}

/// Mean-pool token embeddings over the attention mask and L2-normalize
fn pool_embeddings(
    hidden: &[f32],
    attention_mask: &[i64],
    batch_size: usize,
    seq_len: usize,
    hidden_size: usize,
) -> Vec<Vec<f32>> {
    let mut embeddings = Vec::with_capacity(batch_size);

    for row in 0..batch_size {
        let mut pooled = vec![0.0f32; hidden_size];
        let mut count = 0.0f32;

        for col in 0..seq_len {
            let mask = attention_mask[row * seq_len + col] as f32;
            if mask > 0.0 {
                let base = row * seq_len * hidden_size + col * hidden_size;
                for (k, value) in pooled.iter_mut().enumerate() {
                    if let Some(h) = hidden.get(base + k) {
                        *value += h * mask;
                    }
                }
                count += mask;
            }
        }

        if count > 0.0 {
            for value in &mut pooled {
                *value /= count;
            }
        }

        l2_normalize(&mut pooled);
        embeddings.push(pooled);
    }

    embeddings
}

/// Normalize a vector to unit length in place
fn l2_normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

/// Cosine similarity between two embeddings
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_pooling_ignores_padding() {
        // batch=1, seq=3 (last position padded), hidden=2
        let hidden = vec![1.0, 2.0, 3.0, 4.0, 100.0, 100.0];
        let mask = vec![1i64, 1, 0];

        let pooled = pool_embeddings(&hidden, &mask, 1, 3, 2);
        assert_eq!(pooled.len(), 1);

        // mean of [1,2] and [3,4] is [2,3], then L2-normalized
        let expected_norm = (4.0f32 + 9.0).sqrt();
        assert!((pooled[0][0] - 2.0 / expected_norm).abs() < 1e-6);
        assert!((pooled[0][1] - 3.0 / expected_norm).abs() < 1e-6);
    }

    #[test]
    fn pooled_embeddings_are_unit_length() {
        let hidden = vec![0.3, -0.7, 0.1, 0.9, 0.5, 0.5];
        let mask = vec![1i64, 1, 1];

        let pooled = pool_embeddings(&hidden, &mask, 1, 3, 2);
        let norm: f32 = pooled[0].iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn fully_masked_row_yields_zero_vector() {
        let hidden = vec![1.0, 1.0];
        let mask = vec![0i64];

        let pooled = pool_embeddings(&hidden, &mask, 1, 1, 2);
        assert_eq!(pooled[0], vec![0.0, 0.0]);
    }

    #[test]
    fn cosine_similarity_bounds() {
        let a = vec![1.0, 0.0];
        let b = vec![1.0, 0.0];
        let c = vec![0.0, 1.0];
        let d = vec![-1.0, 0.0];

        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&a, &c).abs() < 1e-6);
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&a, &[0.0, 0.0]), 0.0);
    }
}
