//! ONNX text generation engine
//!
//! Loads a Hugging Face ONNX export and decodes greedily. Encoder-decoder
//! models run the encoder once and autoregress the decoder against its hidden
//! states; causal models autoregress directly over the prompt, and only the
//! newly generated ids are decoded back to text.

use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::{DynValue, Tensor};
use std::path::{Path, PathBuf};
use tokenizers::Tokenizer;

use crate::config::GenerationConfig;
use crate::error::{Error, Result};
use crate::hub;

/// Text generation architecture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    /// Encoder-decoder (seq2seq) model such as T5
    EncoderDecoder,
    /// Decoder-only causal language model such as GPT-2
    Causal,
}

/// Decoding-relevant fields from the model's `config.json`
#[derive(Debug, Clone)]
pub struct ModelSpec {
    /// Architecture kind
    pub kind: ModelKind,
    /// End-of-sequence token id
    pub eos_token_id: Option<u32>,
    /// Padding token id (falls back to EOS when absent)
    pub pad_token_id: Option<u32>,
    /// First decoder input id for encoder-decoder models
    pub decoder_start_token_id: Option<u32>,
}

impl ModelSpec {
    /// Extract the spec from a parsed `config.json`
    pub fn from_config_value(value: &serde_json::Value) -> Self {
        let kind = if value
            .get("is_encoder_decoder")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
        {
            ModelKind::EncoderDecoder
        } else {
            ModelKind::Causal
        };

        let eos_token_id = token_id(value.get("eos_token_id"));
        let pad_token_id = token_id(value.get("pad_token_id")).or(eos_token_id);
        let decoder_start_token_id =
            token_id(value.get("decoder_start_token_id")).or(pad_token_id);

        Self {
            kind,
            eos_token_id,
            pad_token_id,
            decoder_start_token_id,
        }
    }
}

/// Token ids in config.json appear both as integers and as lists
fn token_id(value: Option<&serde_json::Value>) -> Option<u32> {
    let value = value?;
    if let Some(id) = value.as_u64() {
        return Some(id as u32);
    }
    value.as_array()?.first()?.as_u64().map(|id| id as u32)
}

/// Local paths of a generation model's artifacts
#[derive(Debug, Clone)]
pub struct ModelFiles {
    /// `config.json`
    pub config: PathBuf,
    /// `tokenizer.json`
    pub tokenizer: PathBuf,
    /// Encoder graph (encoder-decoder models only)
    pub encoder: Option<PathBuf>,
    /// Decoder graph (or the single graph for causal models)
    pub decoder: PathBuf,
}

/// Download a generation model's artifacts unless cached
///
/// `config.json` decides which ONNX graphs are needed; repositories place
/// their exports either under `onnx/` or at the top level.
pub async fn fetch_model_files(config: &GenerationConfig) -> Result<ModelFiles> {
    let repo = &config.model;
    let dir = hub::model_dir(&config.cache_dir, repo);

    let config_path = dir.join("config.json");
    let tokenizer_path = dir.join("tokenizer.json");

    hub::ensure_file(&hub::hub_url(repo, "config.json"), &config_path).await?;
    hub::ensure_file(&hub::hub_url(repo, "tokenizer.json"), &tokenizer_path).await?;

    let raw = std::fs::read_to_string(&config_path)?;
    let value: serde_json::Value = serde_json::from_str(&raw)?;
    let spec = ModelSpec::from_config_value(&value);

    let files = match spec.kind {
        ModelKind::EncoderDecoder => {
            let encoder_path = dir.join("encoder_model.onnx");
            let decoder_path = dir.join("decoder_model.onnx");
            hub::ensure_any(
                &[
                    hub::hub_url(repo, "onnx/encoder_model.onnx"),
                    hub::hub_url(repo, "encoder_model.onnx"),
                ],
                &encoder_path,
            )
            .await?;
            hub::ensure_any(
                &[
                    hub::hub_url(repo, "onnx/decoder_model.onnx"),
                    hub::hub_url(repo, "decoder_model.onnx"),
                ],
                &decoder_path,
            )
            .await?;

            ModelFiles {
                config: config_path,
                tokenizer: tokenizer_path,
                encoder: Some(encoder_path),
                decoder: decoder_path,
            }
        }
        ModelKind::Causal => {
            let model_path = dir.join("model.onnx");
            hub::ensure_any(
                &[
                    hub::hub_url(repo, "onnx/model.onnx"),
                    hub::hub_url(repo, "onnx/decoder_model.onnx"),
                    hub::hub_url(repo, "model.onnx"),
                    hub::hub_url(repo, "decoder_model.onnx"),
                ],
                &model_path,
            )
            .await?;

            ModelFiles {
                config: config_path,
                tokenizer: tokenizer_path,
                encoder: None,
                decoder: model_path,
            }
        }
    };

    Ok(files)
}

/// Architecture-specific ONNX sessions
enum Backend {
    Seq2Seq { encoder: Session, decoder: Session },
    Causal { model: Session },
}

/// Greedy-decoding text generator over local ONNX graphs
pub struct TextGenerator {
    tokenizer: Tokenizer,
    spec: ModelSpec,
    backend: Backend,
    max_input_tokens: usize,
}

impl TextGenerator {
    /// Load a generator from downloaded artifacts
    pub fn load(files: &ModelFiles, max_input_tokens: usize) -> Result<Self> {
        let raw = std::fs::read_to_string(&files.config)?;
        let value: serde_json::Value = serde_json::from_str(&raw)?;
        let spec = ModelSpec::from_config_value(&value);

        let tokenizer = Tokenizer::from_file(&files.tokenizer)
            .map_err(|e| Error::generation(format!("failed to load tokenizer: {}", e)))?;

        let backend = match spec.kind {
            ModelKind::EncoderDecoder => {
                let encoder_path = files.encoder.as_ref().ok_or_else(|| {
                    Error::generation("encoder graph missing for encoder-decoder model")
                })?;
                Backend::Seq2Seq {
                    encoder: load_session(encoder_path)?,
                    decoder: load_session(&files.decoder)?,
                }
            }
            ModelKind::Causal => Backend::Causal {
                model: load_session(&files.decoder)?,
            },
        };

        tracing::info!(kind = ?spec.kind, "generation model loaded");

        Ok(Self {
            tokenizer,
            spec,
            backend,
            max_input_tokens,
        })
    }

    /// The architecture this generator runs
    pub fn kind(&self) -> ModelKind {
        self.spec.kind
    }

    /// Generate a completion for the prompt with greedy decoding
    pub fn generate(&mut self, prompt: &str, max_new_tokens: usize) -> Result<String> {
        let encoding = self
            .tokenizer
            .encode(prompt, true)
            .map_err(|e| Error::generation(format!("tokenization failed: {}", e)))?;

        let mut input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        input_ids.truncate(self.max_input_tokens);

        if input_ids.is_empty() {
            return Err(Error::generation("prompt tokenized to an empty sequence"));
        }

        let Self {
            tokenizer,
            spec,
            backend,
            ..
        } = self;

        let text = match backend {
            Backend::Seq2Seq { encoder, decoder } => {
                generate_seq2seq(encoder, decoder, tokenizer, spec, &input_ids, max_new_tokens)?
            }
            Backend::Causal { model } => {
                generate_causal(model, tokenizer, spec, input_ids, max_new_tokens)?
            }
        };

        Ok(text.trim().to_string())
    }
}

/// Encoder-decoder generation: one encoder pass, then greedy decoder steps
fn generate_seq2seq(
    encoder: &mut Session,
    decoder: &mut Session,
    tokenizer: &Tokenizer,
    spec: &ModelSpec,
    input_ids: &[i64],
    max_new_tokens: usize,
) -> Result<String> {
    let src_len = input_ids.len();
    let src_mask = vec![1i64; src_len];

    let ids_tensor = i64_tensor(vec![1, src_len], input_ids.to_vec())?;
    let mask_tensor = i64_tensor(vec![1, src_len], src_mask.clone())?;

    let outputs = encoder
        .run(vec![
            ("input_ids", ids_tensor.into_dyn()),
            ("attention_mask", mask_tensor.into_dyn()),
        ])
        .map_err(|e| Error::generation(format!("encoder inference failed: {}", e)))?;

    let collected: Vec<_> = outputs.iter().collect();
    let output = collected
        .iter()
        .find(|(name, _)| *name == "last_hidden_state")
        .or_else(|| collected.first())
        .map(|(_, value)| value)
        .ok_or_else(|| Error::generation("encoder produced no outputs"))?;

    let (shape, data) = output
        .try_extract_tensor::<f32>()
        .map_err(|e| Error::generation(format!("failed to extract encoder output: {}", e)))?;

    let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
    let hidden_size = *dims
        .get(2)
        .ok_or_else(|| Error::generation("unexpected encoder output shape"))?;
    let hidden_states = data.to_vec();

    let start = spec.decoder_start_token_id.unwrap_or(0) as i64;
    let eos = spec.eos_token_id.map(|id| id as i64);

    let mut output_ids = vec![start];

    for _ in 0..max_new_tokens {
        let step_len = output_ids.len();
        let decoder_ids = i64_tensor(vec![1, step_len], output_ids.clone())?;
        let encoder_states = f32_tensor(vec![1, src_len, hidden_size], hidden_states.clone())?;
        let encoder_mask = i64_tensor(vec![1, src_len], src_mask.clone())?;

        let next = run_argmax(
            decoder,
            vec![
                ("input_ids", decoder_ids.into_dyn()),
                ("encoder_attention_mask", encoder_mask.into_dyn()),
                ("encoder_hidden_states", encoder_states.into_dyn()),
            ],
        )?;

        output_ids.push(next);
        if Some(next) == eos {
            break;
        }
    }

    // Drop the decoder start token; skip_special_tokens removes EOS.
    let generated: Vec<u32> = output_ids[1..].iter().map(|&id| id as u32).collect();
    tokenizer
        .decode(&generated, true)
        .map_err(|e| Error::generation(format!("decoding failed: {}", e)))
}

/// Causal generation: greedily extend the prompt, return only the new tokens
fn generate_causal(
    session: &mut Session,
    tokenizer: &Tokenizer,
    spec: &ModelSpec,
    mut ids: Vec<i64>,
    max_new_tokens: usize,
) -> Result<String> {
    let prompt_len = ids.len();
    let eos = spec.eos_token_id.map(|id| id as i64);

    for _ in 0..max_new_tokens {
        let len = ids.len();
        let ids_tensor = i64_tensor(vec![1, len], ids.clone())?;
        let mask_tensor = i64_tensor(vec![1, len], vec![1i64; len])?;

        let next = run_argmax(
            session,
            vec![
                ("input_ids", ids_tensor.into_dyn()),
                ("attention_mask", mask_tensor.into_dyn()),
            ],
        )?;

        if Some(next) == eos {
            break;
        }
        ids.push(next);
    }

    let generated: Vec<u32> = ids[prompt_len..].iter().map(|&id| id as u32).collect();
    tokenizer
        .decode(&generated, true)
        .map_err(|e| Error::generation(format!("decoding failed: {}", e)))
}

/// Run one decoding step and return the argmax of the final position's logits
fn run_argmax(session: &mut Session, inputs: Vec<(&str, DynValue)>) -> Result<i64> {
    let outputs = session
        .run(inputs)
        .map_err(|e| Error::generation(format!("decoder inference failed: {}", e)))?;

    let collected: Vec<_> = outputs.iter().collect();
    let output = collected
        .iter()
        .find(|(name, _)| *name == "logits")
        .or_else(|| collected.first())
        .map(|(_, value)| value)
        .ok_or_else(|| Error::generation("decoder produced no outputs"))?;

    let (shape, data) = output
        .try_extract_tensor::<f32>()
        .map_err(|e| Error::generation(format!("failed to extract logits: {}", e)))?;

    let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
    let vocab = *dims
        .last()
        .ok_or_else(|| Error::generation("unexpected logits shape"))?;

    if vocab == 0 || data.len() < vocab {
        return Err(Error::generation("logits tensor smaller than vocabulary"));
    }

    let last = &data[data.len() - vocab..];
    Ok(argmax(last) as i64)
}

/// Index of the largest value in a slice
fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    let mut best_value = f32::NEG_INFINITY;
    for (i, &v) in values.iter().enumerate() {
        if v > best_value {
            best = i;
            best_value = v;
        }
    }
    best
}

fn i64_tensor(shape: Vec<usize>, data: Vec<i64>) -> Result<Tensor<i64>> {
    Tensor::from_array((shape, data.into_boxed_slice()))
        .map_err(|e| Error::generation(format!("tensor creation failed: {}", e)))
}

fn f32_tensor(shape: Vec<usize>, data: Vec<f32>) -> Result<Tensor<f32>> {
    Tensor::from_array((shape, data.into_boxed_slice()))
        .map_err(|e| Error::generation(format!("tensor creation failed: {}", e)))
}

fn load_session(path: &Path) -> Result<Session> {
    Session::builder()
        .map_err(|e| Error::generation(format!("failed to create session builder: {}", e)))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| Error::generation(format!("failed to set optimization level: {}", e)))?
        .with_intra_threads(4)
        .map_err(|e| Error::generation(format!("failed to set threads: {}", e)))?
        .commit_from_file(path)
        .map_err(|e| Error::generation(format!("failed to load {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn argmax_picks_largest() {
        assert_eq!(argmax(&[0.1, 0.9, 0.3]), 1);
        assert_eq!(argmax(&[-5.0, -1.0, -3.0]), 1);
        assert_eq!(argmax(&[2.0]), 0);
    }

    #[test]
    fn argmax_prefers_first_on_ties() {
        assert_eq!(argmax(&[1.0, 1.0, 1.0]), 0);
    }

    #[test]
    fn t5_style_config_is_encoder_decoder() {
        let config = json!({
            "is_encoder_decoder": true,
            "eos_token_id": 1,
            "pad_token_id": 0,
            "decoder_start_token_id": 0,
        });

        let spec = ModelSpec::from_config_value(&config);
        assert_eq!(spec.kind, ModelKind::EncoderDecoder);
        assert_eq!(spec.eos_token_id, Some(1));
        assert_eq!(spec.pad_token_id, Some(0));
        assert_eq!(spec.decoder_start_token_id, Some(0));
    }

    #[test]
    fn gpt2_style_config_is_causal_with_pad_fallback() {
        let config = json!({
            "eos_token_id": 50256,
        });

        let spec = ModelSpec::from_config_value(&config);
        assert_eq!(spec.kind, ModelKind::Causal);
        assert_eq!(spec.eos_token_id, Some(50256));
        // no pad token defined: falls back to EOS
        assert_eq!(spec.pad_token_id, Some(50256));
        assert_eq!(spec.decoder_start_token_id, Some(50256));
    }

    #[test]
    fn list_valued_token_ids_take_the_first_entry() {
        let config = json!({
            "is_encoder_decoder": false,
            "eos_token_id": [2, 3],
        });

        let spec = ModelSpec::from_config_value(&config);
        assert_eq!(spec.eos_token_id, Some(2));
    }

    #[test]
    fn missing_token_ids_stay_unset() {
        let spec = ModelSpec::from_config_value(&json!({}));
        assert_eq!(spec.kind, ModelKind::Causal);
        assert!(spec.eos_token_id.is_none());
        assert!(spec.pad_token_id.is_none());
        assert!(spec.decoder_start_token_id.is_none());
    }
}
