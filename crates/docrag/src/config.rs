//! Configuration for the RAG service

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Environment variable overriding the generation model repository
pub const GENERATION_MODEL_ENV: &str = "HF_GENERATION_MODEL";

/// Environment variable pointing at a TOML config file
pub const CONFIG_PATH_ENV: &str = "DOCRAG_CONFIG";

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RagConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Embedding configuration
    #[serde(default)]
    pub embeddings: EmbeddingConfig,
    /// Chunking configuration
    #[serde(default)]
    pub chunking: ChunkingConfig,
    /// Text generation configuration
    #[serde(default)]
    pub generation: GenerationConfig,
    /// Vector index configuration
    #[serde(default)]
    pub index: IndexConfig,
}

impl RagConfig {
    /// Load configuration: optional TOML file, then environment overrides
    ///
    /// The file is taken from `DOCRAG_CONFIG` if set, otherwise `docrag.toml`
    /// in the working directory if present. Missing file means defaults.
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("docrag.toml"));

        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };

        config.apply_env();
        Ok(config)
    }

    /// Parse configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))
    }

    /// Apply environment variable overrides
    pub fn apply_env(&mut self) {
        if let Ok(model) = std::env::var(GENERATION_MODEL_ENV) {
            if !model.trim().is_empty() {
                self.generation.model = model;
            }
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum upload size in bytes
    pub max_upload_size: usize,
    /// Timeout for processing a single upload in seconds
    pub upload_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            enable_cors: true,
            max_upload_size: 50 * 1024 * 1024, // 50MB
            upload_timeout_secs: 300,
        }
    }
}

/// Embedding model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Sentence-transformers model name
    pub model: String,
    /// Embedding dimensions (384 for MiniLM)
    pub dimensions: usize,
    /// Batch size for embedding generation
    pub batch_size: usize,
    /// Maximum sequence length in tokens
    pub max_length: usize,
    /// Cache directory for model artifacts
    pub cache_dir: PathBuf,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "all-MiniLM-L6-v2".to_string(),
            dimensions: 384,
            batch_size: 32,
            max_length: 256,
            cache_dir: default_cache_dir().join("embeddings"),
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Target chunk size in characters
    pub chunk_size: usize,
    /// Overlap between chunks in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 150,
        }
    }
}

/// Text generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Hugging Face model repository (must provide ONNX exports)
    pub model: String,
    /// Cache directory for model artifacts
    pub cache_dir: PathBuf,
    /// Maximum prompt length in tokens (longer prompts are truncated)
    pub max_input_tokens: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: "google/flan-t5-base".to_string(),
            cache_dir: default_cache_dir().join("generation"),
            max_input_tokens: 2048,
        }
    }
}

/// Vector index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// HNSW M parameter (connections per layer)
    pub hnsw_m: usize,
    /// HNSW ef_construction parameter
    pub hnsw_ef_construction: usize,
    /// HNSW ef_search parameter
    pub hnsw_ef_search: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            hnsw_m: 16,
            hnsw_ef_construction: 200,
            hnsw_ef_search: 100,
        }
    }
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("docrag")
        .join("models")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_service_expectations() {
        let config = RagConfig::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.chunking.chunk_size, 800);
        assert_eq!(config.chunking.chunk_overlap, 150);
        assert_eq!(config.embeddings.dimensions, 384);
        assert_eq!(config.generation.model, "google/flan-t5-base");
        assert_eq!(config.generation.max_input_tokens, 2048);
    }

    #[test]
    fn partial_toml_keeps_defaults_elsewhere() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[server]
host = "127.0.0.1"
port = 8080
enable_cors = false
max_upload_size = 1048576
upload_timeout_secs = 60

[chunking]
chunk_size = 400
chunk_overlap = 50
"#
        )
        .unwrap();

        let config = RagConfig::from_file(file.path()).unwrap();
        assert_eq!(config.server.port, 8080);
        assert!(!config.server.enable_cors);
        assert_eq!(config.chunking.chunk_size, 400);
        // untouched sections keep defaults
        assert_eq!(config.embeddings.model, "all-MiniLM-L6-v2");
        assert_eq!(config.generation.model, "google/flan-t5-base");
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[server\nport = ").unwrap();
        assert!(matches!(
            RagConfig::from_file(file.path()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn env_override_replaces_generation_model() {
        let mut config = RagConfig::default();
        std::env::set_var(GENERATION_MODEL_ENV, "distilgpt2");
        config.apply_env();
        std::env::remove_var(GENERATION_MODEL_ENV);
        assert_eq!(config.generation.model, "distilgpt2");
    }
}
