//! Application state for the RAG server

use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::config::RagConfig;
use crate::embeddings::OnnxEmbedder;
use crate::error::{Error, Result};
use crate::generation::{fetch_model_files, TextGenerator};
use crate::retrieval::VectorStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: RagConfig,
    /// Local embedding model (ort sessions need exclusive access to run)
    embedder: Mutex<OnnxEmbedder>,
    /// Vector store over the current document; replaced wholesale on upload
    store: RwLock<Option<Arc<VectorStore>>>,
    /// Generation model, loaded lazily on first use
    generator: OnceCell<Arc<Mutex<TextGenerator>>>,
    /// Ready state
    ready: RwLock<bool>,
}

impl AppState {
    /// Create new application state
    ///
    /// The embedding model is loaded eagerly (uploads need it immediately);
    /// the generation model waits for the first ask/summarize request.
    pub async fn new(config: RagConfig) -> Result<Self> {
        tracing::info!("Initializing RAG application state...");

        let embedder = OnnxEmbedder::new(&config.embeddings).await?;
        tracing::info!(
            "Embedding model ready ({}, {} dims)",
            config.embeddings.model,
            config.embeddings.dimensions
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                embedder: Mutex::new(embedder),
                store: RwLock::new(None),
                generator: OnceCell::new(),
                ready: RwLock::new(true),
            }),
        })
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    /// Vector store over the current document, if one has been uploaded
    pub fn store(&self) -> Option<Arc<VectorStore>> {
        self.inner.store.read().clone()
    }

    /// Swap in a freshly built store, dropping the previous document's index
    pub fn replace_store(&self, store: VectorStore) {
        let mut slot = self.inner.store.write();
        if let Some(previous) = slot.as_ref() {
            tracing::info!(
                "Replacing indexed document '{}' with '{}'",
                previous.document().filename,
                store.document().filename
            );
        }
        *slot = Some(Arc::new(store));
    }

    /// Embed a batch of texts on a blocking thread
    pub async fn embed_texts(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let refs: Vec<&str> = texts.iter().map(|s| s.as_str()).collect();
            inner.embedder.lock().embed_batch(&refs)
        })
        .await
        .map_err(|e| Error::internal(format!("embedding task failed: {}", e)))?
    }

    /// Embed a single text on a blocking thread
    pub async fn embed_one(&self, text: String) -> Result<Vec<f32>> {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || inner.embedder.lock().embed_one(&text))
            .await
            .map_err(|e| Error::internal(format!("embedding task failed: {}", e)))?
    }

    /// Generate a completion on a blocking thread
    pub async fn generate(&self, prompt: String, max_new_tokens: usize) -> Result<String> {
        let generator = self.generator().await?;
        tokio::task::spawn_blocking(move || generator.lock().generate(&prompt, max_new_tokens))
            .await
            .map_err(|e| Error::internal(format!("generation task failed: {}", e)))?
    }

    /// Load the generation model once, on first use; it then stays resident
    /// for the process lifetime
    async fn generator(&self) -> Result<Arc<Mutex<TextGenerator>>> {
        let config = self.inner.config.generation.clone();
        self.inner
            .generator
            .get_or_try_init(|| async move {
                tracing::info!("Loading generation model '{}' (first use)", config.model);
                let files = fetch_model_files(&config).await?;
                let max_input_tokens = config.max_input_tokens;
                let generator =
                    tokio::task::spawn_blocking(move || TextGenerator::load(&files, max_input_tokens))
                        .await
                        .map_err(|e| {
                            Error::internal(format!("generator load task failed: {}", e))
                        })??;
                Ok::<_, Error>(Arc::new(Mutex::new(generator)))
            })
            .await
            .cloned()
    }

    /// Check if the server is ready
    pub fn is_ready(&self) -> bool {
        *self.inner.ready.read()
    }

    /// Set ready state
    pub fn set_ready(&self, ready: bool) {
        *self.inner.ready.write() = ready;
    }
}
