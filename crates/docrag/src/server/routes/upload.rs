//! PDF upload and indexing endpoint

use axum::{
    extract::{Multipart, State},
    Json,
};
use std::time::{Duration, Instant};
use tokio::time::timeout;

use crate::error::{Error, Result};
use crate::ingestion::{PdfParser, TextChunker};
use crate::retrieval::VectorStore;
use crate::server::state::AppState;
use crate::types::{response::UploadResponse, Document};

/// POST /upload - Upload a PDF and build a fresh index from it
///
/// The new index replaces whatever document was uploaded before; the service
/// holds exactly one document at a time.
pub async fn upload_pdf(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let start = Instant::now();

    // Take the first multipart field that carries a file.
    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        Error::InvalidRequest(format!("failed to read multipart field: {}", e))
    })? {
        let Some(filename) = field.file_name().map(|s| s.to_string()) else {
            continue;
        };

        let data = field
            .bytes()
            .await
            .map_err(|e| Error::InvalidRequest(format!("failed to read '{}': {}", filename, e)))?;

        upload = Some((filename, data.to_vec()));
        break;
    }

    let Some((filename, data)) = upload else {
        return Err(Error::InvalidRequest(
            "multipart body must contain a file field".to_string(),
        ));
    };

    tracing::info!("Processing upload: {} ({} bytes)", filename, data.len());

    let upload_timeout = Duration::from_secs(state.config().server.upload_timeout_secs);
    let document = match timeout(upload_timeout, index_document(&state, &filename, &data)).await {
        Ok(result) => result?,
        Err(_) => {
            tracing::error!(
                "Timeout processing '{}' after {}s (size: {} bytes)",
                filename,
                upload_timeout.as_secs(),
                data.len()
            );
            return Err(Error::internal(format!(
                "processing timed out after {}s",
                upload_timeout.as_secs()
            )));
        }
    };

    let processing_time_ms = start.elapsed().as_millis() as u64;
    tracing::info!(
        "Indexed '{}': {} pages, {} chunks in {}ms",
        document.filename,
        document.total_pages.unwrap_or(1),
        document.total_chunks,
        processing_time_ms
    );

    Ok(Json(UploadResponse::from_document(&document, processing_time_ms)))
}

/// Parse, chunk, embed, and index one file, then swap the store
async fn index_document(state: &AppState, filename: &str, data: &[u8]) -> Result<Document> {
    let config = state.config();

    let parsed = PdfParser::parse(filename, data)?;

    let mut document = Document::new(
        filename.to_string(),
        parsed.content_hash.clone(),
        data.len() as u64,
    );
    document.total_pages = parsed.total_pages;

    let chunker = TextChunker::new(config.chunking.chunk_size, config.chunking.chunk_overlap);
    let mut chunks = chunker.chunk_document(&document, &parsed);

    if chunks.is_empty() {
        return Err(Error::file_parse(filename, "No text found in PDF."));
    }

    let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
    let embeddings = state.embed_texts(texts).await?;
    for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
        chunk.embedding = embedding;
    }

    document.total_chunks = chunks.len() as u32;

    let store = VectorStore::build(
        &config.index,
        config.embeddings.dimensions,
        document.clone(),
        chunks,
    )?;
    state.replace_store(store);

    Ok(document)
}
