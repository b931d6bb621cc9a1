//! Document summarization endpoint

use axum::{extract::State, Json};
use std::time::Instant;

use crate::error::Result;
use crate::generation::PromptBuilder;
use crate::server::state::AppState;
use crate::types::{request::SummarizeRequest, response::SummaryResponse};

/// Chunks retrieved for the summary context
const TOP_K: usize = 8;

/// Token budget for generated summaries
const MAX_NEW_TOKENS: usize = 350;

/// Retrieval probe standing in for "the whole document"
const SUMMARY_PROBE: &str = "Summarize the document";

/// POST /summarize - Summarize the uploaded document
pub async fn summarize_document(
    State(state): State<AppState>,
    Json(_request): Json<SummarizeRequest>,
) -> Result<Json<SummaryResponse>> {
    let start = Instant::now();

    let Some(store) = state.store() else {
        return Ok(Json(SummaryResponse::no_document(elapsed_ms(start))));
    };

    tracing::info!("Summarizing '{}'", store.document().filename);

    let probe_embedding = state.embed_one(SUMMARY_PROBE.to_string()).await?;
    let results = store.search(&probe_embedding, TOP_K)?;

    let context = PromptBuilder::build_context(&results);
    let prompt = PromptBuilder::build_summary_prompt(&context);

    let summary = state.generate(prompt, MAX_NEW_TOKENS).await?;

    let processing_time_ms = elapsed_ms(start);
    tracing::info!(
        "Summary generated in {}ms ({} chunks)",
        processing_time_ms,
        results.len()
    );

    Ok(Json(SummaryResponse::new(
        summary,
        results.len(),
        processing_time_ms,
    )))
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
