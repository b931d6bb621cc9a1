//! Question answering endpoint

use axum::{extract::State, Json};
use regex::Regex;
use std::time::Instant;

use crate::error::Result;
use crate::generation::PromptBuilder;
use crate::server::state::AppState;
use crate::types::{
    request::AskRequest,
    response::{AskResponse, Citation},
};

/// Chunks retrieved per question
const TOP_K: usize = 6;

/// Token budget for generated answers
const MAX_NEW_TOKENS: usize = 300;

/// POST /ask - Answer a question from the uploaded document
pub async fn ask_question(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>> {
    let start = Instant::now();

    let question = request.validated_question()?;
    tracing::info!("Question: \"{}\"", question);

    let Some(store) = state.store() else {
        return Ok(Json(AskResponse::no_document(elapsed_ms(start))));
    };

    let query_embedding = state.embed_one(question.clone()).await?;
    let results = store.search(&query_embedding, TOP_K)?;

    if results.is_empty() {
        return Ok(Json(AskResponse::not_found(elapsed_ms(start))));
    }

    let citations: Vec<Citation> = results
        .iter()
        .map(|r| Citation::from_chunk(&r.chunk, r.similarity))
        .collect();

    let context = PromptBuilder::build_context(&results);
    let prompt = PromptBuilder::build_qa_prompt(&question, &context);

    let answer = state.generate(prompt, MAX_NEW_TOKENS).await?;
    let answer = normalize_answer(&answer);

    let processing_time_ms = elapsed_ms(start);
    tracing::info!(
        "Question answered in {}ms ({} chunks)",
        processing_time_ms,
        results.len()
    );

    Ok(Json(AskResponse::new(answer, citations, processing_time_ms)))
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Collapse the whitespace runs greedy decoding tends to produce
fn normalize_answer(answer: &str) -> String {
    let whitespace = Regex::new(r"\s{2,}").expect("valid regex");
    whitespace.replace_all(answer, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_runs_are_collapsed() {
        assert_eq!(
            normalize_answer("The  answer\n\nis   42."),
            "The answer is 42."
        );
    }

    #[test]
    fn single_spaces_are_preserved() {
        assert_eq!(normalize_answer("already clean text"), "already clean text");
    }

    #[test]
    fn result_is_trimmed() {
        assert_eq!(normalize_answer("  padded  "), "padded");
        assert_eq!(normalize_answer("   "), "");
    }
}
