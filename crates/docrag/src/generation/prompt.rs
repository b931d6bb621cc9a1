//! Prompt templates for RAG generation

use crate::retrieval::SearchResult;

/// Prompt builder for RAG queries
pub struct PromptBuilder;

impl PromptBuilder {
    /// Build context from retrieved chunks
    pub fn build_context(results: &[SearchResult]) -> String {
        results
            .iter()
            .map(|r| r.chunk.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Build the question-answering prompt with strict grounding
    pub fn build_qa_prompt(question: &str, context: &str) -> String {
        format!(
            "You are a helpful assistant answering ONLY from the context below.\n\n\
             Context:\n{context}\n\n\
             Question: {question}\nAnswer:"
        )
    }

    /// Build the document summarization prompt
    pub fn build_summary_prompt(context: &str) -> String {
        format!(
            "Summarize the document in 6-8 concise bullet points.\n\n\
             Context:\n{context}\n\nSummary:"
        )
    }
}
