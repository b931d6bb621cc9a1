//! Request types for the RAG endpoints

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Maximum accepted question length in characters
const MAX_QUESTION_CHARS: usize = 2000;

/// Request body for `POST /ask`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    /// The question to answer
    pub question: String,
}

impl AskRequest {
    /// Validate and normalize the question
    ///
    /// Rejects blank questions and questions over 2000 characters; returns the
    /// trimmed text otherwise.
    pub fn validated_question(&self) -> Result<String> {
        let question = self.question.trim();

        if question.is_empty() {
            return Err(Error::InvalidRequest(
                "Question cannot be empty".to_string(),
            ));
        }

        if question.chars().count() > MAX_QUESTION_CHARS {
            return Err(Error::InvalidRequest(format!(
                "Question exceeds {} characters",
                MAX_QUESTION_CHARS
            )));
        }

        Ok(question.to_string())
    }
}

/// Request body for `POST /summarize`
///
/// No parameters today; the empty object keeps the endpoint's contract open
/// for options without breaking clients.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummarizeRequest {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_is_trimmed() {
        let request = AskRequest {
            question: "  What is the refund policy?  ".to_string(),
        };
        assert_eq!(
            request.validated_question().unwrap(),
            "What is the refund policy?"
        );
    }

    #[test]
    fn blank_question_is_rejected() {
        let request = AskRequest {
            question: "   \n\t ".to_string(),
        };
        assert!(matches!(
            request.validated_question(),
            Err(Error::InvalidRequest(_))
        ));
    }

    #[test]
    fn oversized_question_is_rejected() {
        let request = AskRequest {
            question: "x".repeat(MAX_QUESTION_CHARS + 1),
        };
        assert!(matches!(
            request.validated_question(),
            Err(Error::InvalidRequest(_))
        ));
    }

    #[test]
    fn question_at_limit_is_accepted() {
        let request = AskRequest {
            question: "y".repeat(MAX_QUESTION_CHARS),
        };
        assert!(request.validated_question().is_ok());
    }

    #[test]
    fn summarize_request_parses_from_empty_object() {
        let request: SummarizeRequest = serde_json::from_str("{}").unwrap();
        let _ = request;
    }
}
