//! Chat turn pipeline: intent classification, evidence retrieval, prompt
//! assembly, generation and output-contract enforcement.

pub mod types;
pub mod synonyms;
pub mod retrieval;
pub mod classify;
pub mod prompt;
pub mod contract;
pub mod citation;
pub mod generate;
pub mod ollama;
pub mod single_flight;
pub mod orchestrator;

use thiserror::Error;

use crate::db::DatabaseError;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Ollama connection failed: {0}")]
    OllamaConnection(String),

    #[error("Ollama returned error (status {status}): {body}")]
    OllamaError { status: u16, body: String },

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("Streaming error: {0}")]
    StreamingError(String),

    #[error("Generation cancelled by a newer request")]
    Cancelled,

    #[error("No model available")]
    NoModel,

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl RagError {
    /// Connection drops, timeouts, overload (429) and server errors are
    /// worth retrying. Everything else fails fast.
    pub fn is_transient(&self) -> bool {
        match self {
            RagError::OllamaConnection(_) | RagError::Timeout(_) => true,
            RagError::OllamaError { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(RagError::OllamaConnection("refused".into()).is_transient());
        assert!(RagError::Timeout(30).is_transient());
        assert!(RagError::OllamaError { status: 503, body: String::new() }.is_transient());
        assert!(RagError::OllamaError { status: 429, body: String::new() }.is_transient());

        assert!(!RagError::OllamaError { status: 404, body: String::new() }.is_transient());
        assert!(!RagError::ResponseParsing("bad json".into()).is_transient());
        assert!(!RagError::Cancelled.is_transient());
        assert!(!RagError::NoModel.is_transient());
    }
}
