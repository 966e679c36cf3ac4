//! Error taxonomy shared by every pipeline stage.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RagError {
    /// Bad caller input, detected before any external call.
    #[error("invalid {field}: {message}")]
    InputValidation { field: &'static str, message: String },

    #[error("embedding service error: {0}")]
    EmbeddingService(String),

    #[error("generation service error: {0}")]
    GenerationService(String),

    #[error("{service} service timed out after {secs}s")]
    Timeout { service: &'static str, secs: u64 },

    #[error("index unavailable: {0}")]
    IndexState(String),
}

impl RagError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        RagError::InputValidation {
            field,
            message: message.into(),
        }
    }

    /// True for failures of an external service (including timeouts).
    pub fn is_service_error(&self) -> bool {
        matches!(
            self,
            RagError::EmbeddingService(_) | RagError::GenerationService(_) | RagError::Timeout { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, RagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_names_field() {
        let err = RagError::invalid("chunk_overlap", "must be smaller than chunk_size");
        assert_eq!(
            err.to_string(),
            "invalid chunk_overlap: must be smaller than chunk_size"
        );
        assert!(!err.is_service_error());
    }

    #[test]
    fn test_service_errors() {
        assert!(RagError::EmbeddingService("down".into()).is_service_error());
        assert!(RagError::GenerationService("down".into()).is_service_error());
        assert!(RagError::Timeout {
            service: "generation",
            secs: 30
        }
        .is_service_error());
        assert!(!RagError::IndexState("empty".into()).is_service_error());
    }
}
