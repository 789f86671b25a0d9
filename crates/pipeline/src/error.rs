use thiserror::Error;

/// Errors surfaced by the pipeline services.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The request was rejected before any side effect took place.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The addressed image does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A random pick was requested from an empty catalog.
    #[error("no images available")]
    EmptyCollection,

    /// A backend call failed after the call policy gave up.
    #[error("{operation} failed after {attempts} attempt(s): {message}")]
    ExternalService {
        operation: &'static str,
        attempts: u32,
        message: String,
    },
}

impl PipelineError {
    /// Returns `true` if the caller may retry the whole request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ExternalService { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_external_failures_are_retryable() {
        let external = PipelineError::ExternalService {
            operation: "blob.put",
            attempts: 2,
            message: "connection reset".into(),
        };
        assert!(external.is_retryable());
        assert!(!PipelineError::Validation("empty".into()).is_retryable());
        assert!(!PipelineError::NotFound("a.png".into()).is_retryable());
        assert!(!PipelineError::EmptyCollection.is_retryable());
    }

    #[test]
    fn error_display() {
        let err = PipelineError::ExternalService {
            operation: "topic.publish",
            attempts: 2,
            message: "request throttled".into(),
        };
        assert_eq!(
            err.to_string(),
            "topic.publish failed after 2 attempt(s): request throttled"
        );
        assert_eq!(
            PipelineError::EmptyCollection.to_string(),
            "no images available"
        );
    }
}
