use thiserror::Error;

/// Errors returned by backend implementations.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The addressed object, record or subscription does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A uniqueness constraint was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The backend did not respond in time.
    #[error("backend request timed out")]
    Timeout,

    /// A network or transport-level error occurred.
    #[error("connection error: {0}")]
    Connection(String),

    /// The backend rejected the request due to rate limiting.
    #[error("request throttled")]
    Throttled,

    /// The backend service returned an error.
    #[error("service error: {0}")]
    Service(String),

    /// A payload could not be serialized or deserialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The backend was given invalid configuration.
    #[error("invalid configuration: {0}")]
    Configuration(String),
}

impl BackendError {
    /// Returns `true` if the error is transient and the operation may succeed
    /// on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::Connection(_) | Self::Throttled)
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(BackendError::Timeout.is_retryable());
        assert!(BackendError::Connection("reset".into()).is_retryable());
        assert!(BackendError::Throttled.is_retryable());
    }

    #[test]
    fn non_retryable_errors() {
        assert!(!BackendError::NotFound("a.png".into()).is_retryable());
        assert!(!BackendError::Conflict("a.png".into()).is_retryable());
        assert!(!BackendError::Service("x".into()).is_retryable());
        assert!(!BackendError::Serialization("x".into()).is_retryable());
        assert!(!BackendError::Configuration("x".into()).is_retryable());
    }

    #[test]
    fn error_display() {
        assert_eq!(
            BackendError::NotFound("a.png".into()).to_string(),
            "not found: a.png"
        );
        assert_eq!(BackendError::Throttled.to_string(), "request throttled");
        assert_eq!(
            BackendError::Timeout.to_string(),
            "backend request timed out"
        );
    }
}
