use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use imagecast_pipeline::PipelineError;

/// Errors that can occur when running the imagecast server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// An I/O error (e.g. binding the listener).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A request the handler could not interpret.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The multipart upload body could not be read.
    #[error("invalid upload: {0}")]
    Multipart(#[from] MultipartError),

    /// A pipeline error surfaced through the API.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl ServerError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Config(_) | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadRequest(_) | Self::Pipeline(PipelineError::Validation(_)) => {
                StatusCode::BAD_REQUEST
            }
            Self::Multipart(e) => e.status(),
            Self::Pipeline(PipelineError::NotFound(_) | PipelineError::EmptyCollection) => {
                StatusCode::NOT_FOUND
            }
            Self::Pipeline(PipelineError::ExternalService { .. }) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(error = %self, status = status.as_u16(), "request failed");
        }
        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_errors_map_to_status_codes() {
        let cases = [
            (PipelineError::Validation("empty".into()), StatusCode::BAD_REQUEST),
            (PipelineError::NotFound("a.png".into()), StatusCode::NOT_FOUND),
            (PipelineError::EmptyCollection, StatusCode::NOT_FOUND),
            (
                PipelineError::ExternalService {
                    operation: "blob.put",
                    attempts: 2,
                    message: "connection reset".into(),
                },
                StatusCode::BAD_GATEWAY,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ServerError::from(err).into_response().status(), status);
        }
    }

    #[test]
    fn config_error_is_internal() {
        let response = ServerError::Config("unknown backend".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
