use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::speech::SpeechError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid request: {0}")]
    BadRequest(String),
    #[error("{0}")]
    MissingField(&'static str),
    #[error("unknown model: {0}")]
    UnknownModel(String),
    #[error("tokenizer error: {0}")]
    Tokenizer(String),
    #[error("model execution failed: {0}")]
    Inference(String),
    #[error("TTS generation failed: {0}")]
    Speech(#[from] SpeechError),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("other: {0}")]
    Other(String),
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match self {
            ServiceError::BadRequest(_)
            | ServiceError::MissingField(_)
            | ServiceError::UnknownModel(_) => StatusCode::BAD_REQUEST,
            ServiceError::Tokenizer(_)
            | ServiceError::Inference(_)
            | ServiceError::Speech(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::Config(_) | ServiceError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = serde_json::json!({
            "error": self.to_string(),
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_maps_to_bad_request_with_bare_message() {
        let err = ServiceError::MissingField("No story content provided");
        assert_eq!(err.to_string(), "No story content provided");
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn speech_failure_is_server_error() {
        let err = ServiceError::from(SpeechError::EmptyText);
        assert!(err.to_string().starts_with("TTS generation failed: "));
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
