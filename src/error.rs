//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::resolver::ResolveError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The request was rejected before any upstream work started.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The metadata tool could not be invoked or exited unsuccessfully.
    #[error("resolution failed: {0}")]
    ResolutionFailed(String),

    /// The metadata tool answered, but its payload was unusable.
    #[error("malformed upstream response: {0}")]
    MalformedUpstream(String),

    /// The relay origin could not be reached or refused the request.
    #[error("upstream unreachable: {0}")]
    UpstreamUnreachable(String),
}

impl ApiError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::ResolutionFailed(_)
            | ApiError::MalformedUpstream(_)
            | ApiError::UpstreamUnreachable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message. Upstream detail stays in the logs.
    fn public_message(&self) -> String {
        match self {
            ApiError::InvalidInput(msg) => msg.clone(),
            ApiError::ResolutionFailed(_) | ApiError::MalformedUpstream(_) => {
                "Failed to retrieve media information.".to_string()
            }
            ApiError::UpstreamUnreachable(_) => "Streaming failed.".to_string(),
        }
    }
}

impl From<ResolveError> for ApiError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::Tool(detail) => ApiError::ResolutionFailed(detail),
            ResolveError::Malformed(detail) => ApiError::MalformedUpstream(detail),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            error!("{self}");
        }

        let body = ErrorResponse {
            error: self.public_message(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_input_maps_to_400_and_echoes_message() {
        let err = ApiError::invalid_input("Missing URL");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.public_message(), "Missing URL");
    }

    #[test]
    fn resolution_detail_is_not_exposed() {
        let err = ApiError::ResolutionFailed("yt-dlp exited with status 1".into());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Failed to retrieve media information.");
    }

    #[test]
    fn malformed_payload_shares_the_generic_message() {
        let err = ApiError::MalformedUpstream("missing title".into());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Failed to retrieve media information.");
    }

    #[test]
    fn relay_failure_uses_streaming_message() {
        let err = ApiError::UpstreamUnreachable("connection refused".into());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Streaming failed.");
    }

    #[test]
    fn resolve_errors_keep_their_kind() {
        let tool: ApiError = ResolveError::Tool("spawn failed".into()).into();
        assert!(matches!(tool, ApiError::ResolutionFailed(_)));

        let malformed: ApiError = ResolveError::Malformed("missing title".into()).into();
        assert!(matches!(malformed, ApiError::MalformedUpstream(_)));
    }
}
