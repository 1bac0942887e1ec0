use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use cosproxy_protocol::openai::ErrorResponse;

/// Client-visible failure: an HTTP status plus a stable machine-readable
/// category, rendered as the OpenAI error envelope. Retry internals never
/// leak through here.
#[derive(Debug)]
pub struct ProxyError {
    pub status: StatusCode,
    pub kind: &'static str,
    pub message: String,
}

impl ProxyError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: "invalid_request_error",
            message: message.into(),
        }
    }

    pub fn no_accounts() -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            kind: "service_unavailable",
            message: "no available accounts".to_string(),
        }
    }

    pub fn retries_exhausted() -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            kind: "upstream_error",
            message: "failed to get response from upstream after retries".to_string(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            kind: "internal_error",
            message: message.into(),
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse::new(self.kind, self.message)),
        )
            .into_response()
    }
}
