use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

/// Failure talking to the analytics API.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("FastAPI responded with status {status}")]
    Status { status: u16, body: String },

    #[error("request to analytics API failed: {0}")]
    Request(#[from] reqwest::Error),
}

impl UpstreamError {
    pub fn status(&self) -> Option<u16> {
        match self {
            UpstreamError::Status { status, .. } => Some(*status),
            UpstreamError::Request(e) => e.status().map(|s| s.as_u16()),
        }
    }

    /// Logs the failure and replaces it with the route's generic message.
    pub fn into_failure(self, message: &str) -> GatewayError {
        tracing::error!(error = %self, "{}", message);
        GatewayError::Failed(message.to_string())
    }
}

/// Error returned to the dashboard as `{"error": ...}`.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{0}")]
    Failed(String),

    #[error("{0}")]
    BadRequest(String),

    /// Upstream status code kept, message rewritten for the browser.
    #[error("{message}")]
    Relayed { status: StatusCode, message: String },
}

impl GatewayError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        GatewayError::BadRequest(msg.into())
    }
}

impl ResponseError for GatewayError {
    fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Failed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::Relayed { status, .. } => *status,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

impl From<validator::ValidationErrors> for GatewayError {
    fn from(errors: validator::ValidationErrors) -> Self {
        // First field message only; the login form shows one line.
        let message = errors
            .field_errors()
            .values()
            .flat_map(|errs| errs.iter())
            .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
            .unwrap_or_else(|| errors.to_string());
        GatewayError::BadRequest(message)
    }
}

/// Collapses an upstream failure into the route's generic 500 message.
pub trait OrFail<T> {
    fn or_fail(self, message: &str) -> Result<T, GatewayError>;
}

impl<T> OrFail<T> for Result<T, UpstreamError> {
    fn or_fail(self, message: &str) -> Result<T, GatewayError> {
        self.map_err(|e| e.into_failure(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn failures_render_error_field() {
        let err: Result<(), _> = Err::<(), _>(UpstreamError::Status { status: 502, body: "down".into() })
            .or_fail("Failed to fetch KPI data");
        let err = err.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(err.error_response().into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, json!({ "error": "Failed to fetch KPI data" }));
    }

    #[test]
    fn relayed_keeps_status() {
        let err = GatewayError::Relayed { status: StatusCode::FORBIDDEN, message: "FastAPI error: no".into() };
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.to_string(), "FastAPI error: no");
    }

    #[test]
    fn upstream_status_exposed() {
        let err = UpstreamError::Status { status: 404, body: String::new() };
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.to_string(), "FastAPI responded with status 404");
    }
}
