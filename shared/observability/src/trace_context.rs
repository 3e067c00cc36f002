//! Trace ids carried from the browser-facing gateway to the analytics API.
//!
//! Accepts a W3C `traceparent` header or the `x-trace-id` / `x-request-id`
//! pair, and re-emits both forms on outgoing calls.

use actix_web::http::header::HeaderMap;
use actix_web::{HttpMessage, HttpRequest};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub const TRACE_ID_HEADER: &str = "x-trace-id";
pub const SPAN_ID_HEADER: &str = "x-span-id";
pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const W3C_TRACEPARENT_HEADER: &str = "traceparent";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraceContext {
    pub trace_id: String,
    pub span_id: String,
    pub parent_span_id: Option<String>,
    pub request_id: String,
    pub service: Option<String>,
    /// Raw `x-user-id` of the caller, recorded for log attribution only.
    pub user_id: Option<String>,
}

impl TraceContext {
    pub fn new() -> Self {
        let trace_id = new_trace_id();
        Self {
            request_id: trace_id.clone(),
            trace_id,
            span_id: new_span_id(),
            parent_span_id: None,
            service: None,
            user_id: None,
        }
    }

    /// Same trace, fresh span parented on this one.
    pub fn child(&self) -> Self {
        Self {
            trace_id: self.trace_id.clone(),
            span_id: new_span_id(),
            parent_span_id: Some(self.span_id.clone()),
            request_id: self.request_id.clone(),
            service: self.service.clone(),
            user_id: self.user_id.clone(),
        }
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    pub fn from_request(req: &HttpRequest) -> Self {
        Self::from_headers(req.headers())
    }

    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|h| h.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
        };

        let user_id = header("x-user-id");

        if let Some(ctx) = header(W3C_TRACEPARENT_HEADER).and_then(|tp| Self::parse_traceparent(&tp)) {
            return Self { user_id, ..ctx };
        }

        let trace_id = header(TRACE_ID_HEADER).unwrap_or_else(new_trace_id);
        Self {
            request_id: header(REQUEST_ID_HEADER).unwrap_or_else(|| trace_id.clone()),
            trace_id,
            span_id: new_span_id(),
            parent_span_id: header(SPAN_ID_HEADER),
            service: None,
            user_id,
        }
    }

    /// `version-trace_id-parent_id-flags`; anything else is ignored.
    fn parse_traceparent(value: &str) -> Option<Self> {
        let parts: Vec<&str> = value.split('-').collect();
        if parts.len() != 4 || parts[1].is_empty() || parts[2].is_empty() {
            return None;
        }
        Some(Self {
            trace_id: parts[1].to_string(),
            span_id: new_span_id(),
            parent_span_id: Some(parts[2].to_string()),
            request_id: parts[1].to_string(),
            service: None,
            user_id: None,
        })
    }

    /// Headers to attach to an outgoing request.
    pub fn to_headers(&self) -> Vec<(&'static str, String)> {
        vec![
            (TRACE_ID_HEADER, self.trace_id.clone()),
            (SPAN_ID_HEADER, self.span_id.clone()),
            (REQUEST_ID_HEADER, self.request_id.clone()),
            (W3C_TRACEPARENT_HEADER, format!("00-{}-{}-01", self.trace_id, self.span_id)),
        ]
    }
}

impl Default for TraceContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TraceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "trace_id={} span_id={}", self.trace_id, self.span_id)
    }
}

// 32 hex chars, the W3C trace-id width.
fn new_trace_id() -> String {
    Uuid::new_v4().simple().to_string()
}

// 16 hex chars, the W3C parent-id width.
fn new_span_id() -> String {
    Uuid::new_v4().simple().to_string()[..16].to_string()
}

pub trait TraceContextExt {
    fn trace_context(&self) -> TraceContext;
}

impl TraceContextExt for HttpRequest {
    fn trace_context(&self) -> TraceContext {
        if let Some(ctx) = self.extensions().get::<TraceContext>() {
            return ctx.clone();
        }
        TraceContext::from_request(self)
    }
}
