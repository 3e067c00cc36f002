use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse};

use crate::errors::GatewayError;
use crate::state::GatewayState;

/// Upstream path for `/api/v1/{tail}`, query string included.
fn upstream_path(tail: &str, query: &str) -> String {
    let mut path = format!("/{}", tail.trim_start_matches('/'));
    if !query.is_empty() {
        path.push('?');
        path.push_str(query);
    }
    path
}

/// Any analytics API route, relayed with its status and body untouched.
async fn forward(
    state: web::Data<GatewayState>,
    req: HttpRequest,
    tail: web::Path<String>,
    body: web::Bytes,
) -> Result<HttpResponse, GatewayError> {
    let path = upstream_path(&tail, req.query_string());
    let upstream = state
        .client
        .forward(&req, &path, body.to_vec())
        .await
        .map_err(|e| e.into_failure("Failed to reach analytics API"))?;

    let status = StatusCode::from_u16(upstream.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut response = HttpResponse::build(status);
    if let Some(content_type) = upstream.content_type {
        response.content_type(content_type);
    }
    Ok(response.body(upstream.body))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/v1/{tail:.*}", web::route().to(forward));
}
