use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;

use crate::errors::UpstreamError;
use crate::state::GatewayState;

/// Reports whether the gateway can reach the analytics API.
async fn health(state: web::Data<GatewayState>, req: HttpRequest) -> HttpResponse {
    let fastapi_url = state.client.base_url();

    match state.client.get_json(&req, "/health", &[]).await {
        Ok(data) => HttpResponse::Ok().json(json!({
            "status": "ok",
            "message": "Gateway can connect to FastAPI",
            "fastapi_url": fastapi_url,
            "fastapi_health": data,
        })),
        Err(UpstreamError::Status { status, body }) => {
            tracing::error!(status, body = %body, "analytics API unhealthy");
            HttpResponse::ServiceUnavailable().json(json!({
                "status": "error",
                "message": format!("FastAPI not responding: {}", status),
                "fastapi_url": fastapi_url,
                "error": body,
            }))
        }
        Err(e) => {
            tracing::error!(error = %e, "analytics API unreachable");
            HttpResponse::ServiceUnavailable().json(json!({
                "status": "error",
                "message": "Cannot connect to FastAPI",
                "fastapi_url": fastapi_url,
                "error": e.to_string(),
            }))
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health));
}
