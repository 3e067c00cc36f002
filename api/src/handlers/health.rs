use actix_web::{web, HttpResponse};
use chrono::Utc;
use classsight_models::{HealthResponse, API_VERSION};
use serde_json::json;

use crate::db;
use crate::state::AppState;

async fn root() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "message": "ClassSight API",
        "version": API_VERSION,
        "timestamp": Utc::now(),
        "status": "operational",
    }))
}

async fn health(state: web::Data<AppState>) -> HttpResponse {
    let connected = db::ping(&state.pool).await;
    if !connected {
        tracing::warn!("health check: database unreachable");
    }
    HttpResponse::Ok().json(HealthResponse::new(connected))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(root))
        .route("/health", web::get().to(health));
}
