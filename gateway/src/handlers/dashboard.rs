use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse};
use classsight_models::dashboard::GradeStats;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::errors::{GatewayError, OrFail, UpstreamError};
use crate::shaping::{sanitize_filters, shape_leaderboards};
use crate::state::GatewayState;

/// Query parameters the overview route lifts out of the posted filters.
const OVERVIEW_PARAMS: [&str; 4] = ["bootcamp_id", "start", "end", "granularity"];

/// Falsy JSON values (null, "", 0, false) are treated as absent.
fn query_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}

fn overview_params(body: &Value) -> Vec<(&'static str, String)> {
    OVERVIEW_PARAMS
        .iter()
        .filter_map(|&key| body.get(key).and_then(query_value).map(|v| (key, v)))
        .collect()
}

fn bootcamp_ids(body: &Value) -> Value {
    match body.get("bootcamp_ids") {
        Some(Value::Null) | None => json!([]),
        Some(ids) => ids.clone(),
    }
}

async fn overview(
    state: web::Data<GatewayState>,
    req: HttpRequest,
    body: web::Json<Value>,
) -> Result<HttpResponse, GatewayError> {
    let data = state
        .client
        .get_json(&req, "/dashboard", &overview_params(&body))
        .await
        .or_fail("Failed to fetch dashboard data")?;
    Ok(HttpResponse::Ok().json(data))
}

async fn relay(
    state: &GatewayState,
    req: &HttpRequest,
    path: &str,
    body: Value,
    failure: &str,
) -> Result<HttpResponse, GatewayError> {
    let data = state.client.post_json(req, path, &body).await.or_fail(failure)?;
    Ok(HttpResponse::Ok().json(data))
}

async fn kpis(state: web::Data<GatewayState>, req: HttpRequest, body: web::Json<Value>) -> Result<HttpResponse, GatewayError> {
    relay(&state, &req, "/dashboard/kpis", body.into_inner(), "Failed to fetch KPI data").await
}

async fn attendance_chart(
    state: web::Data<GatewayState>,
    req: HttpRequest,
    body: web::Json<Value>,
) -> Result<HttpResponse, GatewayError> {
    let body = sanitize_filters(body.into_inner());
    relay(&state, &req, "/dashboard/attendance-chart", body, "Failed to fetch attendance chart data").await
}

async fn attention_chart(
    state: web::Data<GatewayState>,
    req: HttpRequest,
    body: web::Json<Value>,
) -> Result<HttpResponse, GatewayError> {
    let body = sanitize_filters(body.into_inner());
    relay(&state, &req, "/dashboard/attention-chart", body, "Failed to fetch attention chart data").await
}

async fn grade_performance(
    state: web::Data<GatewayState>,
    req: HttpRequest,
    body: web::Json<Value>,
) -> Result<HttpResponse, GatewayError> {
    let body = sanitize_filters(body.into_inner());
    relay(&state, &req, "/dashboard/grade-performance", body, "Failed to fetch grade performance data").await
}

async fn correlation_analysis(
    state: web::Data<GatewayState>,
    req: HttpRequest,
    body: web::Json<Value>,
) -> Result<HttpResponse, GatewayError> {
    relay(
        &state,
        &req,
        "/dashboard/correlation-analysis",
        body.into_inner(),
        "Failed to fetch correlation analysis data",
    )
    .await
}

fn empty_distribution() -> Value {
    json!({ "distribution": [], "stats": GradeStats::default() })
}

async fn grade_distribution(
    state: web::Data<GatewayState>,
    req: HttpRequest,
    body: web::Json<Value>,
) -> Result<HttpResponse, GatewayError> {
    let ids = bootcamp_ids(&body);
    match state.client.post_json(&req, "/dashboard/grade-distribution", &ids).await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({
            "distribution": data.get("items").cloned().unwrap_or_else(|| json!([])),
            "stats": data.get("stats").cloned().unwrap_or_else(|| json!(GradeStats::default())),
        }))),
        // The chart renders empty rather than failing when grades are unavailable.
        Err(UpstreamError::Status { status, .. }) => {
            tracing::warn!(status, "grade distribution unavailable, returning empty");
            Ok(HttpResponse::Ok().json(empty_distribution()))
        }
        Err(e) => Err(e.into_failure("Failed to fetch grade distribution data")),
    }
}

async fn leaderboard(
    state: web::Data<GatewayState>,
    req: HttpRequest,
    body: web::Json<Value>,
) -> Result<HttpResponse, GatewayError> {
    let data = state
        .client
        .post_json(&req, "/dashboard/leaderboard", &bootcamp_ids(&body))
        .await
        .or_fail("Failed to fetch leaderboard data")?;
    Ok(HttpResponse::Ok().json(shape_leaderboards(&data)))
}

#[derive(Debug, Deserialize)]
struct BootcampsQuery {
    include_completed: Option<String>,
}

async fn bootcamps(
    state: web::Data<GatewayState>,
    req: HttpRequest,
    query: web::Query<BootcampsQuery>,
) -> Result<HttpResponse, GatewayError> {
    let include_completed = query
        .include_completed
        .clone()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "false".to_string());

    match state
        .client
        .get_json(&req, "/dashboard/bootcamps", &[("include_completed", include_completed)])
        .await
    {
        Ok(data) => Ok(HttpResponse::Ok().json(data)),
        Err(UpstreamError::Status { status, body }) => Err(GatewayError::Relayed {
            status: StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
            message: format!("FastAPI error: {}", body),
        }),
        Err(e) => {
            tracing::error!(error = %e, "bootcamp list request failed");
            Err(GatewayError::Failed("Internal server error".to_string()))
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/dashboard", web::post().to(overview))
        .route("/dashboard/kpis", web::post().to(kpis))
        .route("/dashboard/attendance-chart", web::post().to(attendance_chart))
        .route("/dashboard/attention-chart", web::post().to(attention_chart))
        .route("/dashboard/grade-performance", web::post().to(grade_performance))
        .route("/dashboard/correlation-analysis", web::post().to(correlation_analysis))
        .route("/dashboard/grade-distribution", web::post().to(grade_distribution))
        .route("/dashboard/leaderboard", web::post().to(leaderboard))
        .route("/dashboard/bootcamps", web::get().to(bootcamps));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overview_params_skip_falsy_values() {
        let body = json!({ "bootcamp_id": 3, "start": "2025-01-01", "end": "", "granularity": null });
        assert_eq!(
            overview_params(&body),
            vec![("bootcamp_id", "3".to_string()), ("start", "2025-01-01".to_string())]
        );
        assert!(overview_params(&json!({ "bootcamp_id": 0 })).is_empty());
    }

    #[test]
    fn bootcamp_ids_default_to_empty_array() {
        assert_eq!(bootcamp_ids(&json!({})), json!([]));
        assert_eq!(bootcamp_ids(&json!({ "bootcamp_ids": null })), json!([]));
        assert_eq!(bootcamp_ids(&json!({ "bootcamp_ids": [1, 2] })), json!([1, 2]));
    }

    #[test]
    fn empty_distribution_has_zero_stats() {
        let empty = empty_distribution();
        assert_eq!(empty["distribution"], json!([]));
        assert_eq!(empty["stats"]["count"], 0);
    }
}
