use std::collections::HashMap;

use actix_web::{web, HttpRequest, HttpResponse};

use crate::errors::{GatewayError, OrFail};
use crate::shaping::with_correlation_summary;
use crate::state::GatewayState;

type Params = web::Query<HashMap<String, String>>;

/// Copies the named, non-empty query parameters in the given order.
fn pick(query: &HashMap<String, String>, names: &[&'static str]) -> Vec<(&'static str, String)> {
    names
        .iter()
        .filter_map(|&name| {
            query
                .get(name)
                .filter(|v| !v.is_empty())
                .map(|v| (name, v.clone()))
        })
        .collect()
}

async fn fetch(
    state: &GatewayState,
    req: &HttpRequest,
    path: &str,
    params: Vec<(&'static str, String)>,
    failure: &str,
) -> Result<serde_json::Value, GatewayError> {
    state.client.get_json(req, path, &params).await.or_fail(failure)
}

async fn grade_performance(state: web::Data<GatewayState>, req: HttpRequest, query: Params) -> Result<HttpResponse, GatewayError> {
    let params = pick(&query, &["bootcampId", "timeRange"]);
    let data = fetch(&state, &req, "/dashboard/grade-performance", params, "Failed to fetch grade performance data").await?;
    Ok(HttpResponse::Ok().json(data))
}

async fn instructor_performance(
    state: web::Data<GatewayState>,
    req: HttpRequest,
    query: Params,
) -> Result<HttpResponse, GatewayError> {
    let params = pick(&query, &["instructorId", "timeRange"]);
    let data = fetch(
        &state,
        &req,
        "/dashboard/instructor-performance",
        params,
        "Failed to fetch instructor performance data",
    )
    .await?;
    Ok(HttpResponse::Ok().json(data))
}

async fn correlation_analysis(
    state: web::Data<GatewayState>,
    req: HttpRequest,
    query: Params,
) -> Result<HttpResponse, GatewayError> {
    let params = pick(&query, &["bootcampId"]);
    let data = fetch(
        &state,
        &req,
        "/dashboard/correlation-analysis",
        params,
        "Failed to fetch correlation analysis data",
    )
    .await?;
    Ok(HttpResponse::Ok().json(with_correlation_summary(data)))
}

async fn heatmap_data(state: web::Data<GatewayState>, req: HttpRequest, query: Params) -> Result<HttpResponse, GatewayError> {
    let params = pick(&query, &["bootcampId", "timeGranularity"]);
    let data = fetch(&state, &req, "/dashboard/heatmap-data", params, "Failed to fetch heatmap data").await?;
    Ok(HttpResponse::Ok().json(data))
}

async fn instructors(state: web::Data<GatewayState>, req: HttpRequest) -> Result<HttpResponse, GatewayError> {
    let data = fetch(&state, &req, "/admin/instructors", Vec::new(), "Failed to fetch instructors").await?;
    Ok(HttpResponse::Ok().json(data))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/grade-performance", web::get().to(grade_performance))
        .route("/instructor-performance", web::get().to(instructor_performance))
        .route("/correlation-analysis", web::get().to(correlation_analysis))
        .route("/heatmap-data", web::get().to(heatmap_data))
        .route("/instructors", web::get().to(instructors));
}
