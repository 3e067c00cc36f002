use actix_web::{web, HttpResponse};
use classsight_middleware::CurrentUser;
use classsight_models::reports::{ReportGenerate, ReportQueued, ReportsList, ReportsQuery};
use classsight_observability::log_security;
use validator::Validate;

use crate::errors::ApiError;
use crate::repositories::reports::ReportFilters;
use crate::repositories::{ReportRepository, ScopeRepository};
use crate::state::AppState;
use crate::utils::Pagination;

async fn list_reports(
    state: web::Data<AppState>,
    user: CurrentUser,
    query: web::Query<ReportsQuery>,
) -> Result<HttpResponse, ApiError> {
    let query = query.into_inner();
    let pagination = Pagination::parse(query.page, query.page_size);
    let scope = ScopeRepository::new(state.pool.clone())
        .resolve_bootcamp_filter(&user, query.bootcamp_id)
        .await?;

    if scope.is_empty() {
        return Ok(HttpResponse::Ok().json(ReportsList {
            items: Vec::new(),
            page: pagination.page,
            page_size: pagination.page_size,
            total: Some(0),
            pages: Some(0),
        }));
    }

    let filters = ReportFilters {
        start: query.start,
        end: query.end,
        status: query.status,
        format: query.format,
    };
    let repo = ReportRepository::new(state.pool.clone());
    let total = repo.count(&scope, &filters).await?;
    let items = repo.list(&scope, &filters, &pagination).await?;

    Ok(HttpResponse::Ok().json(ReportsList {
        items,
        page: pagination.page,
        page_size: pagination.page_size,
        total: Some(total),
        pages: Some(pagination.pages(total)),
    }))
}

async fn generate_report(
    state: web::Data<AppState>,
    user: CurrentUser,
    body: web::Json<ReportGenerate>,
) -> Result<HttpResponse, ApiError> {
    if !user.is_admin() {
        log_security!("report_generation_denied", user_id = user.user_id);
        return Err(ApiError::forbidden("Only administrators can generate reports"));
    }
    body.validate()?;
    if body.start_date > body.end_date {
        return Err(ApiError::bad_request("Start date must be before end date"));
    }

    let (id, created_at) = ReportRepository::new(state.pool.clone()).create(&body).await?;
    tracing::info!(report_id = %id, format = body.format.as_str(), "report queued");

    Ok(HttpResponse::Ok().json(ReportQueued {
        id,
        status: "pending".to_string(),
        message: "Report generation queued successfully".to_string(),
        created_at,
    }))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/reports")
            .route("", web::get().to(list_reports))
            .route("/generate", web::post().to(generate_report)),
    );
}
