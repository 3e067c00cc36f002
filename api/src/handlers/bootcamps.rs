use actix_web::{web, HttpResponse};
use chrono::Utc;
use classsight_middleware::{AdminUser, CurrentUser};
use classsight_models::bootcamps::{
    BootcampCreate, BootcampRow, BootcampStatus, BootcampUpdate, BootcampsList, BootcampsQuery,
};
use validator::Validate;

use crate::errors::ApiError;
use crate::repositories::{BootcampRepository, ScopeRepository};
use crate::state::AppState;
use crate::utils::Pagination;

const DATE_ORDER: &str = "Start date must be before end date";
const NAME_TAKEN: &str = "A bootcamp with this name already exists";

/// Every caller may browse bootcamps; management is admin only.
async fn list_bootcamps(
    state: web::Data<AppState>,
    _user: CurrentUser,
    query: web::Query<BootcampsQuery>,
) -> Result<HttpResponse, ApiError> {
    let pagination = Pagination::parse(query.page, query.page_size);
    let status = query.status.as_deref().and_then(BootcampStatus::parse);

    let repo = BootcampRepository::new(state.pool.clone());
    let total = repo.count(status).await?;
    let today = Utc::now().date_naive();
    let items = repo
        .list(status, &pagination)
        .await?
        .into_iter()
        .map(|record| BootcampRow::from_record(record, today))
        .collect();

    Ok(HttpResponse::Ok().json(BootcampsList {
        items,
        page: pagination.page,
        page_size: pagination.page_size,
        total: Some(total),
    }))
}

async fn create_bootcamp(
    state: web::Data<AppState>,
    admin: AdminUser,
    body: web::Json<BootcampCreate>,
) -> Result<HttpResponse, ApiError> {
    body.validate()?;
    if body.start_date >= body.end_date {
        return Err(ApiError::bad_request(DATE_ORDER));
    }

    let repo = BootcampRepository::new(state.pool.clone());
    if repo.name_taken(&body.bootcamp_name, None).await? {
        return Err(ApiError::bad_request(NAME_TAKEN));
    }

    let bootcamp_id = repo.create(&body, admin.user_id).await?;
    tracing::info!(bootcamp_id, name = %body.bootcamp_name, "bootcamp created");

    Ok(HttpResponse::Ok().json(BootcampRow {
        bootcamp_id,
        bootcamp_name: body.bootcamp_name.clone(),
        start_date: body.start_date,
        end_date: body.end_date,
        allow_multiple_instructors: body.allow_multiple_instructors,
        max_instructors: body.max_instructors,
        description: body.description.clone(),
        status: BootcampStatus::from_dates(body.start_date, body.end_date, Utc::now().date_naive()),
        student_count: 0,
        instructor_count: 0,
        unit_count: 0,
    }))
}

async fn get_bootcamp(
    state: web::Data<AppState>,
    user: CurrentUser,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let bootcamp_id = path.into_inner();
    ScopeRepository::new(state.pool.clone())
        .assert_bootcamp_scope(&user, Some(bootcamp_id))
        .await?;

    let record = BootcampRepository::new(state.pool.clone())
        .find(bootcamp_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Bootcamp not found"))?;
    Ok(HttpResponse::Ok().json(BootcampRow::from_record(record, Utc::now().date_naive())))
}

async fn update_bootcamp(
    state: web::Data<AppState>,
    _admin: AdminUser,
    path: web::Path<i32>,
    body: web::Json<BootcampUpdate>,
) -> Result<HttpResponse, ApiError> {
    let bootcamp_id = path.into_inner();
    body.validate()?;

    let repo = BootcampRepository::new(state.pool.clone());
    let existing = repo
        .find(bootcamp_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Bootcamp not found"))?;

    // Dates are checked after merging with the stored ones.
    let start = body.start_date.unwrap_or(existing.start_date);
    let end = body.end_date.unwrap_or(existing.end_date);
    if start >= end {
        return Err(ApiError::bad_request(DATE_ORDER));
    }

    if let Some(name) = &body.bootcamp_name {
        if repo.name_taken(name, Some(bootcamp_id)).await? {
            return Err(ApiError::bad_request(NAME_TAKEN));
        }
    }
    if body.is_empty() {
        return Err(ApiError::bad_request("No fields to update"));
    }

    repo.update(bootcamp_id, &body).await?;
    let updated = repo
        .find(bootcamp_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Bootcamp not found"))?;
    Ok(HttpResponse::Ok().json(BootcampRow::from_record(updated, Utc::now().date_naive())))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/bootcamps")
            .route("", web::get().to(list_bootcamps))
            .route("", web::post().to(create_bootcamp))
            .route("/{bootcamp_id}", web::get().to(get_bootcamp))
            .route("/{bootcamp_id}", web::patch().to(update_bootcamp)),
    );
}
