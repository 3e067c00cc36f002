//! Instructor approval and bootcamp assignment, admin only.

use actix_web::{web, HttpResponse};
use classsight_middleware::AdminUser;
use classsight_models::instructors::{
    AssignmentBody, AssignmentRemoved, InstructorApproval, InstructorApproved, InstructorDenied, InstructorsList,
    InstructorsQuery,
};
use uuid::Uuid;

use crate::errors::ApiError;
use crate::repositories::InstructorRepository;
use crate::state::AppState;
use crate::utils::Pagination;

const NOT_FOUND: &str = "Instructor not found";

async fn list_instructors(
    state: web::Data<AppState>,
    _admin: AdminUser,
    query: web::Query<InstructorsQuery>,
) -> Result<HttpResponse, ApiError> {
    let pagination = Pagination::parse(query.page, query.page_size);
    let status = query.status.as_deref();

    let repo = InstructorRepository::new(state.pool.clone());
    let total = repo.count(status).await?;
    let items = repo.list(status, &pagination).await?;

    Ok(HttpResponse::Ok().json(InstructorsList {
        items,
        page: pagination.page,
        page_size: pagination.page_size,
        total: Some(total),
    }))
}

async fn approve_instructor(
    state: web::Data<AppState>,
    admin: AdminUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let user_id = path.into_inner();
    let repo = InstructorRepository::new(state.pool.clone());

    match repo.status_of(user_id).await?.as_deref() {
        None => return Err(ApiError::not_found(NOT_FOUND)),
        Some("approved") => return Err(ApiError::bad_request("Instructor is already approved")),
        Some(_) => {}
    }

    let approved_at = repo.approve(user_id, admin.user_id).await?;
    tracing::info!(instructor_id = %user_id, approved_by = %admin.user_id, "instructor approved");

    Ok(HttpResponse::Ok().json(InstructorApproved {
        user_id,
        status: "approved".to_string(),
        approved_at,
        approved_by: admin.user_id,
        message: "Instructor approved successfully".to_string(),
    }))
}

async fn reject_instructor(
    state: web::Data<AppState>,
    admin: AdminUser,
    path: web::Path<Uuid>,
    body: web::Json<InstructorApproval>,
) -> Result<HttpResponse, ApiError> {
    let user_id = path.into_inner();
    let repo = InstructorRepository::new(state.pool.clone());

    match repo.status_of(user_id).await?.as_deref() {
        None => return Err(ApiError::not_found(NOT_FOUND)),
        Some("denied") => return Err(ApiError::bad_request("Instructor is already denied")),
        Some(_) => {}
    }

    repo.deny(user_id, admin.user_id).await?;
    tracing::info!(instructor_id = %user_id, denied_by = %admin.user_id, "instructor denied");

    Ok(HttpResponse::Ok().json(InstructorDenied {
        user_id,
        status: "denied".to_string(),
        denied_by: admin.user_id,
        reason: body.into_inner().reason,
        message: "Instructor denied successfully".to_string(),
    }))
}

async fn assign_instructor(
    state: web::Data<AppState>,
    admin: AdminUser,
    path: web::Path<Uuid>,
    body: web::Json<AssignmentBody>,
) -> Result<HttpResponse, ApiError> {
    let instructor_id = path.into_inner();
    let assigned = InstructorRepository::new(state.pool.clone())
        .assign(instructor_id, body.bootcamp_id, body.is_primary.unwrap_or(false), admin.user_id)
        .await?;
    tracing::info!(
        instructor_id = %instructor_id,
        bootcamp_id = body.bootcamp_id,
        is_primary = assigned.is_primary,
        "instructor assigned"
    );
    Ok(HttpResponse::Ok().json(assigned))
}

async fn remove_assignment(
    state: web::Data<AppState>,
    _admin: AdminUser,
    path: web::Path<(Uuid, i32)>,
) -> Result<HttpResponse, ApiError> {
    let (instructor_id, bootcamp_id) = path.into_inner();
    let removed = InstructorRepository::new(state.pool.clone())
        .unassign(instructor_id, bootcamp_id)
        .await?;
    if !removed {
        return Err(ApiError::not_found("Assignment not found"));
    }

    Ok(HttpResponse::Ok().json(AssignmentRemoved {
        instructor_id,
        bootcamp_id,
        message: "Assignment removed successfully".to_string(),
    }))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin/instructors")
            .route("", web::get().to(list_instructors))
            .route("/{user_id}/approve", web::post().to(approve_instructor))
            .route("/{user_id}/reject", web::post().to(reject_instructor))
            .route("/{user_id}/assign", web::post().to(assign_instructor))
            .route("/{user_id}/assignments/{bootcamp_id}", web::delete().to(remove_assignment)),
    );
}
