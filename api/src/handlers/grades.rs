use std::collections::BTreeMap;

use actix_web::{web, HttpResponse};
use classsight_middleware::CurrentUser;
use classsight_models::grades::{GradePatch, GradeUpdated, GradesList, GradesQuery};
use classsight_observability::log_security;
use validator::Validate;

use crate::errors::ApiError;
use crate::repositories::grades::GradeFilters;
use crate::repositories::{GradeRepository, ScopeRepository};
use crate::services::analytics::round1;
use crate::state::AppState;
use crate::utils::Pagination;

async fn list_grades(
    state: web::Data<AppState>,
    user: CurrentUser,
    query: web::Query<GradesQuery>,
) -> Result<HttpResponse, ApiError> {
    let pagination = Pagination::parse(query.page, query.page_size);
    let scope = ScopeRepository::new(state.pool.clone())
        .resolve_bootcamp_filter(&user, query.bootcamp_id)
        .await?;

    if scope.is_empty() {
        return Ok(HttpResponse::Ok().json(GradesList {
            items: Vec::new(),
            page: pagination.page,
            page_size: pagination.page_size,
            total: Some(0),
            stats: BTreeMap::new(),
        }));
    }

    let repo = GradeRepository::new(state.pool.clone());
    let filters = GradeFilters {
        top: query.top.unwrap_or(false),
        worst: query.worst.unwrap_or(false),
        min_avg: query.min_avg,
    };

    // Stats describe the whole scope, before top/worst/min_avg narrow it.
    let stats = repo.stats(&scope, query.unit_id).await?;
    let total = repo.count(&scope, query.unit_id, filters).await?;
    let items = repo.list(&scope, query.unit_id, filters, &pagination).await?;

    Ok(HttpResponse::Ok().json(GradesList {
        items,
        page: pagination.page,
        page_size: pagination.page_size,
        total: Some(total),
        stats,
    }))
}

async fn update_grade(
    state: web::Data<AppState>,
    user: CurrentUser,
    path: web::Path<i32>,
    body: web::Json<GradePatch>,
) -> Result<HttpResponse, ApiError> {
    let grade_id = path.into_inner();
    if user.is_admin() {
        log_security!("grade_update_denied", user_id = user.user_id, grade_id = grade_id);
        return Err(ApiError::forbidden("Administrators have view-only access to grades"));
    }
    body.validate()?;

    let repo = GradeRepository::new(state.pool.clone());
    let target = repo
        .find_target(grade_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Grade not found"))?;

    ScopeRepository::new(state.pool.clone())
        .assert_bootcamp_scope(&user, Some(target.bootcamp_id))
        .await?;

    if body.score > target.max_score {
        return Err(ApiError::bad_request(format!(
            "Score cannot exceed maximum score of {}",
            target.max_score
        )));
    }

    let score = repo.update_score(grade_id, body.score).await?;
    tracing::info!(grade_id, score, user_id = %user.user_id, "grade updated");

    Ok(HttpResponse::Ok().json(GradeUpdated {
        grade_id,
        score,
        max_score: target.max_score,
        percentage: percentage(score, target.max_score),
        message: "Grade updated successfully".to_string(),
    }))
}

fn percentage(score: i32, max_score: i32) -> f64 {
    if max_score <= 0 {
        return 0.0;
    }
    round1(score as f64 / max_score as f64 * 100.0)
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/grades")
            .route("", web::get().to(list_grades))
            .route("/{grade_id}", web::patch().to(update_grade)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_is_rounded() {
        assert_eq!(percentage(17, 20), 85.0);
        assert_eq!(percentage(2, 3), 66.7);
        assert_eq!(percentage(5, 0), 0.0);
    }
}
