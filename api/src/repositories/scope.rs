//! Bootcamp visibility: admins see everything, instructors only their assignments.

use classsight_models::UserContext;
use classsight_observability::log_security;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::ApiError;

/// Bootcamps a query may touch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootcampScope {
    All,
    Only(Vec<i32>),
    /// Instructor without assignments; callers answer with an empty result.
    Nothing,
}

impl BootcampScope {
    pub fn ids(&self) -> Option<&[i32]> {
        match self {
            BootcampScope::Only(ids) => Some(ids),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, BootcampScope::Nothing)
    }
}

/// Scope for an optional single bootcamp.
pub fn scope_from(user: &UserContext, bootcamp_id: Option<i32>, assigned: Option<&[i32]>) -> BootcampScope {
    match (bootcamp_id, user.is_admin()) {
        (Some(id), _) => BootcampScope::Only(vec![id]),
        (None, true) => BootcampScope::All,
        (None, false) => match assigned {
            Some(ids) if !ids.is_empty() => BootcampScope::Only(ids.to_vec()),
            _ => BootcampScope::Nothing,
        },
    }
}

/// Scope for a requested id list. Instructors may only name assigned bootcamps.
pub fn scope_from_list(user: &UserContext, requested: &[i32], assigned: Option<&[i32]>) -> Result<BootcampScope, ApiError> {
    if user.is_admin() {
        return Ok(if requested.is_empty() {
            BootcampScope::All
        } else {
            BootcampScope::Only(requested.to_vec())
        });
    }

    let assigned = assigned.unwrap_or(&[]);
    if let Some(denied) = requested.iter().find(|id| !assigned.contains(id)) {
        return Err(ApiError::forbidden(format!("Access denied to bootcamp {}", denied)));
    }

    let ids = if requested.is_empty() { assigned.to_vec() } else { requested.to_vec() };
    Ok(if ids.is_empty() { BootcampScope::Nothing } else { BootcampScope::Only(ids) })
}

pub struct ScopeRepository {
    pool: PgPool,
}

impl ScopeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn instructor_bootcamp_ids(&self, instructor_id: Uuid) -> Result<Vec<i32>, ApiError> {
        let ids = sqlx::query_scalar::<_, i32>(
            "SELECT bootcamp_id FROM instructor_bootcamps WHERE instructor_id = $1 ORDER BY bootcamp_id",
        )
        .bind(instructor_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    pub async fn assert_bootcamp_scope(&self, user: &UserContext, bootcamp_id: Option<i32>) -> Result<(), ApiError> {
        let Some(bootcamp_id) = bootcamp_id else { return Ok(()) };
        if user.is_admin() {
            return Ok(());
        }

        let assigned = sqlx::query_scalar::<_, i32>(
            "SELECT 1 FROM instructor_bootcamps WHERE instructor_id = $1 AND bootcamp_id = $2",
        )
        .bind(user.user_id)
        .bind(bootcamp_id)
        .fetch_optional(&self.pool)
        .await?;

        if assigned.is_none() {
            log_security!("bootcamp_denied", user_id = user.user_id, bootcamp_id = bootcamp_id);
            return Err(ApiError::forbidden(format!("Access denied to bootcamp {}", bootcamp_id)));
        }
        Ok(())
    }

    /// Checks access to an explicit bootcamp, or narrows an instructor to their assignments.
    pub async fn resolve_bootcamp_filter(&self, user: &UserContext, bootcamp_id: Option<i32>) -> Result<BootcampScope, ApiError> {
        if user.is_admin() {
            return Ok(scope_from(user, bootcamp_id, None));
        }
        if bootcamp_id.is_some() {
            self.assert_bootcamp_scope(user, bootcamp_id).await?;
            return Ok(scope_from(user, bootcamp_id, None));
        }
        let assigned = self.instructor_bootcamp_ids(user.user_id).await?;
        Ok(scope_from(user, None, Some(&assigned)))
    }

    pub async fn resolve_bootcamp_list(&self, user: &UserContext, requested: &[i32]) -> Result<BootcampScope, ApiError> {
        if user.is_admin() {
            return scope_from_list(user, requested, None);
        }
        let assigned = self.instructor_bootcamp_ids(user.user_id).await?;
        scope_from_list(user, requested, Some(&assigned)).map_err(|e| {
            log_security!("bootcamp_denied", user_id = user.user_id, requested = requested);
            e
        })
    }
}
