use chrono::{DateTime, Utc};
use classsight_models::instructors::{InstructorAssigned, InstructorRow};
use classsight_observability::log_db;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::errors::ApiError;
use crate::utils::Pagination;

#[derive(Debug, Clone, FromRow)]
pub struct BootcampCapacity {
    pub bootcamp_id: i32,
    pub bootcamp_name: String,
    pub allow_multiple_instructors: bool,
    pub max_instructors: i32,
    pub current_instructor_count: i64,
}

impl BootcampCapacity {
    /// Whether one more instructor fits.
    pub fn check(&self) -> Result<(), ApiError> {
        if !self.allow_multiple_instructors && self.current_instructor_count > 0 {
            return Err(ApiError::bad_request("This bootcamp does not allow multiple instructors"));
        }
        if self.current_instructor_count >= self.max_instructors as i64 {
            return Err(ApiError::bad_request(format!(
                "Bootcamp has reached maximum instructor limit ({})",
                self.max_instructors
            )));
        }
        Ok(())
    }
}

pub struct InstructorRepository {
    pool: PgPool,
}

impl InstructorRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn push_where(qb: &mut QueryBuilder<'_, Postgres>, status: Option<&str>) {
        qb.push(" WHERE u.role = 'instructor'");
        if let Some(status) = status {
            qb.push(" AND u.status = ").push_bind(status.to_string());
        }
    }

    pub async fn count(&self, status: Option<&str>) -> Result<i64, ApiError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users_app u");
        Self::push_where(&mut qb, status);
        Ok(qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?)
    }

    /// Pending first, then approved, then denied; newest first within a status.
    pub async fn list(&self, status: Option<&str>, pagination: &Pagination) -> Result<Vec<InstructorRow>, ApiError> {
        log_db!("SELECT", "users_app");
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT u.id AS user_id, u.email, u.full_name, u.status, u.approved_at, u.approved_by, u.created_at, \
             (SELECT COUNT(*) FROM instructor_bootcamps ib WHERE ib.instructor_id = u.id) AS bootcamp_count \
             FROM users_app u",
        );
        Self::push_where(&mut qb, status);
        qb.push(
            " ORDER BY CASE u.status WHEN 'pending' THEN 1 WHEN 'approved' THEN 2 WHEN 'denied' THEN 3 ELSE 4 END, \
             u.created_at DESC LIMIT ",
        )
        .push_bind(pagination.limit)
        .push(" OFFSET ")
        .push_bind(pagination.offset);

        Ok(qb.build_query_as::<InstructorRow>().fetch_all(&self.pool).await?)
    }

    /// Current status of an instructor account, `None` when unknown.
    pub async fn status_of(&self, user_id: Uuid) -> Result<Option<String>, ApiError> {
        let status = sqlx::query_scalar::<_, String>(
            "SELECT status FROM users_app WHERE id = $1 AND role = 'instructor'",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(status)
    }

    pub async fn approve(&self, user_id: Uuid, approved_by: Uuid) -> Result<DateTime<Utc>, ApiError> {
        log_db!("UPDATE", "users_app", user_id);
        let approved_at = sqlx::query_scalar::<_, DateTime<Utc>>(
            "UPDATE users_app SET status = 'approved', approved_at = NOW(), approved_by = $1, updated_at = NOW() \
             WHERE id = $2 RETURNING approved_at",
        )
        .bind(approved_by)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(approved_at)
    }

    pub async fn deny(&self, user_id: Uuid, denied_by: Uuid) -> Result<(), ApiError> {
        log_db!("UPDATE", "users_app", user_id);
        sqlx::query("UPDATE users_app SET status = 'denied', approved_by = $1, updated_at = NOW() WHERE id = $2")
            .bind(denied_by)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Validates and records an assignment in one transaction.
    pub async fn assign(
        &self,
        instructor_id: Uuid,
        bootcamp_id: i32,
        is_primary: bool,
        assigned_by: Uuid,
    ) -> Result<InstructorAssigned, ApiError> {
        let mut tx = self.pool.begin().await?;

        let approved = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM users_app WHERE id = $1 AND role = 'instructor' AND status = 'approved'",
        )
        .bind(instructor_id)
        .fetch_optional(&mut *tx)
        .await?;
        if approved.is_none() {
            return Err(ApiError::not_found("Approved instructor not found"));
        }

        let capacity = sqlx::query_as::<_, BootcampCapacity>(
            "SELECT b.bootcamp_id, b.bootcamp_name, b.allow_multiple_instructors, b.max_instructors, \
             (SELECT COUNT(*) FROM instructor_bootcamps ib WHERE ib.bootcamp_id = b.bootcamp_id) AS current_instructor_count \
             FROM bootcamps b WHERE b.bootcamp_id = $1 FOR UPDATE",
        )
        .bind(bootcamp_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ApiError::not_found("Bootcamp not found"))?;

        let existing = sqlx::query_scalar::<_, i32>(
            "SELECT 1 FROM instructor_bootcamps WHERE instructor_id = $1 AND bootcamp_id = $2",
        )
        .bind(instructor_id)
        .bind(bootcamp_id)
        .fetch_optional(&mut *tx)
        .await?;
        if existing.is_some() {
            return Err(ApiError::bad_request("Instructor is already assigned to this bootcamp"));
        }

        capacity.check()?;

        if is_primary {
            sqlx::query("UPDATE instructor_bootcamps SET is_primary = FALSE WHERE bootcamp_id = $1")
                .bind(bootcamp_id)
                .execute(&mut *tx)
                .await?;
        }

        log_db!("INSERT", "instructor_bootcamps", instructor_id);
        let assigned_at = sqlx::query_scalar::<_, DateTime<Utc>>(
            "INSERT INTO instructor_bootcamps (instructor_id, bootcamp_id, is_primary, assigned_at, assigned_by) \
             VALUES ($1, $2, $3, NOW(), $4) RETURNING assigned_at",
        )
        .bind(instructor_id)
        .bind(bootcamp_id)
        .bind(is_primary)
        .bind(assigned_by)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(InstructorAssigned {
            instructor_id,
            bootcamp_id,
            bootcamp_name: capacity.bootcamp_name,
            is_primary,
            assigned_at,
            message: "Instructor assigned successfully".to_string(),
        })
    }

    /// Returns false when there was no such assignment.
    pub async fn unassign(&self, instructor_id: Uuid, bootcamp_id: i32) -> Result<bool, ApiError> {
        log_db!("DELETE", "instructor_bootcamps", instructor_id);
        let result = sqlx::query("DELETE FROM instructor_bootcamps WHERE instructor_id = $1 AND bootcamp_id = $2")
            .bind(instructor_id)
            .bind(bootcamp_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capacity(allow_multiple: bool, max: i32, current: i64) -> BootcampCapacity {
        BootcampCapacity {
            bootcamp_id: 1,
            bootcamp_name: "Data Science".to_string(),
            allow_multiple_instructors: allow_multiple,
            max_instructors: max,
            current_instructor_count: current,
        }
    }

    #[test]
    fn single_instructor_bootcamp_refuses_second() {
        assert!(capacity(false, 5, 0).check().is_ok());
        let err = capacity(false, 5, 1).check().unwrap_err();
        assert_eq!(err.to_string(), "This bootcamp does not allow multiple instructors");
    }

    #[test]
    fn max_instructors_is_enforced() {
        assert!(capacity(true, 3, 2).check().is_ok());
        let err = capacity(true, 3, 3).check().unwrap_err();
        assert_eq!(err.to_string(), "Bootcamp has reached maximum instructor limit (3)");
    }
}
