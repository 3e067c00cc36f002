use classsight_models::bootcamps::{BootcampCreate, BootcampRecord, BootcampStatus, BootcampUpdate, MyBootcampRecord};
use classsight_observability::log_db;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::errors::ApiError;
use crate::utils::Pagination;

const BOOTCAMP_SELECT: &str = "SELECT b.bootcamp_id, b.bootcamp_name, b.start_date, b.end_date, \
    b.allow_multiple_instructors, b.max_instructors, b.description, \
    (SELECT COUNT(*) FROM students s WHERE s.bootcamp_id = b.bootcamp_id) AS student_count, \
    (SELECT COUNT(*) FROM instructor_bootcamps ib WHERE ib.bootcamp_id = b.bootcamp_id) AS instructor_count, \
    (SELECT COUNT(*) FROM units u WHERE u.bootcamp_id = b.bootcamp_id) AS unit_count \
    FROM bootcamps b";

fn push_status(qb: &mut QueryBuilder<'_, Postgres>, status: Option<BootcampStatus>) {
    qb.push(" WHERE TRUE");
    match status {
        Some(BootcampStatus::Upcoming) => qb.push(" AND CURRENT_DATE < b.start_date"),
        Some(BootcampStatus::Active) => qb.push(" AND CURRENT_DATE BETWEEN b.start_date AND b.end_date"),
        Some(BootcampStatus::Completed) => qb.push(" AND CURRENT_DATE > b.end_date"),
        None => qb,
    };
}

pub struct BootcampRepository {
    pool: PgPool,
}

impl BootcampRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn count(&self, status: Option<BootcampStatus>) -> Result<i64, ApiError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM bootcamps b");
        push_status(&mut qb, status);
        Ok(qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?)
    }

    pub async fn list(&self, status: Option<BootcampStatus>, pagination: &Pagination) -> Result<Vec<BootcampRecord>, ApiError> {
        log_db!("SELECT", "bootcamps");
        let mut qb = QueryBuilder::<Postgres>::new(BOOTCAMP_SELECT);
        push_status(&mut qb, status);
        qb.push(" ORDER BY b.start_date DESC, b.bootcamp_name LIMIT ")
            .push_bind(pagination.limit)
            .push(" OFFSET ")
            .push_bind(pagination.offset);
        Ok(qb.build_query_as::<BootcampRecord>().fetch_all(&self.pool).await?)
    }

    pub async fn find(&self, bootcamp_id: i32) -> Result<Option<BootcampRecord>, ApiError> {
        let record = sqlx::query_as::<_, BootcampRecord>(&format!("{} WHERE b.bootcamp_id = $1", BOOTCAMP_SELECT))
            .bind(bootcamp_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    /// Whether another bootcamp already uses `name`.
    pub async fn name_taken(&self, name: &str, except: Option<i32>) -> Result<bool, ApiError> {
        let taken = sqlx::query_scalar::<_, i32>(
            "SELECT 1 FROM bootcamps WHERE bootcamp_name = $1 AND ($2::int IS NULL OR bootcamp_id <> $2)",
        )
        .bind(name)
        .bind(except)
        .fetch_optional(&self.pool)
        .await?;
        Ok(taken.is_some())
    }

    pub async fn create(&self, data: &BootcampCreate, created_by: Uuid) -> Result<i32, ApiError> {
        log_db!("INSERT", "bootcamps");
        let id = sqlx::query_scalar::<_, i32>(
            "INSERT INTO bootcamps (bootcamp_name, start_date, end_date, allow_multiple_instructors, \
             max_instructors, description, created_by, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, NOW()) \
             RETURNING bootcamp_id",
        )
        .bind(&data.bootcamp_name)
        .bind(data.start_date)
        .bind(data.end_date)
        .bind(data.allow_multiple_instructors)
        .bind(data.max_instructors)
        .bind(&data.description)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    /// Applies the set fields of `data`; callers reject empty updates first.
    pub async fn update(&self, bootcamp_id: i32, data: &BootcampUpdate) -> Result<(), ApiError> {
        log_db!("UPDATE", "bootcamps", bootcamp_id);
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE bootcamps SET ");
        let mut sets = qb.separated(", ");
        if let Some(name) = &data.bootcamp_name {
            sets.push("bootcamp_name = ").push_bind_unseparated(name.clone());
        }
        if let Some(start) = data.start_date {
            sets.push("start_date = ").push_bind_unseparated(start);
        }
        if let Some(end) = data.end_date {
            sets.push("end_date = ").push_bind_unseparated(end);
        }
        if let Some(allow) = data.allow_multiple_instructors {
            sets.push("allow_multiple_instructors = ").push_bind_unseparated(allow);
        }
        if let Some(max) = data.max_instructors {
            sets.push("max_instructors = ").push_bind_unseparated(max);
        }
        if let Some(description) = &data.description {
            sets.push("description = ").push_bind_unseparated(description.clone());
        }
        qb.push(" WHERE bootcamp_id = ").push_bind(bootcamp_id);

        qb.build().execute(&self.pool).await?;
        Ok(())
    }

    /// Assignments of one instructor with counts and 30-day averages, primary first.
    pub async fn assigned_to(&self, instructor_id: Uuid) -> Result<Vec<MyBootcampRecord>, ApiError> {
        log_db!("SELECT", "instructor_bootcamps", instructor_id);
        let rows = sqlx::query_as::<_, MyBootcampRecord>(
            "SELECT b.bootcamp_id, b.bootcamp_name, b.start_date, b.end_date, ib.is_primary, \
             (SELECT COUNT(*) FROM students s WHERE s.bootcamp_id = b.bootcamp_id) AS student_count, \
             (SELECT COUNT(*) FROM units u WHERE u.bootcamp_id = b.bootcamp_id) AS unit_count, \
             (SELECT COUNT(a.assessment_id) FROM assessments a JOIN units u ON a.unit_id = u.unit_id \
                WHERE u.bootcamp_id = b.bootcamp_id) AS assessment_count, \
             COALESCE(recent.avg_attendance, 0)::float8 AS avg_attendance, \
             COALESCE(recent.avg_attention, 0)::float8 AS avg_attention \
             FROM instructor_bootcamps ib \
             JOIN bootcamps b ON ib.bootcamp_id = b.bootcamp_id \
             LEFT JOIN ( \
                SELECT bootcamp_id, AVG(attendance_pct) AS avg_attendance, AVG(avg_attention_rate) AS avg_attention \
                FROM class_samples \
                WHERE date >= CURRENT_DATE - INTERVAL '30 days' \
                GROUP BY bootcamp_id \
             ) recent ON recent.bootcamp_id = b.bootcamp_id \
             WHERE ib.instructor_id = $1 \
             ORDER BY ib.is_primary DESC, b.start_date DESC",
        )
        .bind(instructor_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
