use std::collections::BTreeMap;

use classsight_models::grades::GradeRow;
use classsight_observability::log_db;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};

use super::{push_scope, BootcampScope};
use crate::errors::ApiError;
use crate::services::analytics::round1;
use crate::utils::Pagination;

const PERCENTAGE: &str = "(g.score::float8 / NULLIF(a.max_score, 0) * 100)";

const GRADE_JOINS: &str = " FROM grades g \
    JOIN assessments a ON g.assessment_id = a.assessment_id \
    JOIN students s ON g.student_id = s.student_id \
    JOIN units u ON a.unit_id = u.unit_id \
    JOIN bootcamps b ON u.bootcamp_id = b.bootcamp_id \
    WHERE TRUE";

/// Row-level filters applied after the stats are taken.
#[derive(Debug, Clone, Copy, Default)]
pub struct GradeFilters {
    pub top: bool,
    pub worst: bool,
    pub min_avg: Option<f64>,
}

#[derive(Debug, FromRow)]
struct StatsRecord {
    avg: Option<f64>,
    min: Option<f64>,
    max: Option<f64>,
    count: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct GradeTarget {
    pub grade_id: i32,
    pub max_score: i32,
    pub bootcamp_id: i32,
}

pub struct GradeRepository {
    pool: PgPool,
}

impl GradeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn push_base(qb: &mut QueryBuilder<'_, Postgres>, scope: &BootcampScope, unit_id: Option<i32>) {
        qb.push(GRADE_JOINS);
        push_scope(qb, "b.bootcamp_id", scope);
        if let Some(unit_id) = unit_id {
            qb.push(" AND u.unit_id = ").push_bind(unit_id);
        }
    }

    fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filters: GradeFilters) {
        if filters.top {
            qb.push(format!(" AND {} >= ", PERCENTAGE)).push_bind(75.0_f64);
        } else if filters.worst {
            qb.push(format!(" AND {} <= ", PERCENTAGE)).push_bind(25.0_f64);
        }
        if let Some(min_avg) = filters.min_avg {
            qb.push(format!(" AND {} >= ", PERCENTAGE)).push_bind(min_avg);
        }
    }

    /// avg / min / max percentage and count over the scope, ignoring row filters.
    pub async fn stats(&self, scope: &BootcampScope, unit_id: Option<i32>) -> Result<BTreeMap<String, f64>, ApiError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT AVG({p}) AS avg, MIN({p}) AS min, MAX({p}) AS max, COUNT(*) AS count",
            p = PERCENTAGE
        ));
        Self::push_base(&mut qb, scope, unit_id);

        let record = qb.build_query_as::<StatsRecord>().fetch_one(&self.pool).await?;
        let mut stats = BTreeMap::new();
        stats.insert("avg".to_string(), round1(record.avg.unwrap_or(0.0)));
        stats.insert("min".to_string(), round1(record.min.unwrap_or(0.0)));
        stats.insert("max".to_string(), round1(record.max.unwrap_or(0.0)));
        stats.insert("count".to_string(), record.count as f64);
        Ok(stats)
    }

    pub async fn count(&self, scope: &BootcampScope, unit_id: Option<i32>, filters: GradeFilters) -> Result<i64, ApiError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*)");
        Self::push_base(&mut qb, scope, unit_id);
        Self::push_filters(&mut qb, filters);
        Ok(qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?)
    }

    pub async fn list(
        &self,
        scope: &BootcampScope,
        unit_id: Option<i32>,
        filters: GradeFilters,
        pagination: &Pagination,
    ) -> Result<Vec<GradeRow>, ApiError> {
        log_db!("SELECT", "grades");
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT g.grade_id, g.student_id, s.full_name AS student_name, g.assessment_id, \
             a.title AS assessment_title, u.unit_id, u.unit_title AS unit_name, g.score, a.max_score, \
             a.weight::float8 AS weight, a.due_date, b.bootcamp_id, b.bootcamp_name, \
             g.created_at AS submitted_at",
        );
        Self::push_base(&mut qb, scope, unit_id);
        Self::push_filters(&mut qb, filters);
        qb.push(" ORDER BY g.created_at DESC, g.grade_id DESC LIMIT ")
            .push_bind(pagination.limit)
            .push(" OFFSET ")
            .push_bind(pagination.offset);

        Ok(qb.build_query_as::<GradeRow>().fetch_all(&self.pool).await?)
    }

    pub async fn find_target(&self, grade_id: i32) -> Result<Option<GradeTarget>, ApiError> {
        let target = sqlx::query_as::<_, GradeTarget>(
            "SELECT g.grade_id, a.max_score, u.bootcamp_id \
             FROM grades g \
             JOIN assessments a ON g.assessment_id = a.assessment_id \
             JOIN units u ON a.unit_id = u.unit_id \
             WHERE g.grade_id = $1",
        )
        .bind(grade_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(target)
    }

    pub async fn update_score(&self, grade_id: i32, score: i32) -> Result<i32, ApiError> {
        log_db!("UPDATE", "grades", grade_id);
        let score = sqlx::query_scalar::<_, i32>("UPDATE grades SET score = $1 WHERE grade_id = $2 RETURNING score")
            .bind(score)
            .bind(grade_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_filters_guard_zero_max_score() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT g.grade_id");
        GradeRepository::push_base(&mut qb, &BootcampScope::Only(vec![3]), Some(9));
        GradeRepository::push_filters(&mut qb, GradeFilters { top: true, worst: false, min_avg: Some(60.0) });

        let sql = qb.sql();
        assert_eq!(sql.matches("NULLIF(a.max_score, 0)").count(), 2);
        assert!(!sql.contains("/ a.max_score"));
        assert!(sql.contains("b.bootcamp_id = ANY("));
    }
}
