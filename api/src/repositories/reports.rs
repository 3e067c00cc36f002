use chrono::{DateTime, NaiveDate, Utc};
use classsight_models::reports::{ReportGenerate, ReportRow};
use classsight_observability::log_db;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{push_scope, BootcampScope};
use crate::errors::ApiError;
use crate::utils::Pagination;

#[derive(Debug, Clone, Default)]
pub struct ReportFilters {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub status: Option<String>,
    pub format: Option<String>,
}

pub struct ReportRepository {
    pool: PgPool,
}

impl ReportRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, scope: &BootcampScope, filters: &ReportFilters) {
        qb.push(" WHERE TRUE");
        push_scope(qb, "r.bootcamp_id", scope);
        if let Some(start) = filters.start {
            qb.push(" AND r.report_date >= ").push_bind(start);
        }
        if let Some(end) = filters.end {
            qb.push(" AND r.report_date <= ").push_bind(end);
        }
        if let Some(status) = &filters.status {
            qb.push(" AND r.status = ").push_bind(status.clone());
        }
        if let Some(format) = &filters.format {
            qb.push(" AND r.format = ").push_bind(format.clone());
        }
    }

    pub async fn count(&self, scope: &BootcampScope, filters: &ReportFilters) -> Result<i64, ApiError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM reports r");
        Self::push_filters(&mut qb, scope, filters);
        Ok(qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?)
    }

    pub async fn list(
        &self,
        scope: &BootcampScope,
        filters: &ReportFilters,
        pagination: &Pagination,
    ) -> Result<Vec<ReportRow>, ApiError> {
        log_db!("SELECT", "reports");
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT r.id, r.title, r.report_date, r.status, r.format, r.storage_path, \
             r.bootcamp_id, b.bootcamp_name, r.created_at \
             FROM reports r LEFT JOIN bootcamps b ON r.bootcamp_id = b.bootcamp_id",
        );
        Self::push_filters(&mut qb, scope, filters);
        qb.push(" ORDER BY r.created_at DESC LIMIT ")
            .push_bind(pagination.limit)
            .push(" OFFSET ")
            .push_bind(pagination.offset);

        Ok(qb.build_query_as::<ReportRow>().fetch_all(&self.pool).await?)
    }

    /// Records a report job in the `generating` state.
    pub async fn create(&self, report: &ReportGenerate) -> Result<(Uuid, DateTime<Utc>), ApiError> {
        log_db!("INSERT", "reports");
        let row = sqlx::query_as::<_, (Uuid, DateTime<Utc>)>(
            "INSERT INTO reports (title, report_date, status, format, bootcamp_id, date_range_start, date_range_end) \
             VALUES ($1, $2, 'generating', $3, $4, $5, $6) \
             RETURNING id, created_at",
        )
        .bind(&report.title)
        .bind(report.end_date)
        .bind(report.format.as_str())
        .bind(report.bootcamp_id)
        .bind(report.start_date)
        .bind(report.end_date)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }
}
