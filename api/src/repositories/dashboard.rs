use chrono::{DateTime, NaiveDate, Utc};
use classsight_models::dashboard::{
    BootcampOption, CorrelationEntry, CorrelationPoint, HeatmapCell, InstructorPerformance, LeaderboardEntry,
    SeriesPoint, Significance, UnitPerformance,
};
use classsight_models::bootcamps::BootcampStatus;
use classsight_observability::log_db;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{push_scope, BootcampScope};
use crate::errors::ApiError;
use crate::services::analytics::{round1, round2, round_to};

/// Per-sample metric columns of `class_samples`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleMetric {
    Attention,
    Attendance,
}

impl SampleMetric {
    fn column(&self) -> &'static str {
        match self {
            SampleMetric::Attention => "avg_attention_rate",
            SampleMetric::Attendance => "attendance_pct",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaderboardKind {
    Students,
    Instructors,
}

impl LeaderboardKind {
    // (jsonb array column, id key inside each element)
    fn source(&self) -> (&'static str, &'static str) {
        match self {
            LeaderboardKind::Students => ("top_students", "student_id"),
            LeaderboardKind::Instructors => ("top_instructors", "instructor_id"),
        }
    }
}

#[derive(Debug, Clone, Default, FromRow)]
pub struct PeriodStats {
    pub avg_attention: Option<f64>,
    pub avg_attendance: Option<f64>,
    pub total_sessions: i64,
}

#[derive(Debug, FromRow)]
struct LeaderboardRecord {
    id: Option<String>,
    name: Option<String>,
    value: Option<f64>,
    rank: i64,
}

#[derive(Debug, FromRow)]
struct ScatterRecord {
    bootcamp_name: String,
    day: NaiveDate,
    attendance: f64,
    attention: f64,
    samples: i64,
}

#[derive(Debug, FromRow)]
struct CorrelationRecord {
    attendance_attention: Option<f64>,
    attendance_attention_n: i64,
    attendance_grade: Option<f64>,
    attendance_grade_n: i64,
    attention_grade: Option<f64>,
    attention_grade_n: i64,
}

#[derive(Debug, FromRow)]
struct OptionRecord {
    bootcamp_id: i32,
    bootcamp_name: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
}

// Daily attendance, attention and grade averages per bootcamp.
const DAILY_METRICS_CTE: &str = "WITH daily AS (
        SELECT cs.bootcamp_id, cs.date AS day,
               AVG(cs.attendance_pct)::float8 AS attendance,
               AVG(cs.avg_attention_rate)::float8 AS attention,
               COUNT(*) AS samples
        FROM class_samples cs
        WHERE cs.date >= ";

pub struct DashboardRepository {
    pool: PgPool,
}

impl DashboardRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn period_stats(&self, scope: &BootcampScope, start: NaiveDate, end: NaiveDate) -> Result<PeriodStats, ApiError> {
        log_db!("SELECT", "class_samples");
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT AVG(avg_attention_rate)::float8 AS avg_attention, \
             AVG(attendance_pct)::float8 AS avg_attendance, \
             COUNT(DISTINCT date) AS total_sessions \
             FROM class_samples WHERE date BETWEEN ",
        );
        qb.push_bind(start).push(" AND ").push_bind(end);
        push_scope(&mut qb, "bootcamp_id", scope);

        Ok(qb.build_query_as::<PeriodStats>().fetch_one(&self.pool).await?)
    }

    /// Highest daily average attention in the range.
    pub async fn best_day_score(&self, scope: &BootcampScope, start: NaiveDate, end: NaiveDate) -> Result<Option<f64>, ApiError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT AVG(avg_attention_rate)::float8 AS score FROM class_samples WHERE date BETWEEN ",
        );
        qb.push_bind(start).push(" AND ").push_bind(end);
        push_scope(&mut qb, "bootcamp_id", scope);
        qb.push(" GROUP BY date HAVING AVG(avg_attention_rate) IS NOT NULL ORDER BY score DESC LIMIT 1");

        let score = qb.build_query_scalar::<f64>().fetch_optional(&self.pool).await?;
        Ok(score.map(round1))
    }

    /// `bucket` must be a `date_trunc` unit from `granularity_to_bucket`.
    pub async fn series(
        &self,
        scope: &BootcampScope,
        start: NaiveDate,
        end: NaiveDate,
        bucket: &str,
        metric: SampleMetric,
    ) -> Result<Vec<SeriesPoint>, ApiError> {
        let column = metric.column();
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT DATE_TRUNC('{bucket}', bucket_at)::timestamptz AS t, AVG({column})::float8 AS v \
             FROM class_samples WHERE date BETWEEN "
        ));
        qb.push_bind(start).push(" AND ").push_bind(end);
        push_scope(&mut qb, "bootcamp_id", scope);
        qb.push(format!(" GROUP BY 1 HAVING AVG({column}) IS NOT NULL ORDER BY 1"));

        let rows = qb.build_query_as::<(DateTime<Utc>, f64)>().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|(t, v)| SeriesPoint { t, v: round2(v) }).collect())
    }

    /// Top entries of the weekly leaderboards whose week starts in the range.
    pub async fn leaderboard(
        &self,
        scope: &BootcampScope,
        start: NaiveDate,
        end: NaiveDate,
        kind: LeaderboardKind,
        limit: i64,
    ) -> Result<Vec<LeaderboardEntry>, ApiError> {
        log_db!("SELECT", "leaderboards_weekly");
        let (column, id_key) = kind.source();
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT COALESCE(entry->>'{id_key}', entry->>'id') AS id, entry->>'name' AS name, \
             (entry->>'score')::float8 AS value, \
             ROW_NUMBER() OVER (ORDER BY (entry->>'score')::float8 DESC NULLS LAST) AS rank \
             FROM leaderboards_weekly lw, jsonb_array_elements(lw.{column}) AS entry \
             WHERE lw.week_start >= "
        ));
        qb.push_bind(start).push(" AND lw.week_start <= ").push_bind(end);
        push_scope(&mut qb, "lw.bootcamp_id", scope);
        qb.push(" ORDER BY value DESC NULLS LAST LIMIT ").push_bind(limit);

        let rows = qb.build_query_as::<LeaderboardRecord>().fetch_all(&self.pool).await?;
        Ok(rows
            .into_iter()
            .map(|r| LeaderboardEntry {
                id: r.id.unwrap_or_default(),
                name: r.name.unwrap_or_default(),
                value: round1(r.value.unwrap_or(0.0)),
                rank: Some(r.rank),
            })
            .collect())
    }

    pub async fn total_students(&self, scope: &BootcampScope) -> Result<i64, ApiError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM students WHERE TRUE");
        push_scope(&mut qb, "bootcamp_id", scope);
        Ok(qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?)
    }

    /// Every grade in scope as a percentage of its assessment's max score.
    pub async fn grade_percentages(&self, scope: &BootcampScope) -> Result<Vec<f64>, ApiError> {
        log_db!("SELECT", "grades");
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT g.score::float8 / a.max_score * 100 \
             FROM grades g \
             JOIN assessments a ON g.assessment_id = a.assessment_id \
             JOIN units u ON a.unit_id = u.unit_id \
             WHERE a.max_score > 0",
        );
        push_scope(&mut qb, "u.bootcamp_id", scope);
        Ok(qb.build_query_scalar::<f64>().fetch_all(&self.pool).await?)
    }

    /// Average grade percentage per unit, units without grades included.
    pub async fn unit_performance(&self, scope: &BootcampScope, since: Option<NaiveDate>) -> Result<Vec<UnitPerformance>, ApiError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT u.unit_id, u.unit_title AS unit_name, b.bootcamp_id, b.bootcamp_name, \
             COALESCE(AVG(g.score::float8 / NULLIF(a.max_score, 0) * 100), 0)::float8 AS avg_percentage, \
             COUNT(g.grade_id) AS grade_count \
             FROM units u \
             JOIN bootcamps b ON u.bootcamp_id = b.bootcamp_id \
             LEFT JOIN assessments a ON a.unit_id = u.unit_id \
             LEFT JOIN grades g ON g.assessment_id = a.assessment_id",
        );
        if let Some(since) = since {
            qb.push(" AND g.created_at >= ").push_bind(since);
        }
        qb.push(" WHERE TRUE");
        push_scope(&mut qb, "u.bootcamp_id", scope);
        qb.push(" GROUP BY u.unit_id, u.unit_title, b.bootcamp_id, b.bootcamp_name ORDER BY b.bootcamp_name, u.unit_id");

        let rows = qb
            .build_query_as::<(i32, String, i32, String, f64, i64)>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(unit_id, unit_name, bootcamp_id, bootcamp_name, avg, grade_count)| UnitPerformance {
                unit_id,
                unit_name,
                bootcamp_id,
                bootcamp_name,
                avg_percentage: round1(avg),
                grade_count,
            })
            .collect())
    }

    pub async fn instructor_performance(
        &self,
        instructor_id: Option<Uuid>,
        scope: &BootcampScope,
        since: Option<NaiveDate>,
    ) -> Result<Vec<InstructorPerformance>, ApiError> {
        log_db!("SELECT", "users_app");
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT u.id::text AS instructor_id, COALESCE(u.full_name, u.email) AS name, \
             COUNT(DISTINCT ib.bootcamp_id) AS bootcamp_count, \
             AVG(cs.avg_attention_rate)::float8 AS avg_attention, \
             AVG(cs.attendance_pct)::float8 AS avg_attendance \
             FROM users_app u \
             JOIN instructor_bootcamps ib ON ib.instructor_id = u.id \
             LEFT JOIN class_samples cs ON cs.bootcamp_id = ib.bootcamp_id",
        );
        if let Some(since) = since {
            qb.push(" AND cs.date >= ").push_bind(since);
        }
        qb.push(" WHERE u.role = 'instructor'");
        if let Some(id) = instructor_id {
            qb.push(" AND u.id = ").push_bind(id);
        }
        push_scope(&mut qb, "ib.bootcamp_id", scope);
        qb.push(" GROUP BY u.id, u.full_name, u.email ORDER BY avg_attention DESC NULLS LAST");

        let rows = qb
            .build_query_as::<(String, String, i64, Option<f64>, Option<f64>)>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(instructor_id, name, bootcamp_count, attention, attendance)| InstructorPerformance {
                instructor_id,
                name,
                bootcamp_count,
                avg_attention: attention.map(round1),
                avg_attendance: attendance.map(round1),
            })
            .collect())
    }

    /// One point per bootcamp-day: attendance on x, attention on y.
    pub async fn correlation_scatter(&self, scope: &BootcampScope, since: NaiveDate) -> Result<Vec<CorrelationPoint>, ApiError> {
        let mut qb = QueryBuilder::<Postgres>::new(DAILY_METRICS_CTE);
        qb.push_bind(since);
        push_scope(&mut qb, "cs.bootcamp_id", scope);
        qb.push(
            " GROUP BY cs.bootcamp_id, cs.date) \
             SELECT b.bootcamp_name, d.day, d.attendance, d.attention, d.samples \
             FROM daily d JOIN bootcamps b ON b.bootcamp_id = d.bootcamp_id \
             WHERE d.attendance IS NOT NULL AND d.attention IS NOT NULL \
             ORDER BY d.day, b.bootcamp_name",
        );

        let rows = qb.build_query_as::<ScatterRecord>().fetch_all(&self.pool).await?;
        Ok(rows
            .into_iter()
            .map(|r| CorrelationPoint {
                x_value: round2(r.attendance),
                y_value: round2(r.attention),
                label: format!("{} {}", r.bootcamp_name, r.day),
                size: r.samples as f64,
                category: r.bootcamp_name,
            })
            .collect())
    }

    /// Pearson coefficients between the daily attendance, attention and grade averages.
    pub async fn correlation_matrix(&self, scope: &BootcampScope, since: NaiveDate) -> Result<Vec<CorrelationEntry>, ApiError> {
        let mut qb = QueryBuilder::<Postgres>::new(DAILY_METRICS_CTE);
        qb.push_bind(since);
        push_scope(&mut qb, "cs.bootcamp_id", scope);
        qb.push(
            " GROUP BY cs.bootcamp_id, cs.date), \
             daily_grades AS ( \
                SELECT u.bootcamp_id, g.created_at::date AS day, \
                       AVG(g.score::float8 / NULLIF(a.max_score, 0) * 100) AS grade \
                FROM grades g \
                JOIN assessments a ON g.assessment_id = a.assessment_id \
                JOIN units u ON a.unit_id = u.unit_id \
                GROUP BY u.bootcamp_id, g.created_at::date) \
             SELECT corr(d.attendance, d.attention) AS attendance_attention, \
                    regr_count(d.attendance, d.attention) AS attendance_attention_n, \
                    corr(d.attendance, dg.grade) AS attendance_grade, \
                    regr_count(d.attendance, dg.grade) AS attendance_grade_n, \
                    corr(d.attention, dg.grade) AS attention_grade, \
                    regr_count(d.attention, dg.grade) AS attention_grade_n \
             FROM daily d \
             LEFT JOIN daily_grades dg ON dg.bootcamp_id = d.bootcamp_id AND dg.day = d.day",
        );

        let r = qb.build_query_as::<CorrelationRecord>().fetch_one(&self.pool).await?;
        let entry = |v1: &str, v2: &str, r: Option<f64>, n: i64| {
            let correlation = round_to(r.unwrap_or(0.0), 3);
            CorrelationEntry {
                variable1: v1.to_string(),
                variable2: v2.to_string(),
                correlation,
                sample_size: n.max(0) as usize,
                significance: Significance::from_coefficient(correlation),
            }
        };
        Ok(vec![
            entry("attendance", "attention", r.attendance_attention, r.attendance_attention_n),
            entry("attendance", "grade", r.attendance_grade, r.attendance_grade_n),
            entry("attention", "grade", r.attention_grade, r.attention_grade_n),
        ])
    }

    /// Average attendance by day of week (0 = Sunday) and hour. Daily granularity collapses hours to 0.
    pub async fn heatmap(&self, scope: &BootcampScope, daily: bool) -> Result<Vec<HeatmapCell>, ApiError> {
        let hour = if daily { "0" } else { "EXTRACT(HOUR FROM bucket_at)::int" };
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT EXTRACT(DOW FROM bucket_at)::int AS day_of_week, {hour} AS hour, \
             AVG(attendance_pct)::float8 AS value \
             FROM class_samples WHERE attendance_pct IS NOT NULL"
        ));
        push_scope(&mut qb, "bootcamp_id", scope);
        qb.push(" GROUP BY 1, 2 ORDER BY 1, 2");

        let rows = qb.build_query_as::<(i32, i32, f64)>().fetch_all(&self.pool).await?;
        Ok(rows
            .into_iter()
            .map(|(day_of_week, hour, value)| HeatmapCell { day_of_week, hour, value: round2(value) })
            .collect())
    }

    /// Bootcamps for filter menus; completed ones only on request.
    pub async fn bootcamp_options(
        &self,
        scope: &BootcampScope,
        include_completed: bool,
        today: NaiveDate,
    ) -> Result<Vec<BootcampOption>, ApiError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT bootcamp_id, bootcamp_name, start_date, end_date FROM bootcamps WHERE TRUE",
        );
        push_scope(&mut qb, "bootcamp_id", scope);
        if !include_completed {
            qb.push(" AND end_date >= ").push_bind(today);
        }
        qb.push(" ORDER BY start_date DESC, bootcamp_name");

        let rows = qb.build_query_as::<OptionRecord>().fetch_all(&self.pool).await?;
        Ok(rows
            .into_iter()
            .map(|r| BootcampOption {
                status: BootcampStatus::from_dates(r.start_date, r.end_date, today),
                bootcamp_id: r.bootcamp_id,
                bootcamp_name: r.bootcamp_name,
                start_date: r.start_date,
                end_date: r.end_date,
            })
            .collect())
    }
}
