//! Dashboard aggregates over `class_samples`, grades and the weekly leaderboards.
//!
//! Every route resolves a [`BootcampScope`] first; an instructor without
//! assignments gets an empty payload instead of an error.

use actix_web::{web, HttpResponse};
use chrono::{Duration, NaiveDate, Utc};
use classsight_middleware::CurrentUser;
use classsight_models::dashboard::{
    CorrelationAnalysis, DashboardFilters, DashboardResponse, Kpi, KpiSummary, Leaderboards,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::ApiError;
use crate::repositories::dashboard::{LeaderboardKind, SampleMetric};
use crate::repositories::{BootcampScope, DashboardRepository, ScopeRepository};
use crate::services::analytics::{grade_distribution, metric_kpi, percent_change, previous_period, round1, sessions_kpi};
use crate::state::AppState;
use crate::utils::{granularity_to_bucket, resolve_date_range, time_range_days};

const LEADERBOARD_SIZE: i64 = 10;
const LEADERBOARD_WINDOW_DAYS: i64 = 30;
const DEFAULT_GRANULARITY: &str = "day";

#[derive(Debug, Deserialize)]
struct DashboardQuery {
    bootcamp_id: Option<i32>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    granularity: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RangeQuery {
    bootcamp_id: Option<i32>,
    time_range: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstructorPerformanceQuery {
    instructor_id: Option<String>,
    time_range: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HeatmapQuery {
    bootcamp_id: Option<i32>,
    time_granularity: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OptionsQuery {
    #[serde(default)]
    include_completed: bool,
}

fn repo(state: &AppState) -> DashboardRepository {
    DashboardRepository::new(state.pool.clone())
}

fn scopes(state: &AppState) -> ScopeRepository {
    ScopeRepository::new(state.pool.clone())
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Start of a `timeRange` window; `None` means no lower bound.
fn since(time_range: Option<&str>) -> Option<NaiveDate> {
    time_range_days(time_range).map(|days| today() - Duration::days(days))
}

fn is_daily(granularity: Option<&str>) -> bool {
    matches!(granularity, Some("day") | Some("daily"))
}

async fn kpis(
    repo: &DashboardRepository,
    scope: &BootcampScope,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<Kpi>, ApiError> {
    let (prev_start, prev_end) = previous_period(start, end);
    let current = repo.period_stats(scope, start, end).await?;
    let previous = repo.period_stats(scope, prev_start, prev_end).await?;

    let mut kpis = Vec::with_capacity(4);
    kpis.extend(metric_kpi("Average Attention", current.avg_attention, previous.avg_attention));
    kpis.extend(metric_kpi("Average Attendance", current.avg_attendance, previous.avg_attendance));
    kpis.push(sessions_kpi(current.total_sessions, Some(previous.total_sessions)));
    if let Some(best) = repo.best_day_score(scope, start, end).await? {
        kpis.push(Kpi {
            label: "Best Day Score".to_string(),
            value: best,
            delta: None,
            trend: None,
        });
    }
    Ok(kpis)
}

async fn leaderboards(
    repo: &DashboardRepository,
    scope: &BootcampScope,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Leaderboards, ApiError> {
    Ok(Leaderboards {
        leaderboard_students: repo
            .leaderboard(scope, start, end, LeaderboardKind::Students, LEADERBOARD_SIZE)
            .await?,
        leaderboard_instructors: repo
            .leaderboard(scope, start, end, LeaderboardKind::Instructors, LEADERBOARD_SIZE)
            .await?,
    })
}

async fn get_dashboard(
    state: web::Data<AppState>,
    user: CurrentUser,
    query: web::Query<DashboardQuery>,
) -> Result<HttpResponse, ApiError> {
    let (start, end) = resolve_date_range(query.start, query.end);
    let scope = scopes(&state).resolve_bootcamp_filter(&user, query.bootcamp_id).await?;
    if scope.is_empty() {
        return Ok(HttpResponse::Ok().json(DashboardResponse::default()));
    }

    let repo = repo(&state);
    let bucket = granularity_to_bucket(query.granularity.as_deref().unwrap_or(DEFAULT_GRANULARITY));
    let boards = leaderboards(&repo, &scope, start, end).await?;

    let response = DashboardResponse {
        kpis: kpis(&repo, &scope, start, end).await?,
        attention: repo.series(&scope, start, end, bucket, SampleMetric::Attention).await?,
        attendance: repo.series(&scope, start, end, bucket, SampleMetric::Attendance).await?,
        capacity: repo.series(&scope, start, end, bucket, SampleMetric::Attendance).await?,
        leaderboard_students: boards.leaderboard_students,
        leaderboard_instructors: boards.leaderboard_instructors,
    };
    Ok(HttpResponse::Ok().json(response))
}

async fn post_kpis(
    state: web::Data<AppState>,
    user: CurrentUser,
    filters: web::Json<DashboardFilters>,
) -> Result<HttpResponse, ApiError> {
    let scope = scopes(&state).resolve_bootcamp_list(&user, &filters.bootcamp_ids).await?;
    if scope.is_empty() {
        return Ok(HttpResponse::Ok().json(KpiSummary::default()));
    }

    let repo = repo(&state);
    let (start, end) = resolve_date_range(filters.start, filters.end);
    let (prev_start, prev_end) = previous_period(start, end);
    let current = repo.period_stats(&scope, start, end).await?;
    let previous = repo.period_stats(&scope, prev_start, prev_end).await?;

    let attendance = current.avg_attendance.unwrap_or(0.0);
    let attention = current.avg_attention.unwrap_or(0.0);
    let summary = KpiSummary {
        avg_attendance_percentage: round1(attendance),
        attendance_change_percentage: percent_change(attendance, previous.avg_attendance.unwrap_or(0.0)),
        avg_attention_percentage: round1(attention),
        attention_change_percentage: percent_change(attention, previous.avg_attention.unwrap_or(0.0)),
        total_sessions: current.total_sessions,
        total_students: repo.total_students(&scope).await?,
    };
    Ok(HttpResponse::Ok().json(summary))
}

async fn chart(
    state: &AppState,
    user: &CurrentUser,
    filters: &DashboardFilters,
    metric: SampleMetric,
) -> Result<HttpResponse, ApiError> {
    let scope = scopes(state).resolve_bootcamp_list(user, &filters.bootcamp_ids).await?;
    if scope.is_empty() {
        return Ok(HttpResponse::Ok().json(Vec::<()>::new()));
    }
    let (start, end) = resolve_date_range(filters.start, filters.end);
    let bucket = granularity_to_bucket(filters.granularity.as_deref().unwrap_or(DEFAULT_GRANULARITY));
    let points = repo(state).series(&scope, start, end, bucket, metric).await?;
    Ok(HttpResponse::Ok().json(points))
}

async fn attendance_chart(
    state: web::Data<AppState>,
    user: CurrentUser,
    filters: web::Json<DashboardFilters>,
) -> Result<HttpResponse, ApiError> {
    chart(&state, &user, &filters, SampleMetric::Attendance).await
}

async fn attention_chart(
    state: web::Data<AppState>,
    user: CurrentUser,
    filters: web::Json<DashboardFilters>,
) -> Result<HttpResponse, ApiError> {
    chart(&state, &user, &filters, SampleMetric::Attention).await
}

async fn grade_distribution_handler(
    state: web::Data<AppState>,
    user: CurrentUser,
    bootcamp_ids: web::Json<Vec<i32>>,
) -> Result<HttpResponse, ApiError> {
    let scope = scopes(&state).resolve_bootcamp_list(&user, &bootcamp_ids).await?;
    let percentages = if scope.is_empty() {
        Vec::new()
    } else {
        repo(&state).grade_percentages(&scope).await?
    };
    Ok(HttpResponse::Ok().json(grade_distribution(&percentages)))
}

async fn leaderboard(
    state: web::Data<AppState>,
    user: CurrentUser,
    bootcamp_ids: web::Json<Vec<i32>>,
) -> Result<HttpResponse, ApiError> {
    let scope = scopes(&state).resolve_bootcamp_list(&user, &bootcamp_ids).await?;
    if scope.is_empty() {
        return Ok(HttpResponse::Ok().json(Leaderboards::default()));
    }
    let end = today();
    let start = end - Duration::days(LEADERBOARD_WINDOW_DAYS);
    Ok(HttpResponse::Ok().json(leaderboards(&repo(&state), &scope, start, end).await?))
}

async fn unit_performance(
    state: &AppState,
    scope: BootcampScope,
    since: Option<NaiveDate>,
) -> Result<HttpResponse, ApiError> {
    if scope.is_empty() {
        return Ok(HttpResponse::Ok().json(Vec::<()>::new()));
    }
    Ok(HttpResponse::Ok().json(repo(state).unit_performance(&scope, since).await?))
}

async fn grade_performance(
    state: web::Data<AppState>,
    user: CurrentUser,
    query: web::Query<RangeQuery>,
) -> Result<HttpResponse, ApiError> {
    let scope = scopes(&state).resolve_bootcamp_filter(&user, query.bootcamp_id).await?;
    unit_performance(&state, scope, since(query.time_range.as_deref())).await
}

async fn grade_performance_filtered(
    state: web::Data<AppState>,
    user: CurrentUser,
    filters: web::Json<DashboardFilters>,
) -> Result<HttpResponse, ApiError> {
    let scope = scopes(&state).resolve_bootcamp_list(&user, &filters.bootcamp_ids).await?;
    unit_performance(&state, scope, filters.start).await
}

async fn instructor_performance(
    state: web::Data<AppState>,
    user: CurrentUser,
    query: web::Query<InstructorPerformanceQuery>,
) -> Result<HttpResponse, ApiError> {
    // Instructors only ever see their own row.
    let instructor_id = if user.is_instructor() {
        Some(user.user_id)
    } else {
        match query.instructor_id.as_deref().map(str::trim) {
            None | Some("") | Some("all") => None,
            Some(raw) => Some(
                Uuid::parse_str(raw).map_err(|_| ApiError::bad_request(format!("Invalid instructor id: {}", raw)))?,
            ),
        }
    };

    let scope = scopes(&state).resolve_bootcamp_filter(&user, None).await?;
    if scope.is_empty() {
        return Ok(HttpResponse::Ok().json(Vec::<()>::new()));
    }
    let rows = repo(&state)
        .instructor_performance(instructor_id, &scope, since(query.time_range.as_deref()))
        .await?;
    Ok(HttpResponse::Ok().json(rows))
}

async fn correlation(state: &AppState, scope: BootcampScope, since: NaiveDate) -> Result<HttpResponse, ApiError> {
    if scope.is_empty() {
        return Ok(HttpResponse::Ok().json(CorrelationAnalysis::default()));
    }
    let repo = repo(state);
    let analysis = CorrelationAnalysis {
        scatter: repo.correlation_scatter(&scope, since).await?,
        matrix: repo.correlation_matrix(&scope, since).await?,
    };
    Ok(HttpResponse::Ok().json(analysis))
}

async fn correlation_analysis(
    state: web::Data<AppState>,
    user: CurrentUser,
    query: web::Query<RangeQuery>,
) -> Result<HttpResponse, ApiError> {
    let scope = scopes(&state).resolve_bootcamp_filter(&user, query.bootcamp_id).await?;
    // `all` has no lower bound.
    let since = since(query.time_range.as_deref()).unwrap_or_default();
    correlation(&state, scope, since).await
}

async fn correlation_analysis_filtered(
    state: web::Data<AppState>,
    user: CurrentUser,
    filters: web::Json<DashboardFilters>,
) -> Result<HttpResponse, ApiError> {
    let scope = scopes(&state).resolve_bootcamp_list(&user, &filters.bootcamp_ids).await?;
    let since = filters
        .start
        .unwrap_or_else(|| today() - Duration::days(LEADERBOARD_WINDOW_DAYS));
    correlation(&state, scope, since).await
}

async fn heatmap(
    state: web::Data<AppState>,
    user: CurrentUser,
    query: web::Query<HeatmapQuery>,
) -> Result<HttpResponse, ApiError> {
    let scope = scopes(&state).resolve_bootcamp_filter(&user, query.bootcamp_id).await?;
    if scope.is_empty() {
        return Ok(HttpResponse::Ok().json(Vec::<()>::new()));
    }
    let cells = repo(&state)
        .heatmap(&scope, is_daily(query.time_granularity.as_deref()))
        .await?;
    Ok(HttpResponse::Ok().json(cells))
}

async fn bootcamp_options(
    state: web::Data<AppState>,
    user: CurrentUser,
    query: web::Query<OptionsQuery>,
) -> Result<HttpResponse, ApiError> {
    let scope = scopes(&state).resolve_bootcamp_filter(&user, None).await?;
    if scope.is_empty() {
        return Ok(HttpResponse::Ok().json(Vec::<()>::new()));
    }
    let options = repo(&state)
        .bootcamp_options(&scope, query.include_completed, today())
        .await?;
    Ok(HttpResponse::Ok().json(options))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/dashboard")
            .route("", web::get().to(get_dashboard))
            .route("/kpis", web::post().to(post_kpis))
            .route("/attendance-chart", web::post().to(attendance_chart))
            .route("/attention-chart", web::post().to(attention_chart))
            .route("/grade-distribution", web::post().to(grade_distribution_handler))
            .route("/leaderboard", web::post().to(leaderboard))
            .route("/grade-performance", web::get().to(grade_performance))
            .route("/grade-performance", web::post().to(grade_performance_filtered))
            .route("/instructor-performance", web::get().to(instructor_performance))
            .route("/correlation-analysis", web::get().to(correlation_analysis))
            .route("/correlation-analysis", web::post().to(correlation_analysis_filtered))
            .route("/heatmap-data", web::get().to(heatmap))
            .route("/bootcamps", web::get().to(bootcamp_options)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daily_heatmap_granularity() {
        assert!(is_daily(Some("day")));
        assert!(is_daily(Some("daily")));
        assert!(!is_daily(Some("hour")));
        assert!(!is_daily(None));
    }

    #[test]
    fn time_range_window() {
        assert_eq!(since(Some("7d")), Some(today() - Duration::days(7)));
        assert_eq!(since(None), Some(today() - Duration::days(30)));
        assert_eq!(since(Some("all")), None);
    }

    #[test]
    fn camel_case_query_params() {
        let q: InstructorPerformanceQuery = parse("instructorId=all&timeRange=90d");
        assert_eq!(q.instructor_id.as_deref(), Some("all"));
        assert_eq!(q.time_range.as_deref(), Some("90d"));

        let h: HeatmapQuery = parse("bootcampId=3&timeGranularity=hour");
        assert_eq!(h.bootcamp_id, Some(3));
        assert_eq!(h.time_granularity.as_deref(), Some("hour"));
    }

    fn parse<T: serde::de::DeserializeOwned>(qs: &str) -> T {
        web::Query::<T>::from_query(qs).unwrap().into_inner()
    }
}
