use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Neutral,
}

impl Trend {
    pub fn from_delta(delta: Option<f64>) -> Self {
        match delta {
            Some(d) if d > 0.0 => Trend::Up,
            Some(d) if d < 0.0 => Trend::Down,
            _ => Trend::Neutral,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Kpi {
    pub label: String,
    pub value: f64,
    pub delta: Option<f64>,
    pub trend: Option<Trend>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeriesPoint {
    pub t: DateTime<Utc>,
    pub v: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeaderboardEntry {
    pub id: String,
    pub name: String,
    pub value: f64,
    pub rank: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DashboardResponse {
    pub kpis: Vec<Kpi>,
    pub attention: Vec<SeriesPoint>,
    pub attendance: Vec<SeriesPoint>,
    pub capacity: Vec<SeriesPoint>,
    pub leaderboard_students: Vec<LeaderboardEntry>,
    pub leaderboard_instructors: Vec<LeaderboardEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Leaderboards {
    pub leaderboard_students: Vec<LeaderboardEntry>,
    pub leaderboard_instructors: Vec<LeaderboardEntry>,
}

/// Filter payload the dashboard posts for its chart endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardFilters {
    #[serde(default)]
    pub bootcamp_ids: Vec<i32>,
    #[serde(default)]
    pub instructor_ids: Vec<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub granularity: Option<String>,
    #[serde(default)]
    pub include_completed: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct KpiSummary {
    pub avg_attendance_percentage: f64,
    pub attendance_change_percentage: f64,
    pub avg_attention_percentage: f64,
    pub attention_change_percentage: f64,
    pub total_sessions: i64,
    pub total_students: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GradeBucket {
    pub range: String,
    pub count: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GradeStats {
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    pub count: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GradeDistribution {
    pub items: Vec<GradeBucket>,
    pub stats: GradeStats,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CorrelationPoint {
    pub x_value: f64,
    pub y_value: f64,
    pub label: String,
    pub size: f64,
    pub category: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Significance {
    High,
    Medium,
    Low,
    None,
}

impl Significance {
    /// Buckets |r| the way the dashboard colours correlation strength.
    pub fn from_coefficient(r: f64) -> Self {
        let abs = r.abs();
        if abs > 0.7 {
            Significance::High
        } else if abs > 0.5 {
            Significance::Medium
        } else if abs > 0.3 {
            Significance::Low
        } else {
            Significance::None
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Significance::High => "Strong correlation",
            Significance::Medium => "Moderate correlation",
            Significance::Low => "Weak correlation",
            Significance::None => "No correlation",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CorrelationEntry {
    pub variable1: String,
    pub variable2: String,
    pub correlation: f64,
    pub sample_size: usize,
    pub significance: Significance,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CorrelationAnalysis {
    pub scatter: Vec<CorrelationPoint>,
    pub matrix: Vec<CorrelationEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HeatmapCell {
    pub day_of_week: i32,
    pub hour: i32,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnitPerformance {
    pub unit_id: i32,
    pub unit_name: String,
    pub bootcamp_id: i32,
    pub bootcamp_name: String,
    pub avg_percentage: f64,
    pub grade_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstructorPerformance {
    pub instructor_id: String,
    pub name: String,
    pub bootcamp_count: i64,
    pub avg_attention: Option<f64>,
    pub avg_attendance: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BootcampOption {
    pub bootcamp_id: i32,
    pub bootcamp_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: crate::bootcamps::BootcampStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trend_follows_delta_sign() {
        assert_eq!(Trend::from_delta(Some(1.5)), Trend::Up);
        assert_eq!(Trend::from_delta(Some(-0.1)), Trend::Down);
        assert_eq!(Trend::from_delta(Some(0.0)), Trend::Neutral);
        assert_eq!(Trend::from_delta(None), Trend::Neutral);
    }

    #[test]
    fn significance_thresholds_are_exclusive() {
        assert_eq!(Significance::from_coefficient(0.7), Significance::Medium);
        assert_eq!(Significance::from_coefficient(-0.71), Significance::High);
        assert_eq!(Significance::from_coefficient(0.3), Significance::None);
        assert_eq!(Significance::from_coefficient(0.31).describe(), "Weak correlation");
    }

    #[test]
    fn filters_tolerate_missing_fields() {
        let filters: DashboardFilters = serde_json::from_str(r#"{"granularity":"daily"}"#).unwrap();
        assert!(filters.bootcamp_ids.is_empty());
        assert!(!filters.include_completed);
        assert_eq!(filters.granularity.as_deref(), Some("daily"));
    }
}
