use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeMap;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct GradeRow {
    pub grade_id: i32,
    pub student_id: i32,
    pub student_name: String,
    pub assessment_id: i32,
    pub assessment_title: String,
    pub unit_id: i32,
    pub unit_name: String,
    pub score: i32,
    pub max_score: i32,
    pub weight: f64,
    pub due_date: NaiveDate,
    pub bootcamp_id: i32,
    pub bootcamp_name: String,
    pub submitted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GradePatch {
    #[validate(range(min = 0, message = "Score must be >= 0"))]
    pub score: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GradesList {
    pub items: Vec<GradeRow>,
    pub page: i64,
    pub page_size: i64,
    pub total: Option<i64>,
    pub stats: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GradeUpdated {
    pub grade_id: i32,
    pub score: i32,
    pub max_score: i32,
    pub percentage: f64,
    pub message: String,
}

/// Query string accepted by the grades listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GradesQuery {
    pub bootcamp_id: Option<i32>,
    pub unit_id: Option<i32>,
    pub top: Option<bool>,
    pub worst: Option<bool>,
    pub min_avg: Option<f64>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_score_rejected() {
        assert!(GradePatch { score: -1 }.validate().is_err());
        assert!(GradePatch { score: 0 }.validate().is_ok());
    }
}
