use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BootcampStatus {
    Upcoming,
    Active,
    Completed,
}

impl BootcampStatus {
    /// Status relative to `today`; both end points count as active.
    pub fn from_dates(start: NaiveDate, end: NaiveDate, today: NaiveDate) -> Self {
        if today < start {
            BootcampStatus::Upcoming
        } else if today > end {
            BootcampStatus::Completed
        } else {
            BootcampStatus::Active
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "upcoming" => Some(BootcampStatus::Upcoming),
            "active" => Some(BootcampStatus::Active),
            "completed" => Some(BootcampStatus::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BootcampRef {
    pub bootcamp_id: i32,
    pub bootcamp_name: String,
}

/// Bootcamp row as stored plus the aggregated counts.
#[derive(Debug, Clone, FromRow)]
pub struct BootcampRecord {
    pub bootcamp_id: i32,
    pub bootcamp_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub allow_multiple_instructors: bool,
    pub max_instructors: i32,
    pub description: Option<String>,
    pub student_count: i64,
    pub instructor_count: i64,
    pub unit_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BootcampRow {
    pub bootcamp_id: i32,
    pub bootcamp_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub allow_multiple_instructors: bool,
    pub max_instructors: i32,
    pub description: Option<String>,
    pub status: BootcampStatus,
    pub student_count: i64,
    pub instructor_count: i64,
    pub unit_count: i64,
}

impl BootcampRow {
    pub fn from_record(record: BootcampRecord, today: NaiveDate) -> Self {
        Self {
            status: BootcampStatus::from_dates(record.start_date, record.end_date, today),
            bootcamp_id: record.bootcamp_id,
            bootcamp_name: record.bootcamp_name,
            start_date: record.start_date,
            end_date: record.end_date,
            allow_multiple_instructors: record.allow_multiple_instructors,
            max_instructors: record.max_instructors,
            description: record.description,
            student_count: record.student_count,
            instructor_count: record.instructor_count,
            unit_count: record.unit_count,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BootcampsList {
    pub items: Vec<BootcampRow>,
    pub page: i64,
    pub page_size: i64,
    pub total: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BootcampsQuery {
    pub status: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BootcampCreate {
    #[validate(length(min = 1, max = 200, message = "Bootcamp name is required"))]
    pub bootcamp_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default = "default_allow_multiple")]
    pub allow_multiple_instructors: bool,
    #[serde(default = "default_max_instructors")]
    #[validate(range(min = 1, max = 20, message = "max_instructors must be between 1 and 20"))]
    pub max_instructors: i32,
    pub description: Option<String>,
}

fn default_allow_multiple() -> bool {
    true
}

fn default_max_instructors() -> i32 {
    5
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct BootcampUpdate {
    #[validate(length(min = 1, max = 200, message = "Bootcamp name cannot be empty"))]
    pub bootcamp_name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub allow_multiple_instructors: Option<bool>,
    #[validate(range(min = 1, max = 20, message = "max_instructors must be between 1 and 20"))]
    pub max_instructors: Option<i32>,
    pub description: Option<String>,
}

impl BootcampUpdate {
    pub fn is_empty(&self) -> bool {
        self.bootcamp_name.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
            && self.allow_multiple_instructors.is_none()
            && self.max_instructors.is_none()
            && self.description.is_none()
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct MyBootcampRecord {
    pub bootcamp_id: i32,
    pub bootcamp_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_primary: bool,
    pub student_count: i64,
    pub unit_count: i64,
    pub assessment_count: i64,
    pub avg_attendance: f64,
    pub avg_attention: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MyBootcampRow {
    pub bootcamp_id: i32,
    pub bootcamp_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_primary: bool,
    pub status: BootcampStatus,
    pub student_count: i64,
    pub unit_count: i64,
    pub assessment_count: i64,
    pub avg_attendance: Option<f64>,
    pub avg_attention: Option<f64>,
}

impl MyBootcampRow {
    pub fn from_record(record: MyBootcampRecord, today: NaiveDate) -> Self {
        Self {
            status: BootcampStatus::from_dates(record.start_date, record.end_date, today),
            bootcamp_id: record.bootcamp_id,
            bootcamp_name: record.bootcamp_name,
            start_date: record.start_date,
            end_date: record.end_date,
            is_primary: record.is_primary,
            student_count: record.student_count,
            unit_count: record.unit_count,
            assessment_count: record.assessment_count,
            avg_attendance: non_zero_rounded(record.avg_attendance),
            avg_attention: non_zero_rounded(record.avg_attention),
        }
    }
}

// Zero averages mean "no samples in the window" and are reported as null.
fn non_zero_rounded(value: f64) -> Option<f64> {
    if value == 0.0 {
        None
    } else {
        Some((value * 10.0).round() / 10.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MyBootcampsList {
    pub items: Vec<MyBootcampRow>,
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn status_boundaries_are_active() {
        let (start, end) = (d(2024, 1, 10), d(2024, 3, 10));
        assert_eq!(BootcampStatus::from_dates(start, end, d(2024, 1, 9)), BootcampStatus::Upcoming);
        assert_eq!(BootcampStatus::from_dates(start, end, start), BootcampStatus::Active);
        assert_eq!(BootcampStatus::from_dates(start, end, end), BootcampStatus::Active);
        assert_eq!(BootcampStatus::from_dates(start, end, d(2024, 3, 11)), BootcampStatus::Completed);
    }

    #[test]
    fn create_defaults_and_limits() {
        let create: BootcampCreate = serde_json::from_str(
            r#"{"bootcamp_name":"Data Science","start_date":"2024-01-01","end_date":"2024-04-01"}"#,
        )
        .unwrap();
        assert!(create.allow_multiple_instructors);
        assert_eq!(create.max_instructors, 5);
        assert!(create.validate().is_ok());

        let too_many = BootcampCreate { max_instructors: 21, ..create };
        assert!(too_many.validate().is_err());
    }

    #[test]
    fn my_bootcamp_zero_averages_become_null() {
        let record = MyBootcampRecord {
            bootcamp_id: 1,
            bootcamp_name: "Cloud".into(),
            start_date: d(2024, 1, 1),
            end_date: d(2024, 6, 1),
            is_primary: true,
            student_count: 20,
            unit_count: 4,
            assessment_count: 12,
            avg_attendance: 0.0,
            avg_attention: 81.26,
        };
        let row = MyBootcampRow::from_record(record, d(2024, 2, 1));
        assert_eq!(row.avg_attendance, None);
        assert_eq!(row.avg_attention, Some(81.3));
        assert_eq!(row.status, BootcampStatus::Active);
    }

    #[test]
    fn empty_update_detected() {
        assert!(BootcampUpdate::default().is_empty());
        let update = BootcampUpdate { description: Some("x".into()), ..Default::default() };
        assert!(!update.is_empty());
    }
}
