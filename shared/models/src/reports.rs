use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Pdf,
    Csv,
    Excel,
}

impl ReportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportFormat::Pdf => "pdf",
            ReportFormat::Csv => "csv",
            ReportFormat::Excel => "excel",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct ReportRow {
    pub id: Uuid,
    pub title: String,
    pub report_date: NaiveDate,
    pub status: String,
    pub format: String,
    pub storage_path: Option<String>,
    pub bootcamp_id: Option<i32>,
    pub bootcamp_name: Option<String>,
    pub created_at: DateTime<Utc>,
    #[sqlx(default)]
    pub file_size: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportsList {
    pub items: Vec<ReportRow>,
    pub page: i64,
    pub page_size: i64,
    pub total: Option<i64>,
    pub pages: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReportGenerate {
    #[validate(length(min = 1, max = 200, message = "Report title is required"))]
    pub title: String,
    pub bootcamp_id: Option<i32>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub format: ReportFormat,
    #[serde(default)]
    pub include_data_types: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportQueued {
    pub id: Uuid,
    pub status: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportsQuery {
    pub bootcamp_id: Option<i32>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub status: Option<String>,
    pub format: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}
