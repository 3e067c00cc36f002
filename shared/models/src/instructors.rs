use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct InstructorRow {
    pub user_id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub status: String,
    pub approved_at: Option<DateTime<Utc>>,
    pub approved_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub bootcamp_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstructorsList {
    pub items: Vec<InstructorRow>,
    pub page: i64,
    pub page_size: i64,
    pub total: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssignmentBody {
    pub bootcamp_id: i32,
    #[serde(default)]
    pub is_primary: Option<bool>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Approved,
    Denied,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstructorApproval {
    pub status: ApprovalStatus,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstructorsQuery {
    pub status: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InstructorApproved {
    pub user_id: Uuid,
    pub status: String,
    pub approved_at: DateTime<Utc>,
    pub approved_by: Uuid,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InstructorDenied {
    pub user_id: Uuid,
    pub status: String,
    pub denied_by: Uuid,
    pub reason: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InstructorAssigned {
    pub instructor_id: Uuid,
    pub bootcamp_id: i32,
    pub bootcamp_name: String,
    pub is_primary: bool,
    pub assigned_at: DateTime<Utc>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AssignmentRemoved {
    pub instructor_id: Uuid,
    pub bootcamp_id: i32,
    pub message: String,
}
