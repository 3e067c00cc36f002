use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod assistant;
pub mod auth;
pub mod bootcamps;
pub mod dashboard;
pub mod grades;
pub mod instructors;
pub mod reports;

pub use auth::{UserContext, UserRole};

pub const API_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub ok: bool,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

impl HealthResponse {
    pub fn new(database_connected: bool) -> Self {
        Self {
            ok: true,
            timestamp: Utc::now(),
            version: API_VERSION.to_string(),
            database: Some(if database_connected { "connected" } else { "disconnected" }.to_string()),
        }
    }
}

/// Error body returned by the analytics API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub detail: String,
    pub error_code: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ErrorResponse {
    pub fn new(detail: impl Into<String>, error_code: Option<&str>) -> Self {
        Self {
            detail: detail.into(),
            error_code: error_code.map(str::to_string),
            timestamp: Utc::now(),
        }
    }
}

/// Generic paginated envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub page_size: i64,
    pub total: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<i64>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, page: i64, page_size: i64, total: i64) -> Self {
        Self { items, page, page_size, total: Some(total), pages: None }
    }

    pub fn with_pages(mut self) -> Self {
        if let Some(total) = self.total {
            self.pages = Some(if self.page_size > 0 { (total + self.page_size - 1) / self.page_size } else { 0 });
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_count_rounds_up() {
        let page: Page<u8> = Page::new(vec![], 1, 20, 41).with_pages();
        assert_eq!(page.pages, Some(3));

        let empty: Page<u8> = Page::new(vec![], 1, 20, 0).with_pages();
        assert_eq!(empty.pages, Some(0));
    }

    #[test]
    fn health_reports_database_state() {
        let health = HealthResponse::new(false);
        assert!(health.ok);
        assert_eq!(health.version, "1.0.0");
        assert_eq!(health.database.as_deref(), Some("disconnected"));
    }

    #[test]
    fn error_body_shape() {
        let body = serde_json::to_value(ErrorResponse::new("Admin access required", Some("FORBIDDEN"))).unwrap();
        assert_eq!(body["detail"], "Admin access required");
        assert_eq!(body["error_code"], "FORBIDDEN");
        assert!(body["timestamp"].is_string());
    }
}
