use std::sync::Arc;

use classsight_config::ApiSettings;
use sqlx::PgPool;

use crate::services::rag::Assistant;

/// Shared per-worker application data.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub settings: Arc<ApiSettings>,
    pub assistant: Arc<Assistant>,
}

impl AppState {
    pub fn new(pool: PgPool, settings: ApiSettings, assistant: Assistant) -> Self {
        Self {
            pool,
            settings: Arc::new(settings),
            assistant: Arc::new(assistant),
        }
    }
}
