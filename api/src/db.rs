use std::str::FromStr;
use std::time::Duration;

use classsight_config::ApiSettings;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;

fn pool_options(settings: &ApiSettings) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(settings.db_max_connections)
        .min_connections(settings.db_min_connections)
        .acquire_timeout(Duration::from_secs(60))
}

// Server-side prepared statements are disabled for pgbouncer.
fn connect_options(settings: &ApiSettings) -> Result<PgConnectOptions, sqlx::Error> {
    Ok(PgConnectOptions::from_str(&settings.database_url)?.statement_cache_capacity(0))
}

pub async fn connect(settings: &ApiSettings) -> Result<PgPool, sqlx::Error> {
    pool_options(settings).connect_with(connect_options(settings)?).await
}

/// Pool that opens connections on first use.
pub fn connect_lazy(settings: &ApiSettings) -> Result<PgPool, sqlx::Error> {
    Ok(pool_options(settings).connect_lazy_with(connect_options(settings)?))
}

/// `SELECT 1` with a short deadline so health checks never hang on a dead database.
pub async fn ping(pool: &PgPool) -> bool {
    let probe = sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool);
    matches!(tokio::time::timeout(Duration::from_secs(2), probe).await, Ok(Ok(_)))
}
