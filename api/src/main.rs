use actix_web::{web, App, HttpServer};
use classsight_api::{configure_app, db, services::rag::Assistant, state::AppState};
use classsight_config::ApiSettings;
use classsight_middleware::cors;
use classsight_observability::{error, info, init_tracing, observability, warn, TracingConfig};
use std::io;

#[actix_web::main]
async fn main() -> io::Result<()> {
    let settings = ApiSettings::from_env().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;

    init_tracing(TracingConfig::for_service("analytics-service").with_level(settings.log_level.clone()));
    info!("🚀 [Analytics Service] Starting ClassSight API...");

    let disabled = settings.feature_toggles.disabled_features();
    if !disabled.is_empty() {
        warn!("[Analytics Service] Disabled features: {}", disabled.join(", "));
    }

    info!("📊 [Analytics Service] Connecting to PostgreSQL...");
    let pool = db::connect(&settings).await.map_err(|e| {
        error!("❌ [Analytics Service] Failed to connect to database: {}", e);
        io::Error::new(io::ErrorKind::Other, e.to_string())
    })?;
    info!("✅ [Analytics Service] Database connection established");

    let assistant = Assistant::from_settings(&pool, &settings);
    info!(
        sql = assistant.sql_available(),
        vector = assistant.vector_available(),
        "🤖 [Analytics Service] Assistant initialized"
    );

    let port = settings.port;
    let origins = settings.cors_origins();
    let state = web::Data::new(AppState::new(pool, settings, assistant));

    info!("🌐 [Analytics Service] Listening on 0.0.0.0:{}", port);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(cors(&origins))
            .wrap(observability("analytics-service"))
            .configure(configure_app)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
