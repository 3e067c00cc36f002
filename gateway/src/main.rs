use actix_web::{web, App, HttpServer};
use classsight_config::GatewaySettings;
use classsight_gateway::{configure_app, state::GatewayState};
use classsight_middleware::cors;
use classsight_observability::{error, info, init_tracing, observability, TracingConfig};
use std::io;

#[actix_web::main]
async fn main() -> io::Result<()> {
    let settings = GatewaySettings::from_env().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;

    init_tracing(TracingConfig::for_service("gateway-service"));
    info!("🚀 [Gateway Service] Starting ClassSight gateway...");
    info!(
        "🔗 [Gateway Service] Forwarding to {} (fallback identity {} / {})",
        settings.fastapi_url, settings.default_user_id, settings.default_user_role
    );

    let port = settings.port;
    let origins = settings.cors_origins();
    let state = GatewayState::new(settings).map_err(|e| {
        error!("❌ [Gateway Service] Failed to build HTTP client: {}", e);
        io::Error::new(io::ErrorKind::Other, e.to_string())
    })?;
    let state = web::Data::new(state);

    info!("🌐 [Gateway Service] Listening on 0.0.0.0:{}", port);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(cors(&origins))
            .wrap(observability("gateway-service"))
            .configure(configure_app)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
