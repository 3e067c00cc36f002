mod analytics;
mod assistant;
mod auth;
mod dashboard;
mod health;
mod passthrough;

use actix_web::web;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .configure(health::configure)
            .configure(auth::configure)
            .configure(dashboard::configure)
            .configure(analytics::configure)
            .configure(assistant::configure)
            .configure(passthrough::configure),
    );
}
