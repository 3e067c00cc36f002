//! ClassSight gateway: the dashboard's `/api` routes in front of the analytics API.

pub mod client;
pub mod errors;
pub mod handlers;
pub mod shaping;
pub mod state;

use actix_web::web;

use crate::errors::GatewayError;

/// Routes plus a JSON config that reports unreadable bodies as 400 `{error}`.
pub fn configure_app(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default().error_handler(|err, _req| GatewayError::bad_request(err.to_string()).into()),
    )
    .configure(handlers::configure_routes);
}
