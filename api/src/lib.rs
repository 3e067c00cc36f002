//! ClassSight analytics API: dashboards, grades, reports, bootcamps and the assistant.

pub mod db;
pub mod errors;
pub mod handlers;
pub mod repositories;
pub mod services;
pub mod state;
pub mod utils;

use actix_web::web;

use crate::errors::ApiError;

/// Routes plus extractor configs that turn malformed input into 422 JSON errors.
pub fn configure_app(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default().error_handler(|err, _req| ApiError::Validation(err.to_string()).into()),
    )
    .app_data(web::QueryConfig::default().error_handler(|err, _req| ApiError::Validation(err.to_string()).into()))
    .app_data(web::PathConfig::default().error_handler(|err, _req| ApiError::Validation(err.to_string()).into()))
    .configure(handlers::configure_routes);
}
