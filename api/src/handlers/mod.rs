mod admin_instructors;
mod assistant;
mod bootcamps;
mod dashboard;
mod grades;
mod health;
mod my_bootcamps;
mod rbac;
mod reports;

use actix_web::web;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.configure(health::configure)
        .configure(rbac::configure)
        .configure(dashboard::configure)
        .configure(grades::configure)
        .configure(reports::configure)
        .configure(bootcamps::configure)
        .configure(my_bootcamps::configure)
        .configure(admin_instructors::configure)
        .configure(assistant::configure);
}
