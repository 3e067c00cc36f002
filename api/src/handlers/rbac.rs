use actix_web::{web, HttpResponse};
use classsight_middleware::CurrentUser;

/// Echoes the identity the gateway forwarded.
async fn me(user: CurrentUser) -> HttpResponse {
    HttpResponse::Ok().json(user.0)
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/rbac").route("/me", web::get().to(me)));
}
