use actix_web::{web, HttpResponse};
use chrono::Utc;
use classsight_middleware::CurrentUser;
use classsight_models::bootcamps::{MyBootcampRow, MyBootcampsList};

use crate::errors::ApiError;
use crate::repositories::BootcampRepository;
use crate::state::AppState;

async fn my_bootcamps(state: web::Data<AppState>, user: CurrentUser) -> Result<HttpResponse, ApiError> {
    if !user.is_instructor() {
        return Err(ApiError::forbidden(
            "Only instructors can access my bootcamps. Admins should use /bootcamps endpoint.",
        ));
    }

    let today = Utc::now().date_naive();
    let items: Vec<MyBootcampRow> = BootcampRepository::new(state.pool.clone())
        .assigned_to(user.user_id)
        .await?
        .into_iter()
        .map(|record| MyBootcampRow::from_record(record, today))
        .collect();

    Ok(HttpResponse::Ok().json(MyBootcampsList {
        total: items.len(),
        items,
    }))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/my-bootcamps", web::get().to(my_bootcamps));
}
