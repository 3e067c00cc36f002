//! Mocked login and registration.
//!
//! No credentials are checked. Login hands back the fixed demo identity the
//! dashboard stores and replays as `x-user-id` / `x-user-role`.

use actix_web::{web, HttpResponse};
use classsight_config::MOCK_USER_ID;
use classsight_models::auth::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};
use classsight_models::UserRole;
use classsight_observability::info;
use uuid::Uuid;
use validator::Validate;

use crate::errors::GatewayError;

const PENDING_MESSAGE: &str = "Your account has been created and is pending admin approval.";

fn mock_user_id() -> Uuid {
    Uuid::parse_str(MOCK_USER_ID).unwrap_or_else(|_| Uuid::nil())
}

async fn login(body: web::Json<LoginRequest>) -> Result<HttpResponse, GatewayError> {
    body.validate()?;
    info!(email = %body.email, role = %body.role, "mock login");

    Ok(HttpResponse::Ok().json(LoginResponse {
        user_id: mock_user_id(),
        role: body.role,
        email: body.email.clone(),
    }))
}

fn check_registration(body: &RegisterRequest) -> Result<(), GatewayError> {
    body.validate()?;
    if body.confirm_password.as_deref() != Some(body.password.as_str()) {
        return Err(GatewayError::bad_request("Passwords do not match"));
    }
    if body.terms_accepted != Some(true) {
        return Err(GatewayError::bad_request("Please accept the terms and conditions"));
    }
    Ok(())
}

async fn register(body: web::Json<RegisterRequest>) -> Result<HttpResponse, GatewayError> {
    check_registration(&body)?;
    info!(email = %body.email, "mock registration pending approval");

    // Only instructors self-register; admins are created by other admins.
    Ok(HttpResponse::Created().json(RegisterResponse {
        email: body.email.clone(),
        role: UserRole::Instructor,
        status: "pending".to_string(),
        message: PENDING_MESSAGE.to_string(),
    }))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/auth/login", web::post().to(login))
        .route("/auth/register", web::post().to(register));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(confirm: Option<&str>, terms: Option<bool>) -> RegisterRequest {
        RegisterRequest {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            password: "analytical".into(),
            confirm_password: confirm.map(String::from),
            terms_accepted: terms,
        }
    }

    #[test]
    fn registration_rules() {
        assert!(check_registration(&registration(Some("analytical"), Some(true))).is_ok());

        let err = check_registration(&registration(Some("different"), Some(true))).unwrap_err();
        assert_eq!(err.to_string(), "Passwords do not match");

        let err = check_registration(&registration(Some("analytical"), None)).unwrap_err();
        assert_eq!(err.to_string(), "Please accept the terms and conditions");
    }

    #[test]
    fn short_password_rejected() {
        let mut req = registration(Some("short"), Some(true));
        req.password = "short".into();
        let err = check_registration(&req).unwrap_err();
        assert_eq!(err.to_string(), "Password must be at least 8 characters long");
    }

    #[test]
    fn mock_identity_is_fixed() {
        assert_eq!(mock_user_id().to_string(), MOCK_USER_ID);
    }
}
