//! Caller identity from the `x-user-id` / `x-user-role` headers set by the gateway.

use actix_web::{
    dev::Payload,
    http::{header::HeaderMap, StatusCode},
    FromRequest, HttpRequest, HttpResponse, ResponseError,
};
use classsight_models::{ErrorResponse, UserContext, UserRole};
use classsight_observability::log_security;
use std::future::{ready, Ready};
use std::ops::Deref;
use thiserror::Error;
use uuid::Uuid;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("Missing authentication headers. Please log in.")]
    Missing,
    #[error("Invalid user ID format")]
    InvalidUserId,
    #[error("Invalid user role")]
    InvalidRole,
    #[error("Admin access required")]
    AdminRequired,
}

impl IdentityError {
    fn code(&self) -> &'static str {
        match self {
            IdentityError::Missing => "MISSING_IDENTITY",
            IdentityError::InvalidUserId => "INVALID_USER_ID",
            IdentityError::InvalidRole => "INVALID_ROLE",
            IdentityError::AdminRequired => "FORBIDDEN",
        }
    }
}

impl ResponseError for IdentityError {
    fn status_code(&self) -> StatusCode {
        match self {
            IdentityError::AdminRequired => StatusCode::FORBIDDEN,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse::new(self.to_string(), Some(self.code())))
    }
}

pub fn identity_from_headers(headers: &HeaderMap) -> Result<UserContext, IdentityError> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    let (raw_id, raw_role) = match (header(USER_ID_HEADER), header(USER_ROLE_HEADER)) {
        (Some(id), Some(role)) => (id, role),
        _ => return Err(IdentityError::Missing),
    };

    let user_id = Uuid::parse_str(raw_id).map_err(|_| IdentityError::InvalidUserId)?;
    let role = raw_role.parse::<UserRole>().map_err(|_| IdentityError::InvalidRole)?;

    Ok(UserContext { user_id, role })
}

pub fn identity_from_request(req: &HttpRequest) -> Result<UserContext, IdentityError> {
    identity_from_headers(req.headers()).map_err(|e| {
        log_security!("identity_rejected", path = req.path(), reason = e.to_string());
        e
    })
}

pub fn is_admin(user: &UserContext) -> bool {
    user.is_admin()
}

pub fn is_instructor(user: &UserContext) -> bool {
    user.is_instructor()
}

/// Admins see every bootcamp; instructors only their assignments.
pub fn can_access_all_bootcamps(user: &UserContext) -> bool {
    is_admin(user)
}

/// Any authenticated caller.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserContext);

impl Deref for CurrentUser {
    type Target = UserContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequest for CurrentUser {
    type Error = IdentityError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(identity_from_request(req).map(CurrentUser))
    }
}

/// Caller with the admin role; instructors get 403.
#[derive(Debug, Clone)]
pub struct AdminUser(pub UserContext);

impl Deref for AdminUser {
    type Target = UserContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequest for AdminUser {
    type Error = IdentityError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let result = identity_from_request(req).and_then(|user| {
            if is_admin(&user) {
                Ok(AdminUser(user))
            } else {
                log_security!("admin_required", user_id = user.user_id, path = req.path());
                Err(IdentityError::AdminRequired)
            }
        });
        ready(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{body::to_bytes, test::TestRequest};

    const ADMIN_ID: &str = "550e8400-e29b-41d4-a716-446655440000";

    fn request(id: Option<&str>, role: Option<&str>) -> HttpRequest {
        let mut req = TestRequest::default();
        if let Some(id) = id {
            req = req.insert_header((USER_ID_HEADER, id));
        }
        if let Some(role) = role {
            req = req.insert_header((USER_ROLE_HEADER, role));
        }
        req.to_http_request()
    }

    #[test]
    fn missing_headers_rejected() {
        assert_eq!(identity_from_request(&request(None, Some("admin"))), Err(IdentityError::Missing));
        assert_eq!(identity_from_request(&request(Some(ADMIN_ID), None)), Err(IdentityError::Missing));
        assert_eq!(identity_from_request(&request(Some(""), Some("admin"))), Err(IdentityError::Missing));
    }

    #[test]
    fn malformed_identity_rejected() {
        assert_eq!(identity_from_request(&request(Some("1"), Some("admin"))), Err(IdentityError::InvalidUserId));
        assert_eq!(identity_from_request(&request(Some(ADMIN_ID), Some("student"))), Err(IdentityError::InvalidRole));
    }

    #[test]
    fn valid_identity_parsed() {
        let user = identity_from_request(&request(Some(ADMIN_ID), Some("instructor"))).unwrap();
        assert_eq!(user.user_id.to_string(), ADMIN_ID);
        assert!(is_instructor(&user));
        assert!(!can_access_all_bootcamps(&user));
    }

    #[actix_web::test]
    async fn admin_extractor_forbids_instructors() {
        let req = request(Some(ADMIN_ID), Some("instructor"));
        let err = AdminUser::from_request(&req, &mut Payload::None).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);

        let body = to_bytes(err.error_response().into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["detail"], "Admin access required");

        let admin = request(Some(ADMIN_ID), Some("admin"));
        let user = AdminUser::from_request(&admin, &mut Payload::None).await.unwrap();
        assert!(user.is_admin());
    }

    #[test]
    fn missing_identity_is_unauthorized() {
        assert_eq!(IdentityError::Missing.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(IdentityError::InvalidRole.status_code(), StatusCode::UNAUTHORIZED);
    }
}
