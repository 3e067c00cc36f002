use actix_cors::Cors;
use actix_web::http::{header, Method};
use tracing::debug;

const ALLOWED_METHODS: [Method; 6] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::OPTIONS,
];

/// CORS policy for the configured browser origins.
///
/// A single `*` entry allows any origin; credentials are then disabled since
/// browsers refuse the combination.
pub fn cors(origins: &[String]) -> Cors {
    let mut cors = Cors::default()
        .allowed_methods(ALLOWED_METHODS)
        .allow_any_header()
        .expose_headers([header::HeaderName::from_static("x-request-id")])
        .max_age(3600);

    if origins.iter().any(|o| o == "*") {
        debug!("CORS allowing any origin");
        return cors.allow_any_origin();
    }

    for origin in origins {
        debug!(origin = %origin, "CORS origin allowed");
        cors = cors.allowed_origin(origin);
    }
    cors.supports_credentials()
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test, web, App, HttpResponse};

    #[actix_web::test]
    async fn preflight_from_configured_origin_allowed() {
        let origins = vec!["http://localhost:3000".to_string()];
        let app = test::init_service(
            App::new()
                .wrap(cors(&origins))
                .route("/dashboard", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;

        let req = test::TestRequest::default()
            .method(Method::OPTIONS)
            .uri("/dashboard")
            .insert_header((header::ORIGIN, "http://localhost:3000"))
            .insert_header((header::ACCESS_CONTROL_REQUEST_METHOD, "PATCH"))
            .to_request();
        let res = test::call_service(&app, req).await;

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            res.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:3000"
        );
        assert_eq!(res.headers().get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(), "true");
    }

    #[actix_web::test]
    async fn unknown_origin_gets_no_allow_header() {
        let origins = vec!["http://localhost:3000".to_string()];
        let app = test::init_service(
            App::new()
                .wrap(cors(&origins))
                .route("/dashboard", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/dashboard")
            .insert_header((header::ORIGIN, "http://evil.example"))
            .to_request();
        let res = test::try_call_service(&app, req).await;

        match res {
            Ok(res) => assert!(res.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none()),
            Err(err) => assert_eq!(err.as_response_error().status_code(), StatusCode::BAD_REQUEST),
        }
    }
}
