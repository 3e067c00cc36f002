//! Gateway routes against a mocked analytics API.

use actix_web::{http::StatusCode, test, web, App};
use classsight_config::{GatewaySettings, MOCK_USER_ID};
use classsight_gateway::{configure_app, state::GatewayState};
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const INSTRUCTOR_ID: &str = "6f9619ff-8b86-d011-b42d-00c04fc964ff";

fn state(fastapi_url: &str) -> web::Data<GatewayState> {
    let settings = GatewaySettings {
        fastapi_url: fastapi_url.to_string(),
        upstream_timeout_secs: 5,
        ..GatewaySettings::default()
    };
    web::Data::new(GatewayState::new(settings).expect("http client"))
}

macro_rules! gateway {
    ($url:expr) => {
        test::init_service(App::new().app_data(state($url)).configure(configure_app)).await
    };
}

#[actix_web::test]
async fn injects_fallback_identity() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/dashboard/kpis"))
        .and(header("x-user-id", MOCK_USER_ID))
        .and(header("x-user-role", "admin"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "total_sessions": 4 })))
        .expect(1)
        .mount(&server)
        .await;

    let app = gateway!(&server.uri());
    let req = test::TestRequest::post().uri("/api/dashboard/kpis").set_json(json!({})).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!({ "total_sessions": 4 }));
}

#[actix_web::test]
async fn caller_identity_and_query_forwarded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dashboard/heatmap-data"))
        .and(query_param("bootcampId", "2"))
        .and(query_param("timeGranularity", "hour"))
        .and(header("x-user-id", INSTRUCTOR_ID))
        .and(header("x-user-role", "instructor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "day_of_week": 1, "hour": 9, "value": 80.0 }])))
        .expect(1)
        .mount(&server)
        .await;

    let app = gateway!(&server.uri());
    let req = test::TestRequest::get()
        .uri("/api/heatmap-data?bootcampId=2&timeGranularity=hour")
        .insert_header(("x-user-id", INSTRUCTOR_ID))
        .insert_header(("x-user-role", "instructor"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body[0]["hour"], 9);
}

#[actix_web::test]
async fn overview_lifts_filters_into_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dashboard"))
        .and(query_param("bootcamp_id", "3"))
        .and(query_param("granularity", "weekly"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "kpis": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let app = gateway!(&server.uri());
    let req = test::TestRequest::post()
        .uri("/api/dashboard")
        .set_json(json!({ "bootcamp_id": 3, "granularity": "weekly", "start": null }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[actix_web::test]
async fn chart_filters_sanitized_before_forwarding() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/dashboard/attendance-chart"))
        .and(body_json(json!({ "bootcamp_ids": [1, 2], "instructor_ids": ["u1"], "granularity": "daily" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let app = gateway!(&server.uri());
    let req = test::TestRequest::post()
        .uri("/api/dashboard/attendance-chart")
        .set_json(json!({ "bootcamp_ids": [1, "2", null, "x"], "instructor_ids": ["u1", "", null], "granularity": "daily" }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[actix_web::test]
async fn upstream_failure_becomes_route_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/dashboard/kpis"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let app = gateway!(&server.uri());
    let req = test::TestRequest::post().uri("/api/dashboard/kpis").set_json(json!({})).to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body, json!({ "error": "Failed to fetch KPI data" }));
}

#[actix_web::test]
async fn grade_distribution_degrades_to_empty() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/dashboard/grade-distribution"))
        .and(body_json(json!([])))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let app = gateway!(&server.uri());
    let req = test::TestRequest::post()
        .uri("/api/dashboard/grade-distribution")
        .set_json(json!({}))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["distribution"], json!([]));
    assert_eq!(body["stats"]["count"], 0);
}

#[actix_web::test]
async fn grade_distribution_renames_items() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/dashboard/grade-distribution"))
        .and(body_json(json!([5])))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{ "range": "90-100", "count": 3 }],
            "stats": { "avg": 91.0, "min": 90.0, "max": 93.0, "count": 3 }
        })))
        .mount(&server)
        .await;

    let app = gateway!(&server.uri());
    let req = test::TestRequest::post()
        .uri("/api/dashboard/grade-distribution")
        .set_json(json!({ "bootcamp_ids": [5] }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["distribution"][0]["range"], "90-100");
    assert_eq!(body["stats"]["avg"], 91.0);
}

#[actix_web::test]
async fn leaderboard_reranked_with_tiers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/dashboard/leaderboard"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "leaderboard_students": [
                { "id": "a", "name": "A", "value": 70.0, "rank": 9 },
                { "id": "b", "name": "B", "value": 90.0, "rank": 9 },
                { "id": "c", "name": "C", "value": 90.0, "rank": 9 },
                { "id": "d", "name": "D", "value": 40.0, "rank": 9 }
            ]
        })))
        .mount(&server)
        .await;

    let app = gateway!(&server.uri());
    let req = test::TestRequest::post()
        .uri("/api/dashboard/leaderboard")
        .set_json(json!({ "bootcamp_ids": null }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    let ranks: Vec<i64> = body["leaderboard_students"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["rank"].as_i64().unwrap())
        .collect();
    assert_eq!(ranks, vec![1, 1, 3, 4]);
    assert_eq!(body["leaderboard_instructors"], json!([]));
    assert_eq!(body["tiers"]["students"][0], json!({ "name": "Top 25%", "value": 2 }));
}

#[actix_web::test]
async fn bootcamp_errors_keep_upstream_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dashboard/bootcamps"))
        .and(query_param("include_completed", "false"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Admin access required"))
        .mount(&server)
        .await;

    let app = gateway!(&server.uri());
    let req = test::TestRequest::get().uri("/api/dashboard/bootcamps").to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["error"], "FastAPI error: Admin access required");
}

#[actix_web::test]
async fn correlation_gets_summary() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dashboard/correlation-analysis"))
        .and(query_param("bootcampId", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "scatter": [
                { "x_value": 60.0, "y_value": 70.0, "label": "s1", "size": 1, "category": "c" },
                { "x_value": 80.0, "y_value": 60.0, "label": "s2", "size": 1, "category": "c" }
            ],
            "matrix": [
                { "variable1": "attendance", "variable2": "grades", "correlation": 0.82, "sample_size": 40, "significance": "high" }
            ]
        })))
        .mount(&server)
        .await;

    let app = gateway!(&server.uri());
    let req = test::TestRequest::get().uri("/api/correlation-analysis?bootcampId=1").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["matrix"][0]["correlation"], 0.82);
    assert_eq!(body["summary"]["matrix"]["strong"], 1);
    assert_eq!(body["summary"]["scatter_strength"], "strong");
}

#[actix_web::test]
async fn assistant_reply_reshaped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/assistant/query"))
        .and(body_json(json!({ "query": "How is attendance?", "rag_system": "vector", "session_id": null, "bootcamp_id": null })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "session_id": "0b7f3f4e-9f5c-4a44-9a51-8d8f5f5b2f10",
            "answer": "Attendance is steady.",
            "sources": [{ "source": "vector" }],
            "tokens_used": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    let app = gateway!(&server.uri());
    let req = test::TestRequest::post()
        .uri("/api/assistant")
        .set_json(json!({ "message": "How is attendance?", "conversation_history": [] }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["response"], "Attendance is steady.");
    assert_eq!(body["sources"][0]["source"], "vector");
    assert_eq!(body["session_id"], "0b7f3f4e-9f5c-4a44-9a51-8d8f5f5b2f10");
}

#[actix_web::test]
async fn assistant_failure_apologizes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/assistant/query"))
        .respond_with(ResponseTemplate::new(422))
        .mount(&server)
        .await;

    let app = gateway!(&server.uri());
    let req = test::TestRequest::post()
        .uri("/api/assistant")
        .set_json(json!({ "message": "" }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["error"], "Failed to process request");
    assert!(body["response"].as_str().unwrap().starts_with("I apologize"));
    assert_eq!(body["sources"], json!([]));
}

#[actix_web::test]
async fn health_reports_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "version": "1.0.0" })))
        .mount(&server)
        .await;

    let app = gateway!(&server.uri());
    let body: Value =
        test::call_and_read_body_json(&app, test::TestRequest::get().uri("/api/health").to_request()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["fastapi_url"], server.uri());
    assert_eq!(body["fastapi_health"]["ok"], true);
}

#[actix_web::test]
async fn health_unavailable_when_upstream_down() {
    let app = gateway!("http://127.0.0.1:1");
    let res = test::call_service(&app, test::TestRequest::get().uri("/api/health").to_request()).await;
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "Cannot connect to FastAPI");
}

#[actix_web::test]
async fn versioned_passthrough_keeps_status_and_query() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/grades/12"))
        .and(query_param("dry_run", "1"))
        .and(body_json(json!({ "score": 200 })))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "detail": "Score cannot exceed maximum score of 100" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let app = gateway!(&server.uri());
    let req = test::TestRequest::patch()
        .uri("/api/v1/grades/12?dry_run=1")
        .set_json(json!({ "score": 200 }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["detail"], "Score cannot exceed maximum score of 100");
}

#[actix_web::test]
async fn mock_login_and_registration() {
    let app = gateway!("http://127.0.0.1:1");

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": "admin@classsight.io", "password": "secret", "role": "admin" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["user_id"], MOCK_USER_ID);
    assert_eq!(body["role"], "admin");

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": "nope", "password": "secret" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({
            "first_name": "Grace", "last_name": "Hopper", "email": "grace@classsight.io",
            "password": "compiler1", "confirm_password": "compiler1", "terms_accepted": true
        }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["role"], "instructor");
    assert_eq!(body["status"], "pending");
}
