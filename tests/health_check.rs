#[macro_use]
mod common;

use actix_web::test;
use chrono::DateTime;

use common::test_state;

#[actix_web::test]
async fn test_health_check() {
    let state = test_state();
    let app = test_app!(state);

    // Send request without any credentials
    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let body = test::read_body(resp).await;
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json["status"], "healthy");
    assert!(DateTime::parse_from_rfc3339(json["timestamp"].as_str().unwrap()).is_ok());
    assert_eq!(json["store"]["kind"], "memory");
    assert!(json["store"].get("pool").is_none());
}

#[actix_web::test]
async fn test_service_info() {
    let state = test_state();
    let app = test_app!(state);

    let req = test::TestRequest::get().uri("/").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let body = test::read_body(resp).await;
    assert_eq!(body, "TravelEase server running...");
}

#[actix_web::test]
async fn test_unknown_route_requires_token() {
    let state = test_state();
    let app = test_app!(state);

    let req = test::TestRequest::get().uri("/admin/stats").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::UNAUTHORIZED);
}
