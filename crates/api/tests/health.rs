//! Integration tests for the health check endpoint and general HTTP behaviour.

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use common::{body_json, get, StubAdapter};
use tower::ServiceExt;

#[tokio::test]
async fn health_check_returns_ok_with_json() {
    let app = common::build_test_app(Arc::new(StubAdapter::default()), None);
    let response = get(app, "/health").await;

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert_eq!(json["provider"], "stub");
    assert_eq!(json["tracked_jobs"], 0);
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let app = common::build_test_app(Arc::new(StubAdapter::default()), None);
    let response = get(app, "/this-route-does-not-exist").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn response_contains_x_request_id_header() {
    let app = common::build_test_app(Arc::new(StubAdapter::default()), None);
    let response = get(app, "/health").await;

    let request_id = response
        .headers()
        .get("x-request-id")
        .expect("Response must contain an x-request-id header");
    assert_eq!(request_id.to_str().unwrap().len(), 36);
}

#[tokio::test]
async fn cors_preflight_returns_correct_headers() {
    let app = common::build_test_app(Arc::new(StubAdapter::default()), None);

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/v1/generate/image")
        .header("Origin", "http://localhost:5173")
        .header("Access-Control-Request-Method", "POST")
        .header("Access-Control-Request-Headers", "content-type")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "http://localhost:5173"
    );
}

#[tokio::test]
async fn models_lists_catalog_entries() {
    let app = common::build_test_app(Arc::new(StubAdapter::default()), None);
    let response = get(app, "/api/v1/models").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let models = json["data"].as_array().unwrap();
    assert_eq!(models.len(), 6);
    let vid = models.iter().find(|m| m["key"] == "vid").unwrap();
    assert_eq!(vid["kind"], "video-generation");
    assert_eq!(vid["model"], "vidv1");
    assert_eq!(vid["image_field"], "input_image");
}

#[tokio::test]
async fn cors_exposes_request_id_without_credentials() {
    let app = common::build_test_app(Arc::new(StubAdapter::default()), None);

    let request = Request::builder()
        .method(Method::GET)
        .uri("/health")
        .header("Origin", "http://localhost:5173")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(
        headers.get("access-control-expose-headers").unwrap(),
        "x-request-id"
    );
    assert!(headers.get("access-control-allow-credentials").is_none());
}
