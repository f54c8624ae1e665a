//! Integration tests for the inline generation endpoints.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use common::{body_json, post_json, StubAdapter, IMAGE_URL, VIDEO_URL};
use serde_json::json;

#[tokio::test]
async fn image_generation_returns_resolved_url() {
    let adapter = Arc::new(StubAdapter::default());
    let app = common::build_test_app(adapter.clone(), None);

    let response = post_json(app, "/api/v1/generate/image", json!({"prompt": "a lake at dawn"})).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["image_url"], IMAGE_URL);
    assert_eq!(json["data"]["job"]["state"], "succeeded");
    assert_eq!(json["data"]["job"]["attempts"], 1);

    let submitted = adapter.submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].input["prompt"], "a lake at dawn");
}

#[tokio::test]
async fn empty_prompt_is_rejected() {
    let adapter = Arc::new(StubAdapter::default());
    let app = common::build_test_app(adapter.clone(), None);

    let response = post_json(app, "/api/v1/generate/image", json!({"prompt": ""})).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert!(adapter.submitted().is_empty());
}

#[tokio::test]
async fn unknown_model_returns_404() {
    let app = common::build_test_app(Arc::new(StubAdapter::default()), None);

    let response = post_json(
        app,
        "/api/v1/generate/image",
        json!({"prompt": "a lake", "model": "nope"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "Model 'nope' not found");
}

#[tokio::test]
async fn video_model_for_image_endpoint_is_rejected() {
    let app = common::build_test_app(Arc::new(StubAdapter::default()), None);

    let response = post_json(
        app,
        "/api/v1/generate/image",
        json!({"prompt": "a lake", "model": "vid"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn provider_failure_maps_to_bad_gateway_with_message() {
    let app = common::build_test_app(Arc::new(StubAdapter::default()), None);

    let response = post_json(
        app,
        "/api/v1/generate/image",
        json!({"prompt": "a lake", "model": "broken"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = body_json(response).await;
    assert_eq!(json["code"], "JOB_FAILED");
    assert_eq!(json["error"], "Provider reported failure: NSFW content detected");
}

#[tokio::test]
async fn rejected_submission_keeps_provider_body() {
    let app = common::build_test_app(Arc::new(StubAdapter::default()), None);

    let response = post_json(
        app,
        "/api/v1/generate/image",
        json!({"prompt": "a lake", "model": "reject"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let message = body_json(response).await["error"].as_str().unwrap().to_string();
    assert!(message.contains("422"));
    assert!(message.contains("Invalid version or not permitted"));
}

#[tokio::test]
async fn never_finishing_job_maps_to_gateway_timeout() {
    let app = common::build_test_app(Arc::new(StubAdapter::default()), None);

    let response = post_json(
        app,
        "/api/v1/generate/image",
        json!({"prompt": "a lake", "model": "slow"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    let json = body_json(response).await;
    assert_eq!(json["code"], "JOB_TIMED_OUT");
    assert_eq!(json["error"], "Job did not finish within 3 status checks");
}

#[tokio::test]
async fn video_pipeline_chains_image_into_video_model() {
    let adapter = Arc::new(StubAdapter::default());
    let app = common::build_test_app(adapter.clone(), None);

    let response = post_json(app, "/api/v1/generate/video", json!({"prompt": "a lake"})).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["image_url"], IMAGE_URL);
    assert_eq!(json["data"]["video_url"], VIDEO_URL);
    assert_eq!(json["data"]["jobs"].as_array().unwrap().len(), 2);

    let submitted = adapter.submitted();
    assert_eq!(submitted.len(), 2);
    assert_eq!(submitted[1].input["input_image"], IMAGE_URL);
    assert!(!submitted[1].input.contains_key("prompt"));
}

#[tokio::test]
async fn failed_image_stage_never_submits_video() {
    let adapter = Arc::new(StubAdapter::default());
    let app = common::build_test_app(adapter.clone(), None);

    let response = post_json(
        app,
        "/api/v1/generate/video",
        json!({"prompt": "a lake", "image_model": "broken"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(adapter.submitted().len(), 1);
}

#[tokio::test]
async fn video_model_without_image_input_is_rejected() {
    let adapter = Arc::new(StubAdapter::default());
    let app = common::build_test_app(adapter.clone(), None);

    let response = post_json(
        app,
        "/api/v1/generate/video",
        json!({"prompt": "a lake", "video_model": "t2v"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(adapter.submitted().is_empty());
}

#[tokio::test]
async fn finished_generation_is_recorded_to_output_dir() {
    let dir = tempfile::tempdir().unwrap();
    let app = common::build_test_app(Arc::new(StubAdapter::default()), Some(dir.path()));

    let response = post_json(app, "/api/v1/generate/image", json!({"prompt": "a lake"})).await;
    assert_eq!(response.status(), StatusCode::OK);

    let records: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(records.len(), 1);
    let record: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&records[0]).unwrap()).unwrap();
    assert_eq!(record["kind"], "image");
    assert_eq!(record["prompt"], "a lake");
    assert_eq!(record["outputs"][0], IMAGE_URL);
    assert_eq!(record["jobs"][0]["state"], "succeeded");
}

#[tokio::test]
async fn still_video_rejects_invalid_duration_before_running_ffmpeg() {
    let dir = tempfile::tempdir().unwrap();
    let app = common::build_test_app(Arc::new(StubAdapter::default()), Some(dir.path()));

    let response = post_json(
        app,
        "/api/v1/generate/still-video",
        json!({"image_url": IMAGE_URL, "duration_secs": 0}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn still_video_rejects_local_image_paths() {
    let dir = tempfile::tempdir().unwrap();

    for image_url in ["/etc/hosts", "file:///etc/hosts", "concat:/a.png|/b.png"] {
        let app = common::build_test_app(Arc::new(StubAdapter::default()), Some(dir.path()));
        let response = post_json(
            app,
            "/api/v1/generate/still-video",
            json!({"image_url": image_url}),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{image_url}");
        assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
    }
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
