#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Map, Value};
use shortgen_api::config::{PollDefaults, ServerConfig};
use shortgen_api::registry::JobRegistry;
use shortgen_api::router::build_app_router;
use shortgen_api::sink::OutputSink;
use shortgen_api::state::AppState;
use shortgen_core::catalog::{CatalogEntry, ModelCatalog};
use shortgen_core::provider::{ProviderAdapter, StatusCheckError, StatusReport, SubmissionError};
use shortgen_core::types::{JobKind, JobRequest, ModelRef};
use shortgen_pipeline::PollConfig;
use shortgen_replicate::ReplicateConfig;
use tower::ServiceExt;

pub const IMAGE_URL: &str = "https://cdn.test/img.png";
pub const VIDEO_URL: &str = "https://cdn.test/vid.mp4";

/// Provider stub whose behaviour depends on the submitted model version:
///
/// - `imgv1`, `vidv1`, `t2vv1` succeed on the first check
/// - `brokenv1` fails with a provider error
/// - `slowv1` never finishes
/// - `rejectv1` is refused at submission
#[derive(Debug, Default)]
pub struct StubAdapter {
    submitted: Mutex<Vec<JobRequest>>,
}

impl StubAdapter {
    pub fn submitted(&self) -> Vec<JobRequest> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProviderAdapter for StubAdapter {
    fn name(&self) -> &str {
        "stub"
    }

    async fn submit(&self, request: &JobRequest) -> Result<String, SubmissionError> {
        let model = request.model.to_string();
        self.submitted.lock().unwrap().push(request.clone());
        if model == "rejectv1" {
            return Err(SubmissionError::Rejected {
                status: 422,
                body: r#"{"detail":"Invalid version or not permitted"}"#.into(),
            });
        }
        Ok(format!("pred-{model}"))
    }

    async fn check_status(&self, job_id: &str) -> Result<StatusReport, StatusCheckError> {
        let report = match job_id.trim_start_matches("pred-") {
            "imgv1" => StatusReport::succeeded("succeeded", json!([IMAGE_URL])),
            "vidv1" | "t2vv1" => StatusReport::succeeded("succeeded", json!(VIDEO_URL)),
            "brokenv1" => StatusReport::failed("failed", json!("NSFW content detected")),
            _ => StatusReport::pending("processing"),
        };
        Ok(report)
    }
}

fn entry(
    key: &str,
    kind: JobKind,
    version: &str,
    prompt_field: Option<&str>,
    image_field: Option<&str>,
) -> CatalogEntry {
    CatalogEntry {
        key: key.into(),
        kind,
        model: ModelRef::Version(version.into()),
        prompt_field: prompt_field.map(String::from),
        image_field: image_field.map(String::from),
        defaults: Map::new(),
        random_seed: false,
    }
}

pub fn test_catalog() -> ModelCatalog {
    let image = JobKind::ImageGeneration;
    let video = JobKind::VideoGeneration;
    ModelCatalog::new(
        [
            entry("img", image, "imgv1", Some("prompt"), None),
            entry("broken", image, "brokenv1", Some("prompt"), None),
            entry("slow", image, "slowv1", Some("prompt"), None),
            entry("reject", image, "rejectv1", Some("prompt"), None),
            entry("vid", video, "vidv1", None, Some("input_image")),
            entry("t2v", video, "t2vv1", Some("prompt"), None),
        ],
        "img",
        "vid",
    )
    .unwrap()
}

/// Build a test `ServerConfig`: no sleeping between status checks and a
/// three-attempt budget.
pub fn test_config(output_dir: Option<&Path>) -> ServerConfig {
    let poll = PollConfig::new(Duration::ZERO, 3);
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        provider: ReplicateConfig::new("test-token"),
        poll: PollDefaults {
            image: poll,
            video: poll,
        },
        output_dir: output_dir.map(Path::to_path_buf),
        download_outputs: false,
    }
}

/// Build the full application router with all middleware layers.
pub fn build_test_app(adapter: Arc<StubAdapter>, output_dir: Option<&Path>) -> Router {
    let config = test_config(output_dir);
    let state = AppState {
        config: Arc::new(config.clone()),
        adapter,
        catalog: Arc::new(test_catalog()),
        jobs: Arc::new(JobRegistry::default()),
        sink: output_dir.map(|dir| Arc::new(OutputSink::new(dir))),
    };
    build_app_router(state, &config)
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
