//! REST API client for the Replicate HTTP endpoints.
//!
//! Wraps prediction creation, prediction lookup and artifact download
//! using [`reqwest`].

use std::path::Path;
use std::time::Duration;

use futures::StreamExt;
use shortgen_core::types::{JobRequest, ModelRef};
use tokio::io::AsyncWriteExt;

use crate::messages::{ErrorDetail, Prediction};

/// Public Replicate API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.replicate.com";

/// Connection settings for [`ReplicateApi`].
#[derive(Debug, Clone)]
pub struct ReplicateConfig {
    /// API token sent as `Authorization: Token <token>`.
    pub api_token: String,
    /// Base URL without trailing slash, e.g. `https://api.replicate.com`.
    pub base_url: String,
    /// Per-request timeout applied to every call.
    pub request_timeout: Duration,
}

impl ReplicateConfig {
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// HTTP client for the Replicate prediction API.
#[derive(Debug, Clone)]
pub struct ReplicateApi {
    client: reqwest::Client,
    base_url: String,
    api_token: String,
}

/// Errors from the Replicate REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum ReplicateApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Replicate returned a non-2xx status code.
    #[error("Replicate API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// A 2xx body that did not match the expected shape.
    #[error("Unexpected response body: {0}")]
    Decode(String),

    /// Writing a downloaded artifact failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReplicateApi {
    /// Create a client with its own connection pool.
    pub fn new(config: ReplicateConfig) -> Result<Self, ReplicateApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self::with_client(client, config))
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, config: ReplicateConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Create a prediction.
    ///
    /// Pinned versions go through `POST /v1/predictions` with a `version`
    /// field; official models through
    /// `POST /v1/models/{owner}/{name}/predictions`.
    pub async fn create_prediction(
        &self,
        request: &JobRequest,
    ) -> Result<Prediction, ReplicateApiError> {
        let (url, body) = match &request.model {
            ModelRef::Version(version) => (
                format!("{}/v1/predictions", self.base_url),
                serde_json::json!({
                    "version": version,
                    "input": request.input,
                }),
            ),
            ModelRef::Official { owner, name } => (
                format!("{}/v1/models/{owner}/{name}/predictions", self.base_url),
                serde_json::json!({
                    "input": request.input,
                }),
            ),
        };

        let response = self
            .client
            .post(url)
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .json(&body)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Fetch the current state of a prediction.
    ///
    /// Sends a `GET /v1/predictions/{id}` request.
    pub async fn get_prediction(&self, id: &str) -> Result<Prediction, ReplicateApiError> {
        let response = self
            .client
            .get(format!("{}/v1/predictions/{id}", self.base_url))
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Stream a produced artifact into `dest`, creating parent directories.
    ///
    /// Returns the number of bytes written. Delivery URLs are public, so no
    /// auth header is sent.
    pub async fn download(&self, url: &str, dest: &Path) -> Result<u64, ReplicateApiError> {
        let response = Self::ensure_success(self.client.get(url).send().await?).await?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        tracing::debug!(url, path = %dest.display(), bytes = written, "Downloaded artifact");
        Ok(written)
    }

    // ---- private helpers ----

    fn auth_header(&self) -> String {
        format!("Token {}", self.api_token)
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`ReplicateApiError::ApiError`]
    /// containing the status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ReplicateApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            if let Ok(detail) = serde_json::from_str::<ErrorDetail>(&body) {
                tracing::warn!(status = status.as_u16(), detail = %detail.detail, "Replicate rejected request");
            }
            return Err(ReplicateApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    ///
    /// The body is read as text first so that a shape mismatch is reported
    /// as [`ReplicateApiError::Decode`] rather than a transport failure.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ReplicateApiError> {
        let response = Self::ensure_success(response).await?;
        let text = response.text().await?;
        serde_json::from_str::<T>(&text).map_err(|e| ReplicateApiError::Decode(format!("{e}: {text}")))
    }
}
