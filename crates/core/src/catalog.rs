//! Model catalog.
//!
//! An explicit, immutable configuration object mapping short model keys
//! (as submitted by HTTP clients) to provider model references and their
//! default input parameters. Built once at startup and shared read-only.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::error::CoreError;
use crate::types::{JobKind, JobRequest, ModelRef};

/// Upper bound (exclusive) for randomly chosen diffusion seeds.
const MAX_SEED: u32 = 1_000_000;

/// One model the service knows how to drive.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogEntry {
    pub key: String,
    pub kind: JobKind,
    pub model: ModelRef,
    /// Input field that receives the user's prompt, if the model takes one.
    pub prompt_field: Option<String>,
    /// Input field that receives an upstream image URL (image-to-video).
    pub image_field: Option<String>,
    /// Default input parameters merged into every request.
    #[serde(skip)]
    pub defaults: Map<String, Value>,
    /// Whether a random `seed` is injected when the caller gives none.
    #[serde(skip)]
    pub random_seed: bool,
}

impl CatalogEntry {
    /// Build a request from the defaults, the optional prompt and a seed.
    pub fn build_request(&self, prompt: Option<&str>) -> Result<JobRequest, CoreError> {
        let mut request = JobRequest {
            model: self.model.clone(),
            input: self.defaults.clone(),
        };

        match (&self.prompt_field, prompt) {
            (Some(field), Some(prompt)) => {
                if prompt.trim().is_empty() {
                    return Err(CoreError::Validation("Prompt must not be empty".into()));
                }
                request.input.insert(field.clone(), Value::from(prompt));
            }
            (Some(_), None) => {
                return Err(CoreError::Validation(format!(
                    "Model '{}' requires a prompt",
                    self.key
                )));
            }
            (None, _) => {}
        }

        if self.random_seed && !request.input.contains_key("seed") {
            request
                .input
                .insert("seed".into(), Value::from(rand::random_range(0..MAX_SEED)));
        }

        Ok(request)
    }
}

/// Keyed set of [`CatalogEntry`] values plus per-kind defaults.
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    entries: BTreeMap<String, CatalogEntry>,
    default_image: String,
    default_video: String,
}

impl ModelCatalog {
    /// Create a catalog. Both defaults must name entries of the right kind.
    pub fn new(
        entries: impl IntoIterator<Item = CatalogEntry>,
        default_image: impl Into<String>,
        default_video: impl Into<String>,
    ) -> Result<Self, CoreError> {
        let catalog = Self {
            entries: entries
                .into_iter()
                .map(|entry| (entry.key.clone(), entry))
                .collect(),
            default_image: default_image.into(),
            default_video: default_video.into(),
        };

        catalog.expect_kind(&catalog.default_image, JobKind::ImageGeneration)?;
        catalog.expect_kind(&catalog.default_video, JobKind::VideoGeneration)?;
        Ok(catalog)
    }

    /// Look up an entry by key.
    pub fn get(&self, key: &str) -> Result<&CatalogEntry, CoreError> {
        self.entries.get(key).ok_or_else(|| CoreError::NotFound {
            entity: "Model",
            key: key.to_string(),
        })
    }

    /// Look up an entry and check that it produces the expected kind.
    pub fn expect_kind(&self, key: &str, kind: JobKind) -> Result<&CatalogEntry, CoreError> {
        let entry = self.get(key)?;
        if entry.kind != kind {
            return Err(CoreError::Validation(format!(
                "Model '{key}' is a {} model, expected {kind}",
                entry.kind
            )));
        }
        Ok(entry)
    }

    /// Resolve an optional key to an entry, falling back to the kind default.
    pub fn resolve(&self, key: Option<&str>, kind: JobKind) -> Result<&CatalogEntry, CoreError> {
        let key = key.unwrap_or(match kind {
            JobKind::ImageGeneration => self.default_image.as_str(),
            JobKind::VideoGeneration => self.default_video.as_str(),
        });
        self.expect_kind(key, kind)
    }

    pub fn entries(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.values()
    }
}

impl Default for ModelCatalog {
    /// The models the generation servers have been run against.
    fn default() -> Self {
        let entries = vec![
            CatalogEntry {
                key: "sdxl".into(),
                kind: JobKind::ImageGeneration,
                model: ModelRef::Version(
                    "39ed52f2a78e934b3ba6e2a89f5b1c712de7dfea535525255b1aa35c5565e08b".into(),
                ),
                prompt_field: Some("prompt".into()),
                image_field: None,
                defaults: object(json!({
                    "negative_prompt": "low quality, blurry, distorted",
                    "width": 768,
                    "height": 1344,
                    "num_outputs": 1,
                    "scheduler": "K_EULER",
                    "num_inference_steps": 25,
                    "guidance_scale": 7.5,
                })),
                random_seed: true,
            },
            CatalogEntry {
                key: "flux-schnell".into(),
                kind: JobKind::ImageGeneration,
                model: ModelRef::Official {
                    owner: "black-forest-labs".into(),
                    name: "flux-schnell".into(),
                },
                prompt_field: Some("prompt".into()),
                image_field: None,
                defaults: object(json!({
                    "aspect_ratio": "9:16",
                    "num_outputs": 1,
                    "output_format": "png",
                })),
                random_seed: true,
            },
            CatalogEntry {
                key: "sdxl-lightning".into(),
                kind: JobKind::ImageGeneration,
                model: ModelRef::Version(
                    "727e49a643e999d602a896c774a0658ffefea21465756a6ce24b7ea4165eba6a".into(),
                ),
                prompt_field: Some("prompt".into()),
                image_field: None,
                defaults: object(json!({
                    "width": 768,
                    "height": 1344,
                    "num_outputs": 1,
                    "num_inference_steps": 4,
                })),
                random_seed: true,
            },
            CatalogEntry {
                key: "stable-video-diffusion".into(),
                kind: JobKind::VideoGeneration,
                model: ModelRef::Version(
                    "3f0457e4619daac51203dedb472816fd4af51f3149fa7a9e0b5ffcf1b8172438".into(),
                ),
                prompt_field: None,
                image_field: Some("input_image".into()),
                defaults: object(json!({
                    "video_length": "14_frames_with_svd",
                    "frames_per_second": 6,
                    "motion_bucket_id": 127,
                    "cond_aug": 0.02,
                    "decoding_t": 7,
                })),
                random_seed: true,
            },
            CatalogEntry {
                key: "animate-diff".into(),
                kind: JobKind::VideoGeneration,
                model: ModelRef::Version(
                    "beecf59c4aee8d81bf04f0381033dfa10dc16e845b4ae00d281e2fa377e48a9f".into(),
                ),
                prompt_field: Some("prompt".into()),
                image_field: None,
                defaults: object(json!({
                    "negative_prompt": "low quality, worst quality, blurry",
                    "num_frames": 16,
                    "num_inference_steps": 25,
                    "guidance_scale": 7.5,
                })),
                random_seed: true,
            },
        ];

        Self {
            entries: entries
                .into_iter()
                .map(|entry| (entry.key.clone(), entry))
                .collect(),
            default_image: "sdxl".into(),
            default_video: "stable-video-diffusion".into(),
        }
    }
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
