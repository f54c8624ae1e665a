use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// The kind of work a job performs.
///
/// Used to pick poll defaults (video jobs run much longer than image jobs)
/// and to label logs, events and sink records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobKind {
    ImageGeneration,
    VideoGeneration,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::ImageGeneration => "image-generation",
            JobKind::VideoGeneration => "video-generation",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image-generation" | "image" => Ok(JobKind::ImageGeneration),
            "video-generation" | "video" => Ok(JobKind::VideoGeneration),
            other => Err(CoreError::Validation(format!(
                "Unknown job kind '{other}'. Must be one of: image-generation, video-generation"
            ))),
        }
    }
}

/// Reference to a hosted model.
///
/// Providers address models either by an immutable version hash or by an
/// `owner/name` pair that always targets the latest published version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ModelRef {
    /// A pinned model version hash.
    Version(String),
    /// An official model addressed by owner and name.
    Official { owner: String, name: String },
}

impl FromStr for ModelRef {
    type Err = CoreError;

    /// Accepts `"<hash>"`, `"owner/name"` and `"owner/name:<hash>"`.
    ///
    /// The pinned form keeps only the version hash since that is all the
    /// provider needs to address it.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(CoreError::Validation("Model reference is empty".into()));
        }

        let (path, version) = match s.split_once(':') {
            Some((path, version)) => (path, Some(version)),
            None => (s, None),
        };

        if let Some(version) = version {
            let path_ok = path
                .split_once('/')
                .is_some_and(|(owner, name)| is_model_segment(owner) && is_model_segment(name));
            let version_ok =
                !version.is_empty() && version.chars().all(|c| c.is_ascii_alphanumeric());
            if !path_ok || !version_ok {
                return Err(CoreError::Validation(format!(
                    "Invalid model reference '{s}'"
                )));
            }
            return Ok(ModelRef::Version(version.to_string()));
        }

        match path.split_once('/') {
            Some((owner, name)) if is_model_segment(owner) && is_model_segment(name) => {
                Ok(ModelRef::Official {
                    owner: owner.to_string(),
                    name: name.to_string(),
                })
            }
            Some(_) => Err(CoreError::Validation(format!(
                "Invalid model reference '{s}'"
            ))),
            None if path.chars().all(|c| c.is_ascii_alphanumeric()) => {
                Ok(ModelRef::Version(path.to_string()))
            }
            None => Err(CoreError::Validation(format!(
                "Invalid model reference '{s}'"
            ))),
        }
    }
}

fn is_model_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

impl fmt::Display for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelRef::Version(v) => f.write_str(v),
            ModelRef::Official { owner, name } => write!(f, "{owner}/{name}"),
        }
    }
}

impl From<ModelRef> for String {
    fn from(model: ModelRef) -> Self {
        model.to_string()
    }
}

impl TryFrom<String> for ModelRef {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// The opaque input payload of a job: which model to run and with what
/// parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRequest {
    pub model: ModelRef,
    pub input: serde_json::Map<String, serde_json::Value>,
}

impl JobRequest {
    pub fn new(model: ModelRef) -> Self {
        Self {
            model,
            input: serde_json::Map::new(),
        }
    }

    /// Set a single input parameter, replacing any previous value.
    pub fn with_input(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.input.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn parses_bare_version_hash() {
        let model: ModelRef = "39ed52f2a78e934b3ba6e2a89f5b1c71".parse().unwrap();
        assert_eq!(
            model,
            ModelRef::Version("39ed52f2a78e934b3ba6e2a89f5b1c71".into())
        );
    }

    #[test]
    fn parses_official_owner_name() {
        let model: ModelRef = "black-forest-labs/flux-schnell".parse().unwrap();
        assert_eq!(
            model,
            ModelRef::Official {
                owner: "black-forest-labs".into(),
                name: "flux-schnell".into(),
            }
        );
        assert_eq!(model.to_string(), "black-forest-labs/flux-schnell");
    }

    #[test]
    fn pinned_reference_keeps_only_version() {
        let model: ModelRef = "stability-ai/sdxl:39ed52f2a78e".parse().unwrap();
        assert_eq!(model, ModelRef::Version("39ed52f2a78e".into()));
    }

    #[test]
    fn rejects_malformed_references() {
        assert_matches!("".parse::<ModelRef>(), Err(CoreError::Validation(_)));
        assert_matches!("owner/".parse::<ModelRef>(), Err(CoreError::Validation(_)));
        assert_matches!("a/b:".parse::<ModelRef>(), Err(CoreError::Validation(_)));
        assert_matches!("not a model".parse::<ModelRef>(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn pinned_reference_validates_owner_and_name() {
        for s in ["a/b c:39ed52", "a:39ed52", "a/:39ed52", "/b:39ed52", "a/b:39 ed"] {
            assert_matches!(s.parse::<ModelRef>(), Err(CoreError::Validation(_)), "{s}");
        }
    }

    #[test]
    fn job_kind_serializes_kebab_case() {
        let json = serde_json::to_string(&JobKind::VideoGeneration).unwrap();
        assert_eq!(json, "\"video-generation\"");
        assert_eq!("image".parse::<JobKind>().unwrap(), JobKind::ImageGeneration);
    }

    #[test]
    fn job_request_round_trips_model_as_string() {
        let request = JobRequest::new("owner/model".parse().unwrap()).with_input("prompt", "a lake");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "owner/model");
        assert_eq!(json["input"]["prompt"], "a lake");
    }
}
