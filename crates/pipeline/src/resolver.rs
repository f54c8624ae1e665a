//! Success payload normalisation.
//!
//! Providers return a finished job's output as a bare string, a list of
//! strings, or an object carrying a `url` field, depending on the model.
//! [`resolve`] turns any of those into one [`OutputRef`].

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Schemes accepted as output references.
const ACCEPTED_SCHEMES: &[&str] = &["https://", "http://", "data:"];

/// Field inspected on object-shaped payloads.
const URL_FIELD: &str = "url";

/// A normalised reference to a produced artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputRef(String);

impl OutputRef {
    /// Validate a candidate reference.
    pub fn parse(candidate: &str) -> Result<Self, ResolveError> {
        let candidate = candidate.trim();
        let lower = candidate.to_ascii_lowercase();
        let has_body = ACCEPTED_SCHEMES
            .iter()
            .any(|scheme| lower.starts_with(scheme) && candidate.len() > scheme.len());
        if !has_body {
            return Err(ResolveError::UnrecognizedOutputFormat(format!(
                "'{candidate}' is not an http(s) or data reference"
            )));
        }
        Ok(Self(candidate.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for OutputRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Shape of a raw provider payload, classified before resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawOutput<'a> {
    Sequence(&'a [Value]),
    Reference(&'a str),
    Object(&'a Map<String, Value>),
    Other(&'a Value),
}

impl<'a> RawOutput<'a> {
    pub fn classify(raw: &'a Value) -> Self {
        match raw {
            Value::Array(items) => RawOutput::Sequence(items),
            Value::String(s) => RawOutput::Reference(s),
            Value::Object(map) => RawOutput::Object(map),
            other => RawOutput::Other(other),
        }
    }

    fn describe(&self) -> String {
        match self {
            RawOutput::Sequence(items) if items.is_empty() => "empty sequence".into(),
            RawOutput::Sequence(_) => "sequence".into(),
            RawOutput::Reference(_) => "string".into(),
            RawOutput::Object(_) => format!("object without a string '{URL_FIELD}' field"),
            RawOutput::Other(Value::Null) => "null".into(),
            RawOutput::Other(v) => format!("unsupported value {v}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "type", content = "detail", rename_all = "snake_case")]
pub enum ResolveError {
    #[error("Unrecognized output format: {0}")]
    UnrecognizedOutputFormat(String),
}

/// Normalise a provider success payload into a single [`OutputRef`].
///
/// Rule order: a non-empty sequence yields its first element, a string is
/// used directly, an object yields its `url` field. The chosen value must
/// carry an accepted scheme. Pure and idempotent.
pub fn resolve(raw: &Value) -> Result<OutputRef, ResolveError> {
    let shape = RawOutput::classify(raw);
    match shape {
        RawOutput::Sequence([first, ..]) => resolve_element(first),
        RawOutput::Reference(s) => OutputRef::parse(s),
        RawOutput::Object(map) => match map.get(URL_FIELD) {
            Some(Value::String(url)) => OutputRef::parse(url),
            _ => Err(unrecognized(&shape)),
        },
        RawOutput::Sequence([]) | RawOutput::Other(_) => Err(unrecognized(&shape)),
    }
}

/// Resolve the first element of a sequence: a string or a url-object.
fn resolve_element(element: &Value) -> Result<OutputRef, ResolveError> {
    match RawOutput::classify(element) {
        RawOutput::Reference(s) => OutputRef::parse(s),
        RawOutput::Object(map) => match map.get(URL_FIELD) {
            Some(Value::String(url)) => OutputRef::parse(url),
            _ => Err(ResolveError::UnrecognizedOutputFormat(
                "first sequence element has no string 'url' field".into(),
            )),
        },
        other => Err(ResolveError::UnrecognizedOutputFormat(format!(
            "first sequence element is a {}",
            other.describe()
        ))),
    }
}

fn unrecognized(shape: &RawOutput<'_>) -> ResolveError {
    ResolveError::UnrecognizedOutputFormat(shape.describe())
}
