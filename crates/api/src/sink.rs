//! JSON output sink.
//!
//! Every finished generation is written to
//! `<dir>/<label>-<timestamp>.json`. With downloads enabled the produced
//! artifacts are fetched next to the record as
//! `<label>-<timestamp>-<n>.<ext>`. Records can be listed and read back by
//! bare file name.

use std::path::{Path, PathBuf};

use serde::Serialize;
use shortgen_core::types::Timestamp;
use shortgen_pipeline::{Job, OutputRef};
use shortgen_replicate::{ReplicateApi, ReplicateApiError};

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Invalid record name '{0}'")]
    InvalidName(String),

    #[error("Failed to download {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: ReplicateApiError,
    },
}

/// One persisted generation.
#[derive(Debug, Serialize)]
pub struct GenerationRecord<'a> {
    pub kind: &'a str,
    pub prompt: Option<&'a str>,
    pub outputs: &'a [OutputRef],
    pub jobs: &'a [Job],
    pub created_at: Timestamp,
}

/// Paths written for one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkReceipt {
    pub record: PathBuf,
    pub artifacts: Vec<PathBuf>,
}

/// Listing entry for one stored record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordSummary {
    pub name: String,
    pub size_bytes: u64,
    pub modified: Option<Timestamp>,
}

pub struct OutputSink {
    dir: PathBuf,
    downloader: Option<ReplicateApi>,
}

impl OutputSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            downloader: None,
        }
    }

    /// Also download every http(s) output through `api`.
    pub fn with_downloads(mut self, api: ReplicateApi) -> Self {
        self.downloader = Some(api);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn write(&self, record: &GenerationRecord<'_>) -> Result<SinkReceipt, SinkError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let stem = format!(
            "{}-{}",
            record.kind,
            record.created_at.format("%Y%m%dT%H%M%S%.3fZ")
        );
        let path = self.dir.join(format!("{stem}.json"));
        tokio::fs::write(&path, serde_json::to_vec_pretty(record)?).await?;

        let mut artifacts = Vec::new();
        if let Some(api) = &self.downloader {
            for (index, output) in record.outputs.iter().enumerate() {
                let url = output.as_str();
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    continue;
                }
                let dest = self
                    .dir
                    .join(format!("{stem}-{index}.{}", extension_of(url)));
                api.download(url, &dest)
                    .await
                    .map_err(|source| SinkError::Download {
                        url: url.to_string(),
                        source,
                    })?;
                artifacts.push(dest);
            }
        }

        tracing::info!(path = %path.display(), artifacts = artifacts.len(), "Generation recorded");
        Ok(SinkReceipt {
            record: path,
            artifacts,
        })
    }

    /// Every stored JSON record, newest first. A missing directory lists
    /// as empty.
    pub async fn list(&self) -> Result<Vec<RecordSummary>, SinkError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !is_record_name(&name) {
                continue;
            }
            let meta = entry.metadata().await?;
            if !meta.is_file() {
                continue;
            }
            records.push(RecordSummary {
                name,
                size_bytes: meta.len(),
                modified: meta.modified().ok().map(Timestamp::from),
            });
        }
        records.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| b.name.cmp(&a.name)));
        Ok(records)
    }

    /// Parsed content of the record `name`, `None` when it does not exist.
    pub async fn read(&self, name: &str) -> Result<Option<serde_json::Value>, SinkError> {
        if !is_record_name(name) {
            return Err(SinkError::InvalidName(name.to_string()));
        }
        let bytes = match tokio::fs::read(self.dir.join(name)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }
}

/// A bare `*.json` file name: no separators, no leading dot.
fn is_record_name(name: &str) -> bool {
    name.len() > ".json".len()
        && name.ends_with(".json")
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// File extension from the last path segment of a URL, `bin` if none.
fn extension_of(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let segment = path.rsplit('/').next().unwrap_or(path);
    match segment.rsplit_once('.') {
        Some((name, ext))
            if !name.is_empty()
                && !ext.is_empty()
                && ext.len() <= 5
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            ext
        }
        _ => "bin",
    }
}
