pub mod generation;
pub mod jobs;
pub mod models;
pub mod outputs;
pub mod still_video;

use shortgen_pipeline::{Job, OutputRef};

use crate::sink::{GenerationRecord, OutputSink};

/// Write a finished generation to the sink, if one is configured.
///
/// Sink failures are logged and never fail the request.
pub(crate) async fn record_generation(
    sink: Option<&OutputSink>,
    kind: &str,
    prompt: Option<&str>,
    outputs: &[OutputRef],
    jobs: &[Job],
) {
    let Some(sink) = sink else {
        return;
    };
    let record = GenerationRecord {
        kind,
        prompt,
        outputs,
        jobs,
        created_at: chrono::Utc::now(),
    };
    if let Err(e) = sink.write(&record).await {
        tracing::warn!(kind, error = %e, "Failed to record generation");
    }
}
