//! In-memory registry of background jobs.
//!
//! Keys are time-ordered UUIDv7 values, so iterating the map walks jobs
//! from oldest to newest. Once more than `capacity` jobs are tracked the
//! oldest finished ones are evicted; running jobs are never evicted.

use std::collections::BTreeMap;

use shortgen_pipeline::{Job, JobHandle};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Default number of jobs kept for status lookups.
pub const DEFAULT_CAPACITY: usize = 1024;

pub struct JobRegistry {
    jobs: RwLock<BTreeMap<Uuid, JobHandle>>,
    capacity: usize,
}

impl JobRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            jobs: RwLock::new(BTreeMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Track a spawned job and return its registry id.
    pub async fn insert(&self, handle: JobHandle) -> Uuid {
        let id = Uuid::now_v7();
        let mut jobs = self.jobs.write().await;
        jobs.insert(id, handle);

        let overflow = jobs.len().saturating_sub(self.capacity);
        if overflow > 0 {
            let evict: Vec<Uuid> = jobs
                .iter()
                .filter(|(_, handle)| handle.is_finished())
                .map(|(id, _)| *id)
                .take(overflow)
                .collect();
            for id in &evict {
                jobs.remove(id);
            }
            tracing::debug!(evicted = evict.len(), tracked = jobs.len(), "Evicted finished jobs");
        }
        id
    }

    /// Latest snapshot of a tracked job.
    pub async fn snapshot(&self, id: &Uuid) -> Option<Job> {
        self.jobs.read().await.get(id).map(JobHandle::snapshot)
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Stop polling every job still running. Used at shutdown.
    pub async fn abort_all(&self) {
        let jobs = self.jobs.read().await;
        let running = jobs.values().filter(|h| !h.is_finished()).count();
        for handle in jobs.values() {
            handle.abort();
        }
        tracing::info!(running, "Aborted background jobs");
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
