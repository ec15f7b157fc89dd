//! In-memory reference implementation of the job store.

use std::collections::HashMap;

use parking_lot::RwLock;
use pythia_core::{Job, JobId, JobStatus};
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::store::JobStore;

/// Job store backed by a lock-guarded map.
///
/// The map's write lock is held for the whole read-modify-write of
/// [`update_if`](JobStore::update_if), which gives every job-level update
/// compare-and-swap semantics without per-record locks.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl MemoryJobStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.read().len()
    }

    /// Returns true when no records are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.read().is_empty()
    }
}

impl JobStore for MemoryJobStore {
    fn create(&self, job: Job) -> Result<()> {
        let mut jobs = self.jobs.write();
        if jobs.contains_key(&job.id) {
            return Err(StoreError::AlreadyExists(job.id));
        }
        debug!(job_id = %job.id, owner = %job.owner_id, "job record created");
        jobs.insert(job.id, job);
        Ok(())
    }

    fn get(&self, id: &JobId) -> Result<Job> {
        let jobs = self.jobs.read();
        jobs.get(id).cloned().ok_or(StoreError::NotFound(*id))
    }

    fn update_if(
        &self,
        id: &JobId,
        predicate: &dyn Fn(&Job) -> bool,
        mutate: &dyn Fn(&mut Job),
    ) -> Result<Job> {
        let mut jobs = self.jobs.write();
        let job = jobs.get_mut(id).ok_or(StoreError::NotFound(*id))?;
        if !predicate(job) {
            return Err(StoreError::PredicateFailed {
                job_id: *id,
                status: job.status,
            });
        }
        mutate(job);
        Ok(job.clone())
    }

    fn list_pending(&self) -> Vec<Job> {
        let jobs = self.jobs.read();
        jobs.values()
            .filter(|j| j.status == JobStatus::Pending)
            .cloned()
            .collect()
    }

    fn snapshot(&self) -> Vec<Job> {
        let jobs = self.jobs.read();
        jobs.values().cloned().collect()
    }
}
