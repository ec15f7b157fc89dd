//! Per-owner admission control.
//!
//! Tracks how many non-terminal jobs each owner currently has and rejects
//! intake past the configured cap. Counters live in process memory under a
//! single lock; [`AdmissionController::recount`] rebuilds them from a store
//! snapshot when the counters and the store need to be re-synchronized
//! (process restart, or a horizontally-scaled deployment treating the store
//! as the source of truth).

use std::collections::HashMap;

use parking_lot::Mutex;
use pythia_core::{Job, PrincipalId};
use tracing::debug;

/// Per-owner counter of concurrently active (Pending or Processing) jobs.
#[derive(Debug)]
pub struct AdmissionController {
    limit: u32,
    active: Mutex<HashMap<PrincipalId, u32>>,
}

impl AdmissionController {
    /// Creates a controller with the given per-owner cap.
    #[must_use]
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            active: Mutex::new(HashMap::new()),
        }
    }

    /// The configured per-owner cap.
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Atomically checks the owner's count and increments it if below the
    /// cap.
    ///
    /// Returns false when the owner is already at the limit; the caller
    /// must then reject the submission without creating a job record.
    #[must_use]
    pub fn try_admit(&self, owner: &PrincipalId) -> bool {
        let mut active = self.active.lock();
        let count = active.entry(owner.clone()).or_insert(0);
        if *count >= self.limit {
            debug!(owner = %owner, count = *count, limit = self.limit, "admission rejected");
            return false;
        }
        *count += 1;
        true
    }

    /// Releases one admission slot for the owner.
    ///
    /// Safe to call for an untracked owner; the count never goes negative.
    pub fn release(&self, owner: &PrincipalId) {
        let mut active = self.active.lock();
        if let Some(count) = active.get_mut(owner) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                active.remove(owner);
            }
        }
    }

    /// Current active count for an owner.
    #[must_use]
    pub fn active_for(&self, owner: &PrincipalId) -> u32 {
        let active = self.active.lock();
        active.get(owner).copied().unwrap_or(0)
    }

    /// Rebuilds every counter from a job snapshot, counting jobs whose
    /// status still occupies an admission slot.
    pub fn recount<'a>(&self, jobs: impl IntoIterator<Item = &'a Job>) {
        let mut rebuilt: HashMap<PrincipalId, u32> = HashMap::new();
        for job in jobs {
            if job.status.is_active() {
                *rebuilt.entry(job.owner_id.clone()).or_insert(0) += 1;
            }
        }
        let mut active = self.active.lock();
        *active = rebuilt;
    }
}
