//! The marketplace engine façade.
//!
//! Composes admission control, pricing, queue ordering, lease management,
//! and submission validation over a shared job store. One engine instance
//! is shared across all request-handling threads; every mutation it makes
//! goes through the store's atomic conditional update.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use pythia_core::{
    Actor, Job, JobId, JobStatus, PredictionRequest, PrincipalId, PRIORITY_MAX, PRIORITY_MIN,
};
use pythia_store::{JobStore, MemoryJobStore, StoreError};
use serde_json::Value;
use tracing::{debug, info};

use crate::admission::AdmissionController;
use crate::config::MarketConfig;
use crate::error::{MarketError, Result};
use crate::lease::{ClaimReceipt, LeaseManager};
use crate::pricing;
use crate::queue;
use crate::submission::{SubmissionOutcome, SubmissionValidator};

/// The marketplace engine: submit, list, claim, submit-result, release,
/// cancel.
pub struct MarketplaceEngine {
    store: Arc<dyn JobStore>,
    config: MarketConfig,
    admission: AdmissionController,
    leases: LeaseManager,
    submissions: SubmissionValidator,
}

impl MarketplaceEngine {
    /// Creates an engine over the given store.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::InvalidConfig`] if the configuration fails
    /// validation.
    pub fn new(store: Arc<dyn JobStore>, config: MarketConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            admission: AdmissionController::new(config.max_active_per_owner),
            leases: LeaseManager::new(store.clone(), config.clone()),
            submissions: SubmissionValidator::new(store.clone(), config.clone()),
            store,
            config,
        })
    }

    /// Creates an engine over a fresh in-memory store.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::InvalidConfig`] if the configuration fails
    /// validation.
    pub fn in_memory(config: MarketConfig) -> Result<Self> {
        Self::new(Arc::new(MemoryJobStore::new()), config)
    }

    /// The engine's configuration.
    #[must_use]
    pub const fn config(&self) -> &MarketConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────
    // Intake
    // ─────────────────────────────────────────────────────────────

    /// Submits a new prediction job for an owner.
    ///
    /// # Errors
    ///
    /// [`MarketError::InvalidRequest`], [`MarketError::CapacityExceeded`]
    /// (no job record is created and the owner's count is unchanged), or
    /// [`MarketError::CostExceeded`] when the estimate exceeds the caller's
    /// ceiling.
    pub fn submit(&self, owner: &PrincipalId, request: PredictionRequest) -> Result<Job> {
        self.submit_at(owner, request, Utc::now())
    }

    /// [`submit`](Self::submit) with an explicit clock.
    pub fn submit_at(
        &self,
        owner: &PrincipalId,
        request: PredictionRequest,
        now: DateTime<Utc>,
    ) -> Result<Job> {
        validate_request(&request)?;

        if !self.admission.try_admit(owner) {
            return Err(MarketError::CapacityExceeded {
                owner: owner.clone(),
                limit: self.admission.limit(),
            });
        }

        // Every failure past this point must hand the admission slot back.
        let estimated = pricing::estimate(&request);
        if let Some(max) = request.max_cost {
            if estimated > max {
                self.admission.release(owner);
                return Err(MarketError::CostExceeded { estimated, max });
            }
        }

        let job = Job::new(owner.clone(), request, estimated, now);
        if let Err(e) = self.store.create(job.clone()) {
            self.admission.release(owner);
            return Err(e.into());
        }

        info!(job_id = %job.id, owner = %owner, cost = estimated, priority = job.priority, "job submitted");
        Ok(job)
    }

    // ─────────────────────────────────────────────────────────────
    // Queue views
    // ─────────────────────────────────────────────────────────────

    /// Snapshot of one job.
    ///
    /// # Errors
    ///
    /// [`MarketError::NotFound`] if no record exists.
    pub fn get(&self, job_id: &JobId) -> Result<Job> {
        Ok(self.store.get(job_id)?)
    }

    /// Pending jobs in queue order: priority descending, then creation
    /// time, then job ID.
    #[must_use]
    pub fn list_pending(&self) -> Vec<Job> {
        queue::sorted(self.store.list_pending())
    }

    /// 1-based queue position of a Pending job.
    ///
    /// # Errors
    ///
    /// [`MarketError::NotFound`], or [`MarketError::Conflict`] if the job
    /// is not Pending.
    pub fn queue_position(&self, job_id: &JobId) -> Result<usize> {
        let job = self.store.get(job_id)?;
        if job.status != JobStatus::Pending {
            return Err(MarketError::Conflict {
                job_id: job.id,
                status: job.status,
            });
        }
        Ok(queue::position_of(&job, &self.store.list_pending()))
    }

    // ─────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────

    /// Claims a Pending job for an evaluator.
    ///
    /// # Errors
    ///
    /// See [`LeaseManager::claim`].
    pub fn claim(&self, job_id: &JobId, claimant: &PrincipalId) -> Result<ClaimReceipt> {
        self.claim_at(job_id, claimant, Utc::now())
    }

    /// [`claim`](Self::claim) with an explicit clock.
    pub fn claim_at(
        &self,
        job_id: &JobId,
        claimant: &PrincipalId,
        now: DateTime<Utc>,
    ) -> Result<ClaimReceipt> {
        self.leases.claim(job_id, claimant, now)
    }

    /// Submits a result for a claimed job and settles payment.
    ///
    /// # Errors
    ///
    /// See [`SubmissionValidator::submit_result`].
    pub fn submit_result(
        &self,
        job_id: &JobId,
        claimant: &PrincipalId,
        payload: Value,
        reported_quality: Option<f64>,
    ) -> Result<SubmissionOutcome> {
        self.submit_result_at(job_id, claimant, payload, reported_quality, Utc::now())
    }

    /// [`submit_result`](Self::submit_result) with an explicit clock.
    pub fn submit_result_at(
        &self,
        job_id: &JobId,
        claimant: &PrincipalId,
        payload: Value,
        reported_quality: Option<f64>,
        now: DateTime<Utc>,
    ) -> Result<SubmissionOutcome> {
        let (job, outcome) =
            self.submissions
                .submit_result(job_id, claimant, payload, reported_quality, now)?;
        self.admission.release(&job.owner_id);
        Ok(outcome)
    }

    /// Releases a Processing job back to the queue.
    ///
    /// # Errors
    ///
    /// See [`LeaseManager::release`].
    pub fn release(
        &self,
        job_id: &JobId,
        actor: &Actor,
        reason: impl Into<String>,
        details: Option<String>,
    ) -> Result<Job> {
        self.release_at(job_id, actor, reason, details, Utc::now())
    }

    /// [`release`](Self::release) with an explicit clock.
    pub fn release_at(
        &self,
        job_id: &JobId,
        actor: &Actor,
        reason: impl Into<String>,
        details: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Job> {
        self.leases.release(job_id, actor, reason, details, now)
    }

    /// Cancels a Pending job with a full refund of the estimate.
    ///
    /// # Errors
    ///
    /// See [`LeaseManager::cancel`].
    pub fn cancel(&self, job_id: &JobId, actor: &Actor) -> Result<Job> {
        self.cancel_at(job_id, actor, Utc::now())
    }

    /// [`cancel`](Self::cancel) with an explicit clock.
    pub fn cancel_at(&self, job_id: &JobId, actor: &Actor, now: DateTime<Utc>) -> Result<Job> {
        let job = self.leases.cancel(job_id, actor, now)?;
        self.admission.release(&job.owner_id);
        Ok(job)
    }

    /// Marks a Processing job as Failed with a full refund.
    ///
    /// # Errors
    ///
    /// See [`LeaseManager::fail`].
    pub fn fail(&self, job_id: &JobId, actor: &Actor, reason: impl Into<String>) -> Result<Job> {
        let job = self.leases.fail(job_id, actor, reason)?;
        self.admission.release(&job.owner_id);
        Ok(job)
    }

    /// Updates the priority of a Pending job.
    ///
    /// The actor must be the job's owner or an administrator.
    ///
    /// # Errors
    ///
    /// [`MarketError::InvalidRequest`] (priority out of range),
    /// [`MarketError::NotFound`], [`MarketError::Conflict`] (not Pending),
    /// or [`MarketError::Forbidden`].
    pub fn update_priority(
        &self,
        job_id: &JobId,
        actor: &Actor,
        new_priority: u8,
    ) -> Result<Job> {
        if !(PRIORITY_MIN..=PRIORITY_MAX).contains(&new_priority) {
            return Err(MarketError::InvalidRequest {
                reason: format!(
                    "priority must be {PRIORITY_MIN}-{PRIORITY_MAX}, got {new_priority}"
                ),
            });
        }

        let outcome = self.store.update_if(
            job_id,
            &|j| j.status == JobStatus::Pending && (actor.is_admin() || j.owner_id == actor.id),
            &|j| j.priority = new_priority,
        );

        match outcome {
            Ok(job) => {
                debug!(job_id = %job.id, priority = new_priority, "priority updated");
                Ok(job)
            }
            Err(StoreError::PredicateFailed {
                job_id,
                status: JobStatus::Pending,
            }) => Err(MarketError::Forbidden {
                job_id,
                actor: actor.id.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Releases every lease expired past the grace period. See
    /// [`LeaseManager::release_expired`].
    pub fn release_expired(&self) -> Vec<JobId> {
        self.release_expired_at(Utc::now())
    }

    /// [`release_expired`](Self::release_expired) with an explicit clock.
    pub fn release_expired_at(&self, now: DateTime<Utc>) -> Vec<JobId> {
        self.leases.release_expired(now)
    }

    // ─────────────────────────────────────────────────────────────
    // Admission views
    // ─────────────────────────────────────────────────────────────

    /// Current active-job count for an owner.
    #[must_use]
    pub fn active_jobs_for(&self, owner: &PrincipalId) -> u32 {
        self.admission.active_for(owner)
    }

    /// Rebuilds the admission counters from the store.
    ///
    /// Useful after a restart, or when the store is shared by several
    /// engine instances and the in-memory counters have drifted.
    pub fn recount_admissions(&self) {
        let snapshot = self.store.snapshot();
        self.admission.recount(snapshot.iter());
    }
}

/// Structural validation of an incoming request.
fn validate_request(request: &PredictionRequest) -> Result<()> {
    if request.symbol.trim().is_empty() {
        return Err(MarketError::InvalidRequest {
            reason: "symbol cannot be empty".into(),
        });
    }
    if !(PRIORITY_MIN..=PRIORITY_MAX).contains(&request.priority) {
        return Err(MarketError::InvalidRequest {
            reason: format!(
                "priority must be {PRIORITY_MIN}-{PRIORITY_MAX}, got {}",
                request.priority
            ),
        });
    }
    if request.horizon_days == 0 {
        return Err(MarketError::InvalidRequest {
            reason: "horizon must be at least one day".into(),
        });
    }
    if let Some(max) = request.max_cost {
        if !max.is_finite() || max <= 0.0 {
            return Err(MarketError::InvalidRequest {
                reason: "max_cost must be a positive amount".into(),
            });
        }
    }
    Ok(())
}
