//! Error types for pythia-market.
//!
//! Every variant is a per-request outcome surfaced to the caller unchanged;
//! nothing here is fatal to the process. Losing a conditional-update race
//! maps to [`MarketError::Conflict`], never to a crash or a silent
//! overwrite.

use chrono::{DateTime, Utc};
use pythia_core::{JobId, JobStatus, PrincipalId};
use pythia_store::StoreError;
use thiserror::Error;

/// Result alias for marketplace operations.
pub type Result<T> = std::result::Result<T, MarketError>;

/// Errors that can occur in marketplace operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MarketError {
    /// Referenced job does not exist.
    #[error("job not found: {0}")]
    NotFound(JobId),

    /// Operation invalid for the job's current status.
    #[error("operation invalid for job {job_id}: status is {status}")]
    Conflict {
        /// The job the operation targeted.
        job_id: JobId,
        /// Status observed when the operation was rejected.
        status: JobStatus,
    },

    /// Actor is not authorized for the requested mutation.
    #[error("actor {actor} is not authorized to act on job {job_id}")]
    Forbidden {
        /// The job the operation targeted.
        job_id: JobId,
        /// The unauthorized actor.
        actor: PrincipalId,
    },

    /// Job exceeded its admission window before being claimed.
    #[error("job {job_id} exceeded its admission window and can no longer be claimed")]
    Expired {
        /// The job that aged out.
        job_id: JobId,
    },

    /// Submission arrived after lease expiry; the job remains Processing.
    #[error("lease on job {job_id} expired at {lease_expires_at}")]
    LeaseTimeout {
        /// The job whose lease ran out.
        job_id: JobId,
        /// When the lease expired.
        lease_expires_at: DateTime<Utc>,
    },

    /// Owner is already at the concurrent-job limit.
    #[error("owner {owner} already has {limit} active jobs")]
    CapacityExceeded {
        /// The owner whose submission was rejected.
        owner: PrincipalId,
        /// The configured limit.
        limit: u32,
    },

    /// Estimated cost exceeds the caller-supplied ceiling.
    #[error("estimated cost {estimated:.2} exceeds ceiling {max:.2}")]
    CostExceeded {
        /// The engine's estimate.
        estimated: f64,
        /// The caller's ceiling.
        max: f64,
    },

    /// Request failed structural validation.
    #[error("invalid request: {reason}")]
    InvalidRequest {
        /// What was wrong with the request.
        reason: String,
    },

    /// Engine configuration failed validation.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// What was wrong with the configuration.
        reason: String,
    },

    /// Store failure that does not map to a marketplace outcome.
    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for MarketError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => Self::NotFound(id),
            StoreError::PredicateFailed { job_id, status } => Self::Conflict { job_id, status },
            other => Self::Store(other),
        }
    }
}
