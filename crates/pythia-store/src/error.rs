//! Error types for pythia-store.

use pythia_core::{JobId, JobStatus};
use thiserror::Error;

/// Result alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No job record exists under the given ID.
    #[error("job not found: {0}")]
    NotFound(JobId),

    /// A record with this ID already exists.
    #[error("job already exists: {0}")]
    AlreadyExists(JobId),

    /// The conditional update's predicate rejected the current record.
    ///
    /// This is the losing side of a compare-and-swap race: the record
    /// changed between the caller's read and its write. The status carried
    /// here is the one observed inside the critical section.
    #[error("conditional update rejected for job {job_id}: status is {status}")]
    PredicateFailed {
        /// The job whose update was rejected.
        job_id: JobId,
        /// Status observed at the moment of the rejected write.
        status: JobStatus,
    },
}
