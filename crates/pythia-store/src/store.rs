//! The job store contract.

use pythia_core::{Job, JobId};

use crate::error::Result;

/// Abstraction over persisted job records.
///
/// Implementations wrap whatever storage actually holds the records (an
/// in-memory map, a relational table, a KV namespace); the engine only
/// relies on the contract below. Two rules matter:
///
/// 1. [`update_if`](JobStore::update_if) is a true compare-and-swap: the
///    predicate is evaluated and the mutation applied in one critical
///    section with respect to that job. A SQL implementation would express
///    this as `UPDATE ... WHERE id = ? AND <predicate>` with an
///    affected-row check.
/// 2. A rejected predicate is reported as a typed error, never applied
///    partially and never degraded into a blind overwrite.
pub trait JobStore: Send + Sync {
    /// Persists a new job record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AlreadyExists`](crate::StoreError::AlreadyExists)
    /// if a record with this ID is already present.
    fn create(&self, job: Job) -> Result<()>;

    /// Fetches a snapshot of one job.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`](crate::StoreError::NotFound) if no
    /// record exists.
    fn get(&self, id: &JobId) -> Result<Job>;

    /// Atomically updates a job if the predicate holds.
    ///
    /// The predicate sees the current record and the mutation is applied to
    /// that same record without any interleaved write. Returns the record as
    /// it stands after the mutation.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`](crate::StoreError::NotFound) if no
    /// record exists, or
    /// [`StoreError::PredicateFailed`](crate::StoreError::PredicateFailed)
    /// if the predicate rejected the current record.
    fn update_if(
        &self,
        id: &JobId,
        predicate: &dyn Fn(&Job) -> bool,
        mutate: &dyn Fn(&mut Job),
    ) -> Result<Job>;

    /// Snapshot of all currently Pending jobs, in no particular order.
    fn list_pending(&self) -> Vec<Job>;

    /// Snapshot of every job record.
    fn snapshot(&self) -> Vec<Job>;
}
