//! Queue ordering and position calculation for pending jobs.
//!
//! One comparator defines the total order used everywhere: priority
//! descending, then creation time ascending, then job ID as the final
//! deterministic tie-break. The listing sorted with [`queue_order`] and the
//! rank computed by [`position_of`] therefore always agree: position 1 is
//! the head of the sorted listing.

use std::cmp::Ordering;

use pythia_core::Job;

/// Total order over pending jobs.
#[must_use]
pub fn queue_order(a: &Job, b: &Job) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Sorts a pending snapshot into queue order.
#[must_use]
pub fn sorted(mut jobs: Vec<Job>) -> Vec<Job> {
    jobs.sort_by(queue_order);
    jobs
}

/// 1-based rank of a job within a pending snapshot.
///
/// The rank counts jobs strictly ahead in the total order, whether the job
/// itself appears in the snapshot or not.
#[must_use]
pub fn position_of(job: &Job, pending: &[Job]) -> usize {
    1 + pending
        .iter()
        .filter(|other| other.id != job.id && queue_order(other, job) == Ordering::Less)
        .count()
}
