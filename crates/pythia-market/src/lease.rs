//! Lease management: claiming, releasing, cancelling, failing, and the
//! expired-lease sweep.
//!
//! Every transition is one atomic conditional update against the store, so
//! concurrent callers racing on the same job cannot both win: the loser's
//! predicate fails inside the store's critical section and surfaces as a
//! typed error.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use pythia_core::{Actor, Job, JobId, JobStatus, PrincipalId};
use pythia_store::{JobStore, StoreError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::MarketConfig;
use crate::error::{MarketError, Result};

/// Release reason recorded by the expired-lease sweep.
pub const LEASE_EXPIRED_REASON: &str = "lease_expired";

/// What a successful claim hands back to the evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimReceipt {
    /// The claimed job.
    pub job_id: JobId,
    /// The evaluator now holding the lease.
    pub claimant_id: PrincipalId,
    /// When the claim was acquired.
    pub claimed_at: DateTime<Utc>,
    /// When the lease expires.
    pub lease_expires_at: DateTime<Utc>,
    /// Cost estimate snapshot for the evaluator's planning.
    pub estimated_cost: f64,
}

/// Drives the job state machine over the store's conditional updates.
pub struct LeaseManager {
    store: Arc<dyn JobStore>,
    config: MarketConfig,
}

impl LeaseManager {
    /// Creates a lease manager over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn JobStore>, config: MarketConfig) -> Self {
        Self { store, config }
    }

    /// Claims a Pending job for an evaluator: Pending → Processing.
    ///
    /// # Errors
    ///
    /// - [`MarketError::NotFound`] — no such job.
    /// - [`MarketError::Expired`] — the job aged past the admission window;
    ///   it stays Pending for an out-of-band janitor to archive.
    /// - [`MarketError::Conflict`] — the job is not Pending, including the
    ///   case where a concurrent claimer won the race.
    pub fn claim(
        &self,
        job_id: &JobId,
        claimant: &PrincipalId,
        now: DateTime<Utc>,
    ) -> Result<ClaimReceipt> {
        let window = self.config.admission_window;
        let expires = now + self.config.lease_duration;
        let outcome = self.store.update_if(
            job_id,
            &|j| j.status == JobStatus::Pending && now < j.claim_deadline(window),
            &|j| j.begin_processing(claimant.clone(), now, expires),
        );

        match outcome {
            Ok(job) => {
                debug!(job_id = %job.id, claimant = %claimant, expires = %expires, "claim acquired");
                Ok(ClaimReceipt {
                    job_id: job.id,
                    claimant_id: claimant.clone(),
                    claimed_at: now,
                    lease_expires_at: expires,
                    estimated_cost: job.estimated_cost,
                })
            }
            Err(StoreError::PredicateFailed {
                job_id,
                status: JobStatus::Pending,
            }) => {
                // Still Pending at the moment of the write, so the admission
                // deadline is the clause that failed.
                Err(MarketError::Expired { job_id })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Releases a Processing job back to Pending, appending one audit
    /// entry.
    ///
    /// The actor must be the current claimant or an administrator.
    ///
    /// # Errors
    ///
    /// [`MarketError::NotFound`], [`MarketError::Conflict`] (not
    /// Processing), or [`MarketError::Forbidden`] (wrong actor).
    pub fn release(
        &self,
        job_id: &JobId,
        actor: &Actor,
        reason: impl Into<String>,
        details: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Job> {
        let reason = reason.into();
        let outcome = self.store.update_if(
            job_id,
            &|j| {
                j.status == JobStatus::Processing
                    && (actor.is_admin() || j.is_claimed_by(&actor.id))
            },
            &|j| j.return_to_pending(actor.id.clone(), reason.clone(), details.clone(), now),
        );

        match outcome {
            Ok(job) => {
                info!(job_id = %job.id, actor = %actor.id, reason = %reason, "claim released");
                Ok(job)
            }
            Err(StoreError::PredicateFailed {
                job_id,
                status: JobStatus::Processing,
            }) => {
                // Status was fine; the authorization clause failed.
                Err(MarketError::Forbidden {
                    job_id,
                    actor: actor.id.clone(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Cancels a Pending job: Pending → Cancelled with a full refund of the
    /// estimate.
    ///
    /// The actor must be the job's owner or an administrator.
    ///
    /// # Errors
    ///
    /// [`MarketError::NotFound`], [`MarketError::Conflict`] (not Pending),
    /// or [`MarketError::Forbidden`] (wrong actor).
    pub fn cancel(&self, job_id: &JobId, actor: &Actor, now: DateTime<Utc>) -> Result<Job> {
        let outcome = self.store.update_if(
            job_id,
            &|j| {
                j.status == JobStatus::Pending && (actor.is_admin() || j.owner_id == actor.id)
            },
            &|j| j.cancel(now),
        );

        match outcome {
            Ok(job) => {
                info!(job_id = %job.id, actor = %actor.id, refund = job.refund_amount, "job cancelled");
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

    /// Marks a Processing job as Failed with a full refund of the estimate.
    ///
    /// The actor must be the current claimant or an administrator.
    ///
    /// # Errors
    ///
    /// [`MarketError::NotFound`], [`MarketError::Conflict`] (not
    /// Processing), or [`MarketError::Forbidden`] (wrong actor).
    pub fn fail(
        &self,
        job_id: &JobId,
        actor: &Actor,
        reason: impl Into<String>,
    ) -> Result<Job> {
        let reason = reason.into();
        let outcome = self.store.update_if(
            job_id,
            &|j| {
                j.status == JobStatus::Processing
                    && (actor.is_admin() || j.is_claimed_by(&actor.id))
            },
            &|j| j.fail(reason.clone()),
        );

        match outcome {
            Ok(job) => {
                info!(job_id = %job.id, actor = %actor.id, reason = %reason, "job failed");
                Ok(job)
            }
            Err(StoreError::PredicateFailed {
                job_id,
                status: JobStatus::Processing,
            }) => Err(MarketError::Forbidden {
                job_id,
                actor: actor.id.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Releases every Processing job whose lease has been expired for
    /// longer than the configured grace period.
    ///
    /// This is the pull-based replacement for a background sweeper: callers
    /// drive it whenever they want overdue claims returned to the queue.
    /// Each release carries the [`LEASE_EXPIRED_REASON`] and the system
    /// principal. Jobs that change state concurrently are skipped.
    pub fn release_expired(&self, now: DateTime<Utc>) -> Vec<JobId> {
        let grace = self.config.lease_grace;
        let overdue = |j: &Job| {
            j.status == JobStatus::Processing
                && j.claim
                    .as_ref()
                    .is_some_and(|c| c.lease_expires_at + grace < now)
        };

        let mut swept = Vec::new();
        for job in self.store.snapshot() {
            if !overdue(&job) {
                continue;
            }
            let released = self.store.update_if(&job.id, &overdue, &|j| {
                j.return_to_pending(PrincipalId::system(), LEASE_EXPIRED_REASON, None, now);
            });
            if released.is_ok() {
                info!(job_id = %job.id, "expired lease swept");
                swept.push(job.id);
            }
        }
        swept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pythia_core::{ForecastCategory, PredictionRequest};
    use pythia_store::MemoryJobStore;

    fn setup() -> (Arc<MemoryJobStore>, LeaseManager) {
        let store = Arc::new(MemoryJobStore::new());
        let manager = LeaseManager::new(store.clone(), MarketConfig::default());
        (store, manager)
    }

    fn seed_pending(store: &MemoryJobStore, owner: &str, now: DateTime<Utc>) -> JobId {
        let job = Job::new(
            PrincipalId::new(owner),
            PredictionRequest::new("EURUSD", ForecastCategory::ShortTerm),
            6.0,
            now,
        );
        let id = job.id;
        store.create(job).expect("seed");
        id
    }

    #[test]
    fn claim_moves_job_to_processing() {
        let (store, manager) = setup();
        let now = Utc::now();
        let id = seed_pending(&store, "alice", now);

        let receipt = manager
            .claim(&id, &PrincipalId::new("eve"), now)
            .expect("claim");

        assert_eq!(receipt.job_id, id);
        assert_eq!(receipt.lease_expires_at, now + Duration::minutes(30));
        assert!((receipt.estimated_cost - 6.0).abs() < f64::EPSILON);

        let job = store.get(&id).expect("get");
        assert_eq!(job.status, JobStatus::Processing);
        assert!(job.is_claimed_by(&PrincipalId::new("eve")));
    }

    #[test]
    fn claim_of_claimed_job_is_conflict() {
        let (store, manager) = setup();
        let now = Utc::now();
        let id = seed_pending(&store, "alice", now);

        manager
            .claim(&id, &PrincipalId::new("eve"), now)
            .expect("first claim");
        let second = manager.claim(&id, &PrincipalId::new("mallory"), now);

        assert_eq!(
            second,
            Err(MarketError::Conflict {
                job_id: id,
                status: JobStatus::Processing,
            })
        );
        // The original claimant is untouched.
        let job = store.get(&id).expect("get");
        assert!(job.is_claimed_by(&PrincipalId::new("eve")));
    }

    #[test]
    fn claim_of_unknown_job_is_not_found() {
        let (_, manager) = setup();
        let id = JobId::generate();
        assert_eq!(
            manager.claim(&id, &PrincipalId::new("eve"), Utc::now()),
            Err(MarketError::NotFound(id))
        );
    }

    #[test]
    fn claim_past_admission_window_is_expired_and_job_stays_pending() {
        let (store, manager) = setup();
        let created = Utc::now();
        let id = seed_pending(&store, "alice", created);

        let late = created + Duration::hours(25);
        assert_eq!(
            manager.claim(&id, &PrincipalId::new("eve"), late),
            Err(MarketError::Expired { job_id: id })
        );
        assert_eq!(store.get(&id).expect("get").status, JobStatus::Pending);
    }

    #[test]
    fn claim_exactly_at_window_boundary_is_expired() {
        let (store, manager) = setup();
        let created = Utc::now();
        let id = seed_pending(&store, "alice", created);

        let boundary = created + Duration::hours(24);
        assert_eq!(
            manager.claim(&id, &PrincipalId::new("eve"), boundary),
            Err(MarketError::Expired { job_id: id })
        );
    }

    #[test]
    fn release_by_claimant_returns_job_to_pending() {
        let (store, manager) = setup();
        let now = Utc::now();
        let id = seed_pending(&store, "alice", now);
        manager
            .claim(&id, &PrincipalId::new("eve"), now)
            .expect("claim");

        let job = manager
            .release(
                &id,
                &Actor::evaluator("eve"),
                "technical_issue",
                Some("data feed outage".into()),
                now + Duration::minutes(5),
            )
            .expect("release");

        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.claim.is_none());
        assert_eq!(job.release_history.len(), 1);
        assert_eq!(job.release_history[0].reason, "technical_issue");
        assert_eq!(job.release_history[0].released_by, PrincipalId::new("eve"));
    }

    #[test]
    fn release_by_admin_is_allowed() {
        let (store, manager) = setup();
        let now = Utc::now();
        let id = seed_pending(&store, "alice", now);
        manager
            .claim(&id, &PrincipalId::new("eve"), now)
            .expect("claim");

        let job = manager
            .release(&id, &Actor::admin("root"), "operator_intervention", None, now)
            .expect("release");
        assert_eq!(job.status, JobStatus::Pending);
    }

    #[test]
    fn release_by_non_claimant_is_forbidden() {
        let (store, manager) = setup();
        let now = Utc::now();
        let id = seed_pending(&store, "alice", now);
        manager
            .claim(&id, &PrincipalId::new("eve"), now)
            .expect("claim");

        let result = manager.release(&id, &Actor::evaluator("mallory"), "gimme", None, now);
        assert_eq!(
            result,
            Err(MarketError::Forbidden {
                job_id: id,
                actor: PrincipalId::new("mallory"),
            })
        );
        assert_eq!(store.get(&id).expect("get").status, JobStatus::Processing);
    }

    #[test]
    fn release_of_pending_job_is_conflict() {
        let (store, manager) = setup();
        let now = Utc::now();
        let id = seed_pending(&store, "alice", now);

        let result = manager.release(&id, &Actor::admin("root"), "oops", None, now);
        assert_eq!(
            result,
            Err(MarketError::Conflict {
                job_id: id,
                status: JobStatus::Pending,
            })
        );
    }

    #[test]
    fn released_job_can_be_claimed_by_someone_else() {
        let (store, manager) = setup();
        let now = Utc::now();
        let id = seed_pending(&store, "alice", now);

        manager
            .claim(&id, &PrincipalId::new("eve"), now)
            .expect("claim");
        manager
            .release(&id, &Actor::evaluator("eve"), "technical_issue", None, now)
            .expect("release");
        let receipt = manager
            .claim(&id, &PrincipalId::new("frank"), now + Duration::minutes(1))
            .expect("reclaim");

        assert_eq!(receipt.claimant_id, PrincipalId::new("frank"));
        let job = store.get(&id).expect("get");
        assert_eq!(job.release_history.len(), 1);
    }

    #[test]
    fn cancel_by_owner_refunds_estimate() {
        let (store, manager) = setup();
        let now = Utc::now();
        let id = seed_pending(&store, "alice", now);

        let job = manager
            .cancel(&id, &Actor::client("alice"), now)
            .expect("cancel");

        assert_eq!(job.status, JobStatus::Cancelled);
        assert_eq!(job.refund_amount, Some(6.0));
        assert_eq!(job.cancelled_at, Some(now));
        assert!(job.claim.is_none());
    }

    #[test]
    fn cancel_by_stranger_is_forbidden() {
        let (store, manager) = setup();
        let now = Utc::now();
        let id = seed_pending(&store, "alice", now);

        let result = manager.cancel(&id, &Actor::client("bob"), now);
        assert_eq!(
            result,
            Err(MarketError::Forbidden {
                job_id: id,
                actor: PrincipalId::new("bob"),
            })
        );
    }

    #[test]
    fn cancel_of_processing_job_is_conflict() {
        let (store, manager) = setup();
        let now = Utc::now();
        let id = seed_pending(&store, "alice", now);
        manager
            .claim(&id, &PrincipalId::new("eve"), now)
            .expect("claim");

        let result = manager.cancel(&id, &Actor::client("alice"), now);
        assert_eq!(
            result,
            Err(MarketError::Conflict {
                job_id: id,
                status: JobStatus::Processing,
            })
        );
    }

    #[test]
    fn fail_by_claimant_records_reason_and_refund() {
        let (store, manager) = setup();
        let now = Utc::now();
        let id = seed_pending(&store, "alice", now);
        manager
            .claim(&id, &PrincipalId::new("eve"), now)
            .expect("claim");

        let job = manager
            .fail(&id, &Actor::evaluator("eve"), "model diverged")
            .expect("fail");

        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.failure_reason.as_deref(), Some("model diverged"));
        assert_eq!(job.refund_amount, Some(6.0));
        assert!(job.claim.is_none());
    }

    #[test]
    fn fail_by_non_claimant_is_forbidden() {
        let (store, manager) = setup();
        let now = Utc::now();
        let id = seed_pending(&store, "alice", now);
        manager
            .claim(&id, &PrincipalId::new("eve"), now)
            .expect("claim");

        let result = manager.fail(&id, &Actor::evaluator("mallory"), "nope");
        assert!(matches!(result, Err(MarketError::Forbidden { .. })));
    }

    #[test]
    fn release_expired_sweeps_only_overdue_leases() {
        let store = Arc::new(MemoryJobStore::new());
        let config = MarketConfig::default().with_lease_duration(Duration::minutes(30));
        let manager = LeaseManager::new(store.clone(), config);
        let now = Utc::now();

        let overdue = seed_pending(&store, "alice", now);
        let fresh = seed_pending(&store, "bob", now);
        manager
            .claim(&overdue, &PrincipalId::new("eve"), now)
            .expect("claim overdue");
        manager
            .claim(&fresh, &PrincipalId::new("frank"), now + Duration::minutes(40))
            .expect("claim fresh");

        let swept = manager.release_expired(now + Duration::minutes(45));

        assert_eq!(swept, vec![overdue]);
        let released = store.get(&overdue).expect("get");
        assert_eq!(released.status, JobStatus::Pending);
        assert_eq!(released.release_history.len(), 1);
        assert_eq!(released.release_history[0].reason, LEASE_EXPIRED_REASON);
        assert_eq!(released.release_history[0].released_by, PrincipalId::system());
        assert_eq!(store.get(&fresh).expect("get").status, JobStatus::Processing);
    }

    #[test]
    fn release_expired_honors_grace_period() {
        let store = Arc::new(MemoryJobStore::new());
        let config = MarketConfig::default()
            .with_lease_duration(Duration::minutes(30))
            .with_lease_grace(Duration::minutes(15));
        let manager = LeaseManager::new(store.clone(), config);
        let now = Utc::now();

        let id = seed_pending(&store, "alice", now);
        manager
            .claim(&id, &PrincipalId::new("eve"), now)
            .expect("claim");

        // Past expiry but inside the grace period: untouched.
        assert!(manager.release_expired(now + Duration::minutes(40)).is_empty());
        // Past expiry plus grace: swept.
        assert_eq!(manager.release_expired(now + Duration::minutes(46)), vec![id]);
    }

    #[test]
    fn lease_past_expiry_is_not_reclaimable_without_sweep() {
        let (store, manager) = setup();
        let now = Utc::now();
        let id = seed_pending(&store, "alice", now);
        manager
            .claim(&id, &PrincipalId::new("eve"), now)
            .expect("claim");

        // Well past lease expiry the job is still Processing; a direct
        // claim by someone else is a Conflict until a sweep or release.
        let late = now + Duration::hours(2);
        assert!(matches!(
            manager.claim(&id, &PrincipalId::new("frank"), late),
            Err(MarketError::Conflict { .. })
        ));
    }
}
