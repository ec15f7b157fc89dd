//! The job record and its lifecycle state machine.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::{JobId, PrincipalId};
use crate::request::PredictionRequest;

/// Lifecycle status of a job.
///
/// Valid edges:
///
/// ```text
/// Pending ──► Processing ──► Completed
///    │             │    └──► Failed
///    │             └──► Pending        (release)
///    └──► Cancelled
/// ```
///
/// Completed, Failed, and Cancelled are terminal; no edge leaves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Queued, visible to evaluators, claimable.
    Pending,
    /// Claimed under a lease by exactly one evaluator.
    Processing,
    /// Result accepted; terminal.
    Completed,
    /// Evaluation failed; terminal.
    Failed,
    /// Withdrawn by the owner before any claim; terminal.
    Cancelled,
}

impl JobStatus {
    /// Checks if a transition to the target status is valid.
    #[must_use]
    pub const fn can_transition_to(&self, target: &Self) -> bool {
        use JobStatus::{Cancelled, Completed, Failed, Pending, Processing};

        matches!(
            (self, target),
            (Pending, Processing | Cancelled) | (Processing, Completed | Failed | Pending)
        )
    }

    /// Returns true once no further transition is permitted.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Returns true while the job occupies one of its owner's admission
    /// slots.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Processing)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Processing => write!(f, "processing"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// The time-bounded, single-holder right to work on a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    /// The evaluator holding the lease.
    pub claimant_id: PrincipalId,
    /// When the claim was acquired.
    pub claimed_at: DateTime<Utc>,
    /// When the lease expires. Expiry is advisory: the job stays Processing
    /// until released, completed, failed, or swept.
    pub lease_expires_at: DateTime<Utc>,
}

impl Claim {
    /// Returns true once the lease deadline has passed.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.lease_expires_at
    }
}

/// One entry in a job's release audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseRecord {
    /// Who released the claim (claimant, admin, or the system sweeper).
    pub released_by: PrincipalId,
    /// When the release happened.
    pub released_at: DateTime<Utc>,
    /// Machine-readable reason, e.g. `"technical_issue"` or
    /// `"lease_expired"`.
    pub reason: String,
    /// Optional free-form elaboration.
    pub details: Option<String>,
}

/// One prediction request moving through the marketplace lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Unique identifier, assigned at creation.
    pub id: JobId,
    /// The submitting principal.
    pub owner_id: PrincipalId,
    /// Current lifecycle status.
    pub status: JobStatus,
    /// Priority 1-10; higher is claimed first.
    pub priority: u8,
    /// Creation time; FIFO tie-break within a priority tier.
    pub created_at: DateTime<Utc>,
    /// The request this job was created from.
    pub request: PredictionRequest,
    /// Cost estimated at submission.
    pub estimated_cost: f64,
    /// Optional caller-supplied cost ceiling.
    pub max_cost: Option<f64>,
    /// Final payment, set at completion.
    pub actual_cost: Option<f64>,
    /// Refund, set at cancellation or failure.
    pub refund_amount: Option<f64>,
    /// The active lease. Present iff status is Processing.
    pub claim: Option<Claim>,
    /// Append-only release audit trail.
    pub release_history: Vec<ReleaseRecord>,
    /// Result payload, set exactly once at completion.
    pub result: Option<Value>,
    /// SHA-256 over the canonical serialization of `result`.
    pub result_hash: Option<String>,
    /// Set exactly once when the job completes.
    pub completed_at: Option<DateTime<Utc>>,
    /// Set exactly once when the job is cancelled.
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Why the job failed, for Failed jobs only.
    pub failure_reason: Option<String>,
}

impl Job {
    /// Creates a new Pending job from a validated request.
    #[must_use]
    pub fn new(
        owner_id: PrincipalId,
        request: PredictionRequest,
        estimated_cost: f64,
        now: DateTime<Utc>,
    ) -> Self {
        let priority = request.priority;
        let max_cost = request.max_cost;
        Self {
            id: JobId::generate(),
            owner_id,
            status: JobStatus::Pending,
            priority,
            created_at: now,
            request,
            estimated_cost,
            max_cost,
            actual_cost: None,
            refund_amount: None,
            claim: None,
            release_history: Vec::new(),
            result: None,
            result_hash: None,
            completed_at: None,
            cancelled_at: None,
            failure_reason: None,
        }
    }

    /// The evaluator currently holding the lease, if any.
    #[must_use]
    pub fn claimant(&self) -> Option<&PrincipalId> {
        self.claim.as_ref().map(|c| &c.claimant_id)
    }

    /// Returns true if `who` holds the active claim.
    #[must_use]
    pub fn is_claimed_by(&self, who: &PrincipalId) -> bool {
        self.claimant().is_some_and(|c| c == who)
    }

    /// Latest instant at which the job may still be claimed.
    #[must_use]
    pub fn claim_deadline(&self, admission_window: Duration) -> DateTime<Utc> {
        self.created_at + admission_window
    }

    // ─────────────────────────────────────────────────────────────
    // Transition mutators
    //
    // Preconditions are enforced by the store's conditional update;
    // these record the transition and keep the claim/history/timestamp
    // invariants in one place.
    // ─────────────────────────────────────────────────────────────

    /// Records a successful claim: Pending → Processing.
    pub fn begin_processing(
        &mut self,
        claimant_id: PrincipalId,
        now: DateTime<Utc>,
        lease_expires_at: DateTime<Utc>,
    ) {
        debug_assert_eq!(self.status, JobStatus::Pending);
        self.status = JobStatus::Processing;
        self.claim = Some(Claim {
            claimant_id,
            claimed_at: now,
            lease_expires_at,
        });
    }

    /// Records a release: Processing → Pending, claim cleared, one audit
    /// entry appended.
    pub fn return_to_pending(
        &mut self,
        released_by: PrincipalId,
        reason: impl Into<String>,
        details: Option<String>,
        now: DateTime<Utc>,
    ) {
        debug_assert_eq!(self.status, JobStatus::Processing);
        self.status = JobStatus::Pending;
        self.claim = None;
        self.release_history.push(ReleaseRecord {
            released_by,
            released_at: now,
            reason: reason.into(),
            details,
        });
    }

    /// Records an accepted result: Processing → Completed.
    pub fn complete(
        &mut self,
        result: Value,
        result_hash: String,
        payment: f64,
        now: DateTime<Utc>,
    ) {
        debug_assert_eq!(self.status, JobStatus::Processing);
        self.status = JobStatus::Completed;
        self.claim = None;
        self.result = Some(result);
        self.result_hash = Some(result_hash);
        self.actual_cost = Some(payment);
        self.completed_at = Some(now);
    }

    /// Records an owner cancellation: Pending → Cancelled, full refund of
    /// the estimate.
    pub fn cancel(&mut self, now: DateTime<Utc>) {
        debug_assert_eq!(self.status, JobStatus::Pending);
        self.status = JobStatus::Cancelled;
        self.refund_amount = Some(self.estimated_cost);
        self.cancelled_at = Some(now);
    }

    /// Records an evaluation failure: Processing → Failed, full refund of
    /// the estimate.
    pub fn fail(&mut self, reason: impl Into<String>) {
        debug_assert_eq!(self.status, JobStatus::Processing);
        self.status = JobStatus::Failed;
        self.claim = None;
        self.refund_amount = Some(self.estimated_cost);
        self.failure_reason = Some(reason.into());
    }
}
