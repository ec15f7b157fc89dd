//! Result submission: validation, fingerprinting, and payment.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use pythia_core::{result_hash, Job, JobId, JobStatus, PrincipalId};
use pythia_store::{JobStore, StoreError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::config::MarketConfig;
use crate::error::{MarketError, Result};
use crate::pricing::round2;

/// Quality assumed when the evaluator reports none.
pub const DEFAULT_QUALITY: f64 = 0.8;
/// Quality above which the quality bonus starts accruing.
pub const QUALITY_BASELINE: f64 = 0.8;
/// Ceiling on the speed bonus fraction.
pub const MAX_SPEED_BONUS: f64 = 0.10;
/// Ceiling on the quality bonus fraction.
pub const MAX_QUALITY_BONUS: f64 = 0.10;

/// What a successful submission hands back to the evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionOutcome {
    /// The completed job.
    pub job_id: JobId,
    /// SHA-256 fingerprint of the canonical result payload.
    pub result_hash: String,
    /// Quality score used for the bonus, clamped to [0, 1].
    pub quality_score: f64,
    /// Final payment credited for the evaluation.
    pub payment: f64,
    /// When the job completed.
    pub completed_at: DateTime<Utc>,
}

/// Validates and finalizes a claimed job's result.
pub struct SubmissionValidator {
    store: Arc<dyn JobStore>,
    config: MarketConfig,
}

impl SubmissionValidator {
    /// Creates a validator over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn JobStore>, config: MarketConfig) -> Self {
        Self { store, config }
    }

    /// Accepts a result for a Processing job: Processing → Completed.
    ///
    /// Preconditions are checked in order, each with its own failure mode:
    /// the job exists, is Processing, is claimed by this evaluator, and the
    /// lease has not expired. A timed-out lease leaves the job Processing;
    /// the claimant should release it (or an admin/sweep will) before the
    /// job can be claimed again.
    ///
    /// # Errors
    ///
    /// [`MarketError::NotFound`], [`MarketError::Conflict`],
    /// [`MarketError::Forbidden`], or [`MarketError::LeaseTimeout`].
    pub fn submit_result(
        &self,
        job_id: &JobId,
        claimant: &PrincipalId,
        payload: Value,
        reported_quality: Option<f64>,
        now: DateTime<Utc>,
    ) -> Result<(Job, SubmissionOutcome)> {
        // Snapshot for precondition reporting and payment inputs. The
        // fields the payment reads (created_at, estimated_cost) are
        // immutable after creation, so reading them outside the critical
        // section is race-free; the preconditions themselves are
        // re-enforced inside the conditional update below.
        let snapshot = self.store.get(job_id)?;
        self.check_preconditions(&snapshot, claimant, now)?;

        let quality_score = reported_quality.unwrap_or(DEFAULT_QUALITY).clamp(0.0, 1.0);
        let hash = result_hash(&payload);
        let payment = self.payment_for(&snapshot, quality_score, now);

        let outcome = self.store.update_if(
            job_id,
            &|j| {
                j.status == JobStatus::Processing
                    && j.is_claimed_by(claimant)
                    && j.claim.as_ref().is_some_and(|c| !c.is_expired(now))
            },
            &|j| j.complete(payload.clone(), hash.clone(), payment, now),
        );

        match outcome {
            Ok(job) => {
                info!(
                    job_id = %job.id,
                    claimant = %claimant,
                    payment,
                    quality = quality_score,
                    "result accepted"
                );
                let outcome = SubmissionOutcome {
                    job_id: job.id,
                    result_hash: hash,
                    quality_score,
                    payment,
                    completed_at: now,
                };
                Ok((job, outcome))
            }
            Err(StoreError::PredicateFailed { .. }) => {
                // The record changed between the snapshot and the write;
                // re-derive the precise failure from the current state.
                let current = self.store.get(job_id)?;
                Err(self
                    .check_preconditions(&current, claimant, now)
                    .err()
                    .unwrap_or(MarketError::Conflict {
                        job_id: current.id,
                        status: current.status,
                    }))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Checks the ordered preconditions against a job snapshot.
    fn check_preconditions(
        &self,
        job: &Job,
        claimant: &PrincipalId,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if job.status != JobStatus::Processing {
            return Err(MarketError::Conflict {
                job_id: job.id,
                status: job.status,
            });
        }
        let Some(claim) = job.claim.as_ref() else {
            // Unreachable while the claim-iff-Processing invariant holds.
            return Err(MarketError::Conflict {
                job_id: job.id,
                status: job.status,
            });
        };
        if claim.claimant_id != *claimant {
            return Err(MarketError::Forbidden {
                job_id: job.id,
                actor: claimant.clone(),
            });
        }
        if claim.is_expired(now) {
            return Err(MarketError::LeaseTimeout {
                job_id: job.id,
                lease_expires_at: claim.lease_expires_at,
            });
        }
        Ok(())
    }

    /// Payment = estimate adjusted by additive speed and quality bonuses,
    /// each capped at +10%, never below zero.
    fn payment_for(&self, job: &Job, quality_score: f64, now: DateTime<Utc>) -> f64 {
        let elapsed = (now - job.created_at).num_milliseconds() as f64;
        let lease = self.config.lease_duration.num_milliseconds() as f64;

        let speed_bonus = if lease > 0.0 {
            (MAX_SPEED_BONUS * (1.0 - elapsed / lease)).clamp(0.0, MAX_SPEED_BONUS)
        } else {
            0.0
        };
        let quality_bonus = (MAX_QUALITY_BONUS * (quality_score - QUALITY_BASELINE)
            / (1.0 - QUALITY_BASELINE))
            .clamp(0.0, MAX_QUALITY_BONUS);

        round2(job.estimated_cost * (1.0 + speed_bonus + quality_bonus)).max(0.0)
    }
}
