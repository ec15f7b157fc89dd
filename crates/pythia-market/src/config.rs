//! Engine configuration.

use chrono::Duration;

use crate::error::{MarketError, Result};

/// Tunable limits and windows for the marketplace engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketConfig {
    /// Maximum concurrently non-terminal jobs per owner.
    pub max_active_per_owner: u32,
    /// Maximum age a Pending job may reach before it can no longer be
    /// claimed.
    pub admission_window: Duration,
    /// Time a claimant has to submit a result before the lease times out.
    pub lease_duration: Duration,
    /// Extra slack past lease expiry before the expired-lease sweep will
    /// forcibly release a claim.
    pub lease_grace: Duration,
}

impl MarketConfig {
    /// Sets the per-owner concurrent-job limit.
    #[must_use]
    pub fn with_max_active_per_owner(mut self, limit: u32) -> Self {
        self.max_active_per_owner = limit;
        self
    }

    /// Sets the admission window.
    #[must_use]
    pub fn with_admission_window(mut self, window: Duration) -> Self {
        self.admission_window = window;
        self
    }

    /// Sets the lease duration.
    #[must_use]
    pub fn with_lease_duration(mut self, duration: Duration) -> Self {
        self.lease_duration = duration;
        self
    }

    /// Sets the sweep grace period.
    #[must_use]
    pub fn with_lease_grace(mut self, grace: Duration) -> Self {
        self.lease_grace = grace;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::InvalidConfig`] for a zero owner limit or
    /// non-positive windows.
    pub fn validate(&self) -> Result<()> {
        if self.max_active_per_owner == 0 {
            return Err(MarketError::InvalidConfig {
                reason: "max_active_per_owner must be at least 1".into(),
            });
        }
        if self.admission_window <= Duration::zero() {
            return Err(MarketError::InvalidConfig {
                reason: "admission_window must be positive".into(),
            });
        }
        if self.lease_duration <= Duration::zero() {
            return Err(MarketError::InvalidConfig {
                reason: "lease_duration must be positive".into(),
            });
        }
        if self.lease_grace < Duration::zero() {
            return Err(MarketError::InvalidConfig {
                reason: "lease_grace cannot be negative".into(),
            });
        }
        Ok(())
    }
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            max_active_per_owner: 5,
            admission_window: Duration::hours(24),
            lease_duration: Duration::minutes(30),
            lease_grace: Duration::zero(),
        }
    }
}
