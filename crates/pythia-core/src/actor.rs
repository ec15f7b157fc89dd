//! Caller identity as supplied by the external identity layer.
//!
//! The engine performs no authentication of its own: every operation receives
//! an [`Actor`] resolved upstream and trusts it.

use serde::{Deserialize, Serialize};

use crate::ids::PrincipalId;

/// Role held by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Submits prediction jobs and may cancel their own pending jobs.
    Client,
    /// Claims pending jobs and submits results.
    Evaluator,
    /// May act on any job regardless of ownership or claim.
    Admin,
}

impl Role {
    /// Returns true for administrator-equivalent callers.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Client => write!(f, "client"),
            Self::Evaluator => write!(f, "evaluator"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

/// A resolved caller: principal plus role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// The caller's principal ID.
    pub id: PrincipalId,
    /// The caller's role.
    pub role: Role,
}

impl Actor {
    /// Creates an actor with the given ID and role.
    #[must_use]
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: PrincipalId::new(id),
            role,
        }
    }

    /// Creates a client actor.
    #[must_use]
    pub fn client(id: impl Into<String>) -> Self {
        Self::new(id, Role::Client)
    }

    /// Creates an evaluator actor.
    #[must_use]
    pub fn evaluator(id: impl Into<String>) -> Self {
        Self::new(id, Role::Evaluator)
    }

    /// Creates an administrator actor.
    #[must_use]
    pub fn admin(id: impl Into<String>) -> Self {
        Self::new(id, Role::Admin)
    }

    /// Returns true for administrator-equivalent callers.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}
