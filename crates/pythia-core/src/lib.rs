//! # pythia-core
//!
//! Shared domain types for the Pythia prediction marketplace.
//!
//! This crate provides:
//!
//! - Identifier newtypes for jobs and principals
//! - The caller identity model (actor + role)
//! - The `Job` record and its status state machine
//! - The typed prediction request submitted by clients
//! - Canonical-JSON result fingerprinting

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod actor;
pub mod hash;
pub mod ids;
pub mod job;
pub mod request;

pub use actor::{Actor, Role};
pub use hash::{canonical_json, result_hash};
pub use ids::{JobId, PrincipalId};
pub use job::{Claim, Job, JobStatus, ReleaseRecord};
pub use request::{
    DataSource, ForecastCategory, ModelClass, PredictionRequest, PRIORITY_MAX, PRIORITY_MIN,
};
