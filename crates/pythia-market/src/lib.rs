//! # pythia-market
//!
//! The Pythia marketplace engine.
//!
//! This crate provides:
//!
//! - Deterministic cost estimation for prediction requests
//! - Per-owner admission control
//! - Queue ordering and position calculation
//! - Lease management for the claim/release/cancel/fail lifecycle
//! - Result submission with fingerprinting and payment settlement
//! - The [`MarketplaceEngine`] façade composing all of the above
//!
//! The engine is synchronous and thread-safe: it is meant to be shared
//! (behind an `Arc`) across many request-handling threads, with the job
//! store's atomic conditional update as the single point of cross-request
//! synchronization.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod admission;
pub mod config;
pub mod engine;
pub mod error;
pub mod lease;
pub mod pricing;
pub mod queue;
pub mod submission;

pub use admission::AdmissionController;
pub use config::MarketConfig;
pub use engine::MarketplaceEngine;
pub use error::{MarketError, Result};
pub use lease::{ClaimReceipt, LeaseManager, LEASE_EXPIRED_REASON};
pub use submission::{SubmissionOutcome, SubmissionValidator};
