//! Integration test crate for the Pythia marketplace.
//!
//! This crate exists solely to run integration tests that span multiple
//! Pythia crates. It has no public API - all functionality is in the test
//! modules.

#![forbid(unsafe_code)]
