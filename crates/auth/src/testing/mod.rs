//! Test doubles for the crate's dependency-injection seams
//!
//! Available to downstream crates as well, so hosts can exercise their own
//! auth wiring without a running backend-for-frontend.

pub mod mocks;
