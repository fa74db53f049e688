//! Resilience helpers.
//!
//! # Data Flow
//! ```text
//! Failed subscriber refresh:
//!     → backoff.rs computes the delay for the next attempt
//!     → task returns to the queue with not_before = now + delay
//! ```
//!
//! # Design Decisions
//! - Every outbound call has a client-level timeout
//! - Retries are spaced by the queue, not by sleeping in place

pub mod backoff;

pub use backoff::calculate_backoff;
