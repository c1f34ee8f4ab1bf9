//! Retry and backoff policy.
//!
//! Used by the orchestrator to re-read pending articles when the store is
//! briefly unavailable. Every failure handed to the loop is treated as
//! transient; the policy only decides how many attempts and how long to wait.

mod policy;
mod run;

pub use policy::{RetryDecision, RetryPolicy};
pub use run::{run_with_retry, RetryExhausted};
