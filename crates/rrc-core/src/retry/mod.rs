//! Retry and backoff policy.
//!
//! This module holds the retry decision rules and the exponential backoff
//! schedule, so the request pipeline and offline tools (`rrc classify`)
//! share one consistent policy.

mod backoff;
mod decide;
mod policy;

pub use backoff::{
    BackoffPolicy, FixedJitter, JitterSource, NoJitter, ThreadRngJitter, JITTER_MAX_MS,
};
pub use decide::{
    RetryDecider, DEFAULT_MAX_RETRIES, DEFAULT_RETRYABLE_NETWORK_CODES,
    DEFAULT_RETRYABLE_STATUS_CODES,
};
pub use policy::{RetryDecision, RetryPolicy};
