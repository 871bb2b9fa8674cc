use std::time::Duration;

use reqwest::Method;

use super::backoff::{BackoffPolicy, JitterSource};
use super::decide::RetryDecider;
use crate::error::ClassifiedError;

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Retry decider and backoff schedule taken together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryPolicy {
    pub decider: RetryDecider,
    pub backoff: BackoffPolicy,
}

impl RetryPolicy {
    /// Decide what to do after attempt `attempt_number` (0 = first try) failed.
    ///
    /// `max_retries` overrides the decider's limit for this call when set.
    pub fn decide(
        &self,
        error: &ClassifiedError,
        attempt_number: u32,
        method: &Method,
        explicitly_retryable: bool,
        max_retries: Option<u32>,
        jitter: &dyn JitterSource,
    ) -> RetryDecision {
        let limit = max_retries.unwrap_or(self.decider.max_retries);
        if !self.decider.should_retry_with_limit(
            limit,
            error,
            attempt_number,
            method,
            explicitly_retryable,
        ) {
            return RetryDecision::NoRetry;
        }
        let next = attempt_number.saturating_add(1);
        RetryDecision::RetryAfter(self.backoff.delay(next, error.retry_after_ms, jitter))
    }
}
