use std::collections::BTreeSet;

use reqwest::Method;

use crate::error::{ClassifiedError, ErrorCategory};
use crate::transport::NetworkErrorCode;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRYABLE_STATUS_CODES: [u16; 6] = [408, 429, 500, 502, 503, 504];
pub const DEFAULT_RETRYABLE_NETWORK_CODES: [NetworkErrorCode; 7] = [
    NetworkErrorCode::ConnectionReset,
    NetworkErrorCode::TimedOut,
    NetworkErrorCode::ConnectionAborted,
    NetworkErrorCode::HostUnreachable,
    NetworkErrorCode::NetworkUnreachable,
    NetworkErrorCode::ConnectionRefused,
    NetworkErrorCode::DnsFailure,
];

/// Decides whether a classified failure is worth another attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryDecider {
    /// Retries allowed after the first attempt.
    pub max_retries: u32,
    pub retryable_status_codes: BTreeSet<u16>,
    pub retryable_network_codes: BTreeSet<NetworkErrorCode>,
}

impl Default for RetryDecider {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            retryable_status_codes: DEFAULT_RETRYABLE_STATUS_CODES.into_iter().collect(),
            retryable_network_codes: DEFAULT_RETRYABLE_NETWORK_CODES.into_iter().collect(),
        }
    }
}

impl RetryDecider {
    /// `attempt_number` counts attempts already retried (0 after the first try).
    pub fn should_retry(
        &self,
        error: &ClassifiedError,
        attempt_number: u32,
        method: &Method,
        explicitly_retryable: bool,
    ) -> bool {
        self.should_retry_with_limit(
            self.max_retries,
            error,
            attempt_number,
            method,
            explicitly_retryable,
        )
    }

    /// Same rules with a per-call retry limit in place of `max_retries`.
    ///
    /// First matching rule wins.
    pub fn should_retry_with_limit(
        &self,
        max_retries: u32,
        error: &ClassifiedError,
        attempt_number: u32,
        method: &Method,
        explicitly_retryable: bool,
    ) -> bool {
        if attempt_number >= max_retries {
            return false;
        }
        if matches!(
            error.category,
            ErrorCategory::Authentication
                | ErrorCategory::Authorization
                | ErrorCategory::Resource
                | ErrorCategory::Business
        ) {
            return false;
        }
        // Non-idempotent writes are only replayed when the caller opts in.
        if (*method == Method::POST || *method == Method::PATCH) && !explicitly_retryable {
            return false;
        }
        if let Some(status) = error.status_code {
            if self.retryable_status_codes.contains(&status) {
                return true;
            }
        }
        if !error.has_response() {
            if let Some(code) = error.network_code {
                if self.retryable_network_codes.contains(&code) {
                    return true;
                }
            }
        }
        error.retryable == Some(true)
    }
}
