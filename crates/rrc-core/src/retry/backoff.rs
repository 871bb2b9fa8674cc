//! Exponential backoff with injectable jitter.

use std::fmt;
use std::time::Duration;

use rand::Rng;

/// Upper bound (exclusive) of the random jitter added to each computed delay.
pub const JITTER_MAX_MS: u64 = 1_000;

/// Source of the random jitter term, injected so tests can pin it.
pub trait JitterSource: Send + Sync + fmt::Debug {
    /// A value in `[0, bound_ms)`, or 0 when `bound_ms` is 0.
    fn jitter_ms(&self, bound_ms: u64) -> u64;
}

/// Uniform jitter from the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRngJitter;

impl JitterSource for ThreadRngJitter {
    fn jitter_ms(&self, bound_ms: u64) -> u64 {
        if bound_ms == 0 {
            return 0;
        }
        rand::thread_rng().gen_range(0..bound_ms)
    }
}

/// Always returns the same jitter (clamped below the bound).
#[derive(Debug, Clone, Copy)]
pub struct FixedJitter(pub u64);

impl JitterSource for FixedJitter {
    fn jitter_ms(&self, bound_ms: u64) -> u64 {
        self.0.min(bound_ms.saturating_sub(1))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoJitter;

impl JitterSource for NoJitter {
    fn jitter_ms(&self, _bound_ms: u64) -> u64 {
        0
    }
}

/// Delay schedule between retry attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1_000,
            max_delay_ms: 30_000,
        }
    }
}

impl BackoffPolicy {
    /// Delay before `attempt_number` (1 = first retry).
    ///
    /// A peer-supplied `retry_after_ms` wins unchanged. Otherwise
    /// `initial * 2^(n-1) + jitter`, capped at `max_delay_ms`.
    pub fn delay_ms(
        &self,
        attempt_number: u32,
        retry_after_ms: Option<u64>,
        jitter: &dyn JitterSource,
    ) -> u64 {
        if let Some(hint) = retry_after_ms {
            return hint;
        }
        let exp = attempt_number.saturating_sub(1).min(63);
        let base = self.initial_delay_ms.saturating_mul(1u64 << exp);
        base.saturating_add(jitter.jitter_ms(JITTER_MAX_MS))
            .min(self.max_delay_ms)
    }

    pub fn delay(
        &self,
        attempt_number: u32,
        retry_after_ms: Option<u64>,
        jitter: &dyn JitterSource,
    ) -> Duration {
        Duration::from_millis(self.delay_ms(attempt_number, retry_after_ms, jitter))
    }
}
