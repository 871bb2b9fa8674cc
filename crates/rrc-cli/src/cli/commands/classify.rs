//! `rrc classify` – classify a synthetic failure and show the retry decision.

use anyhow::Result;
use rrc_core::classify::{classify, RawFailure};
use rrc_core::config::ClientConfig;
use rrc_core::retry::{NoJitter, RetryDecision};
use rrc_core::transport::{NetworkErrorCode, TransportError};
use rrc_core::Method;
use serde_json::json;

/// Failure to classify.
#[derive(Debug, Clone)]
pub enum ClassifyInput {
    Http { status: u16, body: String },
    Network(NetworkErrorCode),
}

impl ClassifyInput {
    fn into_failure(self) -> RawFailure {
        match self {
            ClassifyInput::Http { status, body } => RawFailure::Http {
                status,
                headers: Vec::new(),
                body: body.into_bytes(),
            },
            ClassifyInput::Network(code) => {
                RawFailure::Transport(TransportError::new(code, format!("simulated {code}")))
            }
        }
    }
}

/// Build the report printed by `rrc classify`. Jitter is left out so the
/// reported delay is the deterministic part of the schedule.
pub(crate) fn classify_report(
    cfg: &ClientConfig,
    input: ClassifyInput,
    method: &Method,
    attempt: u32,
) -> serde_json::Value {
    let error = classify(&input.into_failure());
    let policy = cfg.retry_policy();
    let decision = match policy.decide(&error, attempt, method, false, None, &NoJitter) {
        RetryDecision::NoRetry => json!({ "retry": false }),
        RetryDecision::RetryAfter(delay) => json!({
            "retry": true,
            "delayMs": u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
        }),
    };
    json!({
        "method": method.as_str(),
        "attempt": attempt,
        "error": error,
        "decision": decision,
    })
}

pub fn run_classify(
    cfg: &ClientConfig,
    input: ClassifyInput,
    method: &Method,
    attempt: u32,
) -> Result<()> {
    let report = classify_report(cfg, input, method, attempt);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
