//! Classify raw failures (transport errors, non-2xx responses, local runtime
//! errors) into a [`ClassifiedError`].
//!
//! Classification never fails: unparseable bodies simply fall back to the
//! status-derived category and the category's friendly message.

mod body;

use crate::error::{ClassifiedError, ErrorCategory};
use crate::transport::{find_header, HttpResponse, TransportError};

use body::ErrorBody;

/// A failure as observed by the pipeline, before classification.
#[derive(Debug, Clone)]
pub enum RawFailure {
    /// No response was received.
    Transport(TransportError),
    /// The peer answered with a non-2xx status.
    Http {
        status: u16,
        headers: Vec<(String, String)>,
        body: Vec<u8>,
    },
    /// Local error with no transport involved.
    Runtime {
        message: String,
        stack: Option<String>,
    },
}

impl From<TransportError> for RawFailure {
    fn from(err: TransportError) -> Self {
        RawFailure::Transport(err)
    }
}

impl From<HttpResponse> for RawFailure {
    fn from(resp: HttpResponse) -> Self {
        RawFailure::Http {
            status: resp.status,
            headers: resp.headers,
            body: resp.body,
        }
    }
}

/// Classify a failure. Never panics, whatever the body contains.
pub fn classify(failure: &RawFailure) -> ClassifiedError {
    match failure {
        RawFailure::Transport(err) => classify_transport(err),
        RawFailure::Http {
            status,
            headers,
            body,
        } => classify_http(*status, headers, body),
        RawFailure::Runtime { message, stack } => classify_runtime(message, stack.as_deref()),
    }
}

fn classify_transport(err: &TransportError) -> ClassifiedError {
    let mut classified =
        ClassifiedError::new(ErrorCategory::Network, ErrorCategory::Network.friendly_message())
            .with_technical(err.to_string());
    classified.network_code = Some(err.code);
    classified
}

fn classify_http(status: u16, headers: &[(String, String)], raw_body: &[u8]) -> ClassifiedError {
    let body = ErrorBody::parse(raw_body);

    let category = body
        .category
        .as_deref()
        .map(ErrorCategory::from_peer)
        .unwrap_or_else(|| ErrorCategory::from_status(status));
    let message = body
        .message
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| category.friendly_message().to_string());

    let mut classified = ClassifiedError::new(category, message)
        .with_status(status)
        .with_technical(format!("HTTP {status}"));
    classified.code = body.code;
    classified.retryable = body.retryable;
    classified.retry_after_ms = body
        .retry_after_ms
        .or_else(|| retry_after_header_ms(headers));
    classified.validation_errors = body.errors;
    classified.tracking_id = body.tracking_id;
    classified.suggestion = body.suggestion;
    classified
}

fn classify_runtime(message: &str, stack: Option<&str>) -> ClassifiedError {
    let message = if message.trim().is_empty() {
        ErrorCategory::Client.friendly_message()
    } else {
        message
    };
    let mut classified = ClassifiedError::new(ErrorCategory::Client, message);
    classified.technical_message = stack.map(str::to_string);
    classified
}

/// `Retry-After` in delta-seconds form; HTTP-date values are ignored.
fn retry_after_header_ms(headers: &[(String, String)]) -> Option<u64> {
    find_header(headers, "retry-after")?
        .trim()
        .parse::<u64>()
        .ok()
        .map(|secs| secs.saturating_mul(1000))
}
