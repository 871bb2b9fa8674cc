//! Request descriptors, per-call options and responses.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Method;
use serde::de::DeserializeOwned;

use crate::error::ClassifiedError;
use crate::transport::{find_header, HttpResponse};

/// Notification sent to [`RequestOptions::on_retry`] before each re-dispatch.
#[derive(Debug, Clone)]
pub struct RetryEvent {
    pub request_id: String,
    /// Number of the attempt about to be dispatched (1 = first retry).
    pub attempt_number: u32,
    pub delay: Duration,
    /// The failure that triggered this retry.
    pub error: ClassifiedError,
}

pub type RetryObserver = Arc<dyn Fn(&RetryEvent) + Send + Sync>;

/// Per-call knobs.
#[derive(Clone, Default)]
pub struct RequestOptions {
    /// Allow retries for POST/PATCH, which are otherwise never replayed.
    pub retryable: bool,
    /// Overrides the configured retry limit for this call.
    pub retries: Option<u32>,
    pub on_retry: Option<RetryObserver>,
    /// Overrides the configured per-attempt timeout for this call.
    pub timeout: Option<Duration>,
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOptions")
            .field("retryable", &self.retryable)
            .field("retries", &self.retries)
            .field("on_retry", &self.on_retry.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// One logical request as issued by a caller.
///
/// `path` is resolved against the pipeline's base URL; absolute URLs are
/// used as given.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<serde_json::Value>,
    pub headers: Vec<(String, String)>,
    pub options: RequestOptions,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            headers: Vec::new(),
            options: RequestOptions::default(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(Method::POST, path).with_body(body)
    }

    pub fn put(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(Method::PUT, path).with_body(body)
    }

    pub fn patch(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(Method::PATCH, path).with_body(body)
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Mark a POST/PATCH as safe to replay.
    pub fn retryable(mut self) -> Self {
        self.options.retryable = true;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.options.retries = Some(retries);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    pub fn on_retry<F>(mut self, observer: F) -> Self
    where
        F: Fn(&RetryEvent) + Send + Sync + 'static,
    {
        self.options.on_retry = Some(Arc::new(observer));
        self
    }
}

/// Attempt bookkeeping for one logical request; carried by value through the
/// retry loop and dropped when the request terminates.
#[derive(Debug, Clone)]
pub struct RequestAttempt {
    /// 0 for the first try.
    pub attempt_number: u32,
    /// Stable across retries of the same logical request.
    pub request_id: String,
    pub started_at: Instant,
}

impl RequestAttempt {
    pub fn first() -> Self {
        Self {
            attempt_number: 0,
            request_id: uuid::Uuid::new_v4().to_string(),
            started_at: Instant::now(),
        }
    }

    /// The following attempt of the same logical request.
    pub fn next(&self) -> Self {
        Self {
            attempt_number: self.attempt_number.saturating_add(1),
            request_id: self.request_id.clone(),
            started_at: Instant::now(),
        }
    }
}

/// Successful (2xx) response returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// `X-Request-ID` the request was sent with.
    pub request_id: String,
    /// Attempts made, including the successful one.
    pub attempts: u32,
}

impl ApiResponse {
    pub(crate) fn from_http(resp: HttpResponse, attempt: &RequestAttempt) -> Self {
        Self {
            status: resp.status,
            headers: resp.headers,
            body: resp.body,
            request_id: attempt.request_id.clone(),
            attempts: attempt.attempt_number + 1,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
