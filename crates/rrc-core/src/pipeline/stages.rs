//! The named stages of one logical request: prepare, inject headers, dispatch
//! (which also classifies failures). The retry loop in `mod.rs` strings them
//! together with the decide and backoff stages.

use reqwest::Method;
use url::Url;

use super::request::{ApiRequest, ApiResponse, RequestAttempt, RequestOptions};
use super::RequestPipeline;
use crate::classify::{classify, RawFailure};
use crate::credentials::CredentialError;
use crate::error::{ClassifiedError, ErrorCategory};
use crate::transport::{HttpRequest, NetworkErrorCode, TransportError};

pub const AUTHORIZATION: &str = "Authorization";
pub const REQUEST_ID_HEADER: &str = "X-Request-ID";
const CONTENT_TYPE: &str = "Content-Type";

/// A logical request after URL resolution and body encoding.
#[derive(Debug)]
pub(super) struct PreparedRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    pub options: RequestOptions,
}

impl RequestPipeline {
    /// Stage 1: resolve the URL and encode the body once for all attempts.
    pub(super) fn prepare(&self, request: ApiRequest) -> Result<PreparedRequest, ClassifiedError> {
        let url = resolve_url(&self.base_url, &request.path)?;
        let mut headers = request.headers;
        let body = match request.body {
            Some(value) => {
                let bytes = serde_json::to_vec(&value).map_err(|e| {
                    ClassifiedError::new(ErrorCategory::Client, "Request body could not be encoded")
                        .with_technical(e.to_string())
                })?;
                if !headers.iter().any(|(k, _)| k.eq_ignore_ascii_case(CONTENT_TYPE)) {
                    headers.push((CONTENT_TYPE.to_string(), "application/json".to_string()));
                }
                Some(bytes)
            }
            None => None,
        };
        Ok(PreparedRequest {
            method: request.method,
            url,
            headers,
            body,
            options: request.options,
        })
    }

    /// Stage 2: per-attempt copy of the headers with auth and request id set.
    ///
    /// The credential provider is read here, once per attempt.
    pub(super) fn inject_headers(
        &self,
        prepared: &PreparedRequest,
        attempt: &RequestAttempt,
    ) -> Result<Vec<(String, String)>, ClassifiedError> {
        let mut headers = prepared.headers.clone();
        let token = self
            .credentials
            .token()
            .map_err(|err| credential_failure(err, &attempt.request_id))?;
        if let Some(token) = token {
            set_header(&mut headers, AUTHORIZATION, format!("Bearer {token}"));
        }
        set_header(&mut headers, REQUEST_ID_HEADER, attempt.request_id.clone());
        Ok(headers)
    }

    /// Stage 3 (+ classify): one physical attempt under the per-attempt timeout.
    pub(super) async fn dispatch(
        &self,
        prepared: &PreparedRequest,
        attempt: &RequestAttempt,
    ) -> Result<ApiResponse, ClassifiedError> {
        let headers = self.inject_headers(prepared, attempt)?;
        let request = HttpRequest {
            method: prepared.method.clone(),
            url: prepared.url.clone(),
            headers,
            body: prepared.body.clone(),
        };
        let timeout = prepared.options.timeout.unwrap_or(self.timeout);

        tracing::debug!(
            request_id = %attempt.request_id,
            attempt = attempt.attempt_number,
            method = %prepared.method,
            url = %prepared.url,
            "dispatching request"
        );

        let outcome = match tokio::time::timeout(timeout, self.transport.execute(request)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::new(
                NetworkErrorCode::TimedOut,
                format!("no response within {} ms", timeout.as_millis()),
            )),
        };

        let failure = match outcome {
            Ok(response) if response.is_success() => {
                return Ok(ApiResponse::from_http(response, attempt));
            }
            Ok(response) => RawFailure::from(response),
            Err(err) if err.local => RawFailure::Runtime {
                message: "The request could not be built".to_string(),
                stack: Some(err.message),
            },
            Err(err) => RawFailure::Transport(err),
        };

        let local = matches!(failure, RawFailure::Runtime { .. });
        let mut error = classify(&failure);
        if local {
            error = error.with_code("INVALID_REQUEST").with_retryable(false);
        }
        if error.tracking_id.is_none() {
            error.tracking_id = Some(attempt.request_id.clone());
        }
        Err(error)
    }
}

fn resolve_url(base: &Url, path: &str) -> Result<Url, ClassifiedError> {
    let invalid = |detail: String| {
        ClassifiedError::new(ErrorCategory::Request, format!("Invalid request URL: {path}"))
            .with_code("INVALID_URL")
            .with_technical(detail)
            .with_retryable(false)
    };
    if path.starts_with("http://") || path.starts_with("https://") {
        return Url::parse(path).map_err(|e| invalid(e.to_string()));
    }
    base.join(path.trim_start_matches('/'))
        .map_err(|e| invalid(e.to_string()))
}

/// Credential lookup failures are local and never retried.
fn credential_failure(err: CredentialError, request_id: &str) -> ClassifiedError {
    let mut error =
        ClassifiedError::new(ErrorCategory::Client, "Could not read the stored credentials")
            .with_code("CREDENTIALS_UNAVAILABLE")
            .with_technical(err.to_string())
            .with_retryable(false);
    error.tracking_id = Some(request_id.to_string());
    error
}

/// Replace any header with the same name (case-insensitive), then append.
fn set_header(headers: &mut Vec<(String, String)>, name: &str, value: String) {
    headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
    headers.push((name.to_string(), value));
}
