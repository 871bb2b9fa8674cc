//! Request pipeline: the single entry point for issuing logical requests.
//!
//! Stages run in a fixed order for every attempt:
//! prepare -> inject headers -> dispatch -> classify -> decide -> backoff -> redispatch.
//! Attempts of one logical request are strictly sequential; separate logical
//! requests share only read-only configuration and providers.

mod request;
mod stages;

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use url::Url;

use crate::config::{ClientConfig, ConfigError};
use crate::control::{AbortToken, ControlGuard, RequestControl};
use crate::credentials::{CredentialProvider, EnvToken, NoCredentials};
use crate::error::{ClassifiedError, ErrorCategory};
use crate::retry::{JitterSource, RetryDecision, RetryPolicy, ThreadRngJitter};
use crate::transport::{ReqwestTransport, Transport};

pub use request::{
    ApiRequest, ApiResponse, RequestAttempt, RequestOptions, RetryEvent, RetryObserver,
};
pub use stages::{AUTHORIZATION, REQUEST_ID_HEADER};

use stages::PreparedRequest;

/// Issues logical requests with auth/tracing headers, failure classification
/// and bounded retries. Cheap to clone; clones share providers.
#[derive(Clone)]
pub struct RequestPipeline {
    transport: Arc<dyn Transport>,
    credentials: Arc<dyn CredentialProvider>,
    jitter: Arc<dyn JitterSource>,
    control: Option<Arc<RequestControl>>,
    base_url: Url,
    timeout: Duration,
    policy: RetryPolicy,
}

impl std::fmt::Debug for RequestPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestPipeline")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .field("policy", &self.policy)
            .field("credentials", &self.credentials)
            .finish()
    }
}

impl RequestPipeline {
    pub fn builder(config: ClientConfig) -> PipelineBuilder {
        PipelineBuilder::new(config)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Issue a logical request; retries are invisible except through `on_retry`.
    ///
    /// Dropping the returned future cancels the in-flight attempt or backoff
    /// sleep and prevents further attempts.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ClassifiedError> {
        let prepared = self.prepare(request)?;
        let attempt = RequestAttempt::first();
        match &self.control {
            Some(control) => {
                let guard = ControlGuard::register(control, &attempt.request_id);
                let token = guard.token.clone();
                race_abort(&token, self.run(prepared, attempt)).await
            }
            None => self.run(prepared, attempt).await,
        }
    }

    /// Like [`send`](Self::send) but stops as soon as `abort` fires.
    pub async fn send_with_abort(
        &self,
        request: ApiRequest,
        abort: &AbortToken,
    ) -> Result<ApiResponse, ClassifiedError> {
        race_abort(abort, self.send(request)).await
    }

    /// Send and decode a 2xx JSON body; a decode failure is a CLIENT error.
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<T, ClassifiedError> {
        let response = self.send(request).await?;
        response.json::<T>().map_err(|e| {
            let mut err = ClassifiedError::new(
                ErrorCategory::Client,
                "The server response could not be read",
            )
            .with_status(response.status)
            .with_code("DECODE_FAILED")
            .with_technical(e.to_string())
            .with_retryable(false);
            err.tracking_id = Some(response.request_id.clone());
            err
        })
    }

    pub async fn get(&self, path: &str) -> Result<ApiResponse, ClassifiedError> {
        self.send(ApiRequest::get(path)).await
    }

    pub async fn delete(&self, path: &str) -> Result<ApiResponse, ClassifiedError> {
        self.send(ApiRequest::delete(path)).await
    }

    pub async fn post(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<ApiResponse, ClassifiedError> {
        self.send(ApiRequest::post(path, body)).await
    }

    pub async fn put(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<ApiResponse, ClassifiedError> {
        self.send(ApiRequest::put(path, body)).await
    }

    pub async fn patch(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<ApiResponse, ClassifiedError> {
        self.send(ApiRequest::patch(path, body)).await
    }

    /// The retry loop: dispatch, decide, back off, redispatch.
    async fn run(
        &self,
        prepared: PreparedRequest,
        mut attempt: RequestAttempt,
    ) -> Result<ApiResponse, ClassifiedError> {
        loop {
            let error = match self.dispatch(&prepared, &attempt).await {
                Ok(response) => return Ok(response),
                Err(error) => error,
            };

            let decision = self.policy.decide(
                &error,
                attempt.attempt_number,
                &prepared.method,
                prepared.options.retryable,
                prepared.options.retries,
                self.jitter.as_ref(),
            );
            let delay = match decision {
                RetryDecision::NoRetry => {
                    tracing::debug!(
                        request_id = %attempt.request_id,
                        attempts = attempt.attempt_number + 1,
                        category = %error.category,
                        status = ?error.status_code,
                        "request failed"
                    );
                    return Err(error);
                }
                RetryDecision::RetryAfter(delay) => delay,
            };

            tracing::warn!(
                request_id = %attempt.request_id,
                attempt = attempt.attempt_number,
                category = %error.category,
                status = ?error.status_code,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "retrying request"
            );
            tokio::time::sleep(delay).await;
            attempt = attempt.next();

            if let Some(observer) = &prepared.options.on_retry {
                observer(&RetryEvent {
                    request_id: attempt.request_id.clone(),
                    attempt_number: attempt.attempt_number,
                    delay,
                    error,
                });
            }
        }
    }
}

async fn race_abort<F>(token: &AbortToken, fut: F) -> Result<ApiResponse, ClassifiedError>
where
    F: std::future::Future<Output = Result<ApiResponse, ClassifiedError>>,
{
    if token.is_aborted() {
        return Err(aborted());
    }
    tokio::select! {
        biased;
        _ = token.aborted() => Err(aborted()),
        result = fut => result,
    }
}

fn aborted() -> ClassifiedError {
    ClassifiedError::new(ErrorCategory::Request, "The request was cancelled")
        .with_code("ABORTED")
        .with_retryable(false)
}

/// Builds a [`RequestPipeline`] from config plus optional injected providers.
pub struct PipelineBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn Transport>>,
    credentials: Option<Arc<dyn CredentialProvider>>,
    jitter: Option<Arc<dyn JitterSource>>,
    control: Option<Arc<RequestControl>>,
}

impl PipelineBuilder {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            transport: None,
            credentials: None,
            jitter: None,
            control: None,
        }
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn credentials(mut self, credentials: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn jitter(mut self, jitter: Arc<dyn JitterSource>) -> Self {
        self.jitter = Some(jitter);
        self
    }

    pub fn control(mut self, control: Arc<RequestControl>) -> Self {
        self.control = Some(control);
        self
    }

    /// Defaults: reqwest transport, `token_env` (or no) credentials, thread RNG jitter.
    pub fn build(self) -> Result<RequestPipeline, ConfigError> {
        let base_url = parse_base_url(&self.config.base_url)?;
        let transport: Arc<dyn Transport> = match self.transport {
            Some(t) => t,
            None => Arc::new(ReqwestTransport::new()?),
        };
        let credentials: Arc<dyn CredentialProvider> = match (self.credentials, &self.config.token_env) {
            (Some(c), _) => c,
            (None, Some(var)) => Arc::new(EnvToken::new(var.clone())),
            (None, None) => Arc::new(NoCredentials),
        };
        let jitter: Arc<dyn JitterSource> = match self.jitter {
            Some(j) => j,
            None => Arc::new(ThreadRngJitter),
        };
        Ok(RequestPipeline {
            transport,
            credentials,
            jitter,
            control: self.control,
            base_url,
            timeout: self.config.timeout(),
            policy: self.config.retry_policy(),
        })
    }
}

/// Parse the base URL, forcing a trailing slash so joins keep its path.
fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(raw.trim()).map_err(|source| ConfigError::InvalidBaseUrl {
        url: raw.to_string(),
        source,
    })?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::OpaqueBaseUrl(raw.to_string()));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
