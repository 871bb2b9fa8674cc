//! `rrc request <METHOD> <PATH>` – send one request through the retrying pipeline.

use std::time::Duration;

use anyhow::Result;
use rrc_core::config::ClientConfig;
use rrc_core::{ApiRequest, Method, RequestPipeline};

/// Arguments collected from the `request` subcommand.
#[derive(Debug)]
pub struct RequestArgs {
    pub method: Method,
    pub path: String,
    pub data: Option<serde_json::Value>,
    pub headers: Vec<(String, String)>,
    pub retryable: bool,
    pub retries: Option<u32>,
    pub timeout_ms: Option<u64>,
}

impl RequestArgs {
    fn into_request(self) -> ApiRequest {
        let mut request = ApiRequest::new(self.method, self.path);
        if let Some(body) = self.data {
            request = request.with_body(body);
        }
        for (name, value) in self.headers {
            request = request.with_header(name, value);
        }
        if self.retryable {
            request = request.retryable();
        }
        if let Some(retries) = self.retries {
            request = request.with_retries(retries);
        }
        if let Some(ms) = self.timeout_ms {
            request = request.with_timeout(Duration::from_millis(ms));
        }
        request.on_retry(|event| {
            eprintln!(
                "retry #{} in {}ms: {} (request {})",
                event.attempt_number,
                event.delay.as_millis(),
                event.error,
                event.request_id
            );
        })
    }
}

pub async fn run_request(cfg: &ClientConfig, args: RequestArgs) -> Result<()> {
    let pipeline = RequestPipeline::builder(cfg.clone()).build()?;
    let request = args.into_request();

    match pipeline.send(request).await {
        Ok(resp) => {
            tracing::info!(
                "request {} finished with HTTP {} after {} attempt(s)",
                resp.request_id,
                resp.status,
                resp.attempts
            );
            if !resp.body.is_empty() {
                println!("{}", resp.text());
            }
            Ok(())
        }
        Err(err) => {
            println!("{}", serde_json::to_string_pretty(&err)?);
            anyhow::bail!("{}", err.user_message())
        }
    }
}
