//! reqwest-backed transport.

use std::error::Error as _;

use async_trait::async_trait;

use super::{HttpRequest, HttpResponse, NetworkErrorCode, Transport, TransportError};

/// Production transport over a shared `reqwest::Client`.
///
/// Redirects are followed by reqwest; the per-attempt timeout is applied by
/// the pipeline, not here.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| TransportError::new(NetworkErrorCode::Other, e.to_string()))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self.client.request(request.method, request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await.map_err(map_reqwest_error)?.to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_builder() {
        let mut message = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        return TransportError::local(message);
    }
    TransportError::new(network_code(&err), err.to_string())
}

/// Best-effort mapping of a reqwest failure onto a network error code.
fn network_code(err: &reqwest::Error) -> NetworkErrorCode {
    if err.is_timeout() {
        return NetworkErrorCode::TimedOut;
    }

    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            let code = NetworkErrorCode::from(io.kind());
            if code != NetworkErrorCode::Other {
                return code;
            }
        }
        let text = cause.to_string().to_ascii_lowercase();
        if text.contains("dns error") || text.contains("failed to lookup address") {
            return NetworkErrorCode::DnsFailure;
        }
        if text.contains("network is unreachable") {
            return NetworkErrorCode::NetworkUnreachable;
        }
        if text.contains("no route to host") || text.contains("host is unreachable") {
            return NetworkErrorCode::HostUnreachable;
        }
        source = cause.source();
    }

    if err.is_connect() {
        NetworkErrorCode::ConnectionRefused
    } else if err.is_body() || err.is_decode() {
        NetworkErrorCode::ConnectionAborted
    } else {
        NetworkErrorCode::Other
    }
}
