//! Transport seam: one physical HTTP exchange, no retries.
//!
//! The pipeline owns retries, timeouts and header injection; a transport only
//! sends what it is given and reports either a response (any status) or a
//! transport-level failure with a [`NetworkErrorCode`].

mod http;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use url::Url;

pub use http::ReqwestTransport;

/// Machine-readable code for a failure where no HTTP response was received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkErrorCode {
    ConnectionReset,
    TimedOut,
    ConnectionAborted,
    ConnectionRefused,
    HostUnreachable,
    NetworkUnreachable,
    DnsFailure,
    /// Anything the transport could not map more precisely.
    Other,
}

impl NetworkErrorCode {
    pub const ALL: [NetworkErrorCode; 8] = [
        NetworkErrorCode::ConnectionReset,
        NetworkErrorCode::TimedOut,
        NetworkErrorCode::ConnectionAborted,
        NetworkErrorCode::ConnectionRefused,
        NetworkErrorCode::HostUnreachable,
        NetworkErrorCode::NetworkUnreachable,
        NetworkErrorCode::DnsFailure,
        NetworkErrorCode::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkErrorCode::ConnectionReset => "connection_reset",
            NetworkErrorCode::TimedOut => "timed_out",
            NetworkErrorCode::ConnectionAborted => "connection_aborted",
            NetworkErrorCode::ConnectionRefused => "connection_refused",
            NetworkErrorCode::HostUnreachable => "host_unreachable",
            NetworkErrorCode::NetworkUnreachable => "network_unreachable",
            NetworkErrorCode::DnsFailure => "dns_failure",
            NetworkErrorCode::Other => "other",
        }
    }
}

impl fmt::Display for NetworkErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetworkErrorCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('-', "_").to_ascii_lowercase();
        NetworkErrorCode::ALL
            .into_iter()
            .find(|code| code.as_str() == wanted)
            .ok_or_else(|| format!("unknown network error code: {s}"))
    }
}

impl From<std::io::ErrorKind> for NetworkErrorCode {
    fn from(kind: std::io::ErrorKind) -> Self {
        use std::io::ErrorKind;
        match kind {
            ErrorKind::ConnectionReset | ErrorKind::BrokenPipe | ErrorKind::UnexpectedEof => {
                NetworkErrorCode::ConnectionReset
            }
            ErrorKind::ConnectionAborted => NetworkErrorCode::ConnectionAborted,
            ErrorKind::ConnectionRefused => NetworkErrorCode::ConnectionRefused,
            ErrorKind::TimedOut | ErrorKind::WouldBlock => NetworkErrorCode::TimedOut,
            ErrorKind::AddrNotAvailable | ErrorKind::NotConnected => {
                NetworkErrorCode::HostUnreachable
            }
            _ => NetworkErrorCode::Other,
        }
    }
}

/// Failure of a single exchange before any HTTP status was received.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct TransportError {
    pub code: NetworkErrorCode,
    pub message: String,
    /// The request was rejected locally (bad header, unbuildable request)
    /// and never reached the wire.
    pub local: bool,
}

impl TransportError {
    pub fn new(code: NetworkErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            local: false,
        }
    }

    /// A request that could not be built; nothing was sent.
    pub fn local(message: impl Into<String>) -> Self {
        Self {
            code: NetworkErrorCode::Other,
            message: message.into(),
            local: true,
        }
    }
}

/// One physical request as handed to a transport.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

/// Raw response of one exchange, whatever its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First header value with the given name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

pub(crate) fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Performs one HTTP exchange.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}
