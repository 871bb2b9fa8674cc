pub mod config;
pub mod logging;

pub mod classify;
pub mod control;
pub mod credentials;
pub mod error;
pub mod pipeline;
pub mod retry;
pub mod transport;

pub use error::{ClassifiedError, ErrorCategory};
pub use pipeline::{ApiRequest, ApiResponse, RequestPipeline};
pub use reqwest::Method;
