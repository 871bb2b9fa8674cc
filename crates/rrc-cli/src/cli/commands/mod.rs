//! Subcommand implementations.

mod classify;
mod completions;
mod config;
mod request;

pub use classify::{run_classify, ClassifyInput};
pub use completions::run_completions;
pub use config::run_config;
pub use request::{run_request, RequestArgs};
