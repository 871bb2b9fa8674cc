//! CLI for the resilient request client.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use rrc_core::config;
use rrc_core::transport::NetworkErrorCode;
use rrc_core::Method;

use commands::{run_classify, run_completions, run_config, run_request, ClassifyInput, RequestArgs};

/// Top-level CLI for the resilient request client.
#[derive(Debug, Parser)]
#[command(name = "rrc")]
#[command(about = "RRC: HTTP requests with failure classification and bounded retries", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Issue a request through the retrying pipeline.
    Request {
        /// HTTP method (GET, POST, PUT, PATCH, DELETE, ...).
        #[arg(value_parser = parse_method)]
        method: Method,
        /// Path relative to the configured base URL, or an absolute URL.
        path: String,
        /// JSON request body.
        #[arg(long, short = 'd', value_name = "JSON", value_parser = parse_json)]
        data: Option<serde_json::Value>,
        /// Extra header, "Name: value". Repeatable.
        #[arg(long = "header", short = 'H', value_name = "HEADER", value_parser = parse_header)]
        headers: Vec<(String, String)>,
        /// Allow retries for POST/PATCH.
        #[arg(long)]
        retryable: bool,
        /// Override the configured retry count for this request.
        #[arg(long, value_name = "N")]
        retries: Option<u32>,
        /// Override the per-attempt timeout.
        #[arg(long, value_name = "MS")]
        timeout_ms: Option<u64>,
    },

    /// Classify a synthetic failure offline and show the retry decision.
    Classify {
        /// HTTP status of the failed response.
        #[arg(long, conflicts_with = "network", required_unless_present = "network")]
        status: Option<u16>,
        /// Response body (JSON error object) to classify with --status.
        #[arg(long, requires = "status")]
        body: Option<String>,
        /// Transport failure code (e.g. timed_out, connection_reset) instead of a status.
        #[arg(long, value_parser = parse_network_code)]
        network: Option<NetworkErrorCode>,
        /// Method the decision is computed for.
        #[arg(long, default_value = "GET", value_parser = parse_method)]
        method: Method,
        /// Attempts already retried.
        #[arg(long, default_value = "0")]
        attempt: u32,
    },

    /// Show the config file path and effective configuration.
    Config,

    /// Generate shell completions.
    Completions {
        shell: Shell,
    },
}

fn parse_method(s: &str) -> Result<Method, String> {
    Method::from_bytes(s.trim().to_ascii_uppercase().as_bytes())
        .map_err(|_| format!("invalid HTTP method: {s}"))
}

fn parse_header(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once(':')
        .ok_or_else(|| format!("header must look like 'Name: value': {s}"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("header name is empty: {s}"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

fn parse_json(s: &str) -> Result<serde_json::Value, String> {
    serde_json::from_str(s).map_err(|e| format!("invalid JSON: {e}"))
}

fn parse_network_code(s: &str) -> Result<NetworkErrorCode, String> {
    s.parse()
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        if let CliCommand::Completions { shell } = cli.command {
            return run_completions(shell);
        }

        let mut cfg = config::load_or_init()?;
        cfg.apply_env_overrides()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Request {
                method,
                path,
                data,
                headers,
                retryable,
                retries,
                timeout_ms,
            } => {
                let args = RequestArgs {
                    method,
                    path,
                    data,
                    headers,
                    retryable,
                    retries,
                    timeout_ms,
                };
                run_request(&cfg, args).await?
            }
            CliCommand::Classify {
                status,
                body,
                network,
                method,
                attempt,
            } => {
                let input = match (status, network) {
                    (Some(status), _) => ClassifyInput::Http {
                        status,
                        body: body.unwrap_or_default(),
                    },
                    (None, Some(code)) => ClassifyInput::Network(code),
                    (None, None) => anyhow::bail!("either --status or --network is required"),
                };
                run_classify(&cfg, input, &method, attempt)?
            }
            CliCommand::Config => run_config(&cfg)?,
            CliCommand::Completions { shell } => run_completions(shell)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
