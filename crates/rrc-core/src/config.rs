use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::retry::{
    BackoffPolicy, RetryDecider, RetryPolicy, DEFAULT_MAX_RETRIES,
    DEFAULT_RETRYABLE_NETWORK_CODES, DEFAULT_RETRYABLE_STATUS_CODES,
};
use crate::transport::{NetworkErrorCode, TransportError};

/// Environment variable overriding `base_url`.
pub const ENV_BASE_URL: &str = "RRC_BASE_URL";
/// Environment variable overriding `timeout_ms`.
pub const ENV_TIMEOUT_MS: &str = "RRC_TIMEOUT_MS";

/// Retry tuning (optional section in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub retries: u32,
    /// Delay before the first retry, doubled for each further retry.
    pub initial_delay_ms: u64,
    /// Maximum backoff delay (server `retryAfter` hints are not capped).
    pub max_delay_ms: u64,
    #[serde(default = "default_status_codes")]
    pub retryable_status_codes: Vec<u16>,
    #[serde(default = "default_network_codes")]
    pub retryable_network_codes: Vec<NetworkErrorCode>,
}

fn default_status_codes() -> Vec<u16> {
    DEFAULT_RETRYABLE_STATUS_CODES.to_vec()
}

fn default_network_codes() -> Vec<NetworkErrorCode> {
    DEFAULT_RETRYABLE_NETWORK_CODES.to_vec()
}

impl Default for RetryConfig {
    fn default() -> Self {
        let backoff = BackoffPolicy::default();
        Self {
            retries: DEFAULT_MAX_RETRIES,
            initial_delay_ms: backoff.initial_delay_ms,
            max_delay_ms: backoff.max_delay_ms,
            retryable_status_codes: default_status_codes(),
            retryable_network_codes: default_network_codes(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            decider: RetryDecider {
                max_retries: self.retries,
                retryable_status_codes: self.retryable_status_codes.iter().copied().collect(),
                retryable_network_codes: self.retryable_network_codes.iter().copied().collect(),
            },
            backoff: BackoffPolicy {
                initial_delay_ms: self.initial_delay_ms,
                max_delay_ms: self.max_delay_ms,
            },
        }
    }
}

/// Client configuration loaded from `~/.config/rrc/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL request paths are resolved against.
    pub base_url: String,
    /// Per-attempt timeout in milliseconds.
    pub timeout_ms: u64,
    /// Environment variable holding the bearer token, if any.
    #[serde(default)]
    pub token_env: Option<String>,
    /// Optional retry tuning; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api/".to_string(),
            timeout_ms: 30_000,
            token_env: None,
            retry: None,
        }
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry.clone().unwrap_or_default().policy()
    }

    /// Apply `RRC_BASE_URL` / `RRC_TIMEOUT_MS` from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup (used by tests).
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
            self.base_url = url.trim().to_string();
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_MS) {
            self.timeout_ms = raw
                .trim()
                .parse()
                .with_context(|| format!("{ENV_TIMEOUT_MS} is not a number: {raw}"))?;
        }
        Ok(())
    }
}

/// Errors raised while turning a config into a working pipeline.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid base URL {url}: {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("base URL {0} cannot carry request paths")]
    OpaqueBaseUrl(String),
    #[error("building HTTP transport: {0}")]
    Transport(#[from] TransportError),
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("rrc")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<ClientConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = ClientConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    load_from(&path)
}

/// Load configuration from an explicit path.
pub fn load_from(path: &Path) -> Result<ClientConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let cfg: ClientConfig =
        toml::from_str(&data).with_context(|| format!("parsing config {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.timeout(), Duration::from_secs(30));
        assert!(cfg.retry.is_none());
        let policy = cfg.retry_policy();
        assert_eq!(policy.decider.max_retries, 3);
        assert_eq!(policy.backoff, BackoffPolicy::default());
        assert!(policy.decider.retryable_status_codes.contains(&503));
    }

    #[test]
    fn config_toml_roundtrip() {
        let mut cfg = ClientConfig::default();
        cfg.token_env = Some("RRC_TOKEN".to_string());
        cfg.retry = Some(RetryConfig::default());
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: ClientConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn config_toml_retry_section() {
        let toml = r#"
            base_url = "https://ops.example.com/api/v2/"
            timeout_ms = 5000

            [retry]
            retries = 5
            initial_delay_ms = 250
            max_delay_ms = 8000
            retryable_status_codes = [503]
            retryable_network_codes = ["timed_out"]
        "#;
        let cfg: ClientConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.base_url, "https://ops.example.com/api/v2/");
        let policy = cfg.retry_policy();
        assert_eq!(policy.decider.max_retries, 5);
        assert_eq!(policy.backoff.initial_delay_ms, 250);
        assert_eq!(policy.backoff.max_delay_ms, 8000);
        assert_eq!(policy.decider.retryable_status_codes.len(), 1);
        assert!(policy
            .decider
            .retryable_network_codes
            .contains(&NetworkErrorCode::TimedOut));
        assert!(!policy
            .decider
            .retryable_network_codes
            .contains(&NetworkErrorCode::ConnectionReset));
    }

    #[test]
    fn retry_code_sets_default_when_omitted() {
        let toml = r#"
            base_url = "http://localhost/"
            timeout_ms = 1000
            [retry]
            retries = 1
            initial_delay_ms = 10
            max_delay_ms = 100
        "#;
        let cfg: ClientConfig = toml::from_str(toml).unwrap();
        let retry = cfg.retry.unwrap();
        assert_eq!(retry.retryable_status_codes, default_status_codes());
        assert_eq!(retry.retryable_network_codes, default_network_codes());
    }

    #[test]
    fn overrides_replace_values_and_reject_bad_timeout() {
        let mut cfg = ClientConfig::default();
        cfg.apply_overrides_from(|key| match key {
            ENV_BASE_URL => Some("https://staging.example.com/".to_string()),
            ENV_TIMEOUT_MS => Some("1500".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(cfg.base_url, "https://staging.example.com/");
        assert_eq!(cfg.timeout_ms, 1500);

        let err = cfg
            .apply_overrides_from(|key| (key == ENV_TIMEOUT_MS).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_TIMEOUT_MS));
    }

    #[test]
    fn load_from_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "base_url = \"http://10.0.0.1/\"\ntimeout_ms = 42\n").unwrap();
        let cfg = load_from(&path).unwrap();
        assert_eq!(cfg.timeout_ms, 42);
        assert!(load_from(&dir.path().join("missing.toml")).is_err());
    }
}
