//! Tests for `rrc request`.

use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::Parser;
use rrc_core::Method;

#[test]
fn cli_parse_request_minimal() {
    match parse(&["rrc", "request", "get", "orders"]) {
        CliCommand::Request {
            method,
            path,
            data,
            headers,
            retryable,
            retries,
            timeout_ms,
        } => {
            assert_eq!(method, Method::GET);
            assert_eq!(path, "orders");
            assert!(data.is_none());
            assert!(headers.is_empty());
            assert!(!retryable);
            assert!(retries.is_none());
            assert!(timeout_ms.is_none());
        }
        _ => panic!("expected Request"),
    }
}

#[test]
fn cli_parse_request_full() {
    match parse(&[
        "rrc",
        "request",
        "PATCH",
        "credits/9",
        "--data",
        r#"{"amount":15}"#,
        "-H",
        "X-Trace: abc",
        "--header",
        "Accept-Language:fr",
        "--retryable",
        "--retries",
        "5",
        "--timeout-ms",
        "1500",
    ]) {
        CliCommand::Request {
            method,
            path,
            data,
            headers,
            retryable,
            retries,
            timeout_ms,
        } => {
            assert_eq!(method, Method::PATCH);
            assert_eq!(path, "credits/9");
            assert_eq!(data, Some(serde_json::json!({"amount": 15})));
            assert_eq!(
                headers,
                vec![
                    ("X-Trace".to_string(), "abc".to_string()),
                    ("Accept-Language".to_string(), "fr".to_string()),
                ]
            );
            assert!(retryable);
            assert_eq!(retries, Some(5));
            assert_eq!(timeout_ms, Some(1500));
        }
        _ => panic!("expected Request"),
    }
}

#[test]
fn cli_rejects_malformed_header() {
    assert!(Cli::try_parse_from(["rrc", "request", "GET", "x", "-H", "no-colon"]).is_err());
}

#[test]
fn cli_rejects_invalid_json_body() {
    assert!(Cli::try_parse_from(["rrc", "request", "POST", "x", "--data", "{oops"]).is_err());
}
