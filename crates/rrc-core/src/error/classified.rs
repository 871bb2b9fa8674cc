use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::ErrorCategory;
use crate::transport::NetworkErrorCode;

/// Normalized record of one failed logical request.
///
/// Produced by [`crate::classify::classify`] and returned to callers of the
/// pipeline once retries are exhausted or the failure is judged terminal.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
#[error("{category}: {message}")]
pub struct ClassifiedError {
    pub message: String,
    pub technical_message: Option<String>,
    pub category: ErrorCategory,
    pub status_code: Option<u16>,
    /// Machine-readable code from the remote peer (or a local code such as `ABORTED`).
    pub code: Option<String>,
    /// Explicit retry signal; `None` leaves the decision to the retry decider.
    pub retryable: Option<bool>,
    pub retry_after_ms: Option<u64>,
    pub validation_errors: Option<BTreeMap<String, Vec<String>>>,
    pub tracking_id: Option<String>,
    pub suggestion: Option<String>,
    /// Set only when no response was received.
    pub network_code: Option<NetworkErrorCode>,
    pub timestamp: DateTime<Utc>,
}

impl ClassifiedError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            technical_message: None,
            category,
            status_code: None,
            code: None,
            retryable: None,
            retry_after_ms: None,
            validation_errors: None,
            tracking_id: None,
            suggestion: None,
            network_code: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_technical(mut self, detail: impl Into<String>) -> Self {
        self.technical_message = Some(detail.into());
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = Some(retryable);
        self
    }

    /// True when the failure carried an HTTP status.
    pub fn has_response(&self) -> bool {
        self.status_code.is_some()
    }

    /// Message suitable for end users; falls back to the category text.
    pub fn user_message(&self) -> &str {
        if self.message.trim().is_empty() {
            self.category.friendly_message()
        } else {
            &self.message
        }
    }

    /// Validation messages attached to one form field, if any.
    pub fn field_errors(&self, field: &str) -> &[String] {
        self.validation_errors
            .as_ref()
            .and_then(|errors| errors.get(field))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_falls_back_to_category_text() {
        let err = ClassifiedError::new(ErrorCategory::Resource, "  ");
        assert_eq!(err.user_message(), ErrorCategory::Resource.friendly_message());
        let err = ClassifiedError::new(ErrorCategory::Resource, "Order 17 not found");
        assert_eq!(err.user_message(), "Order 17 not found");
    }

    #[test]
    fn field_errors_reads_validation_map() {
        let mut err = ClassifiedError::new(ErrorCategory::Validation, "invalid");
        let mut map = BTreeMap::new();
        map.insert("sku".to_string(), vec!["must not be empty".to_string()]);
        err.validation_errors = Some(map);
        assert_eq!(err.field_errors("sku"), ["must not be empty".to_string()]);
        assert!(err.field_errors("price").is_empty());
    }

    #[test]
    fn serializes_camel_case() {
        let err = ClassifiedError::new(ErrorCategory::ApiLimit, "slow down").with_status(429);
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["statusCode"], 429);
        assert_eq!(value["category"], "API_LIMIT");
        assert!(value.get("retryAfterMs").is_some());
    }
}
