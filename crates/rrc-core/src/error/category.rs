use std::fmt;

use serde::{Deserialize, Serialize};

/// Failure taxonomy shared by the classifier and the retry decider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    Network,
    Internal,
    Validation,
    Authentication,
    Authorization,
    ApiLimit,
    Integration,
    Marketplace,
    Business,
    Resource,
    Conflict,
    Client,
    Request,
    Ui,
    Unexpected,
}

impl ErrorCategory {
    pub const ALL: [ErrorCategory; 15] = [
        ErrorCategory::Network,
        ErrorCategory::Internal,
        ErrorCategory::Validation,
        ErrorCategory::Authentication,
        ErrorCategory::Authorization,
        ErrorCategory::ApiLimit,
        ErrorCategory::Integration,
        ErrorCategory::Marketplace,
        ErrorCategory::Business,
        ErrorCategory::Resource,
        ErrorCategory::Conflict,
        ErrorCategory::Client,
        ErrorCategory::Request,
        ErrorCategory::Ui,
        ErrorCategory::Unexpected,
    ];

    /// Wire form, e.g. `API_LIMIT`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Network => "NETWORK",
            ErrorCategory::Internal => "INTERNAL",
            ErrorCategory::Validation => "VALIDATION",
            ErrorCategory::Authentication => "AUTHENTICATION",
            ErrorCategory::Authorization => "AUTHORIZATION",
            ErrorCategory::ApiLimit => "API_LIMIT",
            ErrorCategory::Integration => "INTEGRATION",
            ErrorCategory::Marketplace => "MARKETPLACE",
            ErrorCategory::Business => "BUSINESS",
            ErrorCategory::Resource => "RESOURCE",
            ErrorCategory::Conflict => "CONFLICT",
            ErrorCategory::Client => "CLIENT",
            ErrorCategory::Request => "REQUEST",
            ErrorCategory::Ui => "UI",
            ErrorCategory::Unexpected => "UNEXPECTED",
        }
    }

    /// Interpret a category string supplied by the remote peer.
    ///
    /// Known values pass through (case-insensitive), `database` is folded
    /// into `Internal`, anything else becomes `Unexpected`.
    pub fn from_peer(value: &str) -> Self {
        let value = value.trim();
        if value.eq_ignore_ascii_case("database") {
            return ErrorCategory::Internal;
        }
        ErrorCategory::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(value))
            .unwrap_or(ErrorCategory::Unexpected)
    }

    /// Category implied by an HTTP status when the body does not declare one.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => ErrorCategory::Authentication,
            403 => ErrorCategory::Authorization,
            404 => ErrorCategory::Resource,
            409 => ErrorCategory::Conflict,
            422 => ErrorCategory::Business,
            429 => ErrorCategory::ApiLimit,
            400..=499 => ErrorCategory::Client,
            _ => ErrorCategory::Internal,
        }
    }

    /// Fallback text for end users when the peer gave no message.
    pub fn friendly_message(&self) -> &'static str {
        match self {
            ErrorCategory::Network => {
                "Unable to reach the server. Please check your connection and try again."
            }
            ErrorCategory::Internal => "The server encountered an error. Please try again later.",
            ErrorCategory::Validation => "Some of the submitted data is invalid.",
            ErrorCategory::Authentication => "Your session has expired. Please sign in again.",
            ErrorCategory::Authorization => "You do not have permission to perform this action.",
            ErrorCategory::ApiLimit => "Too many requests. Please wait a moment and try again.",
            ErrorCategory::Integration => "A connected service is not responding correctly.",
            ErrorCategory::Marketplace => "The marketplace rejected the request.",
            ErrorCategory::Business => "The request could not be completed as submitted.",
            ErrorCategory::Resource => "The requested item could not be found.",
            ErrorCategory::Conflict => "The item was changed by someone else. Reload and retry.",
            ErrorCategory::Client => "Something went wrong in the application.",
            ErrorCategory::Request => "The request was not sent.",
            ErrorCategory::Ui => "The page failed to display correctly.",
            ErrorCategory::Unexpected => "An unexpected error occurred.",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
