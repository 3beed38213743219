//! Error types for admin API operations.
//!
//! Errors are categorized so callers (most importantly the reconciliation
//! engine) can decide whether a failure aborts one entry, needs an explicit
//! operator override, or points at a broken connection.

use std::fmt;

/// Result type alias for admin API operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Message used for every refused data-reducing mutation.
pub const DATA_DELETION_NOT_ALLOWED: &str = "repository contains data and data deletion not allowed";

/// Categories of API errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// A named entity (role, user, view, saved query, ...) does not exist.
    NotFound,
    /// A mutation was refused because it would discard retained data.
    SafetyViolation,
    /// Caller supplied input the API would reject.
    Validation,
    /// Network, authentication or protocol failure.
    Transport,
}

impl ErrorCategory {
    /// Whether this error category is typically transient.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::NotFound => "Entity not found",
            Self::SafetyViolation => "Refused to delete data",
            Self::Validation => "Invalid input",
            Self::Transport => "Remote call failed",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::NotFound => "Verify the name is spelled correctly and exists on the cluster",
            Self::SafetyViolation => "Re-run with --allow-data-deletion if losing data is intended",
            Self::Validation => "Run 'logctl permissions list' or check the command help",
            Self::Transport => "Check the address, the API token and your network connection",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Kinds of remote entities that can be looked up by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Repository,
    View,
    SearchDomain,
    SavedQuery,
    User,
    Role,
    Token,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Repository => "repository",
            Self::View => "view",
            Self::SearchDomain => "search domain",
            Self::SavedQuery => "saved query",
            Self::User => "user",
            Self::Role => "role",
            Self::Token => "token",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while talking to the admin API.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A named entity does not exist.
    #[error("{kind} {key:?} not found")]
    NotFound {
        /// What was looked up.
        kind: EntityKind,
        /// The name or id used for the lookup.
        key: String,
    },

    /// Retention or deletion refused by the safety gate.
    #[error("{}", DATA_DELETION_NOT_ALLOWED)]
    SafetyViolation {
        /// Repository the mutation targeted.
        repository: String,
    },

    /// Invalid input.
    #[error("{0}")]
    Validation(String),

    /// HTTP request failed.
    #[error("HTTP request failed: {message}")]
    Http {
        /// Error message.
        message: String,
        /// HTTP status code if available.
        status: Option<u16>,
    },

    /// The GraphQL endpoint answered with an `errors` array.
    #[error("API error: {0}")]
    Api(String),

    /// Response body could not be decoded.
    #[error("invalid API response: {0}")]
    InvalidResponse(String),
}

impl Error {
    /// Create a not-found error.
    pub fn not_found(kind: EntityKind, key: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            key: key.into(),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an HTTP error.
    pub fn http(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Http {
            message: message.into(),
            status,
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::NotFound { .. } => ErrorCategory::NotFound,
            Error::SafetyViolation { .. } => ErrorCategory::SafetyViolation,
            Error::Validation(_) => ErrorCategory::Validation,
            Error::Http { .. } => ErrorCategory::Transport,
            Error::Api(msg) => {
                if msg.to_lowercase().contains("not found") {
                    ErrorCategory::NotFound
                } else {
                    ErrorCategory::Transport
                }
            }
            Error::InvalidResponse(_) => ErrorCategory::Transport,
        }
    }

    /// Whether this error means the looked-up entity does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.category() == ErrorCategory::NotFound
    }

    /// Whether this error is typically transient.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::Http {
                message: format!("HTTP {code}"),
                status: Some(code),
            },
            other => Self::Http {
                message: other.to_string(),
                status: None,
            },
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_retryable() {
        assert!(ErrorCategory::Transport.is_retryable());
        assert!(!ErrorCategory::NotFound.is_retryable());
        assert!(!ErrorCategory::SafetyViolation.is_retryable());
        assert!(!ErrorCategory::Validation.is_retryable());
    }

    #[test]
    fn test_error_category_advice() {
        assert!(ErrorCategory::SafetyViolation.advice().contains("--allow-data-deletion"));
        assert!(!ErrorCategory::Transport.description().is_empty());
    }

    #[test]
    fn test_not_found_display() {
        let err = Error::not_found(EntityKind::Role, "admin");
        assert_eq!(err.to_string(), "role \"admin\" not found");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_safety_violation_display() {
        let err = Error::SafetyViolation {
            repository: "repo-x".to_string(),
        };
        assert_eq!(err.to_string(), DATA_DELETION_NOT_ALLOWED);
        assert_eq!(err.category(), ErrorCategory::SafetyViolation);
    }

    #[test]
    fn test_api_error_category() {
        assert!(Error::Api("Entity not found".into()).is_not_found());
        assert_eq!(
            Error::Api("Unauthorized".into()).category(),
            ErrorCategory::Transport
        );
    }

    #[test]
    fn test_http_category() {
        let err = Error::http("connection reset", Some(502));
        assert_eq!(err.category(), ErrorCategory::Transport);
        assert!(err.is_retryable());
        let missing_endpoint = Error::http("not found", Some(404));
        assert_eq!(missing_endpoint.category(), ErrorCategory::Transport);
        assert!(!missing_endpoint.is_not_found());
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::InvalidResponse(_)));
    }
}
