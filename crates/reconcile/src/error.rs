//! Errors raised before or outside the reconciliation passes.
//!
//! Errors inside a pass never escape: they become failed outcomes in the
//! [`Report`](crate::Report).

use std::path::PathBuf;

/// Result type alias for reconcile operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The desired-state document could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The desired-state document is not valid YAML of the expected shape.
    #[error("invalid desired-state document{location}: {message}")]
    Parse { message: String, location: String },

    /// A `regex: true` entry carries a pattern that does not compile.
    #[error("invalid pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        let location = err
            .location()
            .map(|loc| format!(" at line {}, column {}", loc.line(), loc.column()))
            .unwrap_or_default();
        Self::Parse {
            message: err.to_string(),
            location,
        }
    }
}
