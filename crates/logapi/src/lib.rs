//! # logapi
//!
//! Typed client for the GraphQL admin API of a log-management cluster.
//!
//! This crate provides:
//! - A [`Backend`](backend::Backend) trait covering repositories, views,
//!   saved queries, users, roles, permissions and tokens
//! - A live [`GraphQlBackend`](backend::graphql::GraphQlBackend) and an
//!   in-memory [`MockBackend`] for tests
//! - The retention safety gate guarding data-reducing mutations
//! - Normalization of the polymorphic token listing
//!
//! ## Example
//!
//! ```no_run
//! use logapi::{Client, RetentionDimension};
//!
//! let client = Client::new("https://logs.example.com", "secret");
//!
//! for token in client.list_tokens().unwrap() {
//!     println!("{} ({})", token.name, token.kind);
//! }
//!
//! // Refused if the repository holds data and 7 days is a reduction.
//! client
//!     .update_retention("prod", RetentionDimension::Time, 7.0, false)
//!     .unwrap();
//! ```

#![warn(clippy::all)]

pub mod backend;
pub mod error;
pub mod permissions;
pub mod retention;
pub mod search_domains;
pub mod tokens;
pub mod types;

pub use error::{DATA_DELETION_NOT_ALLOWED, EntityKind, Error, ErrorCategory, Result};
pub use tokens::{NormalizedToken, RawToken, TokenKind};
pub use types::{
    NewSavedQuery, PermissionDescriptor, PermissionType, QueryDetails, Repository,
    RetentionDimension, Role, RoleBinding, SavedQuery, SavedQueryRef, SearchDomain, User,
    UserChangeSet, View, ViewConnection,
};

use backend::Backend;
pub use backend::MockBackend;
use backend::graphql::GraphQlBackend;
use std::time::Duration;

/// High-level client for admin operations.
///
/// Wraps a [`Backend`] and routes the guarded operations (retention changes,
/// repository deletion, token creation) through their checks. Plain reads
/// and unguarded mutations are reached through [`Client::backend`].
///
/// # Example
///
/// ```
/// use logapi::{Client, MockBackend, Repository};
///
/// let mock = MockBackend::new();
/// mock.add_repository(Repository {
///     id: "r1".into(),
///     name: "prod".into(),
///     space_used: 1024,
///     ..Default::default()
/// });
///
/// let client = Client::with_backend(Box::new(mock));
/// assert!(client.delete_repository("prod", "cleanup", false).is_err());
/// ```
pub struct Client {
    backend: Box<dyn Backend>,
}

impl Client {
    /// Create a client talking to the cluster at `address`.
    #[must_use]
    pub fn new(address: &str, token: &str) -> Self {
        Self {
            backend: Box::new(GraphQlBackend::new(address, token)),
        }
    }

    /// Create a client with a custom request timeout.
    #[must_use]
    pub fn with_timeout(address: &str, token: &str, timeout: Duration) -> Self {
        Self {
            backend: Box::new(GraphQlBackend::with_timeout(address, token, timeout)),
        }
    }

    /// Create a client with a custom backend (useful for testing).
    #[must_use]
    pub fn with_backend(backend: Box<dyn Backend>) -> Self {
        Self { backend }
    }

    /// The underlying backend.
    #[must_use]
    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    // =========================================================================
    // Repositories
    // =========================================================================

    /// Change one retention limit, refusing data-reducing changes unless allowed.
    pub fn update_retention(
        &self,
        name: &str,
        dimension: RetentionDimension,
        requested: f64,
        allow_data_deletion: bool,
    ) -> Result<()> {
        retention::update_retention(self.backend(), name, dimension, requested, allow_data_deletion)
    }

    /// Delete a repository, refusing when it holds data unless allowed.
    pub fn delete_repository(&self, name: &str, reason: &str, allow_data_deletion: bool) -> Result<()> {
        retention::delete_repository(self.backend(), name, reason, allow_data_deletion)
    }

    /// Set the default query of a repository or view by saved query name or id.
    pub fn set_default_query(&self, search_domain: &str, query: &str) -> Result<()> {
        search_domains::set_default_query(self.backend(), search_domain, query)
    }

    // =========================================================================
    // Tokens
    // =========================================================================

    /// List tokens normalized to one shape.
    pub fn list_tokens(&self) -> Result<Vec<NormalizedToken>> {
        tokens::list_tokens(self.backend())
    }

    /// Create a token and return its secret.
    pub fn add_token(
        &self,
        name: &str,
        token_type: &str,
        permissions: &[String],
        view_name: &str,
    ) -> Result<String> {
        tokens::add_token(self.backend(), name, token_type, permissions, view_name)
    }

    /// Delete a token by id.
    pub fn delete_token(&self, id: &str) -> Result<()> {
        tokens::delete_token(self.backend(), id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_with_mock_backend() {
        let mock = MockBackend::new();
        mock.add_repository(Repository {
            id: "r1".into(),
            name: "prod".into(),
            ..Default::default()
        });
        let client = Client::with_backend(Box::new(mock.clone()));

        let repos = client.backend().list_repositories().unwrap();
        assert_eq!(repos.len(), 1);

        client.delete_repository("prod", "", false).unwrap();
        assert!(mock.repository("prod").is_none());
    }

    #[test]
    fn test_client_retention_guard() {
        let mock = MockBackend::new();
        mock.add_repository(Repository {
            id: "r1".into(),
            name: "prod".into(),
            space_used: 1,
            time_based_retention: Some(30.0),
            ..Default::default()
        });
        let client = Client::with_backend(Box::new(mock.clone()));

        let err = client
            .update_retention("prod", RetentionDimension::Time, 7.0, false)
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::SafetyViolation);
        assert!(mock.mutations().is_empty());
    }

    #[test]
    fn test_client_token_round() {
        let mock = MockBackend::new();
        mock.set_permissions(PermissionType::Organization, &["CreateRepository"]);
        let client = Client::with_backend(Box::new(mock));

        client
            .add_token("ci", "Organization", &["CreateRepository".to_string()], "")
            .unwrap();
        let tokens = client.list_tokens().unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Organization);

        client.delete_token(&tokens[0].id).unwrap();
        assert!(client.list_tokens().unwrap().is_empty());
    }
}
