//! Backend trait and implementations for talking to the admin API.
//!
//! The [`Backend`] trait is the narrow interface every higher layer
//! (token handling, the retention gate, the reconciliation engine) is
//! written against. [`graphql::GraphQlBackend`] talks to a live cluster;
//! [`MockBackend`] keeps everything in memory for tests.
//!
//! # Testing
//!
//! ```
//! use logapi::backend::{Backend, MockBackend};
//! use logapi::Repository;
//!
//! let mock = MockBackend::new();
//! mock.add_repository(Repository {
//!     id: "r1".to_string(),
//!     name: "prod".to_string(),
//!     ..Default::default()
//! });
//!
//! let repos = mock.list_repositories().unwrap();
//! assert_eq!(repos.len(), 1);
//! assert!(mock.mutations().is_empty());
//! ```

pub mod graphql;
mod mock;

pub use mock::{MockBackend, Mutation};

use crate::error::{EntityKind, Error, Result};
use crate::tokens::RawToken;
use crate::types::{
    NewSavedQuery, PermissionDescriptor, PermissionType, Repository, RetentionDimension, Role,
    SavedQuery, SearchDomain, User, UserChangeSet, View, ViewConnection,
};

/// Remote state accessor.
///
/// Lookups of a single entity either return `Option` (absence is a normal
/// answer the caller branches on) or fail with [`Error::NotFound`] (absence
/// aborts the caller). Mutations return `()` unless the API hands back a
/// value the caller needs.
pub trait Backend: Send + Sync {
    // =========================================================================
    // Users
    // =========================================================================

    /// Look up a user by username.
    fn get_user(&self, username: &str) -> Result<Option<User>>;

    /// Create a user.
    fn create_user(&self, username: &str, changes: &UserChangeSet) -> Result<User>;

    /// Rename a user.
    fn update_username(&self, username: &str, new_username: &str) -> Result<User>;

    // =========================================================================
    // Search domains
    // =========================================================================

    /// List every repository and view.
    fn list_search_domains(&self) -> Result<Vec<SearchDomain>>;

    /// Fetch one repository or view with its saved queries.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if no search domain has that name.
    fn get_search_domain(&self, name: &str) -> Result<SearchDomain>;

    /// Bind `role_id` to `user_id` on a search domain.
    fn assign_user_role(&self, search_domain_id: &str, user_id: &str, role_id: &str)
    -> Result<()>;

    /// Turn automatic search on or off for a repository or view.
    fn set_automatic_search(&self, search_domain: &str, automatic_search: bool) -> Result<()>;

    /// Point a repository's or view's default query at a saved query.
    fn set_default_saved_query(&self, search_domain: &str, saved_query_id: &str) -> Result<()>;

    /// Replace the description of a repository or view.
    fn update_description(&self, search_domain: &str, description: &str) -> Result<()>;

    /// Delete a repository or view. No safety checks happen at this level.
    fn delete_search_domain(&self, name: &str, reason: &str) -> Result<()>;

    // =========================================================================
    // Roles
    // =========================================================================

    fn list_roles(&self) -> Result<Vec<Role>>;

    /// Look up a role by display name.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the role does not exist.
    fn get_role(&self, name: &str) -> Result<Role>;

    fn remove_role(&self, name: &str) -> Result<()>;

    // =========================================================================
    // Saved queries
    // =========================================================================

    /// Find a saved query by name or id inside a search domain.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the search domain or the query is missing.
    fn get_saved_query(&self, name_or_id: &str, search_domain: &str) -> Result<SavedQuery> {
        let domain = self.get_search_domain(search_domain)?;
        domain
            .find_saved_query(name_or_id)
            .cloned()
            .ok_or_else(|| Error::not_found(EntityKind::SavedQuery, name_or_id))
    }

    fn create_saved_query(&self, query: &NewSavedQuery) -> Result<()>;

    fn delete_saved_query(&self, search_domain: &str, saved_query_id: &str) -> Result<()>;

    // =========================================================================
    // Repositories
    // =========================================================================

    fn list_repositories(&self) -> Result<Vec<Repository>>;

    /// Look up a repository by name.
    fn get_repository(&self, name: &str) -> Result<Option<Repository>>;

    fn create_repository(&self, name: &str) -> Result<()>;

    /// Set (`Some`) or clear (`None`) one retention limit.
    ///
    /// Raw mutation: callers go through [`crate::retention::update_retention`]
    /// so the data-loss check runs first.
    fn update_retention(
        &self,
        name: &str,
        dimension: RetentionDimension,
        value: Option<f64>,
    ) -> Result<()>;

    // =========================================================================
    // Views
    // =========================================================================

    fn list_views(&self) -> Result<Vec<View>>;

    /// Look up a view by name.
    fn get_view(&self, name: &str) -> Result<Option<View>>;

    fn create_view(&self, name: &str, description: &str, connections: &[ViewConnection])
    -> Result<()>;

    fn update_view_connections(&self, name: &str, connections: &[ViewConnection]) -> Result<()>;

    /// Resolve a view name to its id.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the view does not exist.
    fn resolve_view_id(&self, name: &str) -> Result<String> {
        self.get_view(name)?
            .map(|view| view.id)
            .ok_or_else(|| Error::not_found(EntityKind::View, name))
    }

    // =========================================================================
    // Permissions and tokens
    // =========================================================================

    /// List the valid values of a permission enumeration.
    fn list_permissions(&self, permission_type: PermissionType)
    -> Result<Vec<PermissionDescriptor>>;

    /// List tokens in their raw, per-kind shape.
    fn list_tokens(&self) -> Result<Vec<RawToken>>;

    /// Create a system token and return its secret.
    fn create_system_token(&self, name: &str, permissions: &[String]) -> Result<String>;

    /// Create an organization token and return its secret.
    fn create_organization_token(&self, name: &str, permissions: &[String]) -> Result<String>;

    /// Create a token scoped to one view and return its secret.
    fn create_view_token(&self, name: &str, view_id: &str, permissions: &[String])
    -> Result<String>;

    fn delete_token(&self, id: &str) -> Result<()>;
}
