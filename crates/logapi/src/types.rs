//! Core types for the admin API.
//!
//! These are read-only projections of remote entities plus the input
//! records used by mutations. Wire-format quirks (nested selections,
//! GraphQL naming) are handled by the backends, not here.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Widget type used when creating saved queries without an explicit one.
pub const DEFAULT_WIDGET_TYPE: &str = "list-view";

/// Reference to a saved query (used as a search domain's default query).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SavedQueryRef {
    pub id: String,
    pub name: String,
}

/// A repository as seen by the admin API.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub automatic_search: bool,
    #[serde(default)]
    pub default_query: Option<SavedQueryRef>,
    /// Compressed bytes currently stored.
    #[serde(rename = "compressedByteSize", default)]
    pub space_used: u64,
    /// Retention in days, `None` when unbounded.
    #[serde(default)]
    pub time_based_retention: Option<f64>,
    /// Ingest size based retention in GB, `None` when unbounded.
    #[serde(default)]
    pub ingest_size_based_retention: Option<f64>,
    /// Storage size based retention in GB, `None` when unbounded.
    #[serde(default)]
    pub storage_size_based_retention: Option<f64>,
}

impl Repository {
    /// Name of the current default query, empty when none is set.
    pub fn default_query_name(&self) -> &str {
        self.default_query.as_ref().map_or("", |q| q.name.as_str())
    }

    /// Whether the repository holds no data at all.
    pub fn is_empty(&self) -> bool {
        self.space_used == 0
    }
}

/// A repository feeding a view, with the filter applied to its events.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewConnection {
    pub repository_name: String,
    pub filter: String,
}

/// A view as seen by the admin API.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct View {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub automatic_search: bool,
    pub default_query: Option<SavedQueryRef>,
    pub connections: Vec<ViewConnection>,
}

impl View {
    /// Name of the current default query, empty when none is set.
    pub fn default_query_name(&self) -> &str {
        self.default_query.as_ref().map_or("", |q| q.name.as_str())
    }
}

/// Query body of a saved query.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryDetails {
    #[serde(default)]
    pub query_string: String,
    #[serde(default)]
    pub start: String,
    #[serde(default)]
    pub end: String,
    #[serde(default)]
    pub is_live: bool,
}

/// A saved query stored in a search domain.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SavedQuery {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub query: QueryDetails,
}

impl SavedQuery {
    /// Whether `name_or_id` identifies this query.
    pub fn matches(&self, name_or_id: &str) -> bool {
        self.id == name_or_id || self.name == name_or_id
    }

    /// Reference to this query.
    pub fn to_ref(&self) -> SavedQueryRef {
        SavedQueryRef {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

/// Input for creating a saved query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSavedQuery {
    pub name: String,
    /// Repository or view the query is stored in.
    pub view_name: String,
    pub query_string: String,
    pub start: String,
    pub end: String,
    pub is_live: bool,
    pub widget_type: String,
}

impl NewSavedQuery {
    /// A non-live query from `1h` ago until `now`, shown as a list.
    pub fn new(
        name: impl Into<String>,
        search_domain: impl Into<String>,
        query_string: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            view_name: search_domain.into(),
            query_string: query_string.into(),
            start: "1h".to_string(),
            end: "now".to_string(),
            is_live: false,
            widget_type: DEFAULT_WIDGET_TYPE.to_string(),
        }
    }

    /// Set the query start.
    pub fn start(mut self, start: impl Into<String>) -> Self {
        self.start = start.into();
        self
    }

    /// Set the query end.
    pub fn end(mut self, end: impl Into<String>) -> Self {
        self.end = end.into();
        self
    }

    /// Set live mode.
    pub fn live(mut self, is_live: bool) -> Self {
        self.is_live = is_live;
        self
    }

    /// Set the displayed widget.
    pub fn widget_type(mut self, widget_type: impl Into<String>) -> Self {
        self.widget_type = widget_type.into();
        self
    }
}

/// A repository or view, as a holder of saved queries.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchDomain {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub saved_queries: Vec<SavedQuery>,
}

impl SearchDomain {
    /// Find a saved query by name or id.
    pub fn find_saved_query(&self, name_or_id: &str) -> Option<&SavedQuery> {
        self.saved_queries.iter().find(|q| q.matches(name_or_id))
    }
}

/// A role granted to a user on one search domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoleBinding {
    pub search_domain_id: String,
    pub role_id: String,
}

/// A user account.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct User {
    pub id: String,
    pub username: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub company: Option<String>,
    pub is_root: bool,
    pub search_domain_roles: Vec<RoleBinding>,
}

impl User {
    /// Whether the user already holds `role_id` on `search_domain_id`.
    pub fn has_role(&self, search_domain_id: &str, role_id: &str) -> bool {
        self.search_domain_roles
            .iter()
            .any(|b| b.search_domain_id == search_domain_id && b.role_id == role_id)
    }
}

/// Optional attributes applied when creating a user.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserChangeSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_root: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

/// A role that can be granted on search domains.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: String,
    pub display_name: String,
}

/// The three permission enumerations in the remote schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionType {
    /// Permissions on a view or repository.
    View,
    Organization,
    System,
}

impl PermissionType {
    /// Name of the GraphQL enum listing valid values.
    #[must_use]
    pub fn schema_name(&self) -> &'static str {
        match self {
            Self::View => "Permission",
            Self::Organization => "OrganizationPermission",
            Self::System => "SystemPermission",
        }
    }

    #[must_use]
    pub fn all() -> &'static [PermissionType] {
        &[Self::View, Self::Organization, Self::System]
    }
}

impl fmt::Display for PermissionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.schema_name())
    }
}

/// One valid value of a permission enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_deprecated: bool,
}

/// Retention limits a repository can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RetentionDimension {
    /// Days of data kept.
    Time,
    /// GB of ingested (uncompressed) data kept.
    IngestSize,
    /// GB of stored (compressed) data kept.
    StorageSize,
}

impl RetentionDimension {
    /// Argument name of the `updateRetention` mutation.
    #[must_use]
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::Time => "timeBasedRetention",
            Self::IngestSize => "ingestSizeBasedRetention",
            Self::StorageSize => "storageSizeBasedRetention",
        }
    }

    /// Current limit of `repo` in this dimension, `0` when unbounded.
    #[must_use]
    pub fn current(&self, repo: &Repository) -> f64 {
        let value = match self {
            Self::Time => repo.time_based_retention,
            Self::IngestSize => repo.ingest_size_based_retention,
            Self::StorageSize => repo.storage_size_based_retention,
        };
        value.unwrap_or(0.0)
    }
}

impl fmt::Display for RetentionDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Time => "time based retention",
            Self::IngestSize => "ingest size based retention",
            Self::StorageSize => "storage size based retention",
        };
        f.write_str(label)
    }
}
