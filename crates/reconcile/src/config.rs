//! Desired-state document.
//!
//! ```yaml
//! users:
//!   - username: alice
//!     searchDomains:
//!       - { name: "prod-.*", role: Member, regex: true }
//! repos:
//!   - { name: "prod-.*", automaticSearch: true, defaultQuery: errors, regex: true }
//! views:
//!   - { name: all, automaticSearch: false, defaultQuery: "" }
//! defaultQueries:
//!   - { name: errors, global: true, queryString: "level=ERROR", start: 24h }
//! ```
//!
//! Every collection is optional. The document is read once per run and never
//! modified.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root of the desired state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesiredConfig {
    #[serde(default)]
    pub users: Vec<DesiredUser>,
    #[serde(default)]
    pub repos: Vec<DesiredRepo>,
    #[serde(default)]
    pub views: Vec<DesiredView>,
    #[serde(default)]
    pub default_queries: Vec<DesiredDefaultQuery>,
}

impl DesiredConfig {
    /// Decode a YAML document.
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Read and decode a YAML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Number of entries across all collections.
    pub fn len(&self) -> usize {
        self.users.len() + self.repos.len() + self.views.len() + self.default_queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A user and the roles it should hold.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesiredUser {
    /// Identity key. Entries without one are ignored.
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub search_domains: Vec<RoleGrant>,
}

/// A role to grant on one search domain, or on every search domain whose
/// name matches `name` when `regex` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleGrant {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub regex: bool,
}

/// Settings for one repository or view, or for every match of `name` when
/// `regex` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesiredSearchDomain {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub automatic_search: bool,
    /// Saved query name, empty for none.
    #[serde(default)]
    pub default_query: String,
    #[serde(default)]
    pub regex: bool,
}

pub type DesiredRepo = DesiredSearchDomain;
pub type DesiredView = DesiredSearchDomain;

/// A saved query that should exist.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesiredDefaultQuery {
    #[serde(default)]
    pub name: String,
    /// Only global queries (created in every search domain) are reconciled.
    #[serde(default)]
    pub global: bool,
    #[serde(default)]
    pub query_string: String,
    #[serde(default)]
    pub start: String,
    #[serde(default)]
    pub options: Option<String>,
}
