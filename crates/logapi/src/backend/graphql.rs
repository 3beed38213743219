//! GraphQL backend.
//!
//! This module provides the [`GraphQlBackend`] implementation, which posts
//! queries and mutations to the cluster's `/graphql` endpoint with a bearer
//! token.
//!
//! Every request is a single blocking round trip. The agent applies one
//! global timeout per request; nothing is retried.

use crate::backend::Backend;
use crate::error::{EntityKind, Error, Result};
use crate::tokens::RawToken;
use crate::types::{
    NewSavedQuery, PermissionDescriptor, PermissionType, Repository, RetentionDimension, Role,
    RoleBinding, SavedQueryRef, SearchDomain, User, UserChangeSet, View, ViewConnection,
};
use log::{debug, trace};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// =============================================================================
// Queries
// =============================================================================

const USER_FIELDS: &str = "id username fullName email company isRoot \
    searchDomainRoles { searchDomain { id } role { id } }";

const SEARCH_DOMAIN_FIELDS: &str = "id name description \
    savedQueries { id name query { queryString start end isLive } }";

const REPOSITORY_FIELDS: &str = "id name description automaticSearch \
    defaultQuery { id name } compressedByteSize \
    timeBasedRetention ingestSizeBasedRetention storageSizeBasedRetention";

const VIEW_FIELDS: &str = "id name description automaticSearch defaultQuery { id name } \
    ... on View { connections { repository { name } filter } }";

const TOKEN_FIELDS: &str = "__typename \
    ... on ViewPermissionsToken { id name createdAt expireAt ipFilter permissions views { name } } \
    ... on SystemPermissionsToken { id name createdAt expireAt ipFilter permissions } \
    ... on OrganizationPermissionsToken { id name createdAt expireAt ipFilter permissions }";

/// Backend talking to a live cluster.
///
/// # Example
///
/// ```no_run
/// use logapi::backend::graphql::GraphQlBackend;
/// use logapi::backend::Backend;
///
/// let backend = GraphQlBackend::new("https://logs.example.com", "secret");
/// let repos = backend.list_repositories().unwrap();
/// println!("Found {} repositories", repos.len());
/// ```
pub struct GraphQlBackend {
    agent: ureq::Agent,
    endpoint: String,
    token: String,
}

impl GraphQlBackend {
    /// Create a backend with the default timeout.
    #[must_use]
    pub fn new(address: &str, token: impl Into<String>) -> Self {
        Self::with_timeout(address, token, DEFAULT_TIMEOUT)
    }

    /// Create a backend with a custom request timeout.
    #[must_use]
    pub fn with_timeout(address: &str, token: impl Into<String>, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self {
            agent,
            endpoint: format!("{}/graphql", address.trim_end_matches('/')),
            token: token.into(),
        }
    }

    /// URL requests are posted to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Run one query or mutation and decode its `data`.
    fn query<T: DeserializeOwned>(&self, query: &str, variables: Value) -> Result<T> {
        debug!("POST {}: {}", self.endpoint, first_line(query));
        trace!("variables: {variables}");

        let body = json!({ "query": query, "variables": variables });
        let response: GraphQlResponse<T> = self
            .agent
            .post(&self.endpoint)
            .header("Authorization", &format!("Bearer {}", self.token))
            .header("User-Agent", concat!("logctl/", env!("CARGO_PKG_VERSION")))
            .send_json(&body)?
            .body_mut()
            .read_json()?;

        if !response.errors.is_empty() {
            let messages: Vec<_> = response.errors.into_iter().map(|e| e.message).collect();
            return Err(Error::Api(messages.join("; ")));
        }
        response
            .data
            .ok_or_else(|| Error::InvalidResponse("response carried neither data nor errors".into()))
    }

    /// Run a mutation whose result selection is irrelevant.
    fn mutate(&self, mutation: &str, variables: Value) -> Result<()> {
        let _: Value = self.query(mutation, variables)?;
        Ok(())
    }

    /// Run a lookup, mapping a not-found answer to `None`.
    fn lookup<T: DeserializeOwned>(&self, query: &str, variables: Value) -> Result<Option<T>> {
        match self.query(query, variables) {
            Ok(found) => Ok(Some(found)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

fn first_line(query: &str) -> &str {
    query.trim().lines().next().unwrap_or_default()
}

impl Backend for GraphQlBackend {
    fn get_user(&self, username: &str) -> Result<Option<User>> {
        let query = format!(
            "query($search: String!) {{ users(search: $search) {{ {USER_FIELDS} }} }}"
        );
        let data: UsersData = self.query(&query, json!({ "search": username }))?;
        Ok(data
            .users
            .into_iter()
            .find(|u| u.username == username)
            .map(Into::into))
    }

    fn create_user(&self, username: &str, changes: &UserChangeSet) -> Result<User> {
        let mut input = serde_json::to_value(changes)?;
        input["username"] = json!(username);
        let mutation = format!(
            "mutation($input: AddUserInput!) {{ addUser(input: $input) {{ user {{ {USER_FIELDS} }} }} }}"
        );
        let data: AddUserData = self.query(&mutation, json!({ "input": input }))?;
        Ok(data.add_user.user.into())
    }

    fn update_username(&self, username: &str, new_username: &str) -> Result<User> {
        let mutation = format!(
            "mutation($username: String!, $newUsername: String!) {{ \
             updateUsername(input: {{username: $username, newUsername: $newUsername}}) \
             {{ user {{ {USER_FIELDS} }} }} }}"
        );
        let data: UpdateUsernameData = self.query(
            &mutation,
            json!({ "username": username, "newUsername": new_username }),
        )?;
        Ok(data.update_username.user.into())
    }

    fn list_search_domains(&self) -> Result<Vec<SearchDomain>> {
        let query = format!("query {{ searchDomains {{ {SEARCH_DOMAIN_FIELDS} }} }}");
        let data: SearchDomainsData = self.query(&query, json!({}))?;
        Ok(data.search_domains)
    }

    fn get_search_domain(&self, name: &str) -> Result<SearchDomain> {
        let query = format!(
            "query($name: String!) {{ searchDomain(name: $name) {{ {SEARCH_DOMAIN_FIELDS} }} }}"
        );
        let data: Option<SearchDomainData> = self.lookup(&query, json!({ "name": name }))?;
        data.map(|d| d.search_domain)
            .ok_or_else(|| Error::not_found(EntityKind::SearchDomain, name))
    }

    fn assign_user_role(&self, search_domain_id: &str, user_id: &str, role_id: &str) -> Result<()> {
        self.mutate(
            "mutation($searchDomainId: String!, $users: [UserRoleAssignment!]!) { \
             changeUserAndGroupRolesForSearchDomain(searchDomainId: $searchDomainId, \
             groups: [], users: $users) { __typename } }",
            json!({
                "searchDomainId": search_domain_id,
                "users": [{ "userId": user_id, "roleId": role_id }],
            }),
        )
    }

    fn set_automatic_search(&self, search_domain: &str, automatic_search: bool) -> Result<()> {
        self.mutate(
            "mutation($name: String!, $automaticSearch: Boolean!) { \
             setAutomaticSearching(name: $name, automaticSearch: $automaticSearch) { __typename } }",
            json!({ "name": search_domain, "automaticSearch": automatic_search }),
        )
    }

    fn set_default_saved_query(&self, search_domain: &str, saved_query_id: &str) -> Result<()> {
        self.mutate(
            "mutation($savedQueryId: String!, $viewName: String!) { \
             setDefaultSavedQuery(input: {savedQueryId: $savedQueryId, viewName: $viewName}) \
             { __typename } }",
            json!({ "savedQueryId": saved_query_id, "viewName": search_domain }),
        )
    }

    fn update_description(&self, search_domain: &str, description: &str) -> Result<()> {
        self.mutate(
            "mutation($name: String!, $description: String!) { \
             updateDescriptionForSearchDomain(name: $name, newDescription: $description) \
             { __typename } }",
            json!({ "name": search_domain, "description": description }),
        )
    }

    fn delete_search_domain(&self, name: &str, reason: &str) -> Result<()> {
        self.mutate(
            "mutation($name: String!, $reason: String!) { \
             deleteSearchDomain(name: $name, deleteMessage: $reason) { __typename } }",
            json!({ "name": name, "reason": reason }),
        )
    }

    fn list_roles(&self) -> Result<Vec<Role>> {
        let data: RolesData = self.query("query { roles { id displayName } }", json!({}))?;
        Ok(data.roles)
    }

    fn get_role(&self, name: &str) -> Result<Role> {
        self.list_roles()?
            .into_iter()
            .find(|r| r.display_name == name)
            .ok_or_else(|| Error::not_found(EntityKind::Role, name))
    }

    fn remove_role(&self, name: &str) -> Result<()> {
        let role = self.get_role(name)?;
        self.mutate(
            "mutation($roleId: String!) { removeRole(roleId: $roleId) { result } }",
            json!({ "roleId": role.id }),
        )
    }

    fn create_saved_query(&self, query: &NewSavedQuery) -> Result<()> {
        self.mutate(
            "mutation($input: CreateSavedQueryInput!) { \
             createSavedQuery(input: $input) { __typename } }",
            json!({ "input": query }),
        )
    }

    fn delete_saved_query(&self, search_domain: &str, saved_query_id: &str) -> Result<()> {
        self.mutate(
            "mutation($id: String!, $viewName: String!) { \
             deleteSavedQuery(input: {id: $id, viewName: $viewName}) { __typename } }",
            json!({ "id": saved_query_id, "viewName": search_domain }),
        )
    }

    fn list_repositories(&self) -> Result<Vec<Repository>> {
        let query = format!("query {{ repositories {{ {REPOSITORY_FIELDS} }} }}");
        let data: RepositoriesData = self.query(&query, json!({}))?;
        Ok(data.repositories)
    }

    fn get_repository(&self, name: &str) -> Result<Option<Repository>> {
        let query = format!(
            "query($name: String!) {{ repository(name: $name) {{ {REPOSITORY_FIELDS} }} }}"
        );
        let data: Option<RepositoryData> = self.lookup(&query, json!({ "name": name }))?;
        Ok(data.map(|d| d.repository))
    }

    fn create_repository(&self, name: &str) -> Result<()> {
        self.mutate(
            "mutation($name: String!) { createRepository(name: $name) { repository { id } } }",
            json!({ "name": name }),
        )
    }

    fn update_retention(
        &self,
        name: &str,
        dimension: RetentionDimension,
        value: Option<f64>,
    ) -> Result<()> {
        let field = dimension.field_name();
        let mutation = format!(
            "mutation($name: String!, $value: Float) {{ \
             updateRetention(repositoryName: $name, {field}: $value) {{ __typename }} }}"
        );
        self.mutate(&mutation, json!({ "name": name, "value": value }))
    }

    fn list_views(&self) -> Result<Vec<View>> {
        let query = format!("query {{ searchDomains {{ {VIEW_FIELDS} }} }}");
        let data: ViewsData = self.query(&query, json!({}))?;
        let mut views: Vec<View> = data.search_domains.into_iter().map(Into::into).collect();
        views.sort_by_key(|v| v.name.to_lowercase());
        Ok(views)
    }

    fn get_view(&self, name: &str) -> Result<Option<View>> {
        let query = format!(
            "query($name: String!) {{ searchDomain(name: $name) {{ {VIEW_FIELDS} }} }}"
        );
        let data: Option<ViewData> = self.lookup(&query, json!({ "name": name }))?;
        Ok(data.and_then(ViewData::into_view))
    }

    fn create_view(&self, name: &str, description: &str, connections: &[ViewConnection]) -> Result<()> {
        self.mutate(
            "mutation($name: String!, $description: String, $connections: [ViewConnectionInput!]) { \
             createView(name: $name, description: $description, connections: $connections) \
             { name } }",
            json!({ "name": name, "description": description, "connections": connections }),
        )
    }

    fn update_view_connections(&self, name: &str, connections: &[ViewConnection]) -> Result<()> {
        self.mutate(
            "mutation($viewName: String!, $connections: [ViewConnectionInput!]!) { \
             updateView(viewName: $viewName, connections: $connections) { name } }",
            json!({ "viewName": name, "connections": connections }),
        )
    }

    fn list_permissions(&self, permission_type: PermissionType) -> Result<Vec<PermissionDescriptor>> {
        let data: TypeData = self.query(
            "query($name: String!) { __type(name: $name) { name \
             enumValues { name description isDeprecated } } }",
            json!({ "name": permission_type.schema_name() }),
        )?;
        Ok(data.schema_type.map(|t| t.enum_values).unwrap_or_default())
    }

    fn list_tokens(&self) -> Result<Vec<RawToken>> {
        let query = format!(
            "query {{ tokens(typeFilter: [ViewPermissionToken, SystemPermissionToken, \
             OrganizationPermissionToken], sortBy: Name) {{ results {{ {TOKEN_FIELDS} }} }} }}"
        );
        let data: TokensData = self.query(&query, json!({}))?;
        Ok(data.tokens.results)
    }

    fn create_system_token(&self, name: &str, permissions: &[String]) -> Result<String> {
        let data: CreateSystemTokenData = self.query(
            "mutation($name: String!, $permissions: [SystemPermission!]!) { \
             createSystemPermissionsToken(input: {name: $name, permissions: $permissions}) }",
            json!({ "name": name, "permissions": permissions }),
        )?;
        Ok(data.secret)
    }

    fn create_organization_token(&self, name: &str, permissions: &[String]) -> Result<String> {
        let data: CreateOrganizationTokenData = self.query(
            "mutation($name: String!, $permissions: [OrganizationPermission!]!) { \
             createOrganizationPermissionsToken(input: {name: $name, permissions: $permissions}) }",
            json!({ "name": name, "permissions": permissions }),
        )?;
        Ok(data.secret)
    }

    fn create_view_token(&self, name: &str, view_id: &str, permissions: &[String]) -> Result<String> {
        let data: CreateViewTokenData = self.query(
            "mutation($name: String!, $viewId: String!, $permissions: [Permission!]!) { \
             createViewPermissionsToken(input: {name: $name, viewIds: [$viewId], \
             permissions: $permissions}) }",
            json!({ "name": name, "viewId": view_id, "permissions": permissions }),
        )?;
        Ok(data.secret)
    }

    fn delete_token(&self, id: &str) -> Result<()> {
        self.mutate(
            "mutation($tokenId: String!) { deleteToken(input: {id: $tokenId}) }",
            json!({ "tokenId": id }),
        )
    }
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct IdOnly {
    id: String,
}

#[derive(Debug, Deserialize)]
struct WireRoleBinding {
    #[serde(rename = "searchDomain")]
    search_domain: IdOnly,
    role: IdOnly,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireUser {
    id: String,
    username: String,
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    company: Option<String>,
    #[serde(default)]
    is_root: bool,
    #[serde(default)]
    search_domain_roles: Vec<WireRoleBinding>,
}

impl From<WireUser> for User {
    fn from(u: WireUser) -> Self {
        Self {
            id: u.id,
            username: u.username,
            full_name: u.full_name,
            email: u.email,
            company: u.company,
            is_root: u.is_root,
            search_domain_roles: u
                .search_domain_roles
                .into_iter()
                .map(|b| RoleBinding {
                    search_domain_id: b.search_domain.id,
                    role_id: b.role.id,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct UsersData {
    users: Vec<WireUser>,
}

#[derive(Debug, Deserialize)]
struct UserPayload {
    user: WireUser,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddUserData {
    add_user: UserPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateUsernameData {
    update_username: UserPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchDomainsData {
    search_domains: Vec<SearchDomain>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchDomainData {
    search_domain: SearchDomain,
}

#[derive(Debug, Deserialize)]
struct RolesData {
    roles: Vec<Role>,
}

#[derive(Debug, Deserialize)]
struct RepositoriesData {
    repositories: Vec<Repository>,
}

#[derive(Debug, Deserialize)]
struct RepositoryData {
    repository: Repository,
}

#[derive(Debug, Deserialize)]
struct NameOnly {
    name: String,
}

#[derive(Debug, Deserialize)]
struct WireConnection {
    repository: NameOnly,
    #[serde(default)]
    filter: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireView {
    id: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    automatic_search: bool,
    #[serde(default)]
    default_query: Option<SavedQueryRef>,
    /// Absent on repositories.
    #[serde(default)]
    connections: Option<Vec<WireConnection>>,
}

impl WireView {
    fn is_view(&self) -> bool {
        self.connections.is_some()
    }
}

impl From<WireView> for View {
    fn from(v: WireView) -> Self {
        Self {
            id: v.id,
            name: v.name,
            description: v.description.filter(|d| !d.is_empty()),
            automatic_search: v.automatic_search,
            default_query: v.default_query,
            connections: v
                .connections
                .unwrap_or_default()
                .into_iter()
                .map(|c| ViewConnection {
                    repository_name: c.repository.name,
                    filter: c.filter,
                })
                .collect(),
        }
    }
}

/// `searchDomains` lists repositories too; keep only views.
#[derive(Debug)]
struct ViewsData {
    search_domains: Vec<WireView>,
}

impl<'de> Deserialize<'de> for ViewsData {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Raw {
            search_domains: Vec<WireView>,
        }
        let raw = Raw::deserialize(deserializer)?;
        Ok(Self {
            search_domains: raw.search_domains.into_iter().filter(WireView::is_view).collect(),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ViewData {
    search_domain: WireView,
}

impl ViewData {
    /// The view, or `None` when the name belongs to a repository.
    fn into_view(self) -> Option<View> {
        self.search_domain
            .is_view()
            .then(|| self.search_domain.into())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnumType {
    #[serde(default)]
    enum_values: Vec<PermissionDescriptor>,
}

#[derive(Debug, Deserialize)]
struct TypeData {
    #[serde(rename = "__type")]
    schema_type: Option<EnumType>,
}

#[derive(Debug, Deserialize)]
struct TokenPage {
    results: Vec<RawToken>,
}

#[derive(Debug, Deserialize)]
struct TokensData {
    tokens: TokenPage,
}

#[derive(Debug, Deserialize)]
struct CreateSystemTokenData {
    #[serde(rename = "createSystemPermissionsToken")]
    secret: String,
}

#[derive(Debug, Deserialize)]
struct CreateOrganizationTokenData {
    #[serde(rename = "createOrganizationPermissionsToken")]
    secret: String,
}

#[derive(Debug, Deserialize)]
struct CreateViewTokenData {
    #[serde(rename = "createViewPermissionsToken")]
    secret: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let backend = GraphQlBackend::new("https://logs.example.com/", "t");
        assert_eq!(backend.endpoint(), "https://logs.example.com/graphql");
    }

    #[test]
    fn test_response_with_errors() {
        let json = r#"{"data": null, "errors": [{"message": "Entity not found"}]}"#;
        let response: GraphQlResponse<RolesData> = serde_json::from_str(json).unwrap();
        assert!(response.data.is_none());
        assert_eq!(response.errors[0].message, "Entity not found");
    }

    #[test]
    fn test_wire_user_conversion() {
        let json = r#"{
            "id": "u1", "username": "alice", "isRoot": false,
            "searchDomainRoles": [{"searchDomain": {"id": "sd1"}, "role": {"id": "r1"}}]
        }"#;
        let user: User = serde_json::from_str::<WireUser>(json).unwrap().into();
        assert!(user.has_role("sd1", "r1"));
        assert_eq!(user.full_name, None);
    }

    #[test]
    fn test_views_data_drops_repositories() {
        let json = r#"{"searchDomains": [
            {"id": "1", "name": "zeta", "automaticSearch": true,
             "connections": [{"repository": {"name": "prod"}, "filter": "*"}]},
            {"id": "2", "name": "prod", "automaticSearch": false},
            {"id": "3", "name": "Alpha", "connections": []}
        ]}"#;
        let data: ViewsData = serde_json::from_str(json).unwrap();
        let views: Vec<View> = data.search_domains.into_iter().map(Into::into).collect();
        let names: Vec<_> = views.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "Alpha"]);
        assert_eq!(views[0].connections[0].repository_name, "prod");
    }

    #[test]
    fn test_view_data_rejects_repository() {
        let repo: ViewData =
            serde_json::from_str(r#"{"searchDomain": {"id": "r1", "name": "prod", "automaticSearch": false}}"#)
                .unwrap();
        assert_eq!(repo.into_view(), None);

        let view: ViewData = serde_json::from_str(
            r#"{"searchDomain": {"id": "v1", "name": "all", "connections": []}}"#,
        )
        .unwrap();
        assert_eq!(view.into_view().map(|v| v.name), Some("all".to_string()));
    }

    #[test]
    fn test_type_data_missing_enum() {
        let data: TypeData = serde_json::from_str(r#"{"__type": null}"#).unwrap();
        assert!(data.schema_type.is_none());
    }

    #[test]
    fn test_tokens_page_decodes_union() {
        let json = r#"{"tokens": {"results": [
            {"__typename": "SystemPermissionsToken", "id": "t1", "name": "ops",
             "createdAt": 1, "permissions": ["ManageCluster"]}
        ]}}"#;
        let data: TokensData = serde_json::from_str(json).unwrap();
        assert_eq!(data.tokens.results[0].id(), Some("t1"));
    }

    #[test]
    fn test_first_line() {
        assert_eq!(first_line("\n  query {\n roles }"), "query {");
    }
}
