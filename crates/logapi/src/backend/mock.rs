//! In-memory backend for tests.
//!
//! Mutations are applied to the in-memory state (so a second pass observes
//! the first pass's effects) and recorded in order for assertions.

use super::Backend;
use crate::error::{EntityKind, Error, Result};
use crate::tokens::{RawToken, TokenData, TokenKind, ViewRef, ViewTokenData};
use crate::types::{
    NewSavedQuery, PermissionDescriptor, PermissionType, QueryDetails, Repository,
    RetentionDimension, Role, RoleBinding, SavedQuery, SavedQueryRef, SearchDomain, User,
    UserChangeSet, View, ViewConnection,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A mutating call observed by [`MockBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    CreateUser {
        username: String,
    },
    UpdateUsername {
        username: String,
        new_username: String,
    },
    AssignUserRole {
        search_domain_id: String,
        user_id: String,
        role_id: String,
    },
    SetAutomaticSearch {
        search_domain: String,
        automatic_search: bool,
    },
    SetDefaultSavedQuery {
        search_domain: String,
        saved_query_id: String,
    },
    UpdateDescription {
        search_domain: String,
        description: String,
    },
    DeleteSearchDomain {
        name: String,
        reason: String,
    },
    RemoveRole {
        name: String,
    },
    CreateSavedQuery {
        search_domain: String,
        name: String,
    },
    DeleteSavedQuery {
        search_domain: String,
        saved_query_id: String,
    },
    CreateRepository {
        name: String,
    },
    UpdateRetention {
        name: String,
        dimension: RetentionDimension,
        value: Option<f64>,
    },
    CreateView {
        name: String,
    },
    UpdateViewConnections {
        name: String,
    },
    CreateToken {
        name: String,
        kind: TokenKind,
    },
    DeleteToken {
        id: String,
    },
}

#[derive(Debug, Default)]
struct MockState {
    users: Vec<User>,
    roles: Vec<Role>,
    repositories: Vec<Repository>,
    views: Vec<View>,
    saved_queries: HashMap<String, Vec<SavedQuery>>,
    permissions: HashMap<PermissionType, Vec<PermissionDescriptor>>,
    tokens: Vec<RawToken>,
    failures: HashMap<String, String>,
    mutations: Vec<Mutation>,
    next_id: u64,
}

impl MockState {
    fn fresh_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    fn check(&self, op: &str) -> Result<()> {
        match self.failures.get(op) {
            Some(message) => Err(Error::Api(message.clone())),
            None => Ok(()),
        }
    }

    fn domain_exists(&self, name: &str) -> bool {
        self.repositories.iter().any(|r| r.name == name) || self.views.iter().any(|v| v.name == name)
    }

    fn search_domain(&self, name: &str) -> Option<SearchDomain> {
        let (id, description) = if let Some(repo) = self.repositories.iter().find(|r| r.name == name) {
            (repo.id.clone(), repo.description.clone())
        } else if let Some(view) = self.views.iter().find(|v| v.name == name) {
            (view.id.clone(), view.description.clone())
        } else {
            return None;
        };
        Some(SearchDomain {
            id,
            name: name.to_string(),
            description,
            saved_queries: self.saved_queries.get(name).cloned().unwrap_or_default(),
        })
    }

    fn saved_query_ref(&self, search_domain: &str, saved_query_id: &str) -> Option<SavedQueryRef> {
        self.saved_queries
            .get(search_domain)?
            .iter()
            .find(|q| q.id == saved_query_id)
            .map(SavedQuery::to_ref)
    }
}

/// Mock backend for testing without network access.
///
/// Cloning shares the underlying state, so a test can hand one clone to the
/// code under test and inspect another.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    /// Create a new empty mock backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a user.
    pub fn add_user(&self, user: User) {
        self.state().users.push(user);
    }

    /// Add a role.
    pub fn add_role(&self, role: Role) {
        self.state().roles.push(role);
    }

    /// Add a repository.
    pub fn add_repository(&self, repository: Repository) {
        self.state().repositories.push(repository);
    }

    /// Add a view.
    pub fn add_view(&self, view: View) {
        self.state().views.push(view);
    }

    /// Store a saved query in a repository or view.
    pub fn add_saved_query(&self, search_domain: &str, query: SavedQuery) {
        self.state()
            .saved_queries
            .entry(search_domain.to_string())
            .or_default()
            .push(query);
    }

    /// Set the valid values of a permission enumeration.
    pub fn set_permissions(&self, permission_type: PermissionType, names: &[&str]) {
        let descriptors = names
            .iter()
            .map(|name| PermissionDescriptor {
                name: (*name).to_string(),
                description: None,
                is_deprecated: false,
            })
            .collect();
        self.state().permissions.insert(permission_type, descriptors);
    }

    /// Add a raw token.
    pub fn add_token(&self, token: RawToken) {
        self.state().tokens.push(token);
    }

    /// Make every call of `op` (a [`Backend`] method name) fail.
    pub fn fail_on(&self, op: &str, message: &str) {
        self.state()
            .failures
            .insert(op.to_string(), message.to_string());
    }

    /// All mutations observed so far, in call order.
    pub fn mutations(&self) -> Vec<Mutation> {
        self.state().mutations.clone()
    }

    /// Forget recorded mutations (state is kept).
    pub fn clear_mutations(&self) {
        self.state().mutations.clear();
    }

    /// Current state of a repository.
    pub fn repository(&self, name: &str) -> Option<Repository> {
        self.state().repositories.iter().find(|r| r.name == name).cloned()
    }

    /// Current state of a view.
    pub fn view(&self, name: &str) -> Option<View> {
        self.state().views.iter().find(|v| v.name == name).cloned()
    }

    /// Current state of a user.
    pub fn user(&self, username: &str) -> Option<User> {
        self.state().users.iter().find(|u| u.username == username).cloned()
    }

    fn create_token(&self, name: &str, kind: TokenKind, data: impl FnOnce(TokenData) -> RawToken) -> String {
        let mut state = self.state();
        let id = state.fresh_id("token");
        let token = data(TokenData {
            id: id.clone(),
            name: name.to_string(),
            ..Default::default()
        });
        state.tokens.push(token);
        state.mutations.push(Mutation::CreateToken {
            name: name.to_string(),
            kind,
        });
        format!("secret-{id}")
    }
}

impl Backend for MockBackend {
    fn get_user(&self, username: &str) -> Result<Option<User>> {
        let state = self.state();
        state.check("get_user")?;
        Ok(state.users.iter().find(|u| u.username == username).cloned())
    }

    fn create_user(&self, username: &str, changes: &UserChangeSet) -> Result<User> {
        let mut state = self.state();
        state.check("create_user")?;
        if state.users.iter().any(|u| u.username == username) {
            return Err(Error::Api(format!("user {username} already exists")));
        }
        let user = User {
            id: state.fresh_id("user"),
            username: username.to_string(),
            full_name: changes.full_name.clone(),
            email: changes.email.clone(),
            company: changes.company.clone(),
            is_root: changes.is_root.unwrap_or(false),
            search_domain_roles: Vec::new(),
        };
        state.users.push(user.clone());
        state.mutations.push(Mutation::CreateUser {
            username: username.to_string(),
        });
        Ok(user)
    }

    fn update_username(&self, username: &str, new_username: &str) -> Result<User> {
        let mut state = self.state();
        state.check("update_username")?;
        let user = state
            .users
            .iter_mut()
            .find(|u| u.username == username)
            .ok_or_else(|| Error::not_found(EntityKind::User, username))?;
        user.username = new_username.to_string();
        let updated = user.clone();
        state.mutations.push(Mutation::UpdateUsername {
            username: username.to_string(),
            new_username: new_username.to_string(),
        });
        Ok(updated)
    }

    fn list_search_domains(&self) -> Result<Vec<SearchDomain>> {
        let state = self.state();
        state.check("list_search_domains")?;
        let names = state
            .repositories
            .iter()
            .map(|r| r.name.as_str())
            .chain(state.views.iter().map(|v| v.name.as_str()));
        Ok(names.filter_map(|name| state.search_domain(name)).collect())
    }

    fn get_search_domain(&self, name: &str) -> Result<SearchDomain> {
        let state = self.state();
        state.check("get_search_domain")?;
        state
            .search_domain(name)
            .ok_or_else(|| Error::not_found(EntityKind::SearchDomain, name))
    }

    fn assign_user_role(&self, search_domain_id: &str, user_id: &str, role_id: &str) -> Result<()> {
        let mut state = self.state();
        state.check("assign_user_role")?;
        let user = state
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| Error::not_found(EntityKind::User, user_id))?;
        let binding = RoleBinding {
            search_domain_id: search_domain_id.to_string(),
            role_id: role_id.to_string(),
        };
        if !user.search_domain_roles.contains(&binding) {
            user.search_domain_roles.push(binding);
        }
        state.mutations.push(Mutation::AssignUserRole {
            search_domain_id: search_domain_id.to_string(),
            user_id: user_id.to_string(),
            role_id: role_id.to_string(),
        });
        Ok(())
    }

    fn set_automatic_search(&self, search_domain: &str, automatic_search: bool) -> Result<()> {
        let mut state = self.state();
        state.check("set_automatic_search")?;
        if let Some(repo) = state.repositories.iter_mut().find(|r| r.name == search_domain) {
            repo.automatic_search = automatic_search;
        } else if let Some(view) = state.views.iter_mut().find(|v| v.name == search_domain) {
            view.automatic_search = automatic_search;
        } else {
            return Err(Error::not_found(EntityKind::SearchDomain, search_domain));
        }
        state.mutations.push(Mutation::SetAutomaticSearch {
            search_domain: search_domain.to_string(),
            automatic_search,
        });
        Ok(())
    }

    fn set_default_saved_query(&self, search_domain: &str, saved_query_id: &str) -> Result<()> {
        let mut state = self.state();
        state.check("set_default_saved_query")?;
        let query = state
            .saved_query_ref(search_domain, saved_query_id)
            .ok_or_else(|| Error::not_found(EntityKind::SavedQuery, saved_query_id))?;
        if let Some(repo) = state.repositories.iter_mut().find(|r| r.name == search_domain) {
            repo.default_query = Some(query);
        } else if let Some(view) = state.views.iter_mut().find(|v| v.name == search_domain) {
            view.default_query = Some(query);
        } else {
            return Err(Error::not_found(EntityKind::SearchDomain, search_domain));
        }
        state.mutations.push(Mutation::SetDefaultSavedQuery {
            search_domain: search_domain.to_string(),
            saved_query_id: saved_query_id.to_string(),
        });
        Ok(())
    }

    fn update_description(&self, search_domain: &str, description: &str) -> Result<()> {
        let mut state = self.state();
        state.check("update_description")?;
        if let Some(repo) = state.repositories.iter_mut().find(|r| r.name == search_domain) {
            repo.description = Some(description.to_string());
        } else if let Some(view) = state.views.iter_mut().find(|v| v.name == search_domain) {
            view.description = Some(description.to_string());
        } else {
            return Err(Error::not_found(EntityKind::SearchDomain, search_domain));
        }
        state.mutations.push(Mutation::UpdateDescription {
            search_domain: search_domain.to_string(),
            description: description.to_string(),
        });
        Ok(())
    }

    fn delete_search_domain(&self, name: &str, reason: &str) -> Result<()> {
        let mut state = self.state();
        state.check("delete_search_domain")?;
        if !state.domain_exists(name) {
            return Err(Error::not_found(EntityKind::SearchDomain, name));
        }
        state.repositories.retain(|r| r.name != name);
        state.views.retain(|v| v.name != name);
        state.saved_queries.remove(name);
        state.mutations.push(Mutation::DeleteSearchDomain {
            name: name.to_string(),
            reason: reason.to_string(),
        });
        Ok(())
    }

    fn list_roles(&self) -> Result<Vec<Role>> {
        let state = self.state();
        state.check("list_roles")?;
        Ok(state.roles.clone())
    }

    fn get_role(&self, name: &str) -> Result<Role> {
        let state = self.state();
        state.check("get_role")?;
        state
            .roles
            .iter()
            .find(|r| r.display_name == name)
            .cloned()
            .ok_or_else(|| Error::not_found(EntityKind::Role, name))
    }

    fn remove_role(&self, name: &str) -> Result<()> {
        let mut state = self.state();
        state.check("remove_role")?;
        if !state.roles.iter().any(|r| r.display_name == name) {
            return Err(Error::not_found(EntityKind::Role, name));
        }
        state.roles.retain(|r| r.display_name != name);
        state.mutations.push(Mutation::RemoveRole {
            name: name.to_string(),
        });
        Ok(())
    }

    fn create_saved_query(&self, query: &NewSavedQuery) -> Result<()> {
        let mut state = self.state();
        state.check("create_saved_query")?;
        if !state.domain_exists(&query.view_name) {
            return Err(Error::not_found(EntityKind::SearchDomain, &query.view_name));
        }
        let id = state.fresh_id("query");
        state
            .saved_queries
            .entry(query.view_name.clone())
            .or_default()
            .push(SavedQuery {
                id,
                name: query.name.clone(),
                query: QueryDetails {
                    query_string: query.query_string.clone(),
                    start: query.start.clone(),
                    end: query.end.clone(),
                    is_live: query.is_live,
                },
            });
        state.mutations.push(Mutation::CreateSavedQuery {
            search_domain: query.view_name.clone(),
            name: query.name.clone(),
        });
        Ok(())
    }

    fn delete_saved_query(&self, search_domain: &str, saved_query_id: &str) -> Result<()> {
        let mut state = self.state();
        state.check("delete_saved_query")?;
        let queries = state
            .saved_queries
            .get_mut(search_domain)
            .ok_or_else(|| Error::not_found(EntityKind::SavedQuery, saved_query_id))?;
        let before = queries.len();
        queries.retain(|q| q.id != saved_query_id);
        if queries.len() == before {
            return Err(Error::not_found(EntityKind::SavedQuery, saved_query_id));
        }
        state.mutations.push(Mutation::DeleteSavedQuery {
            search_domain: search_domain.to_string(),
            saved_query_id: saved_query_id.to_string(),
        });
        Ok(())
    }

    fn list_repositories(&self) -> Result<Vec<Repository>> {
        let state = self.state();
        state.check("list_repositories")?;
        Ok(state.repositories.clone())
    }

    fn get_repository(&self, name: &str) -> Result<Option<Repository>> {
        let state = self.state();
        state.check("get_repository")?;
        Ok(state.repositories.iter().find(|r| r.name == name).cloned())
    }

    fn create_repository(&self, name: &str) -> Result<()> {
        let mut state = self.state();
        state.check("create_repository")?;
        if state.domain_exists(name) {
            return Err(Error::Api(format!("{name} already exists")));
        }
        let id = state.fresh_id("repo");
        state.repositories.push(Repository {
            id,
            name: name.to_string(),
            ..Default::default()
        });
        state.mutations.push(Mutation::CreateRepository {
            name: name.to_string(),
        });
        Ok(())
    }

    fn update_retention(
        &self,
        name: &str,
        dimension: RetentionDimension,
        value: Option<f64>,
    ) -> Result<()> {
        let mut state = self.state();
        state.check("update_retention")?;
        let repo = state
            .repositories
            .iter_mut()
            .find(|r| r.name == name)
            .ok_or_else(|| Error::not_found(EntityKind::Repository, name))?;
        match dimension {
            RetentionDimension::Time => repo.time_based_retention = value,
            RetentionDimension::IngestSize => repo.ingest_size_based_retention = value,
            RetentionDimension::StorageSize => repo.storage_size_based_retention = value,
        }
        state.mutations.push(Mutation::UpdateRetention {
            name: name.to_string(),
            dimension,
            value,
        });
        Ok(())
    }

    fn list_views(&self) -> Result<Vec<View>> {
        let state = self.state();
        state.check("list_views")?;
        Ok(state.views.clone())
    }

    fn get_view(&self, name: &str) -> Result<Option<View>> {
        let state = self.state();
        state.check("get_view")?;
        Ok(state.views.iter().find(|v| v.name == name).cloned())
    }

    fn create_view(&self, name: &str, description: &str, connections: &[ViewConnection]) -> Result<()> {
        let mut state = self.state();
        state.check("create_view")?;
        if state.domain_exists(name) {
            return Err(Error::Api(format!("{name} already exists")));
        }
        let id = state.fresh_id("view");
        state.views.push(View {
            id,
            name: name.to_string(),
            description: Some(description.to_string()).filter(|d| !d.is_empty()),
            connections: connections.to_vec(),
            ..Default::default()
        });
        state.mutations.push(Mutation::CreateView {
            name: name.to_string(),
        });
        Ok(())
    }

    fn update_view_connections(&self, name: &str, connections: &[ViewConnection]) -> Result<()> {
        let mut state = self.state();
        state.check("update_view_connections")?;
        let view = state
            .views
            .iter_mut()
            .find(|v| v.name == name)
            .ok_or_else(|| Error::not_found(EntityKind::View, name))?;
        view.connections = connections.to_vec();
        state.mutations.push(Mutation::UpdateViewConnections {
            name: name.to_string(),
        });
        Ok(())
    }

    fn list_permissions(&self, permission_type: PermissionType) -> Result<Vec<PermissionDescriptor>> {
        let state = self.state();
        state.check("list_permissions")?;
        Ok(state.permissions.get(&permission_type).cloned().unwrap_or_default())
    }

    fn list_tokens(&self) -> Result<Vec<RawToken>> {
        let state = self.state();
        state.check("list_tokens")?;
        Ok(state.tokens.clone())
    }

    fn create_system_token(&self, name: &str, permissions: &[String]) -> Result<String> {
        self.state().check("create_system_token")?;
        let permissions = permissions.to_vec();
        Ok(self.create_token(name, TokenKind::System, |data| {
            RawToken::System(TokenData { permissions, ..data })
        }))
    }

    fn create_organization_token(&self, name: &str, permissions: &[String]) -> Result<String> {
        self.state().check("create_organization_token")?;
        let permissions = permissions.to_vec();
        Ok(self.create_token(name, TokenKind::Organization, |data| {
            RawToken::Organization(TokenData { permissions, ..data })
        }))
    }

    fn create_view_token(&self, name: &str, view_id: &str, permissions: &[String]) -> Result<String> {
        let view_name = {
            let state = self.state();
            state.check("create_view_token")?;
            state
                .views
                .iter()
                .find(|v| v.id == view_id)
                .map(|v| v.name.clone())
                .ok_or_else(|| Error::not_found(EntityKind::View, view_id))?
        };
        let permissions = permissions.to_vec();
        Ok(self.create_token(name, TokenKind::View, |data| {
            RawToken::View(ViewTokenData {
                token: TokenData { permissions, ..data },
                views: vec![ViewRef { name: view_name }],
            })
        }))
    }

    fn delete_token(&self, id: &str) -> Result<()> {
        let mut state = self.state();
        state.check("delete_token")?;
        let before = state.tokens.len();
        state.tokens.retain(|t| t.id() != Some(id));
        if state.tokens.len() == before {
            return Err(Error::not_found(EntityKind::Token, id));
        }
        state.mutations.push(Mutation::DeleteToken { id: id.to_string() });
        Ok(())
    }
}
