//! API tokens.
//!
//! The token listing is polymorphic: each element carries a `__typename`
//! discriminator and the fields of exactly one of three token shapes.
//! [`RawToken`] is that closed set decoded as a sum type, and [`normalize`]
//! projects it onto the flat [`NormalizedToken`] record used everywhere else.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::permissions;
use crate::types::PermissionType;
use log::debug;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Fields shared by all token shapes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenData {
    pub id: String,
    pub name: String,
    /// Creation time in Unix milliseconds.
    #[serde(default)]
    pub created_at: i64,
    /// Expiry in Unix milliseconds, `None` when the token never expires.
    #[serde(default)]
    pub expire_at: Option<i64>,
    #[serde(default)]
    pub ip_filter: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// A view a view token is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct ViewRef {
    pub name: String,
}

/// Fields of a view-scoped token.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct ViewTokenData {
    #[serde(flatten)]
    pub token: TokenData,
    #[serde(default)]
    pub views: Vec<ViewRef>,
}

/// One element of the remote token listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "__typename")]
pub enum RawToken {
    #[serde(rename = "ViewPermissionsToken")]
    View(ViewTokenData),
    #[serde(rename = "SystemPermissionsToken")]
    System(TokenData),
    #[serde(rename = "OrganizationPermissionsToken")]
    Organization(TokenData),
    /// Any other discriminator. Dropped by [`normalize`].
    #[serde(other)]
    Unknown,
}

impl RawToken {
    /// Token id, `None` for unknown shapes.
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::View(data) => Some(&data.token.id),
            Self::System(data) | Self::Organization(data) => Some(&data.id),
            Self::Unknown => None,
        }
    }
}

/// Which scope a token grants permissions on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    View,
    System,
    Organization,
}

impl TokenKind {
    /// Remote type name of this kind of token.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::View => "ViewPermissionsToken",
            Self::System => "SystemPermissionsToken",
            Self::Organization => "OrganizationPermissionsToken",
        }
    }

    /// Permission enumeration that applies to this kind of token.
    #[must_use]
    pub fn permission_type(&self) -> PermissionType {
        match self {
            Self::View => PermissionType::View,
            Self::System => PermissionType::System,
            Self::Organization => PermissionType::Organization,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

impl FromStr for TokenKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "system" => Ok(Self::System),
            "organization" => Ok(Self::Organization),
            "view" => Ok(Self::View),
            _ => Err(Error::validation(format!(
                "invalid token type: {s}. Use: system, organization or view"
            ))),
        }
    }
}

/// A token flattened to one shape regardless of kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedToken {
    pub id: String,
    pub name: String,
    pub created_at: i64,
    pub expire_at: Option<i64>,
    pub ip_filter: Option<String>,
    pub permissions: Vec<String>,
    /// Names of the scoped views, in remote order. `Some` iff `kind` is `View`.
    pub views: Option<Vec<String>>,
    pub kind: TokenKind,
}

impl NormalizedToken {
    /// Whether the token expired before `now_millis`.
    #[must_use]
    pub fn is_expired(&self, now_millis: i64) -> bool {
        self.expire_at.is_some_and(|at| at > 0 && at < now_millis)
    }
}

fn flatten(data: TokenData, kind: TokenKind, views: Option<Vec<String>>) -> NormalizedToken {
    NormalizedToken {
        id: data.id,
        name: data.name,
        created_at: data.created_at,
        expire_at: data.expire_at.filter(|at| *at > 0),
        ip_filter: data.ip_filter.filter(|f| !f.is_empty()),
        permissions: data.permissions,
        views,
        kind,
    }
}

/// Project a raw token onto the flat record, `None` for unknown shapes.
pub fn normalize(raw: RawToken) -> Option<NormalizedToken> {
    match raw {
        RawToken::View(data) => {
            let views = data.views.into_iter().map(|v| v.name).collect();
            Some(flatten(data.token, TokenKind::View, Some(views)))
        }
        RawToken::System(data) => Some(flatten(data, TokenKind::System, None)),
        RawToken::Organization(data) => Some(flatten(data, TokenKind::Organization, None)),
        RawToken::Unknown => None,
    }
}

/// List all tokens, normalized, in remote order.
pub fn list_tokens(backend: &dyn Backend) -> Result<Vec<NormalizedToken>> {
    let raw = backend.list_tokens()?;
    let total = raw.len();
    let tokens: Vec<_> = raw.into_iter().filter_map(normalize).collect();
    if tokens.len() < total {
        debug!("dropped {} token(s) of unknown type", total - tokens.len());
    }
    Ok(tokens)
}

/// Create a token and return its secret.
///
/// `token_type` is `system`, `organization` or `view` (any case). Every
/// permission is validated against the remote schema before anything else
/// happens; view tokens additionally need `view_name` to resolve.
///
/// # Errors
///
/// `Error::Validation` for an unknown type or permission, `Error::NotFound`
/// when the view does not exist, and transport errors from the backend.
pub fn add_token(
    backend: &dyn Backend,
    name: &str,
    token_type: &str,
    permissions: &[String],
    view_name: &str,
) -> Result<String> {
    let kind: TokenKind = token_type.parse()?;

    if !permissions::check(backend, kind.permission_type(), permissions)? {
        return Err(Error::validation("invalid permission provided"));
    }

    match kind {
        TokenKind::System => backend.create_system_token(name, permissions),
        TokenKind::Organization => backend.create_organization_token(name, permissions),
        TokenKind::View => {
            let view_id = backend.resolve_view_id(view_name)?;
            backend.create_view_token(name, &view_id, permissions)
        }
    }
}

/// Delete a token by id.
pub fn delete_token(backend: &dyn Backend, id: &str) -> Result<()> {
    backend.delete_token(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MockBackend, Mutation};
    use crate::types::View;

    fn perms(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_raw_token_decodes_each_shape() {
        let json = r#"[
            {"__typename": "ViewPermissionsToken", "id": "1", "name": "v",
             "createdAt": 10, "expireAt": null, "permissions": ["ReadAccess"],
             "views": [{"name": "b"}, {"name": "a"}]},
            {"__typename": "SystemPermissionsToken", "id": "2", "name": "s",
             "createdAt": 20, "expireAt": 99, "ipFilter": "10.0.0.0/8",
             "permissions": []},
            {"__typename": "OrganizationPermissionsToken", "id": "3", "name": "o",
             "createdAt": 30, "permissions": ["CreateRepository"]},
            {"__typename": "PersonalUserToken", "id": "4", "name": "p"}
        ]"#;
        let raw: Vec<RawToken> = serde_json::from_str(json).unwrap();
        assert_eq!(raw.len(), 4);
        assert!(matches!(raw[0], RawToken::View(_)));
        assert!(matches!(raw[1], RawToken::System(_)));
        assert!(matches!(raw[2], RawToken::Organization(_)));
        assert_eq!(raw[3], RawToken::Unknown);
        assert_eq!(raw[3].id(), None);
    }

    #[test]
    fn test_normalize_kinds_and_views() {
        let view = normalize(RawToken::View(ViewTokenData {
            token: TokenData {
                id: "1".into(),
                name: "v".into(),
                ..Default::default()
            },
            views: vec![ViewRef { name: "b".into() }, ViewRef { name: "a".into() }],
        }))
        .unwrap();
        assert_eq!(view.kind, TokenKind::View);
        assert_eq!(view.views, Some(vec!["b".to_string(), "a".to_string()]));

        for (raw, kind) in [
            (RawToken::System(TokenData::default()), TokenKind::System),
            (RawToken::Organization(TokenData::default()), TokenKind::Organization),
        ] {
            let token = normalize(raw).unwrap();
            assert_eq!(token.kind, kind);
            assert_eq!(token.views, None);
        }

        assert_eq!(normalize(RawToken::Unknown), None);
    }

    #[test]
    fn test_list_tokens_drops_unknown_and_keeps_order() {
        let mock = MockBackend::new();
        mock.add_token(RawToken::System(TokenData {
            id: "b".into(),
            ..Default::default()
        }));
        mock.add_token(RawToken::Unknown);
        mock.add_token(RawToken::Organization(TokenData {
            id: "a".into(),
            ..Default::default()
        }));

        let ids: Vec<_> = list_tokens(&mock).unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn test_is_expired() {
        let mut token = normalize(RawToken::System(TokenData::default())).unwrap();
        assert!(!token.is_expired(1_000));
        token.expire_at = Some(500);
        assert!(token.is_expired(1_000));
        assert!(!token.is_expired(100));
    }

    #[test]
    fn test_token_kind_parse() {
        assert_eq!("SYSTEM".parse::<TokenKind>().unwrap(), TokenKind::System);
        assert_eq!("View".parse::<TokenKind>().unwrap(), TokenKind::View);
        let err = "personal".parse::<TokenKind>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid token type: personal. Use: system, organization or view"
        );
    }

    #[test]
    fn test_add_view_token_with_bad_permission_creates_nothing() {
        let mock = MockBackend::new();
        mock.set_permissions(PermissionType::View, &["ReadAccess"]);
        mock.add_view(View {
            id: "v1".into(),
            name: "myview".into(),
            ..Default::default()
        });

        let err = add_token(&mock, "t1", "view", &perms(&["BadPerm"]), "myview").unwrap_err();
        assert_eq!(err.to_string(), "invalid permission provided");
        assert!(mock.mutations().is_empty());
        assert!(mock.list_tokens().unwrap().is_empty());
    }

    #[test]
    fn test_add_view_token_resolves_view() {
        let mock = MockBackend::new();
        mock.set_permissions(PermissionType::View, &["ReadAccess"]);
        mock.add_view(View {
            id: "v1".into(),
            name: "myview".into(),
            ..Default::default()
        });

        let secret = add_token(&mock, "t1", "view", &perms(&["ReadAccess"]), "myview").unwrap();
        assert!(!secret.is_empty());

        let tokens = list_tokens(&mock).unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].views, Some(vec!["myview".to_string()]));
    }

    #[test]
    fn test_add_view_token_missing_view() {
        let mock = MockBackend::new();
        mock.set_permissions(PermissionType::View, &["ReadAccess"]);

        let err = add_token(&mock, "t1", "view", &perms(&["ReadAccess"]), "nope").unwrap_err();
        assert!(err.is_not_found());
        assert!(mock.mutations().is_empty());
    }

    #[test]
    fn test_add_system_token() {
        let mock = MockBackend::new();
        mock.set_permissions(PermissionType::System, &["ManageCluster"]);

        add_token(&mock, "ops", "system", &perms(&["ManageCluster"]), "").unwrap();
        assert_eq!(
            mock.mutations(),
            vec![Mutation::CreateToken {
                name: "ops".into(),
                kind: TokenKind::System,
            }]
        );
    }

    #[test]
    fn test_add_token_unknown_type_skips_remote() {
        let mock = MockBackend::new();
        mock.fail_on("list_permissions", "should not be called");

        let err = add_token(&mock, "t", "user", &[], "").unwrap_err();
        assert!(err.to_string().starts_with("invalid token type: user"));
    }

    #[test]
    fn test_delete_token() {
        let mock = MockBackend::new();
        mock.add_token(RawToken::System(TokenData {
            id: "t1".into(),
            ..Default::default()
        }));

        delete_token(&mock, "t1").unwrap();
        assert!(mock.list_tokens().unwrap().is_empty());
        assert!(delete_token(&mock, "t1").unwrap_err().is_not_found());
    }
}
