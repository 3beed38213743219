//! Permission name validation.

use crate::backend::Backend;
use crate::error::Result;
use crate::types::PermissionType;
use std::collections::HashSet;

/// Whether every name in `permissions` is a valid value of `permission_type`.
///
/// The valid set is fetched from the remote schema on every call.
pub fn check(
    backend: &dyn Backend,
    permission_type: PermissionType,
    permissions: &[String],
) -> Result<bool> {
    let valid: HashSet<String> = backend
        .list_permissions(permission_type)?
        .into_iter()
        .map(|p| p.name)
        .collect();
    Ok(permissions.iter().all(|p| valid.contains(p)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;

    #[test]
    fn test_check_accepts_known_permissions() {
        let mock = MockBackend::new();
        mock.set_permissions(PermissionType::System, &["ReadHealthCheck", "ManageCluster"]);

        let ok = check(&mock, PermissionType::System, &["ManageCluster".to_string()]).unwrap();
        assert!(ok);
    }

    #[test]
    fn test_check_rejects_unknown_permission() {
        let mock = MockBackend::new();
        mock.set_permissions(PermissionType::View, &["ReadAccess"]);

        let perms = vec!["ReadAccess".to_string(), "BadPerm".to_string()];
        assert!(!check(&mock, PermissionType::View, &perms).unwrap());
    }

    #[test]
    fn test_check_is_scoped_to_type() {
        let mock = MockBackend::new();
        mock.set_permissions(PermissionType::Organization, &["CreateRepository"]);

        let perms = vec!["CreateRepository".to_string()];
        assert!(!check(&mock, PermissionType::System, &perms).unwrap());
    }

    #[test]
    fn test_check_empty_list_is_valid() {
        let mock = MockBackend::new();
        assert!(check(&mock, PermissionType::View, &[]).unwrap());
    }
}
