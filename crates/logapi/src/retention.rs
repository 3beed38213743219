//! Data-loss guard for repository mutations.
//!
//! Every mutation that can shrink what a repository retains (lowering a
//! retention limit, introducing one where there was none, deleting the
//! repository) goes through this module. The checks always run against a
//! repository snapshot fetched immediately before the mutation.

use crate::backend::Backend;
use crate::error::{EntityKind, Error, Result};
use crate::types::{Repository, RetentionDimension};
use log::{debug, warn};

/// Whether changing a retention limit from `current` to `requested` is allowed.
///
/// `requested <= 0` clears the limit and is always safe. A `current` of `0`
/// means the repository is unbounded today, so introducing any limit counts
/// as a reduction.
#[must_use]
pub fn is_safe_to_mutate_retention(
    existing: &Repository,
    requested: f64,
    current: f64,
    allow_data_deletion: bool,
) -> bool {
    if allow_data_deletion || existing.is_empty() || requested <= 0.0 {
        return true;
    }
    !(requested < current || current == 0.0)
}

/// Whether `existing` may be deleted.
#[must_use]
pub fn is_safe_to_delete(existing: &Repository, allow_data_deletion: bool) -> bool {
    allow_data_deletion || existing.is_empty()
}

fn fetch(backend: &dyn Backend, name: &str) -> Result<Repository> {
    backend
        .get_repository(name)?
        .ok_or_else(|| Error::not_found(EntityKind::Repository, name))
}

/// Set one retention limit of a repository, or clear it when `requested <= 0`.
///
/// # Errors
///
/// Returns `Error::SafetyViolation` (and issues no mutation) when the change
/// would discard data and `allow_data_deletion` is false.
pub fn update_retention(
    backend: &dyn Backend,
    name: &str,
    dimension: RetentionDimension,
    requested: f64,
    allow_data_deletion: bool,
) -> Result<()> {
    let existing = fetch(backend, name)?;
    let current = dimension.current(&existing);

    if !is_safe_to_mutate_retention(&existing, requested, current, allow_data_deletion) {
        warn!(
            "refusing to change {dimension} of {name} from {current} to {requested}: {} bytes stored",
            existing.space_used
        );
        return Err(Error::SafetyViolation {
            repository: name.to_string(),
        });
    }

    let value = (requested > 0.0).then_some(requested);
    debug!("updating {dimension} of {name}: {current} -> {value:?}");
    backend.update_retention(name, dimension, value)
}

/// Delete a repository.
///
/// # Errors
///
/// Returns `Error::SafetyViolation` when the repository holds data and
/// `allow_data_deletion` is false.
pub fn delete_repository(
    backend: &dyn Backend,
    name: &str,
    reason: &str,
    allow_data_deletion: bool,
) -> Result<()> {
    let existing = fetch(backend, name)?;
    if !is_safe_to_delete(&existing, allow_data_deletion) {
        warn!(
            "refusing to delete {name}: {} bytes stored",
            existing.space_used
        );
        return Err(Error::SafetyViolation {
            repository: name.to_string(),
        });
    }
    backend.delete_search_domain(name, reason)
}
