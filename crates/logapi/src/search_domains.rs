//! Helpers shared by repositories and views.

use crate::backend::Backend;
use crate::error::Result;

/// Make the saved query `query` (name or id) the default query of `search_domain`.
///
/// The query is looked up in `search_domain` at call time and the pointer is
/// set by id.
pub fn set_default_query(backend: &dyn Backend, search_domain: &str, query: &str) -> Result<()> {
    let saved = backend.get_saved_query(query, search_domain)?;
    backend.set_default_saved_query(search_domain, &saved.id)
}
