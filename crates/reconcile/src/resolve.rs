//! Exact-or-regex target resolution shared by every pass.

use crate::error::{Error, Result};
use regex::Regex;

/// Names an entry applies to.
///
/// With `is_regex` unset, `pattern` itself is the single target, whether or
/// not it exists. Otherwise every name in `live_names` the pattern matches
/// anywhere (unanchored, case-sensitive) is a target, in `live_names` order.
pub fn resolve_targets<S: AsRef<str>>(
    pattern: &str,
    is_regex: bool,
    live_names: &[S],
) -> Result<Vec<String>> {
    if !is_regex {
        return Ok(vec![pattern.to_string()]);
    }
    let re = Regex::new(pattern).map_err(|e| Error::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })?;
    Ok(live_names
        .iter()
        .filter_map(|name| {
            let name: &str = name.as_ref();
            re.is_match(name).then(|| name.to_string())
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIVE: &[&str] = &["prod-eu", "prod-us", "staging", "preprod-eu"];

    #[test]
    fn test_exact_ignores_live_names() {
        assert_eq!(resolve_targets("missing", false, LIVE).unwrap(), vec!["missing"]);
        assert_eq!(resolve_targets("prod-.*", false, LIVE).unwrap(), vec!["prod-.*"]);
    }

    #[test]
    fn test_regex_is_unanchored() {
        let targets = resolve_targets("prod-.*", true, LIVE).unwrap();
        assert_eq!(targets, vec!["prod-eu", "prod-us", "preprod-eu"]);
    }

    #[test]
    fn test_regex_anchors_are_honored() {
        let targets = resolve_targets("^prod-", true, LIVE).unwrap();
        assert_eq!(targets, vec!["prod-eu", "prod-us"]);
    }

    #[test]
    fn test_regex_is_case_sensitive() {
        assert!(resolve_targets("PROD", true, LIVE).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_regex() {
        let err = resolve_targets("prod-(", true, LIVE).unwrap_err();
        assert!(matches!(err, Error::InvalidPattern { .. }));
    }

    #[test]
    fn test_owned_names() {
        let live = vec!["a".to_string(), "b".to_string()];
        assert_eq!(resolve_targets("b", true, &live).unwrap(), vec!["b"]);
    }
}
