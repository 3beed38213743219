use super::Engine;
use crate::config::{DesiredUser, RoleGrant};
use crate::context::ProgressCallback;
use crate::report::{Action, Change, Collection, Outcome};
use crate::resolve::resolve_targets;
use log::debug;
use logapi::UserChangeSet;

const USERS: Collection = Collection::Users;

pub(super) fn reconcile_users<P: ProgressCallback>(engine: &mut Engine<'_, P>, users: &[DesiredUser]) {
    for user in users {
        if user.username.is_empty() {
            debug!("skipping user entry without username");
            continue;
        }
        let Some(exists) = ensure_user(engine, &user.username) else {
            continue;
        };
        for grant in &user.search_domains {
            reconcile_grant(engine, &user.username, exists, grant);
        }
    }
}

/// Make sure the user exists. Returns whether it exists remotely now, or
/// `None` when its grants cannot be processed.
fn ensure_user<P: ProgressCallback>(engine: &mut Engine<'_, P>, username: &str) -> Option<bool> {
    match engine.remote.get_user(username) {
        Ok(Some(_)) => {
            engine.record(Outcome::new(USERS, username, Action::Exists));
            Some(true)
        }
        Ok(None) if engine.dry_run => {
            engine.record(Outcome::new(USERS, username, Action::WouldCreate));
            Some(false)
        }
        Ok(None) => match engine.remote.create_user(username, &UserChangeSet::default()) {
            Ok(_) => {
                engine.record(Outcome::new(USERS, username, Action::Created));
                Some(true)
            }
            Err(e) => {
                engine.record(Outcome::failed(USERS, username, format!("creating user: {e}")));
                None
            }
        },
        Err(e) => {
            engine.record(Outcome::failed(USERS, username, format!("looking up user: {e}")));
            None
        }
    }
}

fn reconcile_grant<P: ProgressCallback>(
    engine: &mut Engine<'_, P>,
    username: &str,
    user_exists: bool,
    grant: &RoleGrant,
) {
    let live_names: Vec<String> = if grant.regex {
        match engine.remote.list_search_domains() {
            Ok(domains) => domains.into_iter().map(|d| d.name).collect(),
            Err(e) => {
                let outcome = Outcome::failed(USERS, username, format!("listing search domains: {e}"))
                    .in_target(&grant.name);
                engine.record(outcome);
                return;
            }
        }
    } else {
        Vec::new()
    };

    let targets = match resolve_targets(&grant.name, grant.regex, &live_names) {
        Ok(targets) => targets,
        Err(e) => {
            engine.record(Outcome::failed(USERS, username, e).in_target(&grant.name));
            return;
        }
    };
    if targets.is_empty() {
        debug!("no search domain matches {:?} for user {username}", grant.name);
    }

    for target in targets {
        assign(engine, username, user_exists, &grant.role, &target);
    }
}

/// Grant `role_name` to the user on one search domain.
fn assign<P: ProgressCallback>(
    engine: &mut Engine<'_, P>,
    username: &str,
    user_exists: bool,
    role_name: &str,
    target: &str,
) {
    let failed = |message: String| Outcome::failed(USERS, username, message).in_target(target);

    let role = match engine.remote.get_role(role_name) {
        Ok(role) => role,
        Err(e) => return engine.record(failed(format!("getting role id: {e}"))),
    };
    let domain = match engine.remote.get_search_domain(target) {
        Ok(domain) => domain,
        Err(e) => return engine.record(failed(format!("getting search domain id: {e}"))),
    };

    let change = Change::RoleGrant {
        role: role.display_name.clone(),
        search_domain: domain.name.clone(),
    };
    if !user_exists {
        let outcome =
            Outcome::new(USERS, username, Action::WouldUpdate { change }).in_target(&domain.name);
        return engine.record(outcome);
    }

    // Fetched again so grants issued earlier in this run are visible.
    let user = match engine.remote.get_user(username) {
        Ok(Some(user)) => user,
        Ok(None) => {
            let e = logapi::Error::not_found(logapi::EntityKind::User, username);
            return engine.record(failed(format!("getting user id: {e}")));
        }
        Err(e) => return engine.record(failed(format!("getting user id: {e}"))),
    };

    if user.has_role(&domain.id, &role.id) {
        return engine.record(Outcome::new(USERS, username, Action::Exists).in_target(&domain.name));
    }
    if engine.dry_run {
        let outcome =
            Outcome::new(USERS, username, Action::WouldUpdate { change }).in_target(&domain.name);
        return engine.record(outcome);
    }

    let result = engine.remote.assign_user_role(&domain.id, &user.id, &role.id);
    engine.record_mutation(
        result,
        Outcome::new(USERS, username, Action::Updated { change }).in_target(&domain.name),
        "setting permissions",
    );
}

#[cfg(test)]
mod tests {
    use crate::config::DesiredConfig;
    use crate::context::{NoProgress, ReconcileOptions};
    use crate::engine::{reconcile, reconcile_with};
    use crate::report::{Action, Collection};
    use logapi::backend::{MockBackend, Mutation};
    use logapi::{Repository, Role, User, View};

    fn cluster(domains: &[&str]) -> MockBackend {
        let mock = MockBackend::new();
        mock.add_role(Role {
            id: "role-1".into(),
            display_name: "Member".into(),
        });
        for (i, name) in domains.iter().enumerate() {
            mock.add_repository(Repository {
                id: format!("sd-{i}"),
                name: (*name).to_string(),
                ..Default::default()
            });
        }
        mock
    }

    fn assignments(mock: &MockBackend) -> Vec<String> {
        mock.mutations()
            .into_iter()
            .filter_map(|m| match m {
                Mutation::AssignUserRole { search_domain_id, .. } => Some(search_domain_id),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_regex_grant_fans_out_to_matches_only() {
        let mock = cluster(&["team-a", "team-b", "other", "team-c"]);
        mock.add_user(User {
            id: "u1".into(),
            username: "bob".into(),
            ..Default::default()
        });
        let config = DesiredConfig::from_yaml(
            "users:\n  - username: bob\n    searchDomains:\n      - { name: \"^team-\", role: Member, regex: true }\n",
        )
        .unwrap();

        reconcile(&config, &mock);
        assert_eq!(assignments(&mock), vec!["sd-0", "sd-1", "sd-3"]);
    }

    #[test]
    fn test_regex_grant_without_matches() {
        let mock = cluster(&["other"]);
        let config = DesiredConfig::from_yaml(
            "users:\n  - username: bob\n    searchDomains:\n      - { name: \"^team-\", role: Member, regex: true }\n",
        )
        .unwrap();

        let report = reconcile(&config, &mock);
        assert!(assignments(&mock).is_empty());
        assert_eq!(report.outcomes().len(), 1);
        assert_eq!(report.outcomes()[0].action, Action::Created);
    }

    #[test]
    fn test_missing_role_fails_entry_and_continues() {
        let mock = cluster(&["team-a", "team-b"]);
        let config = DesiredConfig::from_yaml(
            "users:\n  - username: bob\n    searchDomains:\n      - { name: team-a, role: Ghost }\n      - { name: team-b, role: Member }\n",
        )
        .unwrap();

        let report = reconcile(&config, &mock);
        let failures: Vec<_> = report.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].target.as_deref(), Some("team-a"));
        assert!(failures[0].error.as_deref().unwrap_or_default().contains("getting role id"));
        assert_eq!(assignments(&mock), vec!["sd-1"]);
    }

    #[test]
    fn test_grant_without_role_fails_only_that_grant() {
        let mock = cluster(&["team-a", "team-b"]);
        let config = DesiredConfig::from_yaml(
            "users:\n  - username: bob\n    searchDomains:\n      - { name: team-a }\n      - { name: team-b, role: Member }\nrepos:\n  - { name: team-a, automaticSearch: true }\n",
        )
        .unwrap();
        assert_eq!(config.users[0].search_domains[0].role, "");

        let report = reconcile(&config, &mock);
        let failures: Vec<_> = report.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].target.as_deref(), Some("team-a"));
        assert_eq!(assignments(&mock), vec!["sd-1"]);
        assert!(mock.repository("team-a").unwrap().automatic_search);
    }

    #[test]
    fn test_dry_run_grants_carry_target() {
        let mock = cluster(&["team-a"]);
        mock.add_user(User {
            id: "u1".into(),
            username: "bob".into(),
            ..Default::default()
        });
        let config = DesiredConfig::from_yaml(
            "users:\n  - username: bob\n    searchDomains:\n      - { name: team-a, role: Member }\n  - username: carol\n    searchDomains:\n      - { name: team-a, role: Member }\n",
        )
        .unwrap();
        let options = ReconcileOptions::default().dry_run(true);

        let report = reconcile_with(&config, &mock, &options, &mut NoProgress);
        assert!(mock.mutations().is_empty());
        let grants: Vec<_> = report
            .outcomes()
            .iter()
            .filter(|o| matches!(o.action, Action::WouldUpdate { .. }))
            .collect();
        assert_eq!(grants.len(), 2);
        assert!(grants.iter().all(|o| o.target.as_deref() == Some("team-a")));
    }

    #[test]
    fn test_missing_search_domain_fails_entry() {
        let mock = cluster(&[]);
        mock.add_view(View {
            id: "v1".into(),
            name: "all".into(),
            ..Default::default()
        });
        let config = DesiredConfig::from_yaml(
            "users:\n  - username: bob\n    searchDomains:\n      - { name: nowhere, role: Member }\n      - { name: all, role: Member }\n",
        )
        .unwrap();

        let report = reconcile(&config, &mock);
        assert_eq!(report.failures().count(), 1);
        assert_eq!(assignments(&mock), vec!["v1"]);
    }

    #[test]
    fn test_invalid_pattern_fails_grant() {
        let mock = cluster(&["team-a"]);
        let config = DesiredConfig::from_yaml(
            "users:\n  - username: bob\n    searchDomains:\n      - { name: \"team-(\", role: Member, regex: true }\n",
        )
        .unwrap();

        let report = reconcile(&config, &mock);
        let failure = report.failures().next().unwrap();
        assert!(failure.error.as_deref().unwrap_or_default().starts_with("invalid pattern"));
    }

    #[test]
    fn test_create_failure_skips_grants() {
        let mock = cluster(&["team-a"]);
        mock.fail_on("create_user", "permission denied");
        let config = DesiredConfig::from_yaml(
            "users:\n  - username: bob\n    searchDomains:\n      - { name: team-a, role: Member }\n",
        )
        .unwrap();

        let report = reconcile(&config, &mock);
        assert_eq!(report.outcomes().len(), 1);
        assert!(report.outcomes()[0].is_failure());
        assert!(mock.mutations().is_empty());
    }

    #[test]
    fn test_existing_user_is_not_modified() {
        let mock = cluster(&[]);
        mock.add_user(User {
            id: "u1".into(),
            username: "bob".into(),
            email: Some("old@example.com".into()),
            ..Default::default()
        });
        let config = DesiredConfig::from_yaml(
            "users:\n  - username: bob\n    email: new@example.com\n",
        )
        .unwrap();

        let report = reconcile(&config, &mock);
        assert!(mock.mutations().is_empty());
        assert_eq!(report.outcomes()[0].collection, Collection::Users);
        assert_eq!(report.outcomes()[0].action, Action::Exists);
        assert_eq!(mock.user("bob").unwrap().email.as_deref(), Some("old@example.com"));
    }
}
