//! Reconciliation engine.
//!
//! Walks the desired-state collections in a fixed order (users, default
//! queries, repositories, views), compares each entry with live state
//! fetched at the moment of the decision, and issues one mutation per
//! differing field. An entry's failure is recorded and the pass moves on.

mod queries;
mod search_domains;
mod users;

use crate::config::DesiredConfig;
use crate::context::{NoProgress, ProgressCallback, ReconcileOptions};
use crate::report::{Action, Collection, Outcome, Report};
use log::{error, info};
use logapi::backend::Backend;

/// Reconcile `config` against `remote`, applying every needed mutation.
pub fn reconcile(config: &DesiredConfig, remote: &dyn Backend) -> Report {
    reconcile_with(config, remote, &ReconcileOptions::default(), &mut NoProgress)
}

/// Reconcile with explicit options and a progress callback.
pub fn reconcile_with<P: ProgressCallback>(
    config: &DesiredConfig,
    remote: &dyn Backend,
    options: &ReconcileOptions,
    progress: &mut P,
) -> Report {
    let mut engine = Engine {
        remote,
        dry_run: options.dry_run,
        progress,
        report: Report::default(),
    };

    engine.pass(Collection::Users, config.users.len(), |e| {
        users::reconcile_users(e, &config.users);
    });
    engine.pass(Collection::DefaultQueries, config.default_queries.len(), |e| {
        queries::reconcile_default_queries(e, &config.default_queries);
    });
    engine.pass(Collection::Repos, config.repos.len(), |e| {
        search_domains::reconcile_repos(e, &config.repos);
    });
    engine.pass(Collection::Views, config.views.len(), |e| {
        search_domains::reconcile_views(e, &config.views);
    });

    engine.report
}

/// State shared by the passes of one run.
pub(crate) struct Engine<'a, P: ProgressCallback> {
    pub(crate) remote: &'a dyn Backend,
    pub(crate) dry_run: bool,
    progress: &'a mut P,
    report: Report,
}

impl<P: ProgressCallback> Engine<'_, P> {
    fn pass(&mut self, collection: Collection, entries: usize, run: impl FnOnce(&mut Self)) {
        self.progress.on_pass_start(collection, entries);
        run(self);
        self.progress.on_pass_complete(collection);
    }

    /// Log one decision and add it to the report.
    pub(crate) fn record(&mut self, outcome: Outcome) {
        if outcome.is_failure() {
            error!("{outcome}");
        } else {
            info!("{outcome}");
        }
        self.progress.on_outcome(&outcome);
        self.report.push(outcome);
    }

    /// Record the result of a mutation: `done` on success, a failure otherwise.
    pub(crate) fn record_mutation<T>(
        &mut self,
        result: logapi::Result<T>,
        done: Outcome,
        context: &str,
    ) {
        match result {
            Ok(_) => self.record(done),
            Err(e) => {
                let failed = Outcome {
                    action: Action::Failed,
                    error: Some(format!("{context}: {e}")),
                    ..done
                };
                self.record(failed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Change;
    use logapi::backend::{MockBackend, Mutation};
    use logapi::{QueryDetails, Repository, Role, SavedQuery, View};

    const DOC: &str = r#"
users:
  - username: alice
    searchDomains:
      - { name: "prod-.*", role: Member, regex: true }
      - { name: audit, role: Admin }
  - username: ""
repos:
  - { name: "prod-.*", automaticSearch: true, defaultQuery: errors, regex: true }
  - { name: audit, automaticSearch: false, defaultQuery: errors }
  - { name: archive, automaticSearch: false }
views:
  - { name: all, automaticSearch: true, defaultQuery: errors }
defaultQueries:
  - { name: errors, global: true, queryString: "level=ERROR", start: 24h }
  - { name: local, global: false, queryString: "*" }
"#;

    fn repo(id: &str, name: &str, automatic_search: bool) -> Repository {
        Repository {
            id: id.into(),
            name: name.into(),
            automatic_search,
            ..Default::default()
        }
    }

    fn cluster() -> MockBackend {
        let mock = MockBackend::new();
        mock.add_role(Role {
            id: "role-member".into(),
            display_name: "Member".into(),
        });
        mock.add_role(Role {
            id: "role-admin".into(),
            display_name: "Admin".into(),
        });
        mock.add_repository(repo("r1", "prod-eu", false));
        mock.add_repository(repo("r2", "prod-us", true));
        mock.add_repository(repo("r3", "audit", false));
        mock.add_view(View {
            id: "v1".into(),
            name: "all".into(),
            ..Default::default()
        });
        mock
    }

    #[test]
    fn test_full_run_converges() {
        let mock = cluster();
        let config = DesiredConfig::from_yaml(DOC).unwrap();

        let report = reconcile(&config, &mock);
        let failures: Vec<_> = report.failures().map(ToString::to_string).collect();
        assert!(failures.is_empty(), "{failures:?}");

        // User created and granted on prod-eu, prod-us (regex) and audit (exact)
        let alice = mock.user("alice").unwrap();
        assert_eq!(alice.search_domain_roles.len(), 3);
        assert!(alice.has_role("r3", "role-admin"));

        // Default query created in every search domain before repos point at it
        assert_eq!(mock.repository("prod-eu").unwrap().default_query_name(), "errors");
        assert_eq!(mock.view("all").unwrap().default_query_name(), "errors");
        assert!(mock.repository("prod-eu").unwrap().automatic_search);
        assert!(mock.view("all").unwrap().automatic_search);

        // Exact repo that does not exist is reported, never created
        assert!(mock.repository("archive").is_none());
        let archive: Vec<_> = report
            .for_collection(Collection::Repos)
            .filter(|o| o.entry == "archive")
            .collect();
        assert_eq!(archive.len(), 1);
        assert_eq!(archive[0].action, Action::WouldCreate);

        // Non-global query skipped
        assert!(report.for_collection(Collection::DefaultQueries).any(|o| {
            o.entry == "local" && matches!(o.action, Action::Skipped { .. })
        }));
    }

    #[test]
    fn test_second_run_is_idempotent() {
        let mock = cluster();
        let config = DesiredConfig::from_yaml(DOC).unwrap();

        let first = reconcile(&config, &mock);
        assert!(first.summary().total_changes() > 0);
        mock.clear_mutations();

        let second = reconcile(&config, &mock);
        assert!(mock.mutations().is_empty(), "{:?}", mock.mutations());
        assert_eq!(second.summary().total_changes(), 0);
        assert!(second.outcomes().iter().all(|o| matches!(
            o.action,
            Action::Exists | Action::Skipped { .. } | Action::WouldCreate
        )));
    }

    #[test]
    fn test_pass_order() {
        let mock = cluster();
        let config = DesiredConfig::from_yaml(DOC).unwrap();

        let report = reconcile(&config, &mock);
        let mut seen: Vec<Collection> = Vec::new();
        for outcome in report.outcomes() {
            if seen.last() != Some(&outcome.collection) {
                seen.push(outcome.collection);
            }
        }
        assert_eq!(seen, Collection::all());
    }

    #[test]
    fn test_dry_run_issues_no_mutations() {
        let mock = cluster();
        let config = DesiredConfig::from_yaml(DOC).unwrap();
        let options = ReconcileOptions::default().dry_run(true);

        let report = reconcile_with(&config, &mock, &options, &mut NoProgress);
        assert!(mock.mutations().is_empty());
        assert_eq!(report.summary().total_changes(), 0);
        assert!(report.summary().planned > 0);
        assert!(report.outcomes().iter().any(|o| o.action
            == Action::WouldUpdate {
                change: Change::AutomaticSearch { value: true }
            }));
    }

    #[test]
    fn test_prod_regex_scenario() {
        let mock = MockBackend::new();
        mock.add_repository(repo("r1", "prod-eu", false));
        mock.add_repository(repo("r2", "prod-us", true));
        mock.add_repository(repo("r3", "staging", false));
        let config = DesiredConfig::from_yaml(
            "repos:\n  - { name: \"prod-.*\", automaticSearch: true, regex: true }\n",
        )
        .unwrap();

        let report = reconcile(&config, &mock);

        assert_eq!(
            mock.mutations(),
            vec![Mutation::SetAutomaticSearch {
                search_domain: "prod-eu".into(),
                automatic_search: true,
            }]
        );
        let entries: Vec<_> = report
            .outcomes()
            .iter()
            .map(|o| (o.entry.as_str(), o.action.clone()))
            .collect();
        assert_eq!(
            entries,
            vec![
                (
                    "prod-eu",
                    Action::Updated {
                        change: Change::AutomaticSearch { value: true }
                    }
                ),
                ("prod-us", Action::Exists),
            ]
        );
    }

    #[test]
    fn test_listing_failure_ends_pass_only() {
        let mock = cluster();
        mock.fail_on("list_repositories", "connection reset");
        let config = DesiredConfig::from_yaml(DOC).unwrap();

        let report = reconcile(&config, &mock);
        let repo_outcomes: Vec<_> = report.for_collection(Collection::Repos).collect();
        assert_eq!(repo_outcomes.len(), 1);
        assert!(repo_outcomes[0].is_failure());
        // Views pass still ran
        assert!(mock.view("all").unwrap().automatic_search);
    }

    #[test]
    fn test_progress_callback_sees_every_outcome() {
        struct Counter {
            passes: usize,
            outcomes: usize,
        }
        impl ProgressCallback for Counter {
            fn on_pass_start(&mut self, _collection: Collection, _entries: usize) {
                self.passes += 1;
            }
            fn on_outcome(&mut self, _outcome: &Outcome) {
                self.outcomes += 1;
            }
            fn on_pass_complete(&mut self, _collection: Collection) {}
        }

        let mock = cluster();
        mock.add_saved_query(
            "audit",
            SavedQuery {
                id: "q0".into(),
                name: "errors".into(),
                query: QueryDetails::default(),
            },
        );
        let config = DesiredConfig::from_yaml(DOC).unwrap();
        let mut counter = Counter {
            passes: 0,
            outcomes: 0,
        };

        let report = reconcile_with(&config, &mock, &ReconcileOptions::default(), &mut counter);
        assert_eq!(counter.passes, 4);
        assert_eq!(counter.outcomes, report.outcomes().len());
    }
}
