use super::Engine;
use crate::config::DesiredSearchDomain;
use crate::context::ProgressCallback;
use crate::report::{Action, Change, Collection, Outcome};
use crate::resolve::resolve_targets;
use log::debug;
use logapi::backend::Backend;
use logapi::{Repository, View, search_domains};

/// The fields a pass compares, for either a repository or a view.
#[derive(Debug, Clone)]
struct LiveDomain {
    name: String,
    automatic_search: bool,
    default_query: String,
}

impl From<Repository> for LiveDomain {
    fn from(repo: Repository) -> Self {
        Self {
            default_query: repo.default_query_name().to_string(),
            name: repo.name,
            automatic_search: repo.automatic_search,
        }
    }
}

impl From<View> for LiveDomain {
    fn from(view: View) -> Self {
        Self {
            default_query: view.default_query_name().to_string(),
            name: view.name,
            automatic_search: view.automatic_search,
        }
    }
}

pub(super) fn reconcile_repos<P: ProgressCallback>(
    engine: &mut Engine<'_, P>,
    repos: &[DesiredSearchDomain],
) {
    let live: Vec<LiveDomain> = match engine.remote.list_repositories() {
        Ok(repos) => repos.into_iter().map(LiveDomain::from).collect(),
        Err(e) => return list_failed(engine, Collection::Repos, &e),
    };
    let get = |remote: &dyn Backend, name: &str| {
        remote.get_repository(name).map(|r| r.map(LiveDomain::from))
    };
    reconcile_domains(engine, Collection::Repos, repos, &live, get);
}

pub(super) fn reconcile_views<P: ProgressCallback>(
    engine: &mut Engine<'_, P>,
    views: &[DesiredSearchDomain],
) {
    let live: Vec<LiveDomain> = match engine.remote.list_views() {
        Ok(views) => views.into_iter().map(LiveDomain::from).collect(),
        Err(e) => return list_failed(engine, Collection::Views, &e),
    };
    let get = |remote: &dyn Backend, name: &str| {
        remote.get_view(name).map(|v| v.map(LiveDomain::from))
    };
    reconcile_domains(engine, Collection::Views, views, &live, get);
}

fn list_failed<P: ProgressCallback>(engine: &mut Engine<'_, P>, collection: Collection, e: &logapi::Error) {
    let message = format!("listing {collection}: {e}");
    engine.record(Outcome::failed(collection, "*", message));
}

fn reconcile_domains<P, G>(
    engine: &mut Engine<'_, P>,
    collection: Collection,
    desired: &[DesiredSearchDomain],
    live: &[LiveDomain],
    get: G,
) where
    P: ProgressCallback,
    G: Fn(&dyn Backend, &str) -> logapi::Result<Option<LiveDomain>>,
{
    let live_names: Vec<&str> = live.iter().map(|d| d.name.as_str()).collect();

    for entry in desired.iter().filter(|d| !d.name.is_empty()) {
        if entry.regex {
            let targets = match resolve_targets(&entry.name, true, &live_names) {
                Ok(targets) => targets,
                Err(e) => {
                    engine.record(Outcome::failed(collection, &entry.name, e));
                    continue;
                }
            };
            if targets.is_empty() {
                debug!("no {collection} match {:?}", entry.name);
            }
            for current in live.iter().filter(|d| targets.contains(&d.name)) {
                converge(engine, collection, current, entry);
            }
            continue;
        }

        match get(engine.remote, &entry.name) {
            Ok(Some(current)) => converge(engine, collection, &current, entry),
            Ok(None) => engine.record(Outcome::new(collection, &entry.name, Action::WouldCreate)),
            Err(e) => {
                let message = format!("looking up {}: {e}", entry.name);
                engine.record(Outcome::failed(collection, &entry.name, message));
            }
        }
    }
}

/// Issue one update per field of `current` that differs from `desired`.
fn converge<P: ProgressCallback>(
    engine: &mut Engine<'_, P>,
    collection: Collection,
    current: &LiveDomain,
    desired: &DesiredSearchDomain,
) {
    let name = current.name.as_str();
    let mut in_sync = true;

    if desired.automatic_search != current.automatic_search {
        in_sync = false;
        let change = Change::AutomaticSearch {
            value: desired.automatic_search,
        };
        if engine.dry_run {
            engine.record(Outcome::new(collection, name, Action::WouldUpdate { change }));
        } else {
            let result = engine.remote.set_automatic_search(name, desired.automatic_search);
            engine.record_mutation(
                result,
                Outcome::new(collection, name, Action::Updated { change }),
                "setting automatic search",
            );
        }
    }

    if desired.default_query != current.default_query {
        in_sync = false;
        let change = Change::DefaultQuery {
            value: desired.default_query.clone(),
        };
        if engine.dry_run {
            engine.record(Outcome::new(collection, name, Action::WouldUpdate { change }));
        } else {
            let result = search_domains::set_default_query(engine.remote, name, &desired.default_query);
            engine.record_mutation(
                result,
                Outcome::new(collection, name, Action::Updated { change }),
                "setting default saved query",
            );
        }
    }

    if in_sync {
        engine.record(Outcome::new(collection, name, Action::Exists));
    }
}
