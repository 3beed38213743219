use super::Engine;
use crate::config::DesiredDefaultQuery;
use crate::context::ProgressCallback;
use crate::report::{Action, Collection, Outcome};
use logapi::NewSavedQuery;

const QUERIES: Collection = Collection::DefaultQueries;

pub(super) fn reconcile_default_queries<P: ProgressCallback>(
    engine: &mut Engine<'_, P>,
    queries: &[DesiredDefaultQuery],
) {
    for query in queries.iter().filter(|q| !q.name.is_empty()) {
        if !query.global {
            let reason = "only global queries are deployed".to_string();
            engine.record(Outcome::new(QUERIES, &query.name, Action::Skipped { reason }));
            continue;
        }

        let domains = match engine.remote.list_search_domains() {
            Ok(domains) => domains,
            Err(e) => {
                let message = format!("listing search domains: {e}");
                engine.record(Outcome::failed(QUERIES, &query.name, message));
                continue;
            }
        };

        for domain in domains {
            ensure_query(engine, query, &domain.name);
        }
    }
}

fn ensure_query<P: ProgressCallback>(
    engine: &mut Engine<'_, P>,
    query: &DesiredDefaultQuery,
    search_domain: &str,
) {
    match engine.remote.get_saved_query(&query.name, search_domain) {
        Ok(_) => {
            engine.record(Outcome::new(QUERIES, &query.name, Action::Exists).in_target(search_domain));
        }
        Err(e) if !e.is_not_found() => {
            let outcome = Outcome::failed(QUERIES, &query.name, format!("looking up query: {e}"))
                .in_target(search_domain);
            engine.record(outcome);
        }
        Err(_) if engine.dry_run => {
            let outcome = Outcome::new(QUERIES, &query.name, Action::WouldCreate).in_target(search_domain);
            engine.record(outcome);
        }
        Err(_) => {
            let mut new_query = NewSavedQuery::new(&query.name, search_domain, &query.query_string);
            if !query.start.is_empty() {
                new_query = new_query.start(&query.start);
            }
            let result = engine.remote.create_saved_query(&new_query);
            engine.record_mutation(
                result,
                Outcome::new(QUERIES, &query.name, Action::Created).in_target(search_domain),
                "creating query",
            );
        }
    }
}
