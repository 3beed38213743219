use anyhow::{Context as AnyhowContext, Result};
use logapi::{Client, NewSavedQuery, SavedQuery};

use crate::Context;
use crate::cli::SavedQueriesCommand;
use crate::ui;

pub fn run(ctx: &Context, cmd: SavedQueriesCommand) -> Result<()> {
    let client = ctx.client()?;
    match cmd {
        SavedQueriesCommand::List {
            search_domain,
            detail,
        } => list(&client, &search_domain, detail),
        SavedQueriesCommand::Show { search_domain, name } => {
            let query = client
                .backend()
                .get_saved_query(&name, &search_domain)
                .context("Error fetching saved query")?;
            print_query(&query);
            Ok(())
        }
        SavedQueriesCommand::Create {
            search_domain,
            name,
            query_string,
            start,
            end,
            live,
            widget_type,
        } => {
            let query = NewSavedQuery::new(&name, &search_domain, &query_string)
                .start(start)
                .end(end)
                .live(live)
                .widget_type(widget_type);
            client
                .backend()
                .create_saved_query(&query)
                .context("Error creating saved query")?;
            ui::success(&format!("Created saved query '{name}' in '{search_domain}'"));
            Ok(())
        }
        SavedQueriesCommand::Delete { search_domain, name } => {
            delete(&client, &search_domain, &name)?;
            ui::success(&format!("Deleted saved query '{name}' from '{search_domain}'"));
            Ok(())
        }
    }
}

fn list(client: &Client, search_domain: &str, detail: bool) -> Result<()> {
    let mut queries = client
        .backend()
        .get_search_domain(search_domain)
        .context("Error fetching saved queries")?
        .saved_queries;
    queries.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));

    if detail {
        let rows: Vec<Vec<String>> = queries
            .iter()
            .map(|q| {
                vec![
                    q.name.clone(),
                    q.query.query_string.clone(),
                    q.query.start.clone(),
                    q.query.end.clone(),
                    q.query.is_live.to_string(),
                ]
            })
            .collect();
        ui::table(&["Name", "Query", "Start", "End", "Live"], &rows);
    } else {
        let rows: Vec<Vec<&str>> = queries.iter().map(|q| vec![q.name.as_str()]).collect();
        ui::table(&["Name"], &rows);
    }
    Ok(())
}

fn print_query(query: &SavedQuery) {
    ui::header(&query.name);
    ui::kv("Id", &query.id);
    ui::kv("Query", &query.query.query_string);
    ui::kv("Start", &query.query.start);
    ui::kv("End", &query.query.end);
    ui::kv("Live", &query.query.is_live.to_string());
}

/// Delete by name or id
fn delete(client: &Client, search_domain: &str, name: &str) -> Result<()> {
    let query = client
        .backend()
        .get_saved_query(name, search_domain)
        .context("Error fetching saved query")?;
    client
        .backend()
        .delete_saved_query(search_domain, &query.id)
        .context("Error removing saved query")
}
