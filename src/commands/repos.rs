use anyhow::{Context as AnyhowContext, Result, bail};
use logapi::{Client, RetentionDimension};

use crate::Context;
use crate::cli::{RepoUpdateArgs, ReposCommand};
use crate::commands::confirm;
use crate::ui;

pub fn run(ctx: &Context, cmd: ReposCommand) -> Result<()> {
    let client = ctx.client()?;
    match cmd {
        ReposCommand::List => list(&client),
        ReposCommand::Show { name } => show(&client, &name),
        ReposCommand::Create { name } => {
            client
                .backend()
                .create_repository(&name)
                .with_context(|| format!("Error creating repository '{name}'"))?;
            ui::success(&format!("Created repository '{name}'"));
            Ok(())
        }
        ReposCommand::Update(args) => update(&client, &args),
        ReposCommand::Delete {
            name,
            reason,
            allow_data_deletion,
        } => {
            if !confirm(ctx, &format!("Delete repository '{name}'?"))? {
                ui::info("Cancelled");
                return Ok(());
            }
            client
                .delete_repository(&name, &reason, allow_data_deletion)
                .with_context(|| format!("Error deleting repository '{name}'"))?;
            ui::success(&format!("Deleted repository '{name}'"));
            Ok(())
        }
    }
}

fn list(client: &Client) -> Result<()> {
    let mut repos = client
        .backend()
        .list_repositories()
        .context("Error fetching repository list")?;
    repos.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));

    let rows: Vec<Vec<String>> = repos
        .iter()
        .map(|r| {
            vec![
                r.name.clone(),
                ui::format_size(r.space_used),
                ui::format_limit(r.time_based_retention, "days"),
                r.automatic_search.to_string(),
            ]
        })
        .collect();
    ui::table(&["Name", "Space Used", "Retention", "Automatic Search"], &rows);
    Ok(())
}

fn show(client: &Client, name: &str) -> Result<()> {
    let repo = client
        .backend()
        .get_repository(name)
        .context("Error fetching repository")?
        .with_context(|| format!("Repository '{name}' not found"))?;

    ui::header(&repo.name);
    ui::kv("Id", &repo.id);
    ui::kv("Description", repo.description.as_deref().unwrap_or(""));
    ui::kv("Space used", &ui::format_size(repo.space_used));
    ui::kv("Retention", &ui::format_limit(repo.time_based_retention, "days"));
    ui::kv(
        "Ingest size retention",
        &ui::format_limit(repo.ingest_size_based_retention, "GB"),
    );
    ui::kv(
        "Storage size retention",
        &ui::format_limit(repo.storage_size_based_retention, "GB"),
    );
    ui::kv("Automatic search", &repo.automatic_search.to_string());
    ui::kv("Default query", repo.default_query_name());
    Ok(())
}

/// Apply each given setting in turn, stopping at the first error
fn update(client: &Client, args: &RepoUpdateArgs) -> Result<()> {
    if !args.has_changes() {
        bail!("Nothing specified to update. Pass at least one setting flag");
    }
    let name = args.name.as_str();

    if let Some(description) = &args.description {
        client
            .backend()
            .update_description(name, description)
            .context("Error updating repository description")?;
    }

    let retention = [
        (RetentionDimension::Time, args.retention_time),
        (RetentionDimension::IngestSize, args.ingest_size_based_retention),
        (RetentionDimension::StorageSize, args.storage_size_based_retention),
    ];
    for (dimension, value) in retention {
        if let Some(value) = value {
            client
                .update_retention(name, dimension, value, args.allow_data_deletion)
                .with_context(|| format!("Error updating {dimension}"))?;
        }
    }

    if let Some(automatic_search) = args.automatic_search {
        client
            .backend()
            .set_automatic_search(name, automatic_search)
            .context("Error setting automatic search")?;
    }
    if let Some(query) = &args.default_query {
        client
            .set_default_query(name, query)
            .context("Error setting default saved query")?;
    }

    ui::success(&format!("Updated repository '{name}'"));
    Ok(())
}
