use anyhow::{Context as AnyhowContext, Result, bail};
use logapi::{Client, ViewConnection};

use crate::Context;
use crate::cli::ViewsCommand;
use crate::commands::confirm;
use crate::ui;

pub fn run(ctx: &Context, cmd: ViewsCommand) -> Result<()> {
    let client = ctx.client()?;
    match cmd {
        ViewsCommand::List => list(&client),
        ViewsCommand::Show { name } => show(&client, &name),
        ViewsCommand::Create {
            name,
            description,
            connections,
        } => {
            let connections = parse_connections(&connections)?;
            client
                .backend()
                .create_view(&name, &description, &connections)
                .with_context(|| format!("Error creating view '{name}'"))?;
            ui::success(&format!("Created view '{name}'"));
            Ok(())
        }
        ViewsCommand::Update {
            name,
            description,
            connections,
            automatic_search,
            default_query,
        } => {
            let update = ViewUpdate {
                description,
                connections: parse_connections(&connections)?,
                automatic_search,
                default_query,
            };
            update.apply(&client, &name)?;
            ui::success(&format!("Updated view '{name}'"));
            Ok(())
        }
        ViewsCommand::Delete { name, reason } => {
            if client.backend().get_view(&name)?.is_none() {
                bail!("View '{name}' not found");
            }
            if !confirm(ctx, &format!("Delete view '{name}'?"))? {
                ui::info("Cancelled");
                return Ok(());
            }
            client
                .backend()
                .delete_search_domain(&name, &reason)
                .with_context(|| format!("Error deleting view '{name}'"))?;
            ui::success(&format!("Deleted view '{name}'"));
            Ok(())
        }
    }
}

fn list(client: &Client) -> Result<()> {
    let views = client.backend().list_views().context("Error fetching view list")?;
    let rows: Vec<Vec<String>> = views
        .iter()
        .map(|v| {
            let repos: Vec<&str> = v.connections.iter().map(|c| c.repository_name.as_str()).collect();
            vec![v.name.clone(), repos.join(", ")]
        })
        .collect();
    ui::table(&["Name", "Repositories"], &rows);
    Ok(())
}

fn show(client: &Client, name: &str) -> Result<()> {
    let view = client
        .backend()
        .get_view(name)
        .context("Error fetching view")?
        .with_context(|| format!("View '{name}' not found"))?;

    ui::header(&view.name);
    ui::kv("Id", &view.id);
    ui::kv("Description", view.description.as_deref().unwrap_or(""));
    ui::kv("Automatic search", &view.automatic_search.to_string());
    ui::kv("Default query", view.default_query_name());

    ui::section("Connections");
    let rows: Vec<Vec<&str>> = view
        .connections
        .iter()
        .map(|c| vec![c.repository_name.as_str(), c.filter.as_str()])
        .collect();
    ui::table(&["Repository", "Filter"], &rows);
    Ok(())
}

/// Parse `repository=filter` pairs; a bare repository name matches everything
fn parse_connections(raw: &[String]) -> Result<Vec<ViewConnection>> {
    raw.iter()
        .map(|spec| {
            let (repo, filter) = spec.split_once('=').unwrap_or((spec.as_str(), "*"));
            let repo = repo.trim();
            if repo.is_empty() {
                bail!("Invalid connection '{spec}'. Use repository=filter");
            }
            let filter = filter.trim();
            Ok(ViewConnection {
                repository_name: repo.to_string(),
                filter: if filter.is_empty() { "*" } else { filter }.to_string(),
            })
        })
        .collect()
}

struct ViewUpdate {
    description: Option<String>,
    connections: Vec<ViewConnection>,
    automatic_search: Option<bool>,
    default_query: Option<String>,
}

impl ViewUpdate {
    fn apply(&self, client: &Client, name: &str) -> Result<()> {
        if self.description.is_none()
            && self.connections.is_empty()
            && self.automatic_search.is_none()
            && self.default_query.is_none()
        {
            bail!("Nothing specified to update. Pass at least one setting flag");
        }

        if let Some(description) = &self.description {
            client
                .backend()
                .update_description(name, description)
                .context("Error updating view description")?;
        }
        if !self.connections.is_empty() {
            client
                .backend()
                .update_view_connections(name, &self.connections)
                .context("Error updating view connections")?;
        }
        if let Some(automatic_search) = self.automatic_search {
            client
                .backend()
                .set_automatic_search(name, automatic_search)
                .context("Error setting automatic search")?;
        }
        if let Some(query) = &self.default_query {
            client
                .set_default_query(name, query)
                .context("Error setting default saved query")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logapi::{MockBackend, QueryDetails, SavedQuery, View};

    #[test]
    fn test_parse_connections() {
        let raw = vec![
            "prod=level=ERROR".to_string(),
            "audit".to_string(),
            " staging = ".to_string(),
        ];
        let parsed = parse_connections(&raw).unwrap();
        assert_eq!(parsed[0].repository_name, "prod");
        assert_eq!(parsed[0].filter, "level=ERROR");
        assert_eq!(parsed[1].filter, "*");
        assert_eq!(parsed[2].repository_name, "staging");
        assert_eq!(parsed[2].filter, "*");

        assert!(parse_connections(&["=x".to_string()]).is_err());
    }

    #[test]
    fn test_update_view() {
        let mock = MockBackend::new();
        mock.add_view(View {
            id: "v1".into(),
            name: "all".into(),
            ..Default::default()
        });
        mock.add_saved_query(
            "all",
            SavedQuery {
                id: "q1".into(),
                name: "errors".into(),
                query: QueryDetails::default(),
            },
        );
        let client = Client::with_backend(Box::new(mock.clone()));

        let update = ViewUpdate {
            description: None,
            connections: parse_connections(&["prod".to_string()]).unwrap(),
            automatic_search: Some(true),
            default_query: Some("errors".into()),
        };
        update.apply(&client, "all").unwrap();

        let view = mock.view("all").unwrap();
        assert_eq!(view.connections.len(), 1);
        assert!(view.automatic_search);
        assert_eq!(view.default_query_name(), "errors");
    }

    #[test]
    fn test_empty_update_is_rejected() {
        let client = Client::with_backend(Box::new(MockBackend::new()));
        let update = ViewUpdate {
            description: None,
            connections: Vec::new(),
            automatic_search: None,
            default_query: None,
        };
        assert!(update.apply(&client, "all").is_err());
    }
}
