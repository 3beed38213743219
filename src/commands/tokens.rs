use anyhow::{Context as AnyhowContext, Result};
use chrono::{DateTime, Utc};
use logapi::NormalizedToken;

use crate::Context;
use crate::cli::TokensCommand;
use crate::commands::confirm;
use crate::ui;

pub fn run(ctx: &Context, cmd: TokensCommand) -> Result<()> {
    let client = ctx.client()?;
    match cmd {
        TokensCommand::List => {
            let tokens = client.list_tokens().context("Error fetching token list")?;
            let now = Utc::now().timestamp_millis();
            let rows: Vec<Vec<String>> = tokens.iter().map(|t| token_row(t, now)).collect();
            ui::table(&["Id", "Name", "Type", "Views", "Status", "Expire At"], &rows);
        }
        TokensCommand::Create {
            name,
            token_type,
            permissions,
            view,
        } => {
            let secret = client
                .add_token(&name, &token_type, &permissions, &view)
                .context("Error creating token")?;
            ui::success(&format!("Created {token_type} token '{name}'"));
            println!("{secret}");
        }
        TokensCommand::Delete { id } => {
            if !confirm(ctx, &format!("Delete token '{id}'?"))? {
                ui::info("Cancelled");
                return Ok(());
            }
            client
                .delete_token(&id)
                .with_context(|| format!("Error deleting token '{id}'"))?;
            ui::success(&format!("Deleted token '{id}'"));
        }
    }
    Ok(())
}

fn token_row(token: &NormalizedToken, now_millis: i64) -> Vec<String> {
    let status = if token.is_expired(now_millis) { "expired" } else { "ok" };
    vec![
        token.id.clone(),
        token.name.clone(),
        token.kind.to_string(),
        token.views.as_deref().map(|v| v.join(",")).unwrap_or_default(),
        status.to_string(),
        format_expiry(token.expire_at),
    ]
}

fn format_expiry(expire_at: Option<i64>) -> String {
    expire_at
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map_or_else(|| "not set".to_string(), |at| at.to_rfc3339())
}
