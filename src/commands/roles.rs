use anyhow::{Context as AnyhowContext, Result};

use crate::Context;
use crate::cli::RolesCommand;
use crate::commands::confirm;
use crate::ui;

pub fn run(ctx: &Context, cmd: RolesCommand) -> Result<()> {
    let client = ctx.client()?;
    let backend = client.backend();
    match cmd {
        RolesCommand::List => {
            let mut roles = backend.list_roles().context("Error fetching role list")?;
            roles.sort_by(|a, b| a.display_name.cmp(&b.display_name));
            let rows: Vec<Vec<&str>> = roles
                .iter()
                .map(|r| vec![r.display_name.as_str(), r.id.as_str()])
                .collect();
            ui::table(&["Name", "Id"], &rows);
        }
        RolesCommand::Show { name } => {
            let role = backend.get_role(&name).context("Error fetching role")?;
            ui::header(&role.display_name);
            ui::kv("Id", &role.id);
        }
        RolesCommand::Remove { name } => {
            if !confirm(ctx, &format!("Remove role '{name}'?"))? {
                ui::info("Cancelled");
                return Ok(());
            }
            backend
                .remove_role(&name)
                .with_context(|| format!("Error removing role '{name}'"))?;
            ui::success(&format!("Removed role '{name}'"));
        }
    }
    Ok(())
}
