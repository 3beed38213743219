use anyhow::{Context as AnyhowContext, Result};
use logapi::PermissionType;

use crate::Context;
use crate::cli::PermissionsCommand;
use crate::ui;

pub fn run(ctx: &Context, cmd: PermissionsCommand) -> Result<()> {
    let client = ctx.client()?;
    let PermissionsCommand::List { permission_type } = cmd;

    let types: Vec<PermissionType> = match permission_type {
        Some(t) => vec![t.into()],
        None => PermissionType::all().to_vec(),
    };

    for permission_type in types {
        let permissions = client
            .backend()
            .list_permissions(permission_type)
            .with_context(|| format!("Error fetching {permission_type} permissions"))?;

        ui::section(&permission_type.to_string());
        let rows: Vec<Vec<&str>> = permissions
            .iter()
            .map(|p| {
                let note = if p.is_deprecated { "deprecated" } else { "" };
                vec![p.name.as_str(), p.description.as_deref().unwrap_or(""), note]
            })
            .collect();
        ui::table(&["Name", "Description", ""], &rows);
    }
    Ok(())
}
