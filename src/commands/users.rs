use anyhow::{Context as AnyhowContext, Result};
use logapi::{Client, User, UserChangeSet};

use crate::Context;
use crate::cli::UsersCommand;
use crate::ui;

pub fn run(ctx: &Context, cmd: UsersCommand) -> Result<()> {
    let client = ctx.client()?;
    match cmd {
        UsersCommand::Add {
            username,
            root,
            name,
            company,
            country_code,
            email,
            picture,
        } => {
            let changes = UserChangeSet {
                is_root: root,
                full_name: name,
                company,
                country_code,
                email,
                picture,
            };
            let user = client
                .backend()
                .create_user(&username, &changes)
                .context("Error creating the user")?;
            ui::success(&format!("Created user '{}'", user.username));
            Ok(())
        }
        UsersCommand::Show { username } => {
            let user = find_user(&client, &username)?;
            print_user(&user);
            Ok(())
        }
        UsersCommand::UpdateUsername {
            username,
            new_username,
            dry_run,
        } => update_username(&client, &username, &new_username, dry_run),
    }
}

fn find_user(client: &Client, username: &str) -> Result<User> {
    client
        .backend()
        .get_user(username)
        .context("Error fetching user")?
        .with_context(|| format!("User '{username}' not found"))
}

fn print_user(user: &User) {
    ui::header(&user.username);
    ui::kv("Id", &user.id);
    ui::kv("Name", user.full_name.as_deref().unwrap_or(""));
    ui::kv("Email", user.email.as_deref().unwrap_or(""));
    ui::kv("Company", user.company.as_deref().unwrap_or(""));
    ui::kv("Root", &user.is_root.to_string());
}

fn update_username(client: &Client, username: &str, new_username: &str, dry_run: bool) -> Result<()> {
    let user = find_user(client, username)?;
    if dry_run {
        ui::info(&format!(
            "Would rename '{}' ({}) to '{new_username}'",
            user.username, user.id
        ));
        return Ok(());
    }
    client
        .backend()
        .update_username(username, new_username)
        .with_context(|| format!("Error renaming user '{username}'"))?;
    ui::success(&format!("Renamed '{username}' to '{new_username}'"));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use logapi::MockBackend;

    fn client_with_alice() -> (Client, MockBackend) {
        let mock = MockBackend::new();
        mock.add_user(User {
            id: "u1".into(),
            username: "alice".into(),
            ..Default::default()
        });
        (Client::with_backend(Box::new(mock.clone())), mock)
    }

    #[test]
    fn test_update_username() {
        let (client, mock) = client_with_alice();
        update_username(&client, "alice", "alice@example.com", false).unwrap();
        assert!(mock.user("alice").is_none());
        assert_eq!(mock.user("alice@example.com").unwrap().id, "u1");
    }

    #[test]
    fn test_update_username_dry_run() {
        let (client, mock) = client_with_alice();
        update_username(&client, "alice", "alice@example.com", true).unwrap();
        assert!(mock.mutations().is_empty());
        assert!(mock.user("alice").is_some());
    }

    #[test]
    fn test_update_unknown_user() {
        let (client, mock) = client_with_alice();
        let err = update_username(&client, "bob", "robert", false).unwrap_err();
        assert!(err.to_string().contains("not found"));
        assert!(mock.mutations().is_empty());
    }
}
