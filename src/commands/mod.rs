pub mod apply;
pub mod permissions;
pub mod repos;
pub mod roles;
pub mod saved_queries;
pub mod tokens;
pub mod users;
pub mod views;

use anyhow::{Context as AnyhowContext, Result, bail};
use console::Term;

use crate::Context;

/// Ask before a destructive action; `--yes` skips the prompt
pub(crate) fn confirm(ctx: &Context, prompt: &str) -> Result<bool> {
    if ctx.yes {
        return Ok(true);
    }
    if !Term::stderr().is_term() {
        bail!("Refusing to prompt without a terminal. Re-run with --yes to confirm");
    }
    dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .context("Failed to read confirmation")
}
