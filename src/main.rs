mod cli;
mod commands;
mod config;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use config::{LogctlConfig, Overrides};
use std::io;
use std::process::ExitCode;

/// Global context for the application
pub struct Context {
    pub quiet: bool,
    pub yes: bool,
    pub overrides: Overrides,
}

impl Context {
    /// Connect using flags, environment and the config file
    pub fn client(&self) -> Result<logapi::Client> {
        let conn = LogctlConfig::load()?.connection(&self.overrides)?;
        log::debug!("Connecting to {}", conn.address);
        Ok(conn.client())
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        quiet: cli.quiet,
        yes: cli.yes,
        overrides: Overrides {
            address: cli.address,
            token: cli.token,
            profile: cli.profile,
        },
    };

    match run(&ctx, cli.command) {
        Ok(code) => code,
        Err(err) => {
            report_error(&err);
            ExitCode::FAILURE
        }
    }
}

fn run(ctx: &Context, command: Command) -> Result<ExitCode> {
    match command {
        Command::Apply(args) => return commands::apply::run(ctx, &args),
        Command::Repos(cmd) => commands::repos::run(ctx, cmd)?,
        Command::Views(cmd) => commands::views::run(ctx, cmd)?,
        Command::Users(cmd) => commands::users::run(ctx, cmd)?,
        Command::Roles(cmd) => commands::roles::run(ctx, cmd)?,
        Command::SavedQueries(cmd) => commands::saved_queries::run(ctx, cmd)?,
        Command::Tokens(cmd) => commands::tokens::run(ctx, cmd)?,
        Command::Permissions(cmd) => commands::permissions::run(ctx, cmd)?,
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "logctl", &mut io::stdout());
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Print the error chain, with advice when the cause is an API error
fn report_error(err: &anyhow::Error) {
    ui::error(&err.to_string());
    for cause in err.chain().skip(1) {
        ui::dim(&format!("caused by: {cause}"));
    }
    if let Some(api_err) = err.chain().find_map(|e| e.downcast_ref::<logapi::Error>()) {
        let category = api_err.category();
        ui::dim(&format!("{}: {}", category.description(), category.advice()));
    }
}
