//! `logctl apply` - make the cluster match a desired-state document.

use anyhow::{Context as AnyhowContext, Result, bail};
use colored::Colorize;
use reconcile::{
    Action, Collection, DesiredConfig, Outcome, ProgressCallback, ReconcileOptions, Report, Summary,
};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::Context;
use crate::cli::ApplyArgs;
use crate::ui;

pub fn run(ctx: &Context, args: &ApplyArgs) -> Result<ExitCode> {
    let config = load_document(args)?;
    if config.is_empty() {
        ui::warn("Document has no users, repos, views or default queries");
        return Ok(ExitCode::SUCCESS);
    }

    let client = ctx.client()?;
    let options = ReconcileOptions::default().dry_run(args.dry_run);
    let mut progress = TerminalProgress {
        enabled: !args.json && !ctx.quiet,
    };

    if progress.enabled {
        let mode = if args.dry_run { " (dry run)" } else { "" };
        ui::header(&format!("Applying {} entries{mode}", config.len()));
    }

    let report = reconcile::reconcile_with(&config, client.backend(), &options, &mut progress);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report.summary(), args.dry_run);
    }

    Ok(exit_code(&report))
}

/// Read the document from `--file` or fetch it from `--url`
fn load_document(args: &ApplyArgs) -> Result<DesiredConfig> {
    if let Some(path) = &args.file {
        let path = PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref());
        return DesiredConfig::from_file(&path)
            .with_context(|| format!("Could not load {}", path.display()));
    }
    if let Some(url) = &args.url {
        log::debug!("Fetching {url}");
        let content = ureq::get(url)
            .call()
            .with_context(|| format!("Could not fetch {url}"))?
            .body_mut()
            .read_to_string()
            .with_context(|| format!("Could not read response from {url}"))?;
        return DesiredConfig::from_yaml(&content).with_context(|| format!("Invalid document at {url}"));
    }
    bail!("Specify --file or --url")
}

fn exit_code(report: &Report) -> ExitCode {
    if report.has_failures() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

// ============================================================================
// Output
// ============================================================================

struct TerminalProgress {
    enabled: bool,
}

impl ProgressCallback for TerminalProgress {
    fn on_pass_start(&mut self, collection: Collection, entries: usize) {
        if self.enabled && entries > 0 {
            ui::section(&format!("{} ({entries})", pass_title(collection)));
        }
    }

    fn on_outcome(&mut self, outcome: &Outcome) {
        if !self.enabled {
            return;
        }
        let line = outcome.to_string();
        match &outcome.action {
            Action::Created | Action::Updated { .. } => println!("  {} {line}", "✓".green()),
            Action::Exists => println!("  {} {}", "·".dimmed(), line.dimmed()),
            Action::WouldCreate | Action::WouldUpdate { .. } => println!("  {} {line}", "~".cyan()),
            Action::Skipped { .. } => println!("  {} {line}", "-".yellow()),
            Action::Failed => println!("  {} {}", "✗".red(), line.red()),
        }
    }

    fn on_pass_complete(&mut self, _collection: Collection) {}
}

fn pass_title(collection: Collection) -> &'static str {
    match collection {
        Collection::Users => "Users",
        Collection::DefaultQueries => "Default queries",
        Collection::Repos => "Repositories",
        Collection::Views => "Views",
    }
}

fn print_summary(summary: &Summary, dry_run: bool) {
    println!();
    if !summary.is_success() {
        println!("  {} Applied with errors", "⚠".yellow().bold());
    } else if dry_run {
        println!("  {} Dry run complete, nothing changed", "✓".green().bold());
    } else {
        println!("  {} Cluster is up to date", "✓".green().bold());
    }

    if summary.created > 0 {
        println!("    • {} created", summary.created);
    }
    if summary.updated > 0 {
        println!("    • {} updated", summary.updated);
    }
    if summary.planned > 0 {
        println!("    • {} planned", summary.planned);
    }
    if summary.exists > 0 {
        println!("    • {} unchanged", summary.exists);
    }
    if summary.skipped > 0 {
        println!("    • {} skipped", summary.skipped);
    }
    if summary.failed > 0 {
        println!("    • {} {}", summary.failed, "failed".red());
    }
}
