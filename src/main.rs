//! Augur CLI - Mines git history and issue trackers into defect datasets.

use std::fs::File;
use std::io::stdout;

use clap::Parser;
use serde::Serialize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use augur::cli::{Cli, Command, HistoryArgs, LifecycleArgs, MineArgs, OutputFormat};
use augur::config::Config;
use augur::core::{Error, Result, Ticket};
use augur::dataset::{release_inventory, release_window, write_rows, DatasetBuilder};
use augur::git::GitRepo;
use augur::history::{BugCommitLinker, BugLinkIndex, HistoryWalker, WalkOutcome};
use augur::label::Labeler;
use augur::lifecycle::{EstimatorParams, LifecycleEstimator};
use augur::metrics::MetricsEngine;
use augur::parser::TreeSitterProvider;
use augur::tracker::{JiraClient, JsonFileSource, TicketSource};

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cli.verbose { "augur=debug" } else { "augur=info" })
    });
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match run(cli) {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load_default(&cli.path)?,
    };

    match &cli.command {
        Command::Mine(args) => mine(&cli, &config, args),
        Command::Lifecycle(args) => lifecycle(&cli, &config, args),
        Command::History(args) => history(&cli, &config, args),
        Command::Releases(_) => releases(&cli),
    }
}

/// Pick the ticket source the configuration names.
fn ticket_source(config: &Config) -> Result<Box<dyn TicketSource>> {
    if let Some(path) = &config.tracker.tickets_file {
        return Ok(Box::new(JsonFileSource::new(path)));
    }
    if !config.tracker.project_key.is_empty() {
        return Ok(Box::new(JiraClient::new(
            config.tracker.jira_url.clone(),
            config.tracker.project_key.clone(),
        )));
    }
    Err(Error::config(
        "set tracker.project_key or tracker.tickets_file",
    ))
}

fn project_name(cli: &Cli, config: &Config, args: &MineArgs) -> String {
    if let Some(name) = &args.project {
        return name.clone();
    }
    if !config.project.name.is_empty() {
        return config.project.name.clone();
    }
    cli.path
        .canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "project".to_string())
}

/// Scan commit messages for references to the known ticket keys.
fn link_commits(repo: &GitRepo, tickets: &[Ticket]) -> Result<BugLinkIndex> {
    let linker = BugCommitLinker::from_keys(tickets.iter().map(|t| t.key.as_str()))?;
    let commits = repo.commits_oldest_first()?;
    linker.scan(repo, &commits)
}

fn provider_for(config: &Config) -> Result<TreeSitterProvider> {
    TreeSitterProvider::for_extension(&config.history.extension).ok_or_else(|| {
        Error::InvalidArgument(format!(
            "unsupported source extension: {}",
            config.history.extension
        ))
    })
}

fn estimate_lifecycles(config: &Config, catalog: &augur::core::ReleaseCatalog, tickets: &mut [Ticket]) {
    let params = EstimatorParams {
        cold_start_threshold: config.lifecycle.cold_start_threshold,
        fallback_proportion: config.lifecycle.fallback_proportion,
    };
    LifecycleEstimator::with_params(catalog, params).estimate(tickets);
}

/// The full pipeline: releases, tickets, links, walk, estimate, label, emit.
fn mine(cli: &Cli, config: &Config, args: &MineArgs) -> Result<()> {
    let repo = GitRepo::open(&cli.path)?;
    let catalog = repo.release_catalog()?;
    let mut tickets = ticket_source(config)?.fetch_tickets()?;
    let links = link_commits(&repo, &tickets)?;

    let provider = provider_for(config)?;
    let outcome = HistoryWalker::new(&repo, &provider, &config.history.extension).walk(&links)?;

    estimate_lifecycles(config, &catalog, &mut tickets);

    let labeler = Labeler::new(&tickets, &links);
    let engine = MetricsEngine::new(&catalog, &outcome.commits);
    let builder = DatasetBuilder::new(project_name(cli, config, args), &outcome, &labeler, &engine);

    let window = release_window(&catalog, config.dataset.release_fraction);
    let rows = builder.build(window, |release| {
        release_inventory(&repo, &provider, release, &config.history.extension)
    })?;

    let format = match cli.format {
        OutputFormat::Csv => augur::dataset::OutputFormat::Csv,
        OutputFormat::Json => augur::dataset::OutputFormat::Json,
    };
    match &args.output {
        Some(path) => write_rows(&rows, format, File::create(path)?)?,
        None => write_rows(&rows, format, stdout().lock())?,
    }
    Ok(())
}

/// Resolve and estimate lifecycles, then dump the tickets as JSON.
fn lifecycle(cli: &Cli, config: &Config, args: &LifecycleArgs) -> Result<()> {
    let repo = GitRepo::open(&cli.path)?;
    let catalog = repo.release_catalog()?;
    let mut tickets = match &args.tickets {
        Some(path) => JsonFileSource::new(path).fetch_tickets()?,
        None => ticket_source(config)?.fetch_tickets()?,
    };
    estimate_lifecycles(config, &catalog, &mut tickets);
    serde_json::to_writer_pretty(stdout().lock(), &tickets)?;
    Ok(())
}

#[derive(Serialize)]
struct FunctionReport {
    function: String,
    revisions: usize,
    total_churn: u64,
    bug_fixes: usize,
}

/// Walk history without the tracker and report per-function change counts.
fn history(cli: &Cli, config: &Config, args: &HistoryArgs) -> Result<()> {
    let repo = GitRepo::open(&cli.path)?;
    let provider = provider_for(config)?;

    // Link commits when a tracker is configured; otherwise report plain
    // churn with zero fixes.
    let links = match ticket_source(config) {
        Ok(source) => link_commits(&repo, &source.fetch_tickets()?)?,
        Err(_) => BugLinkIndex::default(),
    };

    let outcome: WalkOutcome =
        HistoryWalker::new(&repo, &provider, &config.history.extension).walk(&links)?;

    let mut report: Vec<FunctionReport> = outcome
        .functions
        .iter()
        .filter(|(_, h)| h.revisions() >= args.min_revisions)
        .map(|(id, h)| FunctionReport {
            function: id.clone(),
            revisions: h.revisions(),
            total_churn: h.changes.iter().map(|c| u64::from(c.churn)).sum(),
            bug_fixes: h.bug_fix_commits.len(),
        })
        .collect();
    report.sort_by(|a, b| b.revisions.cmp(&a.revisions).then(a.function.cmp(&b.function)));

    serde_json::to_writer_pretty(stdout().lock(), &report)?;
    Ok(())
}

/// List the release catalog derived from repository tags.
fn releases(cli: &Cli) -> Result<()> {
    let repo = GitRepo::open(&cli.path)?;
    let catalog = repo.release_catalog()?;
    serde_json::to_writer_pretty(stdout().lock(), catalog.releases())?;
    Ok(())
}
