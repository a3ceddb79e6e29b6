//! cffauthors command-line tool.
//!
//! Runs the pull request contributor check (normally from a GitHub Actions
//! workflow) and offers offline inspection of citation files.

mod style;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use tracing_subscriber::EnvFilter;

use cffauthors_core::config::{AppConfig, PullRequestContext};
use cffauthors_core::identity::author::{ALIAS, EMAIL, FAMILY_NAMES, GIVEN_NAMES, NAME, ORCID};
use cffauthors_core::identity::{same_identity, AuthorRecord};
use cffauthors_core::updater::{self, RunReport};
use cffauthors_core::CffDocument;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// Keep CITATION.cff authors in sync with pull request contributors.
#[derive(Parser, Debug)]
#[command(name = "cffauthors", version, about)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check the contributors of a pull request against the citation file.
    Run {
        /// TOML configuration file. Without it the GitHub Actions
        /// environment variables are used.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Workflow event payload (overrides GITHUB_EVENT_PATH).
        #[arg(short, long)]
        event: Option<PathBuf>,

        /// Resolve and report without writing files or commenting.
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate a citation file and list its authors.
    Validate {
        /// Path to the citation file.
        file: PathBuf,
    },

    /// List pairs of authors in a citation file that denote the same person.
    Compare {
        /// Path to the citation file.
        file: PathBuf,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_target(false)
        .without_time()
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Run {
            config,
            event,
            dry_run,
        } => cmd_run(config.as_deref(), event.as_deref(), dry_run).await,
        Commands::Validate { file } => cmd_validate(&file).map(|()| ExitCode::SUCCESS),
        Commands::Compare { file } => cmd_compare(&file).map(|()| ExitCode::SUCCESS),
    }
}

// ---------------------------------------------------------------------------
// Config helpers
// ---------------------------------------------------------------------------

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => {
            let mut config =
                AppConfig::load_from_file(path).context("failed to load configuration file")?;
            config
                .resolve_env_vars()
                .context("failed to resolve environment variables")?;
            config
        }
        None => AppConfig::from_env().context("failed to read configuration from environment")?,
    };
    config.validate().context("invalid configuration")?;
    tracing::info!(repo = %config.github.repo, cff = %config.cff.path.display(), "configuration loaded");
    Ok(config)
}

fn load_document(path: &Path) -> Result<CffDocument> {
    CffDocument::load(path).with_context(|| format!("failed to load {}", path.display()))
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

async fn cmd_run(config_path: Option<&Path>, event: Option<&Path>, dry_run: bool) -> Result<ExitCode> {
    let config = load_config(config_path)?;

    let event_path = event
        .map(Path::to_path_buf)
        .or_else(|| config.github.event_path.clone())
        .context("no workflow event: set GITHUB_EVENT_PATH or pass --event")?;
    let pr = PullRequestContext::load_event(&event_path, &config.github.repo)
        .context("failed to read workflow event")?;

    let report = updater::run(&config, &pr, dry_run)
        .await
        .context("contributor check failed")?;

    print_report(&report, &config, dry_run);

    if report.blocks_pr() {
        eprintln!(
            "{}",
            style::error("Contributors are missing from the citation file; failing the check.")
        );
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn print_report(report: &RunReport, config: &AppConfig, dry_run: bool) {
    let summary = &report.summary;

    println!();
    println!("{}", style::header("Contributor check"));
    println!();

    if summary.new_authors.is_empty() {
        println!("{}", style::success("No new authors"));
    } else {
        for author in &summary.new_authors {
            println!("{}", style::success(&format!("added {}", author)));
        }
    }

    for warning in &summary.warnings {
        println!("{}", style::warn(warning.trim_start_matches("- ")));
    }

    if !summary.missing_authors.is_empty() {
        println!();
        println!(
            "{}",
            style::header(&format!(
                "Not yet credited in {}",
                config.cff.path.display()
            ))
        );
        for author in &summary.missing_authors {
            println!("  {}", author);
        }
    }

    println!();
    if dry_run {
        println!("{}", style::dim("Dry run: nothing was written."));
    } else if report.update.written {
        println!(
            "{}",
            style::dim(&format!("Updated {}", config.cff.path.display()))
        );
    }
}

fn cmd_validate(path: &Path) -> Result<()> {
    println!("Validating citation file: {}", path.display());
    println!();

    let doc = load_document(path)?;
    println!("  [OK] YAML structure is valid");

    if let Err(e) = doc.validate() {
        println!("  [FAIL] {}", e);
        anyhow::bail!("citation file validation failed");
    }
    println!("  [OK] Required keys and authors are valid");

    let authors = doc.authors()?;
    println!();
    println!("{}", authors_table(&authors));
    Ok(())
}

fn cmd_compare(path: &Path) -> Result<()> {
    let doc = load_document(path)?;
    let authors = doc.authors()?;

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["#", "Author", "#", "Same as"]);

    let mut pairs = 0;
    for (i, a) in authors.iter().enumerate() {
        for (j, b) in authors.iter().enumerate().skip(i + 1) {
            if same_identity(a, b).with_context(|| format!("cannot compare authors #{} and #{}", i, j))? {
                pairs += 1;
                table.add_row(vec![
                    Cell::new(i),
                    Cell::new(display_name(a)),
                    Cell::new(j),
                    Cell::new(display_name(b)),
                ]);
            }
        }
    }

    if pairs == 0 {
        println!("{}", style::success("No duplicate authors found."));
    } else {
        println!("{}", style::warn(&format!("{} duplicate pair(s) found:", pairs)));
        println!();
        println!("{}", table);
    }
    Ok(())
}

fn authors_table(authors: &[AuthorRecord]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["#", "Kind", "Name", "Alias", "Email", "ORCID"]);

    for (i, author) in authors.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i),
            Cell::new(style::author_kind(&author.kind().to_string())),
            Cell::new(display_name(author)),
            Cell::new(author.get(ALIAS).unwrap_or("-")),
            Cell::new(author.get(EMAIL).unwrap_or("-")),
            Cell::new(author.get(ORCID).unwrap_or("-")),
        ]);
    }
    table
}

fn display_name(author: &AuthorRecord) -> String {
    match author.get(NAME) {
        Some(name) => name.to_string(),
        None => format!(
            "{} {}",
            author.get(GIVEN_NAMES).unwrap_or(""),
            author.get(FAMILY_NAMES).unwrap_or("")
        )
        .trim()
        .to_string(),
    }
}
