//! Bulk HTML Loader main entry point
//!
//! This is the command-line interface for loading a batch of HTML pages.

use anyhow::{bail, Context};
use bulk_html_loader::config::{load_config, Config};
use bulk_html_loader::output::{format_item, print_summary, LoadSummary};
use bulk_html_loader::BulkHtmlLoader;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Bulk HTML Loader: fetch many pages concurrently
///
/// Loads every URL with a bounded number of requests in flight, retries
/// failed requests and prints one line per page followed by a summary.
#[derive(Parser, Debug)]
#[command(name = "bulk-html-loader")]
#[command(version = "1.0.0")]
#[command(about = "Fetch and parse many HTML pages concurrently", long_about = None)]
struct Cli {
    /// URLs to load
    #[arg(value_name = "URLS")]
    urls: Vec<String>,

    /// File with one URL per line (blank lines and # comments are skipped)
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Maximum number of requests in flight (overrides the config file)
    #[arg(long, value_name = "N")]
    concurrency: Option<usize>,

    /// CSS selector whose first match is printed for each loaded page
    #[arg(short, long, value_name = "CSS")]
    selector: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("failed to load configuration from {}", path.display()))?
        }
        None => Config::default(),
    };

    let mut urls = cli.urls.clone();
    if let Some(path) = &cli.input {
        urls.extend(read_url_file(path)?);
    }

    if urls.is_empty() {
        bail!("no URLs given; pass them as arguments or with --input");
    }

    let mut loader = BulkHtmlLoader::from_config(config)?.verbose(cli.verbose > 0);
    if let Some(concurrency) = cli.concurrency {
        loader = loader.max_concurrent_connections(concurrency);
    }

    tracing::info!("Loading {} URLs", urls.len());
    let items = loader.load(urls).await?;
    tracing::info!("{}", loader);

    if cli.quiet {
        return Ok(());
    }

    for item in &items {
        println!("{}", format_item(item, cli.selector.as_deref())?);
    }
    println!();

    print_summary(&LoadSummary::from_items(&items));

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("bulk_html_loader=warn,warn"),
            1 => EnvFilter::new("bulk_html_loader=info,warn"),
            2 => EnvFilter::new("bulk_html_loader=debug,info"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Reads URLs from a file, one per line
fn read_url_file(path: &Path) -> anyhow::Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read URL list {}", path.display()))?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}
