//! Telescroll main entry point
//!
//! This is the command-line interface for the Telescroll channel crawler.

use chrono::{DateTime, NaiveDate, Utc};
use clap::Parser;
use std::path::{Path, PathBuf};
use telescroll::config::{load_config_with_hash, Config};
use telescroll::crawler::{effective_cap, scrape, CrawlMode, ScrapeRequest};
use telescroll::session::{ChromiumSession, Credentials, SessionCookie};
use telescroll::target::resolve_target;
use tracing_subscriber::EnvFilter;

/// Telescroll: an incremental channel-feed crawler
///
/// Telescroll opens a Telegram channel feed in a browser, scrolls it towards
/// older posts, and prints every post it collected as JSON, newest first.
#[derive(Parser, Debug)]
#[command(name = "telescroll")]
#[command(version)]
#[command(about = "An incremental channel-feed crawler", long_about = None)]
struct Cli {
    /// Channel handle, @handle, or t.me link
    #[arg(value_name = "TARGET")]
    target: String,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Oldest post date to keep (RFC 3339 or YYYY-MM-DD)
    #[arg(long, value_name = "DATE", value_parser = parse_from_date)]
    from: Option<DateTime<Utc>>,

    /// Newest post date to keep (RFC 3339 or YYYY-MM-DD, inclusive)
    #[arg(long, value_name = "DATE", value_parser = parse_to_date)]
    to: Option<DateTime<Utc>>,

    /// Maximum number of posts (omitted, 0 or >= 10000 means no limit)
    #[arg(long, value_name = "N")]
    max_posts: Option<usize>,

    /// Drop reaction counts from the output
    #[arg(long)]
    no_reactions: bool,

    /// Use the logged-in web application instead of the public pages
    #[arg(long, requires = "cookies")]
    authenticated: bool,

    /// JSON file with session cookies (an array, or {cookies, localStorage})
    #[arg(long, value_name = "FILE")]
    cookies: Option<PathBuf>,

    /// Show the browser window
    #[arg(long)]
    headful: bool,

    /// Write the JSON result to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Validate config and target, then exit without launching a browser
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            match load_config_with_hash(path) {
                Ok((cfg, hash)) => {
                    tracing::info!("Configuration loaded successfully (hash: {})", hash);
                    cfg
                }
                Err(e) => {
                    tracing::error!("Failed to load configuration: {}", e);
                    return Err(e.into());
                }
            }
        }
        None => Config::default(),
    };
    if cli.headful {
        config.browser.headless = false;
    }

    let credentials = match &cli.cookies {
        Some(path) => Some(load_credentials(path)?),
        None => None,
    };

    let request = ScrapeRequest {
        target: cli.target.clone(),
        date_from: cli.from,
        date_to: cli.to,
        max_posts: cli.max_posts,
        include_reactions: !cli.no_reactions,
        mode: if cli.authenticated {
            CrawlMode::Authenticated
        } else {
            CrawlMode::Public
        },
        credentials,
    };

    if cli.dry_run {
        return handle_dry_run(&config, &request);
    }

    handle_scrape(&config, &request, cli.output.as_deref()).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("telescroll=info,warn"),
            1 => EnvFilter::new("telescroll=debug,info"),
            2 => EnvFilter::new("telescroll=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Reads session credentials from a JSON file
///
/// Accepts either a bare cookie array or a `{cookies, localStorage}` object.
fn load_credentials(path: &Path) -> Result<Credentials, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)?;
    if let Ok(cookies) = serde_json::from_str::<Vec<SessionCookie>>(&content) {
        return Ok(Credentials {
            cookies,
            local_storage: Vec::new(),
        });
    }
    let credentials: Credentials = serde_json::from_str(&content)?;
    tracing::info!(
        "Loaded {} cookies and {} storage entries from {}",
        credentials.cookies.len(),
        credentials.local_storage.len(),
        path.display()
    );
    Ok(credentials)
}

/// Handles --dry-run: shows what would be crawled
fn handle_dry_run(
    config: &Config,
    request: &ScrapeRequest,
) -> Result<(), Box<dyn std::error::Error>> {
    let target = resolve_target(&request.target)?;

    println!("=== Telescroll Dry Run ===\n");

    println!("Target: {}", target);
    for (format, url) in target.public_candidates() {
        println!("  {:<9} {}", format, url);
    }
    println!("  Mode: {:?}", request.mode);

    println!("\nBrowser:");
    println!("  Headless: {}", config.browser.headless);
    println!(
        "  Viewport: {}x{}",
        config.browser.viewport_width, config.browser.viewport_height
    );
    println!("  Timeout: {}ms", config.browser.timeout_ms);

    println!("\nScraping:");
    println!("  Scroll delay: {}ms", config.scraping.scroll_delay_ms);
    println!(
        "  Max scroll attempts: {}",
        config.scraping.max_scroll_attempts
    );
    match effective_cap(request.max_posts) {
        Some(cap) => println!("  Post limit: {}", cap),
        None => println!("  Post limit: none"),
    }
    if let Some(from) = request.date_from {
        println!("  From: {}", from.to_rfc3339());
    }
    if let Some(to) = request.date_to {
        println!("  To: {}", to.to_rfc3339());
    }

    println!("\nGuard:");
    println!("  Memory limit: {} MB", config.guard.memory_limit_mb);
    println!("  Sample interval: {}", config.guard.sample_interval);

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Handles the main scrape operation
async fn handle_scrape(
    config: &Config,
    request: &ScrapeRequest,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = ChromiumSession::launch(&config.browser).await?;
    let result = scrape(&mut session, config, request).await;
    session.close().await;

    let json = serde_json::to_string_pretty(&result)?;
    match output {
        Some(path) => {
            std::fs::write(path, json)?;
            tracing::info!("Wrote {} posts to {}", result.total_posts, path.display());
        }
        None => println!("{}", json),
    }

    if let Some(error) = &result.error {
        tracing::error!("Scrape reported an error: {}", error);
    }
    Ok(())
}

fn parse_from_date(text: &str) -> Result<DateTime<Utc>, String> {
    parse_date_arg(text, false)
}

fn parse_to_date(text: &str) -> Result<DateTime<Utc>, String> {
    parse_date_arg(text, true)
}

/// Parses RFC 3339, or a bare date taken as the start (or end) of that day
fn parse_date_arg(text: &str, end_of_day: bool) -> Result<DateTime<Utc>, String> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Ok(parsed.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .map_err(|_| format!("expected RFC 3339 or YYYY-MM-DD, got '{}'", text))?;
    let time = if end_of_day {
        date.and_hms_opt(23, 59, 59)
    } else {
        date.and_hms_opt(0, 0, 0)
    };
    time.map(|t| t.and_utc())
        .ok_or_else(|| format!("invalid date '{}'", text))
}
