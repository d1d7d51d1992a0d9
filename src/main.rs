// src/main.rs
// =============================================================================
// Entry point of the crawler CLI.
//
// What happens here:
// 1. Set up diagnostics (stderr) and parse the command line
// 2. Build the crawler and hook Ctrl-C up to its cancellation token
// 3. Run the crawl; the page log streams to stdout while it runs (stderr
//    with --json, so stdout holds nothing but the summary)
// 4. Print a summary and exit (0 = crawl ran, 2 = fatal error)
// =============================================================================

mod cli; // src/cli.rs - command-line parsing
mod crawl; // src/crawl/ - the crawl engine
mod logging; // src/logging.rs - tracing setup

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use cli::{Cli, PageLog};
use crawl::{CrawlStats, Crawler};

#[tokio::main]
async fn main() {
    logging::init();

    // clap exits by itself (with usage) when --url is missing
    let cli = Cli::parse();

    let exit_code = match run(cli).await {
        Ok(()) => 0,
        Err(e) => {
            error!("{:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

async fn run(cli: Cli) -> Result<()> {
    let crawler = Crawler::new(cli.crawl_config()).context("could not set up the crawler")?;

    // Ctrl-C stops the crawl cleanly instead of killing the process mid-write
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, stopping crawl");
                cancel.cancel();
            }
        });
    }

    let crawl = match cli.page_log() {
        PageLog::Stdout => crawler.run(&cli.url, std::io::stdout(), cancel).await,
        PageLog::Stderr => crawler.run(&cli.url, std::io::stderr(), cancel).await,
    };
    let stats = crawl.with_context(|| format!("crawl of {} failed", cli.url))?;

    print_summary(&stats, cli.json)
}

// Prints the crawl totals, either human-readable or as JSON
fn print_summary(stats: &CrawlStats, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(stats)?);
        return Ok(());
    }

    println!();
    println!("Summary:");
    println!("   Crawled: {}", stats.pages_crawled);
    println!("   Failed: {}", stats.pages_failed);
    println!("   Queued: {}", stats.links_enqueued);
    println!("   Dropped (queue full): {}", stats.links_dropped);
    if stats.cancelled {
        println!("   Crawl was cancelled before it finished");
    }
    Ok(())
}
