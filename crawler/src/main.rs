use anyhow::Result;
use clap::{ArgAction, Parser};
use crawler::{CrawlConfig, Crawler, HttpFetcher, HttpFetcherConfig};
use search_core::Store;
use std::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "crawler")]
#[command(about = "Crawl a site breadth-first into the page store")]
struct Cli {
    /// Seed URL; https:// is assumed when no scheme is given
    #[arg(long)]
    seed: String,
    /// SQLite database path
    #[arg(long, default_value = "./data/search.db")]
    db: String,
    /// Concurrent fetches
    #[arg(long, default_value_t = 8)]
    concurrency: usize,
    /// Stop after dispatching this many fetches
    #[arg(long)]
    max_pages: Option<usize>,
    /// Request timeout seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,
    /// User-Agent string for robots.txt and page requests
    #[arg(long, default_value = "site-search-bot/0.1")]
    user_agent: String,
    /// Only follow links that stay on the seed's host
    #[arg(long, action = ArgAction::Set, default_value_t = true)]
    same_host_only: bool,
    /// Honor robots.txt allow/disallow rules and crawl-delay
    #[arg(long, action = ArgAction::Set, default_value_t = true)]
    respect_robots: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))).init();
    let args = Cli::parse();

    let fetcher = HttpFetcher::new(&HttpFetcherConfig {
        user_agent: args.user_agent.clone(),
        timeout: Duration::from_secs(args.timeout_secs),
        respect_robots: args.respect_robots,
    })?;
    let crawler = Crawler::new(
        fetcher,
        CrawlConfig { concurrency: args.concurrency, max_pages: args.max_pages, same_host_only: args.same_host_only },
    );

    let mut store = Store::open(&args.db)?;
    let report = crawler.crawl(&mut store, &args.seed).await?;
    tracing::info!(db = %args.db, pages = store.page_count()?, "store updated");
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
