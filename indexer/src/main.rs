use anyhow::Result;
use clap::{Parser, Subcommand};
use search_core::indexer::rebuild_index;
use search_core::phrase::StopwordChunker;
use search_core::rank::rank_pages;
use search_core::{Field, RankConfig, Store};
use serde_json::json;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Rebuild keyword indices and link ranks over the crawled pages", long_about = None)]
struct Cli {
    /// SQLite database path
    #[arg(long, global = true, default_value = "./data/search.db")]
    db: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clear derived tables, index single terms and phrases, then compute link ranks
    Build {
        #[command(flatten)]
        rank: RankArgs,
    },
    /// Recompute link ranks only
    Rank {
        #[command(flatten)]
        rank: RankArgs,
    },
    /// Print table sizes as JSON
    Stats,
}

#[derive(clap::Args)]
struct RankArgs {
    /// Per-iteration floor every page receives
    #[arg(long, default_value_t = RankConfig::default().damping)]
    damping: f64,
    /// Iteration cap for the link-rank fixed point
    #[arg(long, default_value_t = RankConfig::default().max_iter)]
    max_iter: usize,
}

impl From<RankArgs> for RankConfig {
    fn from(args: RankArgs) -> Self {
        RankConfig { damping: args.damping, max_iter: args.max_iter }
    }
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))).init();
    let cli = Cli::parse();
    let mut store = Store::open(&cli.db)?;

    match cli.command {
        Commands::Build { rank } => {
            let stats = rebuild_index(&mut store, &StopwordChunker::default())?;
            let ranks = rank_pages(&mut store, &rank.into())?;
            tracing::info!(db = %cli.db, rows = stats.rows_written, ranked = ranks.len(), "build complete");
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::Rank { rank } => {
            let ranks = rank_pages(&mut store, &rank.into())?;
            tracing::info!(db = %cli.db, ranked = ranks.len(), "ranks recomputed");
        }
        Commands::Stats => {
            let stats = json!({
                "pages": store.page_count()?,
                "edges": store.edges()?.len(),
                "keywords": store.keywords()?.len(),
                "body_rows": store.inverted_rows(Field::Body)?.len(),
                "title_rows": store.inverted_rows(Field::Title)?.len(),
                "ranked_pages": store.page_ranks()?.len(),
            });
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }
    Ok(())
}
