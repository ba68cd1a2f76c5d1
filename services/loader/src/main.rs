//! Loader Service - Loads transformed CSVs into the analytical store
//!
//! Responsibilities:
//! - Build reference caches (one full read per referential)
//! - Resolve election-territory links, creating them lazily
//! - Repair repairable participation tallies, skip the rest with a reason
//! - Insert facts in fixed-size transactional batches
//! - Print a per-stage load report

use anyhow::{Context, Result};
use clap::Parser;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing_subscriber::EnvFilter;

use loader::config::{LoadConfig, DEFAULT_BATCH_SIZE};
use loader::pipeline::{self, Pipeline, Stage};

#[derive(Parser, Debug)]
#[command(name = "loader", about = "Loads transformed electoral CSVs into the store")]
struct Args {
    /// Directory holding the transformed CSVs
    #[arg(long, default_value = "data/processed")]
    data_dir: String,

    /// Rows per transaction
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Run a single stage instead of the whole pipeline
    #[arg(long, value_enum)]
    stage: Option<Stage>,

    /// Validate input files only - don't touch the database
    #[arg(long, default_value = "false")]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let config = LoadConfig::new(&args.data_dir, args.batch_size);

    println!("=== Electio Loader ===");
    println!("Data dir: {}", args.data_dir);
    println!("Batch size: {}", config.batch_size);
    println!("Mode: {}", if args.dry_run { "dry-run" } else { "live" });

    if args.dry_run {
        pipeline::preflight(&config)?;
        println!("All input files valid.");
        return Ok(());
    }

    let db_url =
        std::env::var("DB_URL").unwrap_or_else(|_| "sqlite://electio.db".to_string());

    // The loader is the single writer; one connection keeps batch
    // transactions strictly serialized.
    let options: SqliteConnectOptions = db_url
        .parse::<SqliteConnectOptions>()
        .context("Invalid DB_URL")?
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .context("Failed to connect to database")?;

    let report = Pipeline::new(pool, config).run(args.stage).await;
    println!("{report}");

    if !report.is_success() {
        std::process::exit(1);
    }
    Ok(())
}
