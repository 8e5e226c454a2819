//! sift: consolidate extracted conversation insights via an LLM oracle.
//! Reads extraction documents, merges duplicates until stable, writes one
//! consolidated cluster file for the next pipeline stage.

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use sift::config::Config;
use sift::consolidate::run_consolidation;
use sift::oracle::HttpOracle;
use sift::progress::{ProgressTracker, StatusFile};
use sift::store;

#[derive(Parser)]
#[command(
    name = "sift",
    version,
    about = "Consolidate extracted conversation insights via an LLM"
)]
struct Args {
    /// Items per oracle batch (overrides the config file)
    #[arg(short, long, env = "SIFT_BATCH_SIZE")]
    batch_size: Option<usize>,

    /// Data directory holding extractions/ and receiving consolidated/
    #[arg(short, long, default_value = "data", env = "SIFT_DATA_DIR")]
    data_dir: PathBuf,

    /// Config file path
    #[arg(short, long, default_value = "config.json", env = "SIFT_CONFIG")]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();

    let mut cfg = match Config::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, path = %args.config.display(), "failed to load config");
            std::process::exit(1);
        }
    };
    if let Some(batch_size) = args.batch_size {
        cfg.batch_size = batch_size;
    }
    if let Err(e) = cfg.validate() {
        error!(error = %e, "invalid configuration");
        std::process::exit(1);
    }

    let oracle = match HttpOracle::new(&cfg) {
        Ok(o) => o,
        Err(e) => {
            error!(error = %e, "failed to build oracle client");
            std::process::exit(1);
        }
    };

    let tracker = ProgressTracker::new(Box::new(StatusFile::new(store::status_path(
        &args.data_dir,
    ))));

    info!(
        version = env!("CARGO_PKG_VERSION"),
        provider = ?cfg.api_provider,
        batch_size = cfg.batch_size,
        rpm = cfg.requests_per_minute,
        data_dir = %args.data_dir.display(),
        "sift starting"
    );

    match run_consolidation(&cfg, &oracle, &tracker, &args.data_dir).await {
        Ok(data) => {
            info!(
                ideas = data.idea_clusters.len(),
                problems = data.problem_clusters.len(),
                workflows = data.workflow_clusters.len(),
                elapsed_s = format!("{:.1}", tracker.elapsed_seconds()),
                "consolidation complete"
            );
        }
        Err(e) => {
            error!(error = %e, "consolidation failed");
            std::process::exit(1);
        }
    }
}
