use std::env;
use std::path::PathBuf;

use clap::Parser;
use sabi::indexing::{self, IndexConfig};
use sabi::store::IndexStore;

/// Walk a directory of audio files and fingerprint everything recognized
/// into the index store.
#[derive(Parser)]
#[command(name = "sabi-index")]
struct Cli {
    /// Directory to walk for audio files.
    directory: PathBuf,

    /// Skip files longer than this many seconds.
    #[arg(long)]
    max_duration: Option<f64>,

    /// Number of worker threads.
    #[arg(long, default_value_t = sabi::config::DEFAULT_INDEX_WORKERS)]
    workers: usize,

    /// Render a per-file outcome table after indexing completes.
    #[arg(long)]
    print_table: bool,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    IndexStore::connect(&database_url)?.create_schema()?;

    let config = IndexConfig {
        max_duration_secs: cli.max_duration,
        workers: cli.workers,
    };

    let reports = indexing::index_directory(&cli.directory, &database_url, &config);

    if cli.print_table {
        indexing::print_table(&reports);
    }

    let summary = indexing::summarize(&reports);
    println!(
        "indexed={} duplicates={} failed={}",
        summary.indexed, summary.duplicates, summary.failed
    );

    Ok(())
}
