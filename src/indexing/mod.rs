//! Batch indexer: walk a directory, fingerprint every recognized audio file,
//! and write the results into the index store with a fixed-size worker pool.

pub mod walker;
pub mod worker;

use std::path::{Path, PathBuf};

use crate::error::SabiError;

pub use walker::walk_audio_files;

#[derive(Debug, Clone, Copy)]
pub struct IndexConfig {
    pub max_duration_secs: Option<f64>,
    pub workers: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            max_duration_secs: None,
            workers: crate::config::DEFAULT_INDEX_WORKERS,
        }
    }
}

#[derive(Debug)]
pub enum IndexOutcome {
    Indexed { song_id: i32, fingerprint_count: usize },
    DuplicateSkipped { song_id: i32 },
    Failed(SabiError),
}

#[derive(Debug)]
pub struct IndexReport {
    pub path: PathBuf,
    pub outcome: IndexOutcome,
}

/// Walk `root` and index every recognized audio file found, using
/// `config.workers` OS threads. A bad file never halts the batch; its
/// failure is captured in its own report.
pub fn index_directory(root: &Path, database_url: &str, config: &IndexConfig) -> Vec<IndexReport> {
    let files = walk_audio_files(root);
    worker::index_directory(files, database_url, config)
}

/// Per-file outcome table for `--print-table`.
pub fn print_table(reports: &[IndexReport]) {
    println!("{:<60} {}", "file", "outcome");
    println!("{}", "-".repeat(80));
    for report in reports {
        let outcome = match &report.outcome {
            IndexOutcome::Indexed { song_id, fingerprint_count } => {
                format!("✅ indexed (song_id={song_id}, fingerprints={fingerprint_count})")
            }
            IndexOutcome::DuplicateSkipped { song_id } => {
                format!("↷ duplicate-skipped (song_id={song_id})")
            }
            IndexOutcome::Failed(e) => format!("❌ failed: {e}"),
        };
        println!("{:<60} {}", report.path.display(), outcome);
    }
}

/// Aggregated success/failure counts the CLI prints regardless of
/// `--print-table`.
#[derive(Debug, Default, Clone, Copy)]
pub struct IndexSummary {
    pub indexed: usize,
    pub duplicates: usize,
    pub failed: usize,
}

pub fn summarize(reports: &[IndexReport]) -> IndexSummary {
    let mut summary = IndexSummary::default();
    for report in reports {
        match &report.outcome {
            IndexOutcome::Indexed { .. } => summary.indexed += 1,
            IndexOutcome::DuplicateSkipped { .. } => summary.duplicates += 1,
            IndexOutcome::Failed(_) => summary.failed += 1,
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summarize_counts_each_outcome_kind() {
        let reports = vec![
            IndexReport {
                path: PathBuf::from("a.mp3"),
                outcome: IndexOutcome::Indexed { song_id: 1, fingerprint_count: 100 },
            },
            IndexReport {
                path: PathBuf::from("b.mp3"),
                outcome: IndexOutcome::DuplicateSkipped { song_id: 1 },
            },
            IndexReport {
                path: PathBuf::from("c.mp3"),
                outcome: IndexOutcome::Failed(SabiError::DecodeError("bad".to_string())),
            },
        ];
        let summary = summarize(&reports);
        assert_eq!(summary.indexed, 1);
        assert_eq!(summary.duplicates, 1);
        assert_eq!(summary.failed, 1);
    }
}
