use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;

use log::warn;

use crate::audio::{preprocess_file, read_tags};
use crate::config;
use crate::dsp::{compute_spectrogram, pick_peaks};
use crate::error::SabiError;
use crate::fingerprint::build_fingerprints;
use crate::store::{IndexStore, SongRecord};

use super::{IndexConfig, IndexOutcome, IndexReport};

/// Shared pull queue each worker drains from. A `Mutex<VecDeque<_>>` is the
/// only state workers touch besides the result channel, matching the "no
/// shared mutable state beyond the two queues" rule.
type JobQueue = Arc<Mutex<VecDeque<PathBuf>>>;

pub fn index_directory(
    files: Vec<PathBuf>,
    database_url: &str,
    config: &IndexConfig,
) -> Vec<IndexReport> {
    let queue: JobQueue = Arc::new(Mutex::new(files.into_iter().collect()));
    let (tx, rx) = mpsc::channel::<IndexReport>();
    let worker_count = config.workers.max(1);

    thread::scope(|scope| {
        for _ in 0..worker_count {
            let queue = Arc::clone(&queue);
            let tx = tx.clone();
            let database_url = database_url.to_string();
            let max_duration = config.max_duration_secs;

            scope.spawn(move || run_worker(queue, tx, &database_url, max_duration));
        }
        drop(tx);

        let mut reports = Vec::new();
        while let Ok(report) = rx.recv() {
            reports.push(report);
        }
        reports
    })
}

/// One worker's lifetime: establish its own connection, then pull paths off
/// the shared queue until it's empty.
fn run_worker(queue: JobQueue, tx: mpsc::Sender<IndexReport>, database_url: &str, max_duration: Option<f64>) {
    let mut store = match IndexStore::connect(database_url) {
        Ok(store) => store,
        Err(e) => {
            warn!("indexing worker failed to connect: {}", e);
            return;
        }
    };

    loop {
        let path = {
            let mut guard = queue.lock().expect("job queue poisoned");
            guard.pop_front()
        };
        let Some(path) = path else { break };

        let outcome = index_one_file(&mut store, &path, max_duration);
        if tx.send(IndexReport { path, outcome }).is_err() {
            break;
        }
    }
}

fn index_one_file(store: &mut IndexStore, path: &Path, max_duration: Option<f64>) -> IndexOutcome {
    // Cheap metadata-only probe ahead of the full decode + resample below, so
    // `--max-duration` actually skips the expensive work instead of merely
    // discarding its result.
    if let Some(max) = max_duration {
        if let Ok(actual) = crate::audio::decode::probe_duration(path) {
            if actual > max {
                return IndexOutcome::Failed(SabiError::TooLong { actual, max });
            }
        }
    }

    let audio = match preprocess_file(path) {
        Ok(audio) => audio,
        Err(e) => return IndexOutcome::Failed(e),
    };

    if let Some(max) = max_duration {
        if audio.duration_secs > max {
            return IndexOutcome::Failed(SabiError::TooLong {
                actual: audio.duration_secs,
                max,
            });
        }
    }

    let tags = read_tags(path);

    match store.find_song_id(&tags.title, tags.artist.as_deref(), tags.album.as_deref()) {
        Ok(Some(song_id)) => {
            let dup = SabiError::DuplicateSong {
                title: tags.title.clone(),
                artist: tags.artist.clone(),
                album: tags.album.clone(),
            };
            warn!("indexing: {}", dup);
            return IndexOutcome::DuplicateSkipped { song_id };
        }
        Ok(None) => {}
        Err(e) => return IndexOutcome::Failed(e),
    }

    let spectrogram = compute_spectrogram(&audio.signal, config::WINDOW_SIZE, config::HOP_SIZE);
    let peaks = pick_peaks(
        &spectrogram,
        config::NEIGHBORHOOD,
        config::PEAK_SENSITIVITY,
        config::MAX_PEAKS_PER_FRAME,
    );
    let fingerprints = build_fingerprints(&peaks, config::HOP_SIZE, audio.sample_rate);

    let song_id = match store.insert_song(&SongRecord {
        title: tags.title,
        artist: tags.artist,
        album: tags.album,
        file_path: Some(path.to_string_lossy().to_string()),
        duration_sec: Some(audio.duration_secs),
        sample_rate: Some(audio.sample_rate),
    }) {
        Ok(id) => id,
        Err(e) => return IndexOutcome::Failed(e),
    };

    let postings = fingerprints
        .into_iter()
        .map(|fp| (fp.hash, fp.anchor_time_ms as i64));
    match store.bulk_insert_fingerprints(song_id, postings) {
        Ok(count) => IndexOutcome::Indexed {
            song_id,
            fingerprint_count: count,
        },
        Err(e) => IndexOutcome::Failed(e),
    }
}
