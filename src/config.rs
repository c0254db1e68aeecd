//! Global constants baked into the index. Changing any of these invalidates
//! every posting already written to the store — see `fingerprint::hash`.

/// Canonical sample rate every song and query is resampled to, in Hz.
pub const TARGET_SAMPLE_RATE: u32 = 11_025;

/// STFT window size in samples.
pub const WINDOW_SIZE: usize = 2048;

/// STFT hop size in samples.
pub const HOP_SIZE: usize = 512;

/// Peak picker neighborhood, (frequency bins, time frames).
pub const NEIGHBORHOOD: (usize, usize) = (25, 25);

/// Peak picker local-mean sensitivity multiplier.
pub const PEAK_SENSITIVITY: f32 = 2.0;

/// Maximum peaks kept per time frame after thresholding.
pub const MAX_PEAKS_PER_FRAME: usize = 8;

/// Maximum anchor-target pairs emitted per anchor peak.
pub const FANOUT: usize = 8;

/// Minimum inclusive frame delta between anchor and target.
pub const MIN_FRAME_DELTA: i32 = 0;

/// Maximum inclusive frame delta between anchor and target, corresponding to
/// 1500ms at the canonical rate and hop size.
pub fn max_frame_delta() -> i32 {
    ((1500.0 / 1000.0) * TARGET_SAMPLE_RATE as f32 / HOP_SIZE as f32) as i32
}

/// Histogram bin width used by the matcher's offset-voting step, in
/// milliseconds. Absorbs timing jitter from framing/resampling without
/// smearing a true match across neighboring bins.
pub const VOTE_BIN_SIZE_MS: i64 = 3;

/// Default result cap for one-shot and streaming matches.
pub const DEFAULT_TOP_N: usize = 5;

/// Default streaming chunk window, in milliseconds.
pub const DEFAULT_CHUNK_TIME_MS: u64 = 1000;

/// Default streaming stride (step between successive overlapping chunks).
pub const DEFAULT_STRIDE_MS: u64 = 300;

/// Wall-clock budget for a streaming session before it times out.
pub const SESSION_TIMEOUT_SECS: u64 = 20;

/// Verdict thresholds (see `matching::session::check_verdict`).
pub const VERDICT_SCORE_HIGH: i64 = 30;
pub const VERDICT_SCORE_LOW: i64 = 20;
pub const VERDICT_SCORE_GAP: i64 = 10;

/// Audio file extensions the indexer walker recognizes, lowercase.
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "m4a", "flac", "ogg", "wav"];

/// Default worker count for the batch indexer.
pub const DEFAULT_INDEX_WORKERS: usize = 4;
