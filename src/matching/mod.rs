pub mod session;

use std::collections::HashMap;
use std::collections::HashSet;

use crate::audio::PreprocessedAudio;
use crate::config::{self, VERDICT_SCORE_GAP, VERDICT_SCORE_HIGH, VERDICT_SCORE_LOW, VOTE_BIN_SIZE_MS};
use crate::dsp::{pick_peaks, compute_spectrogram};
use crate::error::SabiResult;
use crate::fingerprint::{build_fingerprints, Fingerprint};
use crate::store::{IndexStore, Posting};

pub use session::{SessionConfig, StreamingSession, Verdict};

/// Shared verdict-threshold test used by both the streaming session's
/// `check_verdict` and the one-shot route: given the top two cumulative
/// scores (`s2` is 0 when only one song is present), is the match confident
/// enough to report as a success?
pub fn verdict_threshold_met(s1: i64, s2: i64) -> bool {
    s1 > VERDICT_SCORE_HIGH || (s1 > VERDICT_SCORE_LOW && (s1 - s2) > VERDICT_SCORE_GAP)
}

/// Run the full DSP pipeline (spectrogram -> peaks -> fingerprints) over an
/// already-preprocessed signal.
pub fn fingerprint_query(audio: &PreprocessedAudio) -> Vec<Fingerprint> {
    let spectrogram = compute_spectrogram(&audio.signal, config::WINDOW_SIZE, config::HOP_SIZE);
    let peaks = pick_peaks(
        &spectrogram,
        config::NEIGHBORHOOD,
        config::PEAK_SENSITIVITY,
        config::MAX_PEAKS_PER_FRAME,
    );
    build_fingerprints(&peaks, config::HOP_SIZE, audio.sample_rate)
}

/// Floor division that rounds toward negative infinity, matching the
/// reference implementation's `//` semantics for (possibly negative)
/// offsets.
fn floor_div(a: i64, b: i64) -> i64 {
    let q = a / b;
    let r = a % b;
    if (r != 0) && ((r < 0) != (b < 0)) {
        q - 1
    } else {
        q
    }
}

/// Build `query_time[hash] = anchor_time_ms`. On duplicate hashes within
/// one query, any one time is kept — tolerated by the binning step.
pub fn query_time_map(fingerprints: &[Fingerprint]) -> HashMap<u32, u64> {
    let mut map = HashMap::with_capacity(fingerprints.len());
    for fp in fingerprints {
        map.entry(fp.hash).or_insert(fp.anchor_time_ms);
    }
    map
}

/// Histogram-vote postings against a query's hash->time map. Returns a flat
/// `song_id -> score` map, where score is the tallest column of that
/// song's offset histogram.
pub fn vote(query_time: &HashMap<u32, u64>, postings: &[Posting]) -> HashMap<i32, i64> {
    let mut histogram: HashMap<(i32, i64), i64> = HashMap::new();

    for posting in postings {
        let Some(&q_time) = query_time.get(&posting.hash) else {
            continue;
        };
        let delta = posting.time_offset_ms - q_time as i64;
        let bin = floor_div(delta, VOTE_BIN_SIZE_MS) * VOTE_BIN_SIZE_MS;
        *histogram.entry((posting.song_id, bin)).or_insert(0) += 1;
    }

    let mut scores: HashMap<i32, i64> = HashMap::new();
    for ((song_id, _bin), count) in histogram {
        let entry = scores.entry(song_id).or_insert(0);
        if count > *entry {
            *entry = count;
        }
    }
    scores
}

/// Sort scores descending, breaking ties by smallest song_id, and cap to
/// `top_n`.
pub fn rank(scores: &HashMap<i32, i64>, top_n: usize) -> Vec<(i32, i64)> {
    let mut ranked: Vec<(i32, i64)> = scores.iter().map(|(&id, &score)| (id, score)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.truncate(top_n);
    ranked
}

/// Full one-shot match: fingerprint the clip, look up postings, vote, rank.
pub fn one_shot_match(
    store: &mut IndexStore,
    audio: &PreprocessedAudio,
    top_n: usize,
) -> SabiResult<Vec<(i32, i64)>> {
    let fingerprints = fingerprint_query(audio);
    if fingerprints.is_empty() {
        return Ok(Vec::new());
    }

    let query_time = query_time_map(&fingerprints);
    let hashes: HashSet<u32> = query_time.keys().copied().collect();

    let postings = match store.find_postings(&hashes) {
        Ok(postings) => postings,
        Err(_) => Vec::new(), // storage errors degrade to "no postings this chunk"
    };

    let scores = vote(&query_time, &postings);
    Ok(rank(&scores, top_n))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posting(hash: u32, time_offset_ms: i64, song_id: i32) -> Posting {
        Posting {
            hash,
            time_offset_ms,
            song_id,
        }
    }

    #[test]
    fn exact_alignment_wins_the_histogram() {
        // Query anchors at t=0,3,6 all line up with db times shifted by a
        // constant +1000ms offset: one true peak bin.
        let mut query_time = HashMap::new();
        query_time.insert(1, 0);
        query_time.insert(2, 3);
        query_time.insert(3, 6);

        let postings = vec![
            posting(1, 1000, 42),
            posting(2, 1003, 42),
            posting(3, 1006, 42),
            // noise: unrelated song with scattered offsets
            posting(1, 500, 7),
            posting(2, 9000, 7),
        ];

        let scores = vote(&query_time, &postings);
        assert_eq!(scores.get(&42), Some(&3));
        assert_eq!(scores.get(&7), Some(&1));

        let ranked = rank(&scores, 5);
        assert_eq!(ranked[0], (42, 3));
    }

    #[test]
    fn rank_breaks_ties_by_smallest_song_id() {
        let mut scores = HashMap::new();
        scores.insert(9, 5);
        scores.insert(3, 5);
        scores.insert(1, 5);

        let ranked = rank(&scores, 5);
        assert_eq!(ranked, vec![(1, 5), (3, 5), (9, 5)]);
    }

    #[test]
    fn rank_truncates_to_top_n() {
        let mut scores = HashMap::new();
        for i in 0..10 {
            scores.insert(i, i as i64);
        }
        let ranked = rank(&scores, 3);
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].0, 9);
    }

    #[test]
    fn every_returned_song_appears_in_postings() {
        let mut query_time = HashMap::new();
        query_time.insert(1, 10);
        let postings = vec![posting(1, 20, 5)];
        let scores = vote(&query_time, &postings);
        let ranked = rank(&scores, 5);
        assert!(ranked.iter().all(|(id, _)| *id == 5));
    }

    #[test]
    fn negative_offsets_bin_toward_negative_infinity() {
        assert_eq!(floor_div(-1, 3), -1);
        assert_eq!(floor_div(-3, 3), -1);
        assert_eq!(floor_div(-4, 3), -2);
        assert_eq!(floor_div(4, 3), 1);
    }
}
