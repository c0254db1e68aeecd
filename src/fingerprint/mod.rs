//! Combinatorial peak pairing and 32-bit hash packing.
//!
//! A fingerprint is logically a pair of peaks (anchor, target); physically
//! it's encoded as `(hash, anchor_time_ms)`, where `hash` packs the anchor
//! frequency bin, target frequency bin, and the frame delta between them
//! into a single lossy 32-bit word. Collisions are resolved downstream by
//! histogram voting, not here.

use crate::config;
use crate::dsp::Peak;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint {
    pub hash: u32,
    pub anchor_time_ms: u64,
}

/// Pack an anchor frequency bin, target frequency bin, and frame delta into
/// a 32-bit word: bins masked to 10 bits, delta masked to 11 bits.
pub fn pack(anchor_freq_bin: u32, target_freq_bin: u32, frame_delta: u32) -> u32 {
    ((anchor_freq_bin & 0x3FF) << 21) | ((target_freq_bin & 0x3FF) << 11) | (frame_delta & 0x7FF)
}

/// Inverse of `pack`. Lossy: only the masked low bits of the original
/// inputs are recoverable.
pub fn unpack(hash: u32) -> (u32, u32, u32) {
    let anchor_freq_bin = (hash >> 21) & 0x3FF;
    let target_freq_bin = (hash >> 11) & 0x3FF;
    let frame_delta = hash & 0x7FF;
    (anchor_freq_bin, target_freq_bin, frame_delta)
}

/// Pair each peak (the anchor) with up to `FANOUT` of its immediate
/// successors in sorted order (the targets), emitting a fingerprint for
/// every pair whose frame delta falls in `[MIN_FRAME_DELTA,
/// max_frame_delta()]`. `peaks` must already be sorted by `(time_frame,
/// freq_bin)`, as `dsp::pick_peaks` guarantees.
pub fn build_fingerprints(peaks: &[Peak], hop_size: usize, sample_rate: u32) -> Vec<Fingerprint> {
    let min_delta = config::MIN_FRAME_DELTA;
    let max_delta = config::max_frame_delta();
    let mut fingerprints = Vec::new();

    for (i, anchor) in peaks.iter().enumerate() {
        let anchor_time_ms =
            (anchor.time_frame as u64 * hop_size as u64 * 1000) / sample_rate as u64;

        for target in peaks.iter().skip(i + 1).take(config::FANOUT) {
            let delta_t = target.time_frame as i64 - anchor.time_frame as i64;
            if delta_t < min_delta as i64 || delta_t > max_delta as i64 {
                continue;
            }

            let hash = pack(anchor.freq_bin as u32, target.freq_bin as u32, delta_t as u32);
            fingerprints.push(Fingerprint {
                hash,
                anchor_time_ms,
            });
        }
    }

    fingerprints
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_unpack_round_trips_within_mask() {
        let (f1, f2, dt) = (500, 300, 40);
        let hash = pack(f1, f2, dt);
        assert_eq!(unpack(hash), (f1 % 1024, f2 % 1024, dt % 2048));
    }

    #[test]
    fn pack_masks_out_of_range_inputs() {
        let hash = pack(2000, 2000, 5000);
        let (f1, f2, dt) = unpack(hash);
        assert_eq!(f1, 2000 % 1024);
        assert_eq!(f2, 2000 % 1024);
        assert_eq!(dt, 5000 % 2048);
    }

    #[test]
    fn fingerprints_respect_frame_delta_bounds() {
        let peaks = vec![
            Peak { time_frame: 0, freq_bin: 10 },
            Peak { time_frame: 1, freq_bin: 20 },
            Peak { time_frame: 5, freq_bin: 30 },
            Peak { time_frame: 1000, freq_bin: 40 },
        ];
        let fps = build_fingerprints(&peaks, config::HOP_SIZE, config::TARGET_SAMPLE_RATE);

        let max_delta = config::max_frame_delta();
        for fp in &fps {
            let (_, _, dt) = unpack(fp.hash);
            assert!(dt as i64 <= max_delta);
        }
        // the far-away peak at frame 1000 cannot pair with anything as anchor
        // or target within 1500ms at this hop/rate.
        assert!(fps.len() < peaks.len() * config::FANOUT);
    }

    #[test]
    fn fewer_than_fanout_targets_only_when_exhausted() {
        let peaks = vec![
            Peak { time_frame: 0, freq_bin: 1 },
            Peak { time_frame: 1, freq_bin: 2 },
        ];
        let fps = build_fingerprints(&peaks, config::HOP_SIZE, config::TARGET_SAMPLE_RATE);
        // one anchor (peaks[0]) has exactly one possible target.
        assert_eq!(fps.len(), 1);
    }

    #[test]
    fn anchor_time_ms_is_nonnegative_and_monotonic_with_frame() {
        let peaks = vec![
            Peak { time_frame: 0, freq_bin: 1 },
            Peak { time_frame: 2, freq_bin: 2 },
        ];
        let fps = build_fingerprints(&peaks, config::HOP_SIZE, config::TARGET_SAMPLE_RATE);
        assert_eq!(fps[0].anchor_time_ms, 0);
    }
}
