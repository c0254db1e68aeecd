use std::path::Path;

use crate::audio::decode::decode_file;
use crate::audio::resample::resample_mono;
use crate::config::TARGET_SAMPLE_RATE;
use crate::error::SabiResult;

/// A mono, peak-normalized signal at the canonical sample rate, plus its
/// derived duration.
#[derive(Debug, Clone)]
pub struct PreprocessedAudio {
    pub signal: Vec<f32>,
    pub sample_rate: u32,
    pub duration_secs: f64,
}

impl PreprocessedAudio {
    fn new(signal: Vec<f32>, sample_rate: u32) -> Self {
        let duration_secs = signal.len() as f64 / sample_rate as f64;
        Self {
            signal,
            sample_rate,
            duration_secs,
        }
    }
}

/// Average interleaved multi-channel samples down to mono. A single-channel
/// buffer passes through unchanged.
pub fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Peak-normalize so the maximum absolute sample is 1. Silent input (max
/// magnitude 0) is left unchanged.
pub fn normalize(signal: &[f32]) -> Vec<f32> {
    let peak = signal.iter().fold(0.0f32, |acc, &s| acc.max(s.abs()));
    if peak == 0.0 {
        return signal.to_vec();
    }
    signal.iter().map(|&s| s / peak).collect()
}

/// Decode, downmix, resample and normalize a file into canonical-rate audio.
pub fn preprocess_file<P: AsRef<Path>>(path: P) -> SabiResult<PreprocessedAudio> {
    let decoded = decode_file(path)?;
    let mono = downmix(&decoded.interleaved, decoded.channels);
    let resampled = resample_mono(&mono, decoded.sample_rate, TARGET_SAMPLE_RATE)?;
    let normalized = normalize(&resampled);
    Ok(PreprocessedAudio::new(normalized, TARGET_SAMPLE_RATE))
}

/// Downmix, resample and normalize an already-decoded mono-or-interleaved
/// float buffer. Used by the streaming session, which hands over PCM
/// decoded straight from the wire, and by tests that synthesize signals
/// directly.
pub fn preprocess_pcm(
    interleaved: &[f32],
    channels: usize,
    source_rate: u32,
) -> SabiResult<PreprocessedAudio> {
    let mono = downmix(interleaved, channels);
    let resampled = resample_mono(&mono, source_rate, TARGET_SAMPLE_RATE)?;
    let normalized = normalize(&resampled);
    Ok(PreprocessedAudio::new(normalized, TARGET_SAMPLE_RATE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_scales_to_unit_peak() {
        let signal = vec![0.0, 0.5, -2.0, 1.0];
        let normalized = normalize(&signal);
        let peak = normalized.iter().fold(0.0f32, |a, &b| a.max(b.abs()));
        assert!((peak - 1.0).abs() < 1e-6);
    }

    #[test]
    fn normalize_leaves_silence_unchanged() {
        let signal = vec![0.0; 100];
        let normalized = normalize(&signal);
        assert!(normalized.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn downmix_averages_stereo_frames() {
        let interleaved = vec![1.0, -1.0, 0.5, 0.5];
        let mono = downmix(&interleaved, 2);
        assert_eq!(mono, vec![0.0, 0.5]);
    }

    #[test]
    fn downmix_passes_through_mono() {
        let mono_in = vec![0.1, 0.2, 0.3];
        assert_eq!(downmix(&mono_in, 1), mono_in);
    }

    #[test]
    fn preprocess_pcm_resamples_to_canonical_rate() {
        let signal: Vec<f32> = (0..4410).map(|i| (i as f32 * 0.01).sin()).collect();
        let out = preprocess_pcm(&signal, 1, 44100).unwrap();
        assert_eq!(out.sample_rate, TARGET_SAMPLE_RATE);
        assert!(out.signal.len() < signal.len());
    }
}
