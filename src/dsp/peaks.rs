use crate::dsp::spectrogram::Spectrogram;

/// A spectral peak at a given time frame and frequency bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Peak {
    pub time_frame: usize,
    pub freq_bin: usize,
}

/// Clamped-border 1D box filter (running mean), used as one pass of the
/// separable 2D uniform filter. `radius` is half the neighborhood size
/// rounded down; out-of-range reads clamp to the nearest edge index, which
/// is the boundary policy shared by indexing and query-time peak picking.
fn box_filter_1d(input: &[f32], radius: usize) -> Vec<f32> {
    let len = input.len();
    if len == 0 {
        return Vec::new();
    }
    let window = 2 * radius + 1;
    (0..len)
        .map(|i| {
            let lo = i.saturating_sub(radius);
            let hi = (i + radius).min(len - 1);
            let sum: f32 = input[lo..=hi].iter().sum();
            // clamp-to-edge padding contributes the same value repeatedly,
            // so divide by the full window width, not the truncated slice.
            let missing_lo = radius.saturating_sub(i);
            let missing_hi = radius.saturating_sub(len - 1 - i);
            let padded_sum = sum + input[lo] * missing_lo as f32 + input[hi] * missing_hi as f32;
            padded_sum / window as f32
        })
        .collect()
}

/// Clamped-border 1D max filter (grey dilation with a flat rectangular
/// structuring element), the other separable pass.
fn max_filter_1d(input: &[f32], radius: usize) -> Vec<f32> {
    let len = input.len();
    if len == 0 {
        return Vec::new();
    }
    (0..len)
        .map(|i| {
            let lo = i.saturating_sub(radius);
            let hi = (i + radius).min(len - 1);
            input[lo..=hi].iter().cloned().fold(f32::MIN, f32::max)
        })
        .collect()
}

/// Apply a separable 1D filter across the frequency axis (columns) then the
/// time axis (rows) of the spectrogram.
fn separable_filter(
    spec: &Spectrogram,
    freq_radius: usize,
    time_radius: usize,
    filter_1d: impl Fn(&[f32], usize) -> Vec<f32>,
) -> Vec<f32> {
    let (bins, frames) = (spec.freq_bins, spec.frames);
    if bins == 0 || frames == 0 {
        return Vec::new();
    }

    // Pass 1: filter along frequency bins within each frame.
    let mut stage = vec![0.0f32; bins * frames];
    for frame in 0..frames {
        let column: Vec<f32> = (0..bins).map(|bin| spec.get(bin, frame)).collect();
        let filtered = filter_1d(&column, freq_radius);
        for (bin, &v) in filtered.iter().enumerate() {
            stage[frame * bins + bin] = v;
        }
    }

    // Pass 2: filter along time frames for each frequency bin.
    let mut out = vec![0.0f32; bins * frames];
    for bin in 0..bins {
        let row: Vec<f32> = (0..frames).map(|frame| stage[frame * bins + bin]).collect();
        let filtered = filter_1d(&row, time_radius);
        for (frame, &v) in filtered.iter().enumerate() {
            out[frame * bins + bin] = v;
        }
    }

    out
}

/// Pick adaptive local-max spectral peaks, capped per frame.
///
/// `neighborhood` is `(freq_bins, time_frames)`; `sensitivity` is the
/// local-mean multiplier a cell's value must exceed; `max_per_frame` caps
/// the surviving peaks kept per time frame, breaking ties by lower
/// frequency bin. Output is sorted lexicographically by `(time_frame,
/// freq_bin)`.
pub fn pick_peaks(
    spec: &Spectrogram,
    neighborhood: (usize, usize),
    sensitivity: f32,
    max_per_frame: usize,
) -> Vec<Peak> {
    let (bins, frames) = (spec.freq_bins, spec.frames);
    if bins == 0 || frames == 0 {
        return Vec::new();
    }

    let freq_radius = neighborhood.0 / 2;
    let time_radius = neighborhood.1 / 2;

    let local_mean = separable_filter(spec, freq_radius, time_radius, box_filter_1d);
    let dilated = separable_filter(spec, freq_radius, time_radius, max_filter_1d);

    let mut per_frame: Vec<Vec<(usize, f32)>> = vec![Vec::new(); frames];

    for frame in 0..frames {
        for bin in 0..bins {
            let idx = frame * bins + bin;
            let value = spec.get(bin, frame);
            let above_threshold = value > sensitivity * local_mean[idx];
            let is_local_max = value == dilated[idx];
            if above_threshold && is_local_max {
                per_frame[frame].push((bin, value));
            }
        }
    }

    let mut peaks = Vec::new();
    for (frame, mut candidates) in per_frame.into_iter().enumerate() {
        candidates.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        candidates.truncate(max_per_frame);
        for (bin, _) in candidates {
            peaks.push(Peak {
                time_frame: frame,
                freq_bin: bin,
            });
        }
    }

    peaks.sort();
    peaks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::spectrogram;
    use crate::config::{HOP_SIZE, WINDOW_SIZE};

    #[test]
    fn silent_signal_yields_no_peaks() {
        let signal = vec![0.0f32; WINDOW_SIZE * 4];
        let spec = spectrogram::compute(&signal, WINDOW_SIZE, HOP_SIZE);
        let peaks = pick_peaks(&spec, (25, 25), 2.0, 8);
        assert!(peaks.is_empty());
    }

    #[test]
    fn peaks_respect_per_frame_cap() {
        let n = WINDOW_SIZE + HOP_SIZE * 20;
        let signal: Vec<f32> = (0..n)
            .map(|i| {
                (0.3 * (i as f32 * 0.9).sin()
                    + 0.3 * (i as f32 * 0.3).sin()
                    + 0.3 * (i as f32 * 1.7).sin())
            })
            .collect();
        let spec = spectrogram::compute(&signal, WINDOW_SIZE, HOP_SIZE);
        let peaks = pick_peaks(&spec, (25, 25), 1.2, 4);

        let mut counts = std::collections::HashMap::new();
        for p in &peaks {
            *counts.entry(p.time_frame).or_insert(0) += 1;
        }
        assert!(counts.values().all(|&c| c <= 4));
    }

    #[test]
    fn output_is_lexicographically_sorted() {
        let n = WINDOW_SIZE + HOP_SIZE * 20;
        let signal: Vec<f32> = (0..n).map(|i| (i as f32 * 0.7).sin()).collect();
        let spec = spectrogram::compute(&signal, WINDOW_SIZE, HOP_SIZE);
        let peaks = pick_peaks(&spec, (25, 25), 1.5, 8);
        let mut sorted = peaks.clone();
        sorted.sort();
        assert_eq!(peaks, sorted);
    }
}
