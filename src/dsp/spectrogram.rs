use crate::dsp::fft::{hann_window, real_fft_power};

const LOG_EPSILON: f32 = 1e-10;

/// A log-scaled power spectrogram shaped `(freq_bins, frames)`.
#[derive(Debug, Clone)]
pub struct Spectrogram {
    pub freq_bins: usize,
    pub frames: usize,
    data: Vec<f32>,
}

impl Spectrogram {
    pub fn get(&self, freq_bin: usize, frame: usize) -> f32 {
        self.data[frame * self.freq_bins + freq_bin]
    }

    fn set(&mut self, freq_bin: usize, frame: usize, value: f32) {
        self.data[frame * self.freq_bins + freq_bin] = value;
    }
}

/// Slide a Hann-windowed FFT across `signal` with the given window/hop size,
/// producing the magnitude-squared, decibel-scaled spectrogram.
///
/// Frame count is `floor((N - W) / H) + 1`, or zero when the signal is
/// shorter than the window.
pub fn compute(signal: &[f32], window_size: usize, hop_size: usize) -> Spectrogram {
    let freq_bins = window_size / 2 + 1;

    if signal.len() < window_size {
        return Spectrogram {
            freq_bins,
            frames: 0,
            data: Vec::new(),
        };
    }

    let frames = (signal.len() - window_size) / hop_size + 1;
    let window = hann_window(window_size);

    let mut spectrogram = Spectrogram {
        freq_bins,
        frames,
        data: vec![0.0; freq_bins * frames],
    };

    for frame in 0..frames {
        let start = frame * hop_size;
        let windowed: Vec<f32> = signal[start..start + window_size]
            .iter()
            .zip(window.iter())
            .map(|(&s, &w)| s * w)
            .collect();

        let power = real_fft_power(&windowed);
        for (bin, &p) in power.iter().enumerate() {
            let db = 10.0 * (p + LOG_EPSILON).log10();
            spectrogram.set(bin, frame, db);
        }
    }

    spectrogram
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HOP_SIZE, WINDOW_SIZE};

    #[test]
    fn short_signal_produces_zero_frames() {
        let signal = vec![0.0f32; WINDOW_SIZE - 1];
        let spec = compute(&signal, WINDOW_SIZE, HOP_SIZE);
        assert_eq!(spec.frames, 0);
    }

    #[test]
    fn frame_count_matches_formula() {
        let n = WINDOW_SIZE + HOP_SIZE * 3;
        let signal = vec![0.1f32; n];
        let spec = compute(&signal, WINDOW_SIZE, HOP_SIZE);
        let expected = (n - WINDOW_SIZE) / HOP_SIZE + 1;
        assert_eq!(spec.frames, expected);
        assert_eq!(spec.freq_bins, WINDOW_SIZE / 2 + 1);
    }

    #[test]
    fn silent_signal_is_finite() {
        let n = WINDOW_SIZE * 3;
        let signal = vec![0.0f32; n];
        let spec = compute(&signal, WINDOW_SIZE, HOP_SIZE);
        for frame in 0..spec.frames {
            for bin in 0..spec.freq_bins {
                assert!(spec.get(bin, frame).is_finite());
            }
        }
    }
}
