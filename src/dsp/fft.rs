use std::f32::consts::PI;
use std::sync::OnceLock;

use crate::dsp::complex::Complex;

/// Recursive radix-2 Cooley-Tukey FFT. The window size used throughout the
/// crate is fixed at a compile-time constant (`config::WINDOW_SIZE`), so a
/// single cached Hann window covers every call site; `hann_window` rebuilds
/// the cache only if it's ever asked for a different size.
static HANN_CACHE: OnceLock<(usize, Vec<f32>)> = OnceLock::new();

fn compute_hann(len: usize) -> Vec<f32> {
    if len <= 1 {
        return vec![1.0; len];
    }
    (0..len)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / (len as f32 - 1.0)).cos()))
        .collect()
}

/// Returns the precomputed Hann window of the given length, building and
/// caching it on first use.
pub fn hann_window(len: usize) -> Vec<f32> {
    if let Some((cached_len, window)) = HANN_CACHE.get() {
        if *cached_len == len {
            return window.clone();
        }
    }
    let window = compute_hann(len);
    let _ = HANN_CACHE.set((len, window.clone()));
    window
}

fn fft_inplace(buf: &mut [Complex]) {
    let n = buf.len();
    if n <= 1 {
        return;
    }
    debug_assert!(n.is_power_of_two(), "FFT size must be a power of two");

    let mut even: Vec<Complex> = Vec::with_capacity(n / 2);
    let mut odd: Vec<Complex> = Vec::with_capacity(n / 2);
    for (i, &sample) in buf.iter().enumerate() {
        if i % 2 == 0 {
            even.push(sample);
        } else {
            odd.push(sample);
        }
    }

    fft_inplace(&mut even);
    fft_inplace(&mut odd);

    for j in 0..n / 2 {
        let theta = 2.0 * PI * j as f32 / n as f32;
        let twiddle = Complex::from_polar(1.0, -theta);
        let t = twiddle * odd[j];
        buf[j] = even[j] + t;
        buf[j + n / 2] = even[j] - t;
    }
}

/// Forward FFT of a real-valued windowed frame, returning the non-redundant
/// `len/2 + 1` power spectrum bins (`|X(f)|^2`).
pub fn real_fft_power(frame: &[f32]) -> Vec<f32> {
    let mut complex: Vec<Complex> = frame.iter().map(|&s| Complex::new(s, 0.0)).collect();
    fft_inplace(&mut complex);
    let bins = frame.len() / 2 + 1;
    complex[..bins].iter().map(|c| c.norm_sqr()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hann_window_has_zero_endpoints() {
        let w = hann_window(8);
        assert_eq!(w.len(), 8);
        assert!(w[0].abs() < 1e-6);
        assert!(w[w.len() - 1].abs() < 1e-6);
    }

    #[test]
    fn fft_of_dc_signal_concentrates_in_bin_zero() {
        let frame = vec![1.0f32; 8];
        let power = real_fft_power(&frame);
        assert!(power[0] > 0.0);
        for &bin in &power[1..] {
            assert!(bin < 1e-6);
        }
    }

    #[test]
    fn fft_detects_pure_tone_bin() {
        let n = 64;
        let k = 4; // bin index of the tone
        let frame: Vec<f32> = (0..n)
            .map(|i| (2.0 * PI * k as f32 * i as f32 / n as f32).sin())
            .collect();
        let power = real_fft_power(&frame);
        let (max_bin, _) = power
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .unwrap();
        assert_eq!(max_bin, k);
    }
}
