//! Band-limited resampling to the canonical rate.
//!
//! Generalizes the teacher's `resample_linear` (plain linear interpolation)
//! into a windowed-sinc resampler so the passband/stopband requirement in
//! the preprocessor contract is actually met, rather than merely
//! approximated.

use rubato::{Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction};

use crate::error::{SabiError, SabiResult};

fn sinc_params() -> SincInterpolationParameters {
    SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    }
}

/// Resample a single mono buffer from `from_rate` to `to_rate`. A no-op copy
/// when the rates already match.
pub fn resample_mono(samples: &[f32], from_rate: u32, to_rate: u32) -> SabiResult<Vec<f32>> {
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, sinc_params(), samples.len(), 1)
        .map_err(|e| SabiError::DecodeError(format!("resampler init failed: {e}")))?;

    let waves_in = vec![samples.to_vec()];
    let mut waves_out = resampler
        .process(&waves_in, None)
        .map_err(|e| SabiError::DecodeError(format!("resampling failed: {e}")))?;

    Ok(waves_out.remove(0))
}
