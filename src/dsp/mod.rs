pub mod complex;
pub mod fft;
pub mod peaks;
pub mod spectrogram;

pub use peaks::{pick_peaks, Peak};
pub use spectrogram::{compute as compute_spectrogram, Spectrogram};
