pub mod decode;
pub mod preprocess;
pub mod resample;

pub use decode::{SampleEncoding, SongTags};
pub use preprocess::{preprocess_file, preprocess_pcm, PreprocessedAudio};
