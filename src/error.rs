use thiserror::Error;

/// Every failure mode the core can produce, one variant per error kind named
/// in the error handling design.
#[derive(Debug, Error)]
pub enum SabiError {
    #[error("could not decode audio file: {0}")]
    DecodeError(String),

    #[error("unsupported sample format: {0}")]
    UnsupportedFormat(String),

    #[error("file exceeds max duration ({actual}s > {max}s)")]
    TooLong { actual: f64, max: f64 },

    #[error("song already indexed: {title} / {artist:?} / {album:?}")]
    DuplicateSong {
        title: String,
        artist: Option<String>,
        album: Option<String>,
    },

    #[error("index store error: {0}")]
    StorageError(String),

    #[error("malformed streaming protocol frame: {0}")]
    ProtocolError(String),

    #[error("session wall-clock budget exhausted")]
    Timeout,
}

pub type SabiResult<T> = Result<T, SabiError>;

impl From<diesel::result::Error> for SabiError {
    fn from(e: diesel::result::Error) -> Self {
        SabiError::StorageError(e.to_string())
    }
}

impl From<diesel::ConnectionError> for SabiError {
    fn from(e: diesel::ConnectionError) -> Self {
        SabiError::StorageError(e.to_string())
    }
}
