use serde::{Deserialize, Serialize};

use crate::store::Song;

/// Wire shape of the verdict sent at the end of a streaming or one-shot
/// identification, per the external interface's JSON contract.
#[derive(Debug, Serialize)]
#[serde(tag = "result")]
pub enum VerdictJson {
    #[serde(rename = "success")]
    Success {
        id: i32,
        title: String,
        artist: String,
        album: String,
    },
    #[serde(rename = "failure")]
    Failure { reason: String },
}

impl VerdictJson {
    pub fn success(song: &Song) -> Self {
        VerdictJson::Success {
            id: song.id,
            title: song.title.clone(),
            artist: song.artist_name.clone().unwrap_or_default(),
            album: song.album_name.clone().unwrap_or_default(),
        }
    }

    pub fn timeout() -> Self {
        VerdictJson::Failure {
            reason: "timeout".to_string(),
        }
    }

    /// Scores were collected but never cleared the verdict thresholds.
    pub fn no_match() -> Self {
        VerdictJson::Failure {
            reason: "no_match".to_string(),
        }
    }

    /// A malformed or unrecognized frame on the streaming interface.
    pub fn protocol_error() -> Self {
        VerdictJson::Failure {
            reason: "protocol_error".to_string(),
        }
    }
}

/// Query parameters for the one-shot identification route.
#[derive(Debug, Deserialize)]
pub struct OneShotParams {
    pub sample_rate: u32,
    pub sample_type: String,
}

#[derive(Debug, Deserialize)]
pub struct AlbumArtQuery {
    pub song_id: i32,
}
