use axum::extract::{Multipart, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json};
use log::warn;

use crate::audio::{preprocess_pcm, SampleEncoding};
use crate::config::DEFAULT_TOP_N;
use crate::matching::{one_shot_match, verdict_threshold_met};
use crate::store::IndexStore;

use super::protocol::{AlbumArtQuery, VerdictJson};
use super::AppState;

/// `POST /identify`: the client posts one multipart body with text fields
/// `sample_rate` and `sample_type` plus a binary `audio` field carrying raw
/// PCM in the declared encoding — the same wire shapes the streaming route
/// uses, minus the framing.
pub async fn identify_one_shot(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let mut sample_rate: Option<u32> = None;
    let mut sample_type: Option<String> = None;
    let mut audio_bytes: Option<Vec<u8>> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return bad_request(&format!("malformed multipart body: {}", e)),
        };

        match field.name() {
            Some("sample_rate") => {
                let text = field.text().await.unwrap_or_default();
                sample_rate = text.trim().parse().ok();
            }
            Some("sample_type") => {
                sample_type = field.text().await.ok();
            }
            Some("audio") => {
                audio_bytes = field.bytes().await.ok().map(|b| b.to_vec());
            }
            _ => {}
        }
    }

    let (Some(sample_rate), Some(sample_type), Some(audio_bytes)) =
        (sample_rate, sample_type, audio_bytes)
    else {
        return bad_request("missing sample_rate, sample_type, or audio field");
    };

    let encoding = match SampleEncoding::parse(sample_type.trim()) {
        Ok(encoding) => encoding,
        Err(e) => return bad_request(&e.to_string()),
    };

    let database_url = state.database_url.to_string();
    let result = tokio::task::spawn_blocking(move || {
        let samples = encoding.decode_interleaved(&audio_bytes);
        let audio = preprocess_pcm(&samples, 1, sample_rate)?;
        let mut store = IndexStore::connect(&database_url)?;
        let ranked = one_shot_match(&mut store, &audio, DEFAULT_TOP_N)?;

        let s1 = ranked.first().map(|&(_, s)| s).unwrap_or(0);
        let s2 = ranked.get(1).map(|&(_, s)| s).unwrap_or(0);
        if !verdict_threshold_met(s1, s2) {
            return Ok(None);
        }

        match ranked.first() {
            Some(&(song_id, _)) => Ok(store.lookup_song(song_id)?),
            None => Ok(None),
        }
    })
    .await
    .expect("one-shot matching worker panicked");

    match result {
        Ok(Some(song)) => Json(VerdictJson::success(&song)).into_response(),
        Ok(None) => Json(VerdictJson::no_match()).into_response(),
        Err(e) => {
            warn!("one-shot identify failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

fn bad_request(reason: &str) -> axum::response::Response {
    (StatusCode::BAD_REQUEST, reason.to_string()).into_response()
}

/// `GET /get_albumart?song_id=`: embedded cover art extracted straight off
/// the indexed file. 404 on an unknown song or one with no embedded image.
pub async fn get_albumart(
    State(state): State<AppState>,
    Query(params): Query<AlbumArtQuery>,
) -> impl IntoResponse {
    let database_url = state.database_url.to_string();
    let result = tokio::task::spawn_blocking(move || {
        let mut store = IndexStore::connect(&database_url)?;
        let song = store.lookup_song(params.song_id)?;
        Ok::<_, crate::error::SabiError>(song)
    })
    .await
    .expect("album art lookup worker panicked");

    let song = match result {
        Ok(Some(song)) => song,
        Ok(None) => return (StatusCode::NOT_FOUND, "unknown song id").into_response(),
        Err(e) => return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    };

    let Some(file_path) = song.file_path else {
        return (StatusCode::NOT_FOUND, "song has no source file on record").into_response();
    };

    match tokio::task::spawn_blocking(move || crate::audio::decode::read_cover_art(&file_path))
        .await
        .expect("cover art read worker panicked")
    {
        Some((mime_type, data)) => {
            ([(header::CONTENT_TYPE, mime_type)], data).into_response()
        }
        None => (StatusCode::NOT_FOUND, "no embedded album art").into_response(),
    }
}
