use std::sync::Arc;
use std::time::Instant;

use axum::extract::ws::{Message, WebSocket};
use log::{info, warn};

use crate::audio::SampleEncoding;
use crate::config::SESSION_TIMEOUT_SECS;
use crate::error::SabiError;
use crate::matching::{one_shot_match, SessionConfig, StreamingSession, Verdict};
use crate::store::IndexStore;

use super::protocol::VerdictJson;

/// Drives one `/identify_song` connection end to end: reads the two header
/// frames, then alternates receiving PCM frames and running the matching
/// pipeline until a verdict lands or the client disconnects.
pub async fn handle_socket(mut socket: WebSocket, database_url: Arc<String>) {
    let in_sample_rate = match recv_text(&mut socket).await {
        Some(text) => match text.trim().parse::<u32>() {
            Ok(rate) => rate,
            Err(_) => {
                let e = SabiError::ProtocolError(format!("malformed sample rate frame {:?}", text));
                warn!("identify_song: {}", e);
                send_json(&mut socket, &VerdictJson::protocol_error()).await;
                return;
            }
        },
        None => {
            warn!("identify_song: connection closed before sending a sample rate frame");
            send_json(&mut socket, &VerdictJson::protocol_error()).await;
            return;
        }
    };

    let encoding = match recv_text(&mut socket).await {
        Some(text) => match SampleEncoding::parse(text.trim()) {
            Ok(encoding) => encoding,
            Err(e) => {
                let e = SabiError::ProtocolError(e.to_string());
                warn!("identify_song: {}", e);
                send_json(&mut socket, &VerdictJson::protocol_error()).await;
                return;
            }
        },
        None => {
            warn!("identify_song: connection closed before sending a sample type frame");
            send_json(&mut socket, &VerdictJson::protocol_error()).await;
            return;
        }
    };

    let mut session = StreamingSession::new(SessionConfig::new(in_sample_rate, encoding));

    let mut store = {
        let database_url = Arc::clone(&database_url);
        match tokio::task::spawn_blocking(move || IndexStore::connect(&database_url)).await {
            Ok(Ok(store)) => store,
            _ => {
                warn!("identify_song: could not open a store connection");
                send_json(&mut socket, &VerdictJson::timeout()).await;
                return;
            }
        }
    };

    let started = Instant::now();
    info!("identify_song session opened (sample_rate={})", in_sample_rate);

    while let Some(Ok(message)) = socket.recv().await {
        let data = match message {
            Message::Binary(data) => data.to_vec(),
            Message::Close(_) => break,
            _ => continue,
        };

        if started.elapsed().as_secs() >= SESSION_TIMEOUT_SECS {
            session.force_timeout();
        } else {
            let (returned_session, returned_store, result) =
                tokio::task::spawn_blocking(move || {
                    let result = session.push_bytes(&data, |audio, top_n| {
                        one_shot_match(&mut store, audio, top_n)
                    });
                    (session, store, result)
                })
                .await
                .expect("matching worker panicked");

            session = returned_session;
            store = returned_store;
            if let Err(e) = result {
                warn!("identify_song: chunk processing failed: {}", e);
            }
        }

        match session.verdict() {
            Verdict::Pending => continue,
            Verdict::Found(song_id) => {
                let (returned_store, song) = tokio::task::spawn_blocking(move || {
                    let song = store.lookup_song(song_id);
                    (store, song)
                })
                .await
                .expect("lookup worker panicked");
                store = returned_store;

                let payload = match song {
                    Ok(Some(song)) => VerdictJson::success(&song),
                    Ok(None) => {
                        warn!("identify_song: verdict named unknown song_id {}", song_id);
                        VerdictJson::timeout()
                    }
                    Err(e) => {
                        warn!("identify_song: song lookup failed: {}", e);
                        VerdictJson::timeout()
                    }
                };
                send_json(&mut socket, &payload).await;
                break;
            }
            Verdict::TimedOut => {
                warn!("identify_song: {}", SabiError::Timeout);
                send_json(&mut socket, &VerdictJson::timeout()).await;
                break;
            }
        }
    }

    if session.verdict() == Verdict::Pending {
        info!("identify_song: client disconnected before a verdict");
    }
}

async fn send_json(socket: &mut WebSocket, payload: &VerdictJson) {
    if let Ok(text) = serde_json::to_string(payload) {
        let _ = socket.send(Message::Text(text.into())).await;
    }
    let _ = socket.send(Message::Close(None)).await;
}

async fn recv_text(socket: &mut WebSocket) -> Option<String> {
    match socket.recv().await? {
        Ok(Message::Text(text)) => Some(text.to_string()),
        _ => None,
    }
}
