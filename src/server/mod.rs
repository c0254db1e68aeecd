//! Axum-based service surface: the streaming `/identify_song` WebSocket, a
//! one-shot HTTP identification route, and the supplemental album-art route.

pub mod protocol;
pub mod routes;
pub mod session_handler;

use std::sync::Arc;

use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;

#[derive(Clone)]
pub struct AppState {
    pub database_url: Arc<String>,
}

impl AppState {
    pub fn new(database_url: String) -> Self {
        Self {
            database_url: Arc::new(database_url),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/identify_song", get(identify_song_ws))
        .route("/identify", post(routes::identify_one_shot))
        .route("/get_albumart", get(routes::get_albumart))
        .with_state(state)
}

async fn identify_song_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| session_handler::handle_socket(socket, state.database_url))
}
