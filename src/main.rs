use std::env;

use sabi::server::{build_router, AppState};
use sabi::store::IndexStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

    {
        let database_url = database_url.clone();
        tokio::task::spawn_blocking(move || IndexStore::connect(&database_url)?.create_schema())
            .await??;
    }

    let state = AppState::new(database_url);
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    log::info!("sabi listening on {}", bind_addr);
    axum::serve(listener, router).await?;

    Ok(())
}
