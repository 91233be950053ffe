//! OpenSASE Marketplace - Self-hosted Marketplace Backend

use anyhow::{Context, Result};
use opensase_marketplace::{
    auth::TokenIssuer,
    http::{cors_layer, router, AppState},
    media::MediaStore,
    publisher::EventPublisher,
    repository::{MemoryStore, PgStore, Repositories},
    services::Services,
    AppConfig,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env().context("loading configuration")?;

    let repos = match &config.database_url {
        Some(url) => {
            let store = PgStore::connect(url, config.database_max_connections).await.context("connecting to database")?;
            store.migrate().await.context("running migrations")?;
            Repositories::postgres(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store; data is lost on exit");
            Repositories::in_memory(Arc::new(MemoryStore::new()))
        }
    };
    let events = EventPublisher::connect(config.nats_url.as_deref()).await;
    let tokens = Arc::new(TokenIssuer::from_config(&config));
    let media = Arc::new(MediaStore::new(&config.media_dir, config.max_upload_bytes));
    tokio::fs::create_dir_all(media.root()).await.context("creating media directory")?;

    let state = AppState { services: Services::new(repos, tokens.clone(), media.clone(), events), tokens, media };
    let app = router(state, cors_layer(config.cors_origin.as_deref()));

    let addr = config.bind_address();
    tracing::info!("🚀 OpenSASE Marketplace listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(&addr).await?, app).await?;
    Ok(())
}
