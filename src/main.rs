use std::sync::Arc;

mod api;
mod check_engine;
mod config;
mod cooldown;
mod error;
mod history;
mod notifier;
mod registry;
mod steam;
mod store;
mod types;

use check_engine::CheckEngine;
use cooldown::CooldownTracker;
use history::HistoryStore;
use registry::ItemRegistry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging (print debug messages)
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = config::Config::from_env()?;

    tracing::info!("🚀 Starting steamwatch...");

    tracing::info!("💾 Connecting to Redis...");
    let store: Arc<dyn store::Store> = Arc::new(store::RedisStore::connect(&config.redis_url).await?);

    let source: Arc<dyn steam::PriceSource> = Arc::new(steam::SteamClient::new(&config.steam)?);
    let notifier: Arc<dyn notifier::Notifier> = Arc::new(notifier::ResendNotifier::new(&config.alert)?);

    let registry = ItemRegistry::new(store.clone());
    let history = HistoryStore::new(store.clone(), config.history.retention_seconds());
    let cooldown = CooldownTracker::new(store.clone(), config.alert.cooldown_seconds);
    let engine = CheckEngine::new(
        registry.clone(),
        history.clone(),
        cooldown.clone(),
        source.clone(),
        notifier,
    );

    let state = api::AppState {
        registry,
        history,
        cooldown,
        source,
        engine,
        store,
    };
    let app = api::create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("🌐 Server running on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
