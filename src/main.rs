mod api;
mod config;
mod engine;
mod error;
mod news;
mod quests;
mod quotes;
mod refresh;
mod seed;
mod state;
mod types;

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::{rngs::SmallRng, SeedableRng};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::api::health::HealthState;
use crate::api::routes::{router, ApiState};
use crate::config::Config;
use crate::engine::EngineState;
use crate::error::Result;
use crate::news::NewsSummarizer;
use crate::quests::QuestLog;
use crate::quotes::QuoteClient;
use crate::refresh::WatchlistRefresher;
use crate::state::WatchlistStore;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Seed the engine so the chart is non-empty on first render ---
    let store = WatchlistStore::new();
    let mut rng = SmallRng::seed_from_u64(rand::random());
    let initial = EngineState::initialize(
        seed::seed_symbols(),
        cfg.tick_interval_secs,
        now_secs(),
        &mut rng,
    );
    info!(
        symbols = initial.symbols.len(),
        history_points = initial.history.len(),
        "Engine seeded: {} symbols, {}-point history",
        initial.symbols.len(),
        initial.history.len(),
    );
    store.install(initial).await;

    // --- Collaborators ---
    let quotes = QuoteClient::from_config(&cfg)?.map(Arc::new);
    match &quotes {
        Some(_) => info!("Live quote refresh enabled against {}", cfg.quote_api_url),
        None => info!("Simulated quote mode (QUOTE_API_KEY not set)"),
    }
    let news = NewsSummarizer::from_config(&cfg)?.map(Arc::new);
    if news.is_none() {
        info!("News summarizer disabled (NEWS_API_KEY not set)");
    }

    // --- Refresh task ---
    let health = Arc::new(HealthState::new());
    let refresher = WatchlistRefresher::spawn(
        cfg.clone(),
        Arc::clone(&store),
        quotes.clone(),
        Arc::clone(&health),
    );

    // --- HTTP API server ---
    let api_state = ApiState {
        store,
        quotes,
        news,
        quests: Arc::new(QuestLog::new()),
        health,
        control_tx: refresher.control_tx(),
    };
    let app = router(api_state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    // Tear down the refresh task so no timer outlives the server.
    refresher.stop().await;

    Ok(())
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
