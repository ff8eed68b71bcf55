use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use rand::{rngs::SmallRng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::api::health::HealthState;
use crate::api::stream::stream_handler;
use crate::engine::indicators::sma_series;
use crate::error::{AppError, Result};
use crate::news::NewsSummarizer;
use crate::quests::{PlayerProgress, Quest, QuestLog, QuestReward};
use crate::quotes::{validate_ticker, QuoteClient};
use crate::state::WatchlistStore;
use crate::types::{ControlMsg, Indicator, IndicatorKind, ScreenerFilter, TrackedSymbol};

#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<WatchlistStore>,
    pub quotes: Option<Arc<QuoteClient>>,
    pub news: Option<Arc<NewsSummarizer>>,
    pub quests: Arc<QuestLog>,
    pub health: Arc<HealthState>,
    pub control_tx: mpsc::Sender<ControlMsg>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .route("/watchlist", get(get_watchlist).post(add_symbol))
        .route("/watchlist/:ticker", axum::routing::delete(remove_symbol))
        .route("/watchlist/:ticker/news", get(get_news_summary))
        .route("/chart/:ticker", get(get_chart))
        .route("/session", get(get_session))
        .route("/session/indicators", put(put_indicators))
        .route("/session/filters", put(put_filters))
        .route("/session/welcome", post(post_welcome))
        .route("/alerts", post(post_alert))
        .route("/quests", get(get_quests))
        .route("/quests/:id/complete", post(complete_quest))
        .route("/stream", get(stream_handler))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct AddSymbolRequest {
    pub ticker: String,
}

#[derive(Deserialize)]
pub struct AlertRequest {
    pub ticker: String,
    pub price: f64,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub tracked_symbols: usize,
    pub ticks_completed: u64,
    pub last_tick_at_secs: u64,
    pub quote_failures: u64,
    pub alerts_registered: usize,
    pub live_quotes: bool,
}

#[derive(Serialize)]
pub struct ChartPoint {
    pub time: String,
    pub price: f64,
}

#[derive(Serialize)]
pub struct Overlay {
    pub label: String,
    pub values: Vec<Option<f64>>,
}

#[derive(Serialize)]
pub struct ChartResponse {
    pub ticker: String,
    pub points: Vec<ChartPoint>,
    pub overlays: Vec<Overlay>,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub indicators: Vec<Indicator>,
    pub filters: Vec<ScreenerFilter>,
    pub welcome_seen: bool,
}

#[derive(Serialize)]
pub struct NewsResponse {
    pub ticker: String,
    pub summary: String,
}

#[derive(Serialize)]
pub struct QuestsResponse {
    pub quests: Vec<Quest>,
    pub progress: PlayerProgress,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        tracked_symbols: state.store.symbol_count().await,
        ticks_completed: state.health.ticks_completed(),
        last_tick_at_secs: state.health.last_tick_at_secs(),
        quote_failures: state.health.quote_failures(),
        alerts_registered: state.store.alert_count(),
        live_quotes: state.quotes.is_some(),
    })
}

async fn get_watchlist(State(state): State<ApiState>) -> Json<Vec<TrackedSymbol>> {
    Json(state.store.filtered_symbols().await)
}

/// Add a ticker to the watchlist. With a quote source configured the real
/// quote is fetched first; a failed fetch leaves the watchlist unchanged.
async fn add_symbol(
    State(state): State<ApiState>,
    Json(req): Json<AddSymbolRequest>,
) -> Result<(StatusCode, Json<TrackedSymbol>)> {
    let ticker = validate_ticker(&req.ticker)?;

    // Reject duplicates before spending a quote-source call; the engine-level
    // check below stays authoritative against concurrent adds.
    if state.store.is_tracked(&ticker).await {
        return Err(AppError::DuplicateTicker(ticker));
    }

    let quote = match &state.quotes {
        Some(client) => Some(client.get_quote(&ticker).await?),
        None => None,
    };

    let mut rng = SmallRng::seed_from_u64(rand::random());
    let added = state.store.add_symbol(&ticker, quote.as_ref(), &mut rng).await?;
    info!(ticker = %ticker, price = added.price, "symbol added to watchlist");
    restart_refresh(&state).await;
    Ok((StatusCode::CREATED, Json(added)))
}

async fn remove_symbol(
    State(state): State<ApiState>,
    Path(ticker): Path<String>,
) -> Result<StatusCode> {
    let ticker = validate_ticker(&ticker)?;
    if state.store.remove_symbol(&ticker).await {
        info!(ticker = %ticker, "symbol removed from watchlist");
        restart_refresh(&state).await;
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Membership changed: cancel-and-reschedule the refresh loop so the next
/// tick acts on the new tracked set.
async fn restart_refresh(state: &ApiState) {
    if let Err(e) = state.control_tx.send(ControlMsg::Restart).await {
        warn!("failed to restart refresh loop: {e}");
    }
}

async fn get_chart(
    State(state): State<ApiState>,
    Path(ticker): Path<String>,
) -> Result<Json<ChartResponse>> {
    let ticker = validate_ticker(&ticker)?;
    let snapshot = state.store.snapshot().await;
    if !snapshot.is_tracked(&ticker) {
        return Err(AppError::NoData(ticker));
    }

    let points = snapshot
        .history
        .iter()
        .filter_map(|p| {
            p.prices
                .get(&ticker)
                .map(|&price| ChartPoint { time: p.time.clone(), price })
        })
        .collect();

    let mut overlays = Vec::new();
    for indicator in state.store.indicators().await {
        match indicator.kind {
            IndicatorKind::Sma => overlays.push(Overlay {
                label: indicator.label(),
                values: sma_series(&snapshot.history, &ticker, indicator.period),
            }),
            // RSI and volume are placeholder selections, never computed
            IndicatorKind::Rsi | IndicatorKind::Volume => {}
        }
    }

    Ok(Json(ChartResponse { ticker, points, overlays }))
}

async fn get_news_summary(
    State(state): State<ApiState>,
    Path(ticker): Path<String>,
) -> Result<Json<NewsResponse>> {
    let summarizer = state
        .news
        .as_ref()
        .ok_or_else(|| AppError::Upstream("news summarizer is not configured".to_string()))?;
    let ticker = validate_ticker(&ticker)?;
    let summary = summarizer.summarize(&ticker).await?;
    Ok(Json(NewsResponse { ticker, summary }))
}

async fn get_session(State(state): State<ApiState>) -> Json<SessionResponse> {
    Json(SessionResponse {
        indicators: state.store.indicators().await,
        filters: state.store.filters().await,
        welcome_seen: state.store.welcome_seen(),
    })
}

async fn put_indicators(
    State(state): State<ApiState>,
    Json(indicators): Json<Vec<Indicator>>,
) -> StatusCode {
    state.store.set_indicators(indicators).await;
    StatusCode::NO_CONTENT
}

async fn put_filters(
    State(state): State<ApiState>,
    Json(filters): Json<Vec<ScreenerFilter>>,
) -> StatusCode {
    state.store.set_filters(filters).await;
    StatusCode::NO_CONTENT
}

async fn post_welcome(State(state): State<ApiState>) -> StatusCode {
    state.store.set_welcome_seen();
    StatusCode::NO_CONTENT
}

async fn post_alert(
    State(state): State<ApiState>,
    Json(req): Json<AlertRequest>,
) -> Result<StatusCode> {
    let ticker = validate_ticker(&req.ticker)?;
    if req.price <= 0.0 {
        return Err(AppError::InvalidAlertPrice);
    }
    if !state.store.snapshot().await.is_tracked(&ticker) {
        return Err(AppError::NoData(ticker));
    }
    state.store.set_alert(&ticker, req.price);
    info!(ticker = %ticker, target = req.price, "price alert registered");
    Ok(StatusCode::CREATED)
}

async fn get_quests(State(state): State<ApiState>) -> Json<QuestsResponse> {
    Json(QuestsResponse {
        quests: state.quests.quests().await,
        progress: state.quests.progress(),
    })
}

async fn complete_quest(
    State(state): State<ApiState>,
    Path(id): Path<u32>,
) -> Result<Json<QuestReward>> {
    let reward = state.quests.complete(id).await?;
    info!(quest = id, xp = reward.progress.xp, "quest completed");
    Ok(Json(reward))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::engine::EngineState;
    use crate::seed;

    fn live_config() -> Config {
        Config {
            log_level: "info".to_string(),
            api_port: 0,
            tick_interval_secs: 2,
            // unroutable on purpose: any request against it errors out
            quote_api_url: "http://127.0.0.1:1".to_string(),
            quote_api_key: Some("test-key".to_string()),
            news_api_url: "http://127.0.0.1:1".to_string(),
            news_api_key: None,
            news_model: "none".to_string(),
        }
    }

    async fn live_state() -> ApiState {
        let cfg = live_config();
        let store = WatchlistStore::new();
        let mut rng = SmallRng::seed_from_u64(7);
        store
            .install(EngineState::initialize(seed::seed_symbols(), 2, 1_700_000_000, &mut rng))
            .await;
        let (control_tx, _control_rx) = mpsc::channel(4);
        ApiState {
            store,
            quotes: QuoteClient::from_config(&cfg).unwrap().map(Arc::new),
            news: None,
            quests: Arc::new(QuestLog::new()),
            health: Arc::new(HealthState::new()),
            control_tx,
        }
    }

    #[tokio::test]
    async fn duplicate_add_is_rejected_before_the_quote_fetch() {
        let state = live_state().await;
        let before = state.store.symbol_count().await;

        // AAPL is seeded; with the quote endpoint unroutable, anything other
        // than the early duplicate rejection would surface as a transport
        // error (and burn an upstream call per attempt).
        let req = AddSymbolRequest { ticker: "aapl".to_string() };
        let err = add_symbol(State(state.clone()), Json(req)).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateTicker(t) if t == "AAPL"));
        assert_eq!(state.store.symbol_count().await, before);
    }
}
