use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use rand::rngs::SmallRng;
use serde::Serialize;
use tokio::sync::{broadcast, RwLock};
use tracing::info;

use crate::config::EVENT_CHANNEL_CAPACITY;
use crate::engine::EngineState;
use crate::error::Result;
use crate::types::{Indicator, Quote, ScreenerFilter, TrackedSymbol};

// ---------------------------------------------------------------------------
// Events pushed to /stream subscribers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PushEvent {
    /// Full state snapshot after every tick and membership change.
    Tick(EngineState),
    /// A registered price alert crossed its target.
    AlertTriggered { ticker: String, target: f64, price: f64 },
}

// ---------------------------------------------------------------------------
// WatchlistStore
// ---------------------------------------------------------------------------

/// Owns the authoritative engine state plus the session-scoped extras: the
/// price-alert registry, ephemeral indicator/filter selections, and the
/// one-bit welcome flag.
///
/// Every state transition happens under the single write lock, so ticks never
/// overlap and readers always see a fully published state.
pub struct WatchlistStore {
    state: RwLock<EngineState>,
    /// ticker → alert target price. An alert fires once, then is removed.
    alerts: DashMap<String, f64>,
    indicators: RwLock<Vec<Indicator>>,
    filters: RwLock<Vec<ScreenerFilter>>,
    welcome_seen: AtomicBool,
    events: broadcast::Sender<PushEvent>,
}

impl WatchlistStore {
    pub fn new() -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            state: RwLock::new(EngineState::default()),
            alerts: DashMap::new(),
            indicators: RwLock::new(Vec::new()),
            filters: RwLock::new(Vec::new()),
            welcome_seen: AtomicBool::new(false),
            events,
        })
    }

    /// Publish the initial seeded state.
    pub async fn install(&self, state: EngineState) {
        *self.state.write().await = state;
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PushEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> EngineState {
        self.state.read().await.clone()
    }

    pub async fn tickers(&self) -> Vec<String> {
        self.state.read().await.tickers()
    }

    pub async fn symbol_count(&self) -> usize {
        self.state.read().await.symbols.len()
    }

    pub async fn is_tracked(&self, ticker: &str) -> bool {
        self.state.read().await.is_tracked(ticker)
    }

    /// Tracked symbols with the session screener filters applied (AND).
    pub async fn filtered_symbols(&self) -> Vec<TrackedSymbol> {
        let filters = self.filters.read().await.clone();
        self.state
            .read()
            .await
            .symbols
            .iter()
            .filter(|s| filters.iter().all(|f| f.matches(s)))
            .cloned()
            .collect()
    }

    // -- state transitions --------------------------------------------------

    /// One simulated tick: perturb every price and append a history point.
    pub async fn tick_simulated(&self, now_secs: u64, rng: &mut SmallRng) {
        let snapshot = {
            let mut state = self.state.write().await;
            state.tick(now_secs, rng);
            state.clone()
        };
        self.after_tick(snapshot);
    }

    /// One live tick: overwrite prices from fetched quotes atomically.
    /// Symbols missing from `quotes` keep their stale values.
    pub async fn apply_quotes(&self, now_secs: u64, quotes: &HashMap<String, Quote>) {
        let snapshot = {
            let mut state = self.state.write().await;
            state.apply_quotes(now_secs, quotes);
            state.clone()
        };
        self.after_tick(snapshot);
    }

    pub async fn add_symbol(
        &self,
        ticker: &str,
        quote: Option<&Quote>,
        rng: &mut SmallRng,
    ) -> Result<TrackedSymbol> {
        let (added, snapshot) = {
            let mut state = self.state.write().await;
            let added = state.add_symbol(ticker, quote, rng)?;
            (added, state.clone())
        };
        let _ = self.events.send(PushEvent::Tick(snapshot));
        Ok(added)
    }

    /// Returns true if the symbol was tracked.
    pub async fn remove_symbol(&self, ticker: &str) -> bool {
        let (removed, snapshot) = {
            let mut state = self.state.write().await;
            let before = state.symbols.len();
            state.remove_symbol(ticker);
            (state.symbols.len() < before, state.clone())
        };
        if removed {
            self.alerts.remove(&ticker.to_ascii_uppercase());
            let _ = self.events.send(PushEvent::Tick(snapshot));
        }
        removed
    }

    fn after_tick(&self, snapshot: EngineState) {
        for (ticker, target, price) in self.fired_alerts(&snapshot) {
            self.alerts.remove(&ticker);
            info!(ticker = %ticker, target, price, "price alert fired: {ticker} crossed ${target:.2}");
            let _ = self.events.send(PushEvent::AlertTriggered { ticker, target, price });
        }
        let _ = self.events.send(PushEvent::Tick(snapshot));
    }

    /// Alerts whose target sits between the previous and current price.
    fn fired_alerts(&self, state: &EngineState) -> Vec<(String, f64, f64)> {
        let mut fired = Vec::new();
        for entry in self.alerts.iter() {
            let Some(symbol) = state.get(entry.key()) else { continue };
            let Some(prev) = symbol.previous_price else { continue };
            let target = *entry.value();
            let crossed_up = prev < target && symbol.price >= target;
            let crossed_down = prev > target && symbol.price <= target;
            if crossed_up || crossed_down {
                fired.push((entry.key().clone(), target, symbol.price));
            }
        }
        fired
    }

    // -- session extras -----------------------------------------------------

    pub fn set_alert(&self, ticker: &str, target: f64) {
        self.alerts.insert(ticker.to_ascii_uppercase(), target);
    }

    pub fn alert_count(&self) -> usize {
        self.alerts.len()
    }

    pub async fn set_indicators(&self, indicators: Vec<Indicator>) {
        *self.indicators.write().await = indicators;
    }

    pub async fn indicators(&self) -> Vec<Indicator> {
        self.indicators.read().await.clone()
    }

    pub async fn set_filters(&self, filters: Vec<ScreenerFilter>) {
        *self.filters.write().await = filters;
    }

    pub async fn filters(&self) -> Vec<ScreenerFilter> {
        self.filters.read().await.clone()
    }

    pub fn welcome_seen(&self) -> bool {
        self.welcome_seen.load(Ordering::Relaxed)
    }

    pub fn set_welcome_seen(&self) {
        self.welcome_seen.store(true, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed;
    use crate::types::{Comparator, FilterField};
    use rand::SeedableRng;

    async fn seeded_store() -> Arc<WatchlistStore> {
        let store = WatchlistStore::new();
        let mut rng = SmallRng::seed_from_u64(11);
        store
            .install(EngineState::initialize(seed::seed_symbols(), 2, 1_700_000_000, &mut rng))
            .await;
        store
    }

    #[tokio::test]
    async fn add_then_duplicate_then_remove_round_trip() {
        let store = seeded_store().await;
        let mut rng = SmallRng::seed_from_u64(3);
        let before = store.symbol_count().await;

        store.add_symbol("NFLX", None, &mut rng).await.unwrap();
        assert_eq!(store.symbol_count().await, before + 1);

        assert!(store.add_symbol("NFLX", None, &mut rng).await.is_err());
        assert_eq!(store.symbol_count().await, before + 1);

        assert!(store.remove_symbol("nflx").await);
        assert!(!store.remove_symbol("NFLX").await);
        assert_eq!(store.symbol_count().await, before);
    }

    #[tokio::test]
    async fn filters_compose_with_and() {
        let store = seeded_store().await;
        store
            .set_filters(vec![
                ScreenerFilter {
                    field: FilterField::Price,
                    comparator: Comparator::GreaterThan,
                    threshold: 150.0,
                },
                ScreenerFilter {
                    field: FilterField::Price,
                    comparator: Comparator::LessThan,
                    threshold: 400.0,
                },
            ])
            .await;

        let visible = store.filtered_symbols().await;
        // seed set: AAPL 172.45, MSFT 370.95, TSLA 245.01 fall in (150, 400)
        let tickers: Vec<&str> = visible.iter().map(|s| s.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["AAPL", "MSFT", "TSLA"]);
    }

    #[tokio::test]
    async fn alert_fires_once_on_crossing() {
        let store = seeded_store().await;
        let mut rx = store.subscribe();
        store.set_alert("AAPL", 180.0);

        // drive the price up through the target with fixed +5% ticks
        for i in 1..=2u64 {
            let snapshot = {
                let mut state = store.state.write().await;
                state.tick_with(1_700_000_000 + 2 * i, |_| 0.05);
                state.clone()
            };
            store.after_tick(snapshot);
        }
        assert_eq!(store.alert_count(), 0);

        let mut alert_events = 0;
        while let Ok(ev) = rx.try_recv() {
            if let PushEvent::AlertTriggered { ticker, target, .. } = ev {
                assert_eq!(ticker, "AAPL");
                assert_eq!(target, 180.0);
                alert_events += 1;
            }
        }
        assert_eq!(alert_events, 1);
    }

    #[test]
    fn push_event_wire_shape_is_stable() {
        // /stream clients key off the "event" tag; pin both variants.
        let tick = serde_json::to_value(PushEvent::Tick(EngineState::default())).unwrap();
        assert_eq!(tick["event"], "tick");
        assert!(tick["symbols"].is_array());
        assert!(tick["history"].is_array());

        let alert = serde_json::to_value(PushEvent::AlertTriggered {
            ticker: "AAPL".to_string(),
            target: 180.0,
            price: 181.07,
        })
        .unwrap();
        assert_eq!(alert["event"], "alert_triggered");
        assert_eq!(alert["ticker"], "AAPL");
        assert_eq!(alert["target"], 180.0);
        assert_eq!(alert["price"], 181.07);
    }

    #[tokio::test]
    async fn removing_a_symbol_drops_its_alert() {
        let store = seeded_store().await;
        store.set_alert("TSLA", 250.0);
        store.remove_symbol("TSLA").await;
        assert_eq!(store.alert_count(), 0);
    }
}
