//! The periodic refresh task: one tick per interval, simulated or live.
//!
//! The task is the only writer on the tick path, so ticks never overlap. When
//! watchlist membership changes, the API sends `ControlMsg::Restart` and the
//! loop is cancelled-and-rescheduled against the new tracked set rather than
//! patched incrementally.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use futures_util::{stream, StreamExt};
use rand::{rngs::SmallRng, SeedableRng};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{info, warn};

use crate::api::health::HealthState;
use crate::config::{Config, CONTROL_CHANNEL_CAPACITY, MAX_CONCURRENT_QUOTE_REQUESTS};
use crate::quotes::QuoteClient;
use crate::state::WatchlistStore;
use crate::types::ControlMsg;

pub struct WatchlistRefresher {
    cfg: Config,
    store: Arc<WatchlistStore>,
    quotes: Option<Arc<QuoteClient>>,
    health: Arc<HealthState>,
    control_rx: mpsc::Receiver<ControlMsg>,
    rng: SmallRng,
}

/// Owning handle for the refresh task. Holders can restart the schedule after
/// membership changes or stop it for good; dropping the process through
/// [`RefreshHandle::stop`] guarantees no orphaned timer task.
pub struct RefreshHandle {
    control_tx: mpsc::Sender<ControlMsg>,
    handle: JoinHandle<()>,
}

impl RefreshHandle {
    pub fn control_tx(&self) -> mpsc::Sender<ControlMsg> {
        self.control_tx.clone()
    }

    pub async fn stop(self) {
        if self.control_tx.send(ControlMsg::Shutdown).await.is_err() {
            self.handle.abort();
            return;
        }
        let _ = self.handle.await;
    }
}

impl WatchlistRefresher {
    pub fn spawn(
        cfg: Config,
        store: Arc<WatchlistStore>,
        quotes: Option<Arc<QuoteClient>>,
        health: Arc<HealthState>,
    ) -> RefreshHandle {
        let (control_tx, control_rx) = mpsc::channel(CONTROL_CHANNEL_CAPACITY);
        let refresher = Self {
            cfg,
            store,
            quotes,
            health,
            control_rx,
            rng: SmallRng::seed_from_u64(rand::random()),
        };
        let handle = tokio::spawn(refresher.run());
        RefreshHandle { control_tx, handle }
    }

    async fn run(mut self) {
        'schedule: loop {
            let members = self.store.tickers().await;
            let mut ticker = interval(Duration::from_secs(self.cfg.tick_interval_secs));
            ticker.tick().await; // interval fires immediately; the seed state is already current
            info!(
                symbols = members.len(),
                interval_secs = self.cfg.tick_interval_secs,
                "refresh schedule (re)started against {} symbols",
                members.len(),
            );

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.refresh(&members).await;
                        self.health.record_tick(now_secs());
                    }
                    msg = self.control_rx.recv() => match msg {
                        Some(ControlMsg::Restart) => continue 'schedule,
                        Some(ControlMsg::Shutdown) | None => {
                            info!("refresh loop stopped");
                            return;
                        }
                    }
                }
            }
        }
    }

    async fn refresh(&mut self, members: &[String]) {
        match &self.quotes {
            Some(client) => self.refresh_live(client.clone(), members).await,
            None => self.store.tick_simulated(now_secs(), &mut self.rng).await,
        }
    }

    /// Fan out one quote request per tracked symbol with bounded concurrency,
    /// then publish the merged result atomically. Per-symbol failures keep
    /// that symbol's stale values and never block siblings.
    async fn refresh_live(&self, client: Arc<QuoteClient>, members: &[String]) {
        let results = stream::iter(members.iter().cloned().map(|ticker| {
            let client = Arc::clone(&client);
            async move {
                let result = client.get_quote(&ticker).await;
                (ticker, result)
            }
        }))
        .buffer_unordered(MAX_CONCURRENT_QUOTE_REQUESTS)
        .collect::<Vec<_>>()
        .await;

        let mut quotes = HashMap::new();
        for (ticker, result) in results {
            match result {
                Ok(quote) => {
                    quotes.insert(ticker, quote);
                }
                Err(e) => {
                    self.health.record_quote_failure();
                    warn!("quote refresh failed for {ticker}, keeping stale values: {e}");
                }
            }
        }
        self.store.apply_quotes(now_secs(), &quotes).await;
    }
}

pub(crate) fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
