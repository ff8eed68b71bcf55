//! The quote simulation & series engine: tracked symbols plus a bounded
//! rolling history buffer, advanced one tick at a time.
//!
//! All monetary and percent values are rounded to 2 decimal places at the
//! point of mutation, so repeated reads are stable.

use std::collections::{HashMap, VecDeque};

use rand::{rngs::SmallRng, Rng};
use serde::Serialize;

use crate::config::{
    BACKFILL_DRIFT, HISTORY_POINTS, SYNTH_PRICE_MIN, SYNTH_PRICE_SPAN, TICK_DRIFT,
};
use crate::error::{AppError, Result};
use crate::seed;
use crate::types::{HistoryPoint, Quote, TrackedSymbol};

pub(crate) fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// HH:MM:SS (UTC) label for a chart point.
fn time_label(unix_secs: u64) -> String {
    let day_secs = unix_secs % 86_400;
    format!(
        "{:02}:{:02}:{:02}",
        day_secs / 3_600,
        day_secs % 3_600 / 60,
        day_secs % 60
    )
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EngineState {
    pub symbols: Vec<TrackedSymbol>,
    pub history: VecDeque<HistoryPoint>,
}

impl EngineState {
    /// Seed the tracked set and synthesize a full history buffer by walking
    /// backward from each seed price with small fluctuations, so the chart is
    /// non-empty on first render. The last point equals the seed prices.
    pub fn initialize(
        seeds: Vec<TrackedSymbol>,
        step_secs: u64,
        now_secs: u64,
        rng: &mut SmallRng,
    ) -> Self {
        let columns: Vec<(String, Vec<f64>)> = seeds
            .iter()
            .map(|s| (s.ticker.clone(), backward_walk(s.price, HISTORY_POINTS, rng)))
            .collect();

        let mut history = VecDeque::with_capacity(HISTORY_POINTS);
        for i in 0..HISTORY_POINTS {
            let t = now_secs.saturating_sub((HISTORY_POINTS - 1 - i) as u64 * step_secs);
            let prices = columns
                .iter()
                .map(|(ticker, walk)| (ticker.clone(), walk[i]))
                .collect();
            history.push_back(HistoryPoint { time: time_label(t), prices });
        }

        Self { symbols: seeds, history }
    }

    pub fn tickers(&self) -> Vec<String> {
        self.symbols.iter().map(|s| s.ticker.clone()).collect()
    }

    pub fn is_tracked(&self, ticker: &str) -> bool {
        self.symbols.iter().any(|s| s.ticker.eq_ignore_ascii_case(ticker))
    }

    pub fn get(&self, ticker: &str) -> Option<&TrackedSymbol> {
        self.symbols.iter().find(|s| s.ticker.eq_ignore_ascii_case(ticker))
    }

    /// Advance every tracked price by a uniform multiplicative perturbation in
    /// [-1%, +1%] and append one history point.
    pub fn tick(&mut self, now_secs: u64, rng: &mut SmallRng) {
        self.tick_with(now_secs, |_| (rng.random::<f64>() - 0.5) * 2.0 * TICK_DRIFT);
    }

    /// Tick with an explicit per-ticker drift factor. The simulation path goes
    /// through [`EngineState::tick`]; this hook exists so the transition is
    /// testable with fixed perturbations.
    pub fn tick_with(&mut self, now_secs: u64, mut drift: impl FnMut(&str) -> f64) {
        for s in &mut self.symbols {
            // Session open is re-derived from the running change every tick.
            let session_open = s.session_open();
            let new_price = round2(s.price * (1.0 + drift(&s.ticker)));

            s.previous_price = Some(s.price);
            s.price = new_price;
            s.change = round2(new_price - session_open);
            s.change_percent = if session_open != 0.0 {
                round2((new_price - session_open) / session_open * 100.0)
            } else {
                0.0
            };
        }
        self.push_point(now_secs);
    }

    /// Live-quote variant of a tick: overwrite prices from fetched quotes and
    /// append one history point. Symbols without a quote keep stale values.
    pub fn apply_quotes(&mut self, now_secs: u64, quotes: &HashMap<String, Quote>) {
        for s in &mut self.symbols {
            if let Some(q) = quotes.get(&s.ticker) {
                s.previous_price = Some(s.price);
                s.price = round2(q.price);
                s.change = round2(q.change);
                s.change_percent = round2(q.change_percent);
            }
        }
        self.push_point(now_secs);
    }

    fn push_point(&mut self, now_secs: u64) {
        let prices = self.symbols.iter().map(|s| (s.ticker.clone(), s.price)).collect();
        self.history.push_back(HistoryPoint { time: time_label(now_secs), prices });
        if self.history.len() > HISTORY_POINTS {
            self.history.pop_front();
        }
    }

    /// Track a new symbol. `ticker` must already be uppercase-normalized.
    /// With no quote, a price is synthesized in [20, 520). Every existing
    /// history point is back-filled so chart series lengths stay aligned.
    pub fn add_symbol(
        &mut self,
        ticker: &str,
        quote: Option<&Quote>,
        rng: &mut SmallRng,
    ) -> Result<TrackedSymbol> {
        if self.is_tracked(ticker) {
            return Err(AppError::DuplicateTicker(ticker.to_string()));
        }

        let symbol = match quote {
            Some(q) => TrackedSymbol {
                ticker: ticker.to_string(),
                name: seed::company_name(ticker),
                price: round2(q.price),
                previous_price: None,
                change: round2(q.change),
                change_percent: round2(q.change_percent),
                market_cap: "N/A".to_string(),
            },
            None => TrackedSymbol {
                ticker: ticker.to_string(),
                name: seed::company_name(ticker),
                price: round2(SYNTH_PRICE_MIN + rng.random::<f64>() * SYNTH_PRICE_SPAN),
                previous_price: None,
                change: 0.0,
                change_percent: 0.0,
                market_cap: "N/A".to_string(),
            },
        };

        let walk = backward_walk(symbol.price, self.history.len(), rng);
        for (point, price) in self.history.iter_mut().zip(walk) {
            point.prices.insert(symbol.ticker.clone(), price);
        }

        self.symbols.push(symbol.clone());
        Ok(symbol)
    }

    /// Remove a symbol; no-op if not tracked. History points keep their stale
    /// keys — renderers simply stop reading them.
    pub fn remove_symbol(&mut self, ticker: &str) {
        self.symbols.retain(|s| !s.ticker.eq_ignore_ascii_case(ticker));
    }
}

/// A backward random walk of `len` prices ending exactly at `last`, with
/// ±0.5% fluctuation per step. No price floor is applied — bounded drift
/// cannot reach zero in realistic runs.
fn backward_walk(last: f64, len: usize, rng: &mut SmallRng) -> Vec<f64> {
    let mut walk = vec![0.0; len];
    if len == 0 {
        return walk;
    }
    walk[len - 1] = last;
    let mut p = last;
    for i in (0..len - 1).rev() {
        let drift = (rng.random::<f64>() - 0.5) * 2.0 * BACKFILL_DRIFT;
        p = round2(p * (1.0 + drift));
        walk[i] = p;
    }
    walk
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(7)
    }

    fn seeded() -> EngineState {
        EngineState::initialize(crate::seed::seed_symbols(), 2, 1_700_000_000, &mut rng())
    }

    fn single(ticker: &str, price: f64, change: f64) -> EngineState {
        let symbol = TrackedSymbol {
            ticker: ticker.to_string(),
            name: ticker.to_string(),
            price,
            previous_price: None,
            change,
            change_percent: 0.0,
            market_cap: "N/A".to_string(),
        };
        EngineState::initialize(vec![symbol], 2, 1_700_000_000, &mut rng())
    }

    #[test]
    fn initialize_builds_full_buffer_ending_at_seed_prices() {
        let state = seeded();
        assert_eq!(state.history.len(), HISTORY_POINTS);
        let last = state.history.back().unwrap();
        for s in &state.symbols {
            assert_eq!(last.prices[&s.ticker], s.price);
        }
        // every point carries every tracked ticker
        for point in &state.history {
            assert_eq!(point.prices.len(), state.symbols.len());
        }
    }

    #[test]
    fn zero_drift_tick_preserves_price_and_change() {
        let mut state = single("AAPL", 172.45, 0.0);
        state.tick_with(1_700_000_002, |_| 0.0);

        let s = state.get("AAPL").unwrap();
        assert_eq!(s.price, 172.45);
        assert_eq!(s.change, 0.0);
        assert_eq!(s.change_percent, 0.0);
        assert_eq!(s.previous_price, Some(172.45));
        // 61st point is appended, then the oldest evicted
        assert_eq!(state.history.len(), HISTORY_POINTS);
    }

    #[test]
    fn change_is_measured_against_session_open() {
        // seed change 2.15 means session open 170.30
        let mut state = single("AAPL", 172.45, 2.15);
        state.tick_with(1_700_000_002, |_| 0.0);

        let s = state.get("AAPL").unwrap();
        assert_eq!(s.price, 172.45);
        assert_eq!(s.change, 2.15);
        assert_eq!(s.change_percent, 1.26);
    }

    #[test]
    fn buffer_stays_bounded_and_prices_stay_positive() {
        let mut state = seeded();
        let mut r = rng();
        for i in 0..500 {
            state.tick(1_700_000_000 + 2 * i, &mut r);
            assert_eq!(state.history.len(), HISTORY_POINTS);
        }
        for s in &state.symbols {
            assert!(s.price > 0.0, "{} went non-positive", s.ticker);
            // rounded at mutation time
            assert_eq!(s.price, round2(s.price));
            assert_eq!(s.change, round2(s.change));
        }
    }

    #[test]
    fn duplicate_add_is_rejected_case_insensitively() {
        let mut state = seeded();
        let before = state.symbols.len();
        let err = state.add_symbol("AAPL", None, &mut rng()).unwrap_err();
        assert!(matches!(err, AppError::DuplicateTicker(_)));
        assert_eq!(state.symbols.len(), before);
    }

    #[test]
    fn add_synthesizes_price_and_backfills_history() {
        let mut state = seeded();
        let before = state.history.len();
        let added = state.add_symbol("NFLX", None, &mut rng()).unwrap();

        assert_eq!(added.name, "Netflix, Inc.");
        assert!(added.price >= SYNTH_PRICE_MIN && added.price < SYNTH_PRICE_MIN + SYNTH_PRICE_SPAN);
        assert_eq!(state.history.len(), before);
        for point in &state.history {
            assert!(point.prices.contains_key("NFLX"));
        }
        assert_eq!(state.history.back().unwrap().prices["NFLX"], added.price);
    }

    #[test]
    fn add_with_quote_uses_quoted_values() {
        let mut state = seeded();
        let quote = Quote {
            ticker: "META".to_string(),
            price: 312.556,
            change: 1.005,
            change_percent: 0.323,
        };
        let added = state.add_symbol("META", Some(&quote), &mut rng()).unwrap();
        assert_eq!(added.price, 312.56);
        assert_eq!(added.change, 1.0);
        assert_eq!(added.change_percent, 0.32);
    }

    #[test]
    fn remove_is_noop_when_absent_and_leaves_stale_history_keys() {
        let mut state = seeded();
        let before = state.symbols.len();

        state.remove_symbol("ZZQ");
        assert_eq!(state.symbols.len(), before);

        state.remove_symbol("tsla");
        assert_eq!(state.symbols.len(), before - 1);
        assert!(!state.is_tracked("TSLA"));
        assert!(state.history.back().unwrap().prices.contains_key("TSLA"));

        // re-adding restores the set size
        state.add_symbol("TSLA", None, &mut rng()).unwrap();
        assert_eq!(state.symbols.len(), before);
    }

    #[test]
    fn stale_symbols_keep_values_when_quote_missing() {
        let mut state = single("AAPL", 100.0, 1.0);
        let quotes = HashMap::new();
        state.apply_quotes(1_700_000_002, &quotes);

        let s = state.get("AAPL").unwrap();
        assert_eq!(s.price, 100.0);
        assert_eq!(s.change, 1.0);
        assert_eq!(state.history.len(), HISTORY_POINTS);
    }

    #[test]
    fn apply_quotes_rounds_at_mutation() {
        let mut state = single("AAPL", 100.0, 0.0);
        let mut quotes = HashMap::new();
        quotes.insert(
            "AAPL".to_string(),
            Quote {
                ticker: "AAPL".to_string(),
                price: 101.239,
                change: 1.239,
                change_percent: 1.2391,
            },
        );
        state.apply_quotes(1_700_000_002, &quotes);

        let s = state.get("AAPL").unwrap();
        assert_eq!(s.price, 101.24);
        assert_eq!(s.change, 1.24);
        assert_eq!(s.change_percent, 1.24);
        assert_eq!(s.previous_price, Some(100.0));
        assert_eq!(state.history.back().unwrap().prices["AAPL"], 101.24);
    }

    #[test]
    fn time_labels_are_display_formatted() {
        assert_eq!(time_label(0), "00:00:00");
        assert_eq!(time_label(86_399), "23:59:59");
        assert_eq!(time_label(1_700_000_000), "22:13:20");
    }
}
