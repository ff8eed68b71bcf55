//! Derived indicators over the rolling history buffer.
//!
//! Only the simple moving average is computed; RSI and volume exist in the
//! UI schema as disabled placeholders.

use std::collections::VecDeque;

use crate::engine::series::round2;
use crate::types::HistoryPoint;

/// Trailing simple moving average of `ticker` over `history`.
///
/// Yields exactly one item per history point: `None` while there is not yet
/// `period` points of lookback (or a point is missing the ticker), otherwise
/// the window mean rounded to 2 decimal places. The iterator is a pure
/// function of its inputs and can be recomputed on every render.
pub fn sma(
    history: &VecDeque<HistoryPoint>,
    ticker: &str,
    period: usize,
) -> impl Iterator<Item = Option<f64>> {
    let prices: Vec<Option<f64>> = history
        .iter()
        .map(|p| p.prices.get(ticker).copied())
        .collect();
    let len = prices.len();

    (0..len).map(move |i| {
        if period == 0 || i + 1 < period {
            return None;
        }
        let window = &prices[i + 1 - period..=i];
        let mut sum = 0.0;
        for price in window {
            sum += (*price)?;
        }
        Some(round2(sum / period as f64))
    })
}

/// Eagerly collected form of [`sma`], for serialization as an overlay series.
pub fn sma_series(history: &VecDeque<HistoryPoint>, ticker: &str, period: usize) -> Vec<Option<f64>> {
    sma(history, ticker, period).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn history(prices: &[f64]) -> VecDeque<HistoryPoint> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &p)| HistoryPoint {
                time: format!("00:00:{i:02}"),
                prices: HashMap::from([("AAPL".to_string(), p)]),
            })
            .collect()
    }

    #[test]
    fn warmup_prefix_is_null_then_means() {
        let h = history(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let out = sma_series(&h, "AAPL", 3);
        assert_eq!(out, vec![None, None, Some(2.0), Some(3.0), Some(4.0)]);
    }

    #[test]
    fn constant_series_averages_to_constant() {
        let h = history(&[172.45; 60]);
        let out = sma_series(&h, "AAPL", 20);
        assert_eq!(out.len(), 60);
        assert!(out[..19].iter().all(Option::is_none));
        assert!(out[19..].iter().all(|v| *v == Some(172.45)));
    }

    #[test]
    fn mean_is_rounded_to_cents() {
        let h = history(&[1.0, 2.0]);
        let out = sma_series(&h, "AAPL", 2);
        // (1 + 2) / 2 = 1.5 — already 2dp; (0.1+0.2)/2 exercises rounding
        assert_eq!(out, vec![None, Some(1.5)]);
        let h = history(&[10.01, 10.02, 10.02]);
        let out = sma_series(&h, "AAPL", 3);
        assert_eq!(out[2], Some(10.02));
    }

    #[test]
    fn degenerate_inputs_yield_nulls() {
        let h = history(&[1.0, 2.0, 3.0]);
        assert!(sma_series(&h, "AAPL", 0).iter().all(Option::is_none));
        assert!(sma_series(&h, "AAPL", 5).iter().all(Option::is_none));
        // unknown ticker: same length, all null
        let out = sma_series(&h, "ZZQ", 2);
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(Option::is_none));
    }

    #[test]
    fn restartable_and_stable_across_recomputation() {
        let h = history(&[3.0, 6.0, 9.0, 12.0]);
        let first = sma_series(&h, "AAPL", 2);
        let second = sma_series(&h, "AAPL", 2);
        assert_eq!(first, second);
    }
}
