use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// TrackedSymbol
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedSymbol {
    /// Uppercase-normalized, unique within the tracked set.
    pub ticker: String,
    pub name: String,
    pub price: f64,
    /// Price immediately before the last update — up/down render cue only.
    pub previous_price: Option<f64>,
    /// Change since the session-open reference price.
    pub change: f64,
    pub change_percent: f64,
    /// Opaque display string, never computed.
    pub market_cap: String,
}

impl TrackedSymbol {
    /// The session-open reference price, backed out of the running change.
    /// Re-deriving it each tick accumulates float drift; tolerated, since
    /// displayed values are re-rounded on every mutation.
    pub fn session_open(&self) -> f64 {
        self.price - self.change
    }
}

// ---------------------------------------------------------------------------
// HistoryPoint
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryPoint {
    /// Display-formatted time label (HH:MM:SS, UTC).
    pub time: String,
    /// ticker → price at this point. Keys for removed tickers go stale and are
    /// simply ignored by readers.
    pub prices: HashMap<String, f64>,
}

// ---------------------------------------------------------------------------
// Quote — what the Quote Source hands back
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub ticker: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
}

// ---------------------------------------------------------------------------
// Indicators — ephemeral UI selections, recomputed against the buffer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndicatorKind {
    #[serde(rename = "SMA")]
    Sma,
    /// Placeholder — selectable in the UI schema but never computed.
    #[serde(rename = "RSI")]
    Rsi,
    #[serde(rename = "Volume")]
    Volume,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Indicator {
    #[serde(rename = "type")]
    pub kind: IndicatorKind,
    pub period: usize,
}

impl Indicator {
    pub fn label(&self) -> String {
        match self.kind {
            IndicatorKind::Sma => format!("SMA ({})", self.period),
            IndicatorKind::Rsi => "RSI".to_string(),
            IndicatorKind::Volume => "Volume".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Screener filters — pure predicates over TrackedSymbol, AND-composed
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterField {
    Price,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparator {
    #[serde(rename = "gt")]
    GreaterThan,
    #[serde(rename = "lt")]
    LessThan,
    #[serde(rename = "eq")]
    EqualTo,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScreenerFilter {
    pub field: FilterField,
    pub comparator: Comparator,
    pub threshold: f64,
}

impl ScreenerFilter {
    pub fn matches(&self, symbol: &TrackedSymbol) -> bool {
        let value = match self.field {
            FilterField::Price => symbol.price,
        };
        match self.comparator {
            Comparator::GreaterThan => value > self.threshold,
            Comparator::LessThan => value < self.threshold,
            Comparator::EqualTo => value == self.threshold,
        }
    }
}

// ---------------------------------------------------------------------------
// Control messages for the refresh task
// ---------------------------------------------------------------------------

/// Membership changes cancel-and-reschedule the refresh loop so a tick never
/// acts on a stale tracked set.
#[derive(Debug)]
pub enum ControlMsg {
    Restart,
    Shutdown,
}
