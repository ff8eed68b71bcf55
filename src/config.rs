use crate::error::{AppError, Result};

pub const QUOTE_API_URL: &str = "https://www.alphavantage.co";
pub const NEWS_API_URL: &str = "https://api.openai.com/v1";
pub const NEWS_MODEL: &str = "gpt-4o-mini";

/// Rolling history buffer length — one chart point per tick, FIFO beyond this.
pub const HISTORY_POINTS: usize = 60;

/// Tickers longer than this fail validation before any network call.
pub const MAX_TICKER_LEN: usize = 10;

/// Per-tick multiplicative perturbation bound (±1%).
pub const TICK_DRIFT: f64 = 0.01;

/// Per-step drift when back-filling synthetic history (±0.5%).
pub const BACKFILL_DRIFT: f64 = 0.005;

/// Synthesized prices for unknown tickers land in [SYNTH_PRICE_MIN, MIN + SPAN).
pub const SYNTH_PRICE_MIN: f64 = 20.0;
pub const SYNTH_PRICE_SPAN: f64 = 500.0;

/// Per-request timeout for quote fetches — bounds live-mode tick latency.
pub const QUOTE_TIMEOUT_SECS: u64 = 10;

/// Per-request timeout for news summarization (LLM calls are slow).
pub const NEWS_TIMEOUT_SECS: u64 = 60;

/// Bounded fan-out for live quote refresh: at most this many in-flight requests per tick.
pub const MAX_CONCURRENT_QUOTE_REQUESTS: usize = 4;

/// Capacity of the refresher control channel.
pub const CONTROL_CHANNEL_CAPACITY: usize = 16;

/// Capacity of the event broadcast channel feeding /stream subscribers.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub api_port: u16,
    /// Seconds between engine ticks / live refreshes (TICK_INTERVAL_SECS).
    pub tick_interval_secs: u64,
    pub quote_api_url: String,
    /// Live quote refresh is enabled iff this is set (QUOTE_API_KEY).
    pub quote_api_key: Option<String>,
    pub news_api_url: String,
    pub news_api_key: Option<String>,
    pub news_model: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            tick_interval_secs: std::env::var("TICK_INTERVAL_SECS")
                .unwrap_or_else(|_| "2".to_string())
                .parse::<u64>()
                .ok()
                .filter(|&s| s >= 1)
                .ok_or_else(|| {
                    AppError::Config("TICK_INTERVAL_SECS must be a positive integer".to_string())
                })?,
            quote_api_url: std::env::var("QUOTE_API_URL")
                .unwrap_or_else(|_| QUOTE_API_URL.to_string()),
            quote_api_key: std::env::var("QUOTE_API_KEY").ok().filter(|k| !k.is_empty()),
            news_api_url: std::env::var("NEWS_API_URL")
                .unwrap_or_else(|_| NEWS_API_URL.to_string()),
            news_api_key: std::env::var("NEWS_API_KEY").ok().filter(|k| !k.is_empty()),
            news_model: std::env::var("NEWS_MODEL").unwrap_or_else(|_| NEWS_MODEL.to_string()),
        })
    }
}
