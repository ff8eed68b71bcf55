//! Quote Source collaborator: an Alpha Vantage-style GLOBAL_QUOTE endpoint.

use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::config::{Config, MAX_TICKER_LEN, QUOTE_TIMEOUT_SECS};
use crate::error::{AppError, Result};
use crate::types::Quote;

/// Uppercase-normalize and validate a raw ticker. Fails closed before any
/// network call: empty, longer than 10 chars, or containing anything outside
/// `A-Z0-9.-` is rejected.
pub fn validate_ticker(raw: &str) -> Result<String> {
    let ticker = raw.trim().to_ascii_uppercase();
    let well_formed = !ticker.is_empty()
        && ticker.len() <= MAX_TICKER_LEN
        && ticker
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'-');
    if !well_formed {
        return Err(AppError::InvalidTicker(raw.to_string()));
    }
    Ok(ticker)
}

pub struct QuoteClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl QuoteClient {
    /// Returns `None` when no QUOTE_API_KEY is configured — the engine then
    /// runs in simulated mode.
    pub fn from_config(cfg: &Config) -> Result<Option<Self>> {
        let Some(api_key) = cfg.quote_api_key.clone() else {
            return Ok(None);
        };
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(QUOTE_TIMEOUT_SECS))
            .build()?;
        Ok(Some(Self { http, base_url: cfg.quote_api_url.clone(), api_key }))
    }

    pub async fn get_quote(&self, ticker: &str) -> Result<Quote> {
        let ticker = validate_ticker(ticker)?;
        let url = format!(
            "{}/query?function=GLOBAL_QUOTE&symbol={}&apikey={}",
            self.base_url, ticker, self.api_key
        );

        let resp = self.http.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(AppError::Upstream(format!(
                "quote endpoint returned {}",
                resp.status()
            )));
        }
        let text = resp.text().await?;
        let body: Value = serde_json::from_str(&text)?;
        debug!(ticker = %ticker, "quote response received");
        parse_global_quote(&ticker, &body)
    }
}

/// Parse a GLOBAL_QUOTE response body.
///
/// A JSON `Error Message` maps to `Upstream`, a rate-limit `Note` /
/// `Information` to `RateLimited`, and an empty quote object to `NoData`.
pub(crate) fn parse_global_quote(ticker: &str, body: &Value) -> Result<Quote> {
    if let Some(msg) = body.get("Error Message").and_then(Value::as_str) {
        return Err(AppError::Upstream(msg.to_string()));
    }
    if body.get("Note").is_some() || body.get("Information").is_some() {
        return Err(AppError::RateLimited);
    }

    let quote = body
        .get("Global Quote")
        .and_then(Value::as_object)
        .ok_or_else(|| AppError::NoData(ticker.to_string()))?;
    if quote.is_empty() {
        return Err(AppError::NoData(ticker.to_string()));
    }

    let price = number_field(quote, "05. price")
        .ok_or_else(|| AppError::Upstream(format!("malformed quote for {ticker}: missing price")))?;
    let change = number_field(quote, "09. change").unwrap_or(0.0);
    let change_percent = quote
        .get("10. change percent")
        .and_then(Value::as_str)
        .and_then(|s| s.trim().trim_end_matches('%').parse::<f64>().ok())
        .unwrap_or(0.0);

    Ok(Quote { ticker: ticker.to_string(), price, change, change_percent })
}

/// Alpha Vantage encodes numbers as strings; tolerate both.
fn number_field(obj: &serde_json::Map<String, Value>, key: &str) -> Option<f64> {
    obj.get(key)
        .and_then(|v| v.as_f64().or_else(|| v.as_str().and_then(|s| s.trim().parse().ok())))
}
