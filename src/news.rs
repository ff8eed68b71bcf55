//! Summarization Service collaborator: a prompt-templated LLM call returning
//! free-text prose about recent news for a ticker.

use std::time::Duration;

use serde_json::{json, Value};
use tracing::debug;

use crate::config::{Config, NEWS_TIMEOUT_SECS};
use crate::error::{AppError, Result};
use crate::quotes::validate_ticker;

fn news_prompt(ticker: &str) -> String {
    format!(
        "Summarize recent news articles related to {ticker}. Focus on \
         information that is likely to be financially relevant to investors."
    )
}

pub struct NewsSummarizer {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl NewsSummarizer {
    /// Returns `None` when no NEWS_API_KEY is configured.
    pub fn from_config(cfg: &Config) -> Result<Option<Self>> {
        let Some(api_key) = cfg.news_api_key.clone() else {
            return Ok(None);
        };
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(NEWS_TIMEOUT_SECS))
            .build()?;
        Ok(Some(Self {
            http,
            base_url: cfg.news_api_url.clone(),
            api_key,
            model: cfg.news_model.clone(),
        }))
    }

    pub async fn summarize(&self, ticker: &str) -> Result<String> {
        let ticker = validate_ticker(ticker)?;
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": news_prompt(&ticker) }],
        });

        let resp = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if resp.status().as_u16() == 429 {
            return Err(AppError::RateLimited);
        }
        if !resp.status().is_success() {
            return Err(AppError::Upstream(format!(
                "summarizer endpoint returned {}",
                resp.status()
            )));
        }

        let body: Value = resp.json().await?;
        debug!(ticker = %ticker, "summary response received");
        parse_summary(&ticker, &body)
    }
}

fn parse_summary(ticker: &str, body: &Value) -> Result<String> {
    let summary = body
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|c| c.first())
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or("");
    if summary.is_empty() {
        return Err(AppError::NoData(ticker.to_string()));
    }
    Ok(summary.to_string())
}
