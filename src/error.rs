use axum::{http::StatusCode, response::IntoResponse};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0} is already on the watchlist")]
    DuplicateTicker(String),

    #[error("invalid ticker: {0:?}")]
    InvalidTicker(String),

    #[error("no quote data for {0}")]
    NoData(String),

    #[error("quote source rate limit reached")]
    RateLimited,

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("alert price must be positive")]
    InvalidAlertPrice,

    #[error("unknown quest: {0}")]
    UnknownQuest(u32),

    #[error("quest {0} is already completed")]
    QuestCompleted(u32),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::DuplicateTicker(_) | AppError::QuestCompleted(_) => StatusCode::CONFLICT,
            AppError::InvalidTicker(_) | AppError::InvalidAlertPrice => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::NoData(_) | AppError::UnknownQuest(_) => StatusCode::NOT_FOUND,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::Upstream(_) | AppError::Http(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}
