use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("invalid ticker '{ticker}'. Choose from: {valid:?}")]
    UnknownTicker { ticker: String, valid: Vec<String> },

    #[error("alphavantage API error for {ticker}: {msg}")]
    Api { ticker: String, msg: String },

    #[error("alphavantage rate limit reached for {ticker}: {msg}")]
    RateLimited { ticker: String, msg: String },

    #[error("error in {ticker} response structure: missing daily time series")]
    MissingSeries { ticker: String },

    #[error("not enough data: {0}")]
    InsufficientData(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("postgres error: {0}")]
    Postgres(#[from] postgres::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("chart error: {0}")]
    Chart(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
