use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::time::Duration;
use url::Url;

use crate::config::AlphaVantageConfig;
use crate::error::AppError;
use crate::model::price::PricePoint;

use super::types::{reshape_daily, DailySeriesResponse};
use super::DailySeriesSource;

pub struct AlphaVantageClient {
    http: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
    outputsize: String,
}

impl AlphaVantageClient {
    pub fn new(config: &AlphaVantageConfig) -> Result<Self> {
        let api_key = config.require_api_key()?.to_string();
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build Alpha Vantage HTTP client")?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            api_key,
            outputsize: config.outputsize.clone(),
        })
    }

    fn query_url(&self, ticker: &str) -> Result<Url, AppError> {
        let endpoint = format!("{}/query", self.base_url.trim_end_matches('/'));
        Url::parse_with_params(
            &endpoint,
            &[
                ("function", "TIME_SERIES_DAILY"),
                ("symbol", ticker),
                ("apikey", self.api_key.as_str()),
                ("outputsize", self.outputsize.as_str()),
            ],
        )
        .map_err(|e| AppError::Config(format!("invalid alphavantage.base_url: {}", e)))
    }

    pub fn fetch_daily_raw(&self, ticker: &str) -> Result<DailySeriesResponse, AppError> {
        let url = self.query_url(ticker)?;
        tracing::info!(
            ticker,
            outputsize = %self.outputsize,
            "Requesting TIME_SERIES_DAILY"
        );

        let body = self.http.get(url).send()?.error_for_status()?.text()?;
        let resp: DailySeriesResponse = serde_json::from_str(&body)?;
        Ok(resp)
    }
}

impl DailySeriesSource for AlphaVantageClient {
    fn fetch_daily(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, AppError> {
        let resp = self.fetch_daily_raw(ticker)?;
        let rows = reshape_daily(ticker, resp, start, end)?;
        tracing::info!(ticker, rows = rows.len(), %start, %end, "Daily series reshaped");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> AlphaVantageClient {
        let config = AlphaVantageConfig {
            base_url: base_url.to_string(),
            outputsize: "full".to_string(),
            months_back: 86,
            api_key: "demo".to_string(),
        };
        AlphaVantageClient::new(&config).unwrap()
    }

    #[test]
    fn query_url_carries_all_parameters() {
        let url = client("https://www.alphavantage.co/").query_url("SPOT").unwrap();
        assert_eq!(url.path(), "/query");
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.contains(&("function".into(), "TIME_SERIES_DAILY".into())));
        assert!(pairs.contains(&("symbol".into(), "SPOT".into())));
        assert!(pairs.contains(&("apikey".into(), "demo".into())));
        assert!(pairs.contains(&("outputsize".into(), "full".into())));
    }

    #[test]
    fn bad_base_url_is_config_error() {
        let err = client("not a url").query_url("SPOT").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn missing_key_fails_construction() {
        let config = AlphaVantageConfig {
            base_url: "https://www.alphavantage.co".to_string(),
            outputsize: "full".to_string(),
            months_back: 86,
            api_key: String::new(),
        };
        assert!(AlphaVantageClient::new(&config).is_err());
    }
}
