use anyhow::{bail, Context, Result};
use chrono::{Days, NaiveDate};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::AppError;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Upper bound for `alphavantage.months_back` (100 years of 30-day months).
pub const MAX_MONTHS_BACK: u32 = 1200;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub alphavantage: AlphaVantageConfig,
    pub pipeline: PipelineConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlphaVantageConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_outputsize")]
    pub outputsize: String,
    #[serde(default = "default_months_back")]
    pub months_back: u32,
    #[serde(skip)]
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    pub tickers: Vec<String>,
    pub pair: [String; 2],
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_true")]
    pub export_csv: bool,
    #[serde(default)]
    pub chart: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Sqlite,
    Postgres,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub metrics_database: String,
    #[serde(default)]
    pub services: Vec<ServiceDatabase>,
    #[serde(skip)]
    pub user: String,
    #[serde(skip)]
    pub password: String,
}

/// One database per ticker ("service").
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceDatabase {
    pub ticker: String,
    pub database: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

fn default_base_url() -> String {
    "https://www.alphavantage.co".to_string()
}

fn default_outputsize() -> String {
    "full".to_string()
}

fn default_months_back() -> u32 {
    86
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    5432
}

fn default_true() -> bool {
    true
}

pub fn normalize_ticker(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

impl AlphaVantageConfig {
    /// Inclusive `[start, end]` window of dates kept from a response.
    /// A "month" is counted as 30 days.
    pub fn fetch_window(
        &self,
        today: NaiveDate,
    ) -> std::result::Result<(NaiveDate, NaiveDate), AppError> {
        let days = 30 * u64::from(self.months_back);
        let start = today.checked_sub_days(Days::new(days)).ok_or_else(|| {
            AppError::Config(format!(
                "alphavantage.months_back = {} reaches before the earliest supported date",
                self.months_back
            ))
        })?;
        Ok((start, today))
    }

    pub fn require_api_key(&self) -> Result<&str> {
        if self.api_key.trim().is_empty() {
            bail!("ALPHAVANTAGE_API_KEY not set in .env or environment");
        }
        Ok(&self.api_key)
    }
}

impl PipelineConfig {
    pub fn tickers(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for raw in &self.tickers {
            let t = normalize_ticker(raw);
            if !t.is_empty() && !out.iter().any(|v| v == &t) {
                out.push(t);
            }
        }
        out
    }

    pub fn pair(&self) -> (String, String) {
        (normalize_ticker(&self.pair[0]), normalize_ticker(&self.pair[1]))
    }
}

impl StorageConfig {
    pub fn tickers(&self) -> Vec<String> {
        self.services
            .iter()
            .map(|s| normalize_ticker(&s.ticker))
            .collect()
    }

    pub fn database_for(&self, ticker: &str) -> std::result::Result<&str, AppError> {
        let wanted = normalize_ticker(ticker);
        self.services
            .iter()
            .find(|s| normalize_ticker(&s.ticker) == wanted)
            .map(|s| s.database.as_str())
            .ok_or_else(|| AppError::UnknownTicker {
                ticker: ticker.to_string(),
                valid: self.tickers(),
            })
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config_path = std::env::var("STOCKPAIR_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        let mut config = Self::from_path(&config_path)?;

        config.alphavantage.api_key = std::env::var("ALPHAVANTAGE_API_KEY").unwrap_or_default();
        config.storage.user = std::env::var("STOCKPAIR_DB_USER").unwrap_or_default();
        config.storage.password = std::env::var("STOCKPAIR_DB_PASSWORD").unwrap_or_default();

        if config.storage.backend == StorageBackend::Postgres && config.storage.user.is_empty() {
            bail!("STOCKPAIR_DB_USER not set in .env or environment (required for postgres)");
        }

        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&config_str)
            .with_context(|| format!("failed to parse {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let av = &self.alphavantage;
        if av.months_back == 0 || av.months_back > MAX_MONTHS_BACK {
            bail!(
                "alphavantage.months_back must be between 1 and {}, got {}",
                MAX_MONTHS_BACK,
                av.months_back
            );
        }
        if av.outputsize != "compact" && av.outputsize != "full" {
            bail!(
                "alphavantage.outputsize '{}' is invalid, expected compact|full",
                av.outputsize
            );
        }

        let tickers = self.pipeline.tickers();
        if tickers.is_empty() {
            bail!("pipeline.tickers must name at least one ticker");
        }
        let (first, second) = self.pipeline.pair();
        if first == second {
            bail!("pipeline.pair must name two distinct tickers, got {}", first);
        }
        for t in [&first, &second] {
            if !tickers.contains(t) {
                bail!("pipeline.pair ticker {} is not listed in pipeline.tickers", t);
            }
        }
        for t in &tickers {
            self.storage
                .database_for(t)
                .context("every pipeline ticker needs a [[storage.services]] entry")?;
        }
        if self.storage.metrics_database.trim().is_empty() {
            bail!("storage.metrics_database must not be empty");
        }
        Ok(())
    }
}
