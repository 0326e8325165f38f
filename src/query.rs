use chrono::NaiveDate;

use crate::analysis::{align_closes, comparison_rows};
use crate::config::{normalize_ticker, Config};
use crate::error::AppError;
use crate::model::comparison::{ComparisonMetric, ComparisonRow};
use crate::model::price::PricePoint;
use crate::store::ServiceStores;

pub const DEFAULT_LATEST_DAYS: usize = 30;

/// Read-side access to the per-ticker databases. Every call opens the
/// ticker's own database and closes it when done.
pub struct DataAccess {
    stores: ServiceStores,
    pair: (String, String),
}

impl DataAccess {
    pub fn new(stores: ServiceStores, pair: (String, String)) -> Self {
        Self { stores, pair }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            ServiceStores::new(config.storage.clone()),
            config.pipeline.pair(),
        )
    }

    pub fn pair(&self) -> (&str, &str) {
        (&self.pair.0, &self.pair.1)
    }

    /// Full history, newest first.
    pub fn get_all_data(&self, ticker: &str) -> Result<Vec<PricePoint>, AppError> {
        let ticker = normalize_ticker(ticker);
        let mut store = self.stores.open_for_ticker(&ticker)?;
        store.all_prices(&ticker)
    }

    /// Bars with `start <= date <= end`, oldest first.
    pub fn get_data_by_date_range(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, AppError> {
        let ticker = normalize_ticker(ticker);
        let mut store = self.stores.open_for_ticker(&ticker)?;
        store.prices_between(&ticker, start, end)
    }

    /// The `days` most recent bars, newest first.
    pub fn get_latest_records(&self, ticker: &str, days: usize) -> Result<Vec<PricePoint>, AppError> {
        let ticker = normalize_ticker(ticker);
        let mut store = self.stores.open_for_ticker(&ticker)?;
        store.latest_prices(&ticker, days)
    }

    /// Closes of the configured pair over `[start, end]` joined on date, with
    /// each side rescaled to 100 at the first common date. `None` when either
    /// side has nothing in range.
    pub fn compare_services(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<Vec<ComparisonRow>>, AppError> {
        let (t1, t2) = self.pair();
        let s1 = self.get_data_by_date_range(t1, start, end)?;
        let s2 = self.get_data_by_date_range(t2, start, end)?;
        if s1.is_empty() || s2.is_empty() {
            tracing::warn!(
                ticker1 = t1,
                ticker2 = t2,
                rows1 = s1.len(),
                rows2 = s2.len(),
                "Comparison range has no data for one side"
            );
            return Ok(None);
        }

        let aligned = align_closes(&s1, &s2);
        if aligned.is_empty() {
            return Ok(None);
        }
        comparison_rows(&aligned).map(Some)
    }

    /// Stored daily metrics for the configured pair, oldest first.
    pub fn stored_comparisons(&self) -> Result<Vec<ComparisonMetric>, AppError> {
        let (t1, t2) = self.pair();
        let mut store = self.stores.open_metrics()?;
        store.comparisons(t1, t2)
    }
}
