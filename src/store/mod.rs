pub mod pg;
pub mod sqlite;

use chrono::NaiveDate;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::AppError;
use crate::model::comparison::ComparisonMetric;
use crate::model::price::PricePoint;

pub use self::pg::PostgresStore;
pub use self::sqlite::SqliteStore;

/// SQL `LIMIT` value for a row count. Counts past `i64::MAX` saturate
/// instead of wrapping negative.
pub(crate) fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

/// A single service database holding `stock_data` and `comparison_metrics`.
pub trait MarketStore {
    /// Name of the service database this handle points at.
    fn database(&self) -> &str;

    fn ensure_schema(&mut self) -> Result<(), AppError>;

    /// Insert-or-update keyed by `(ticker, date)`. Returns rows written.
    fn upsert_prices(&mut self, rows: &[PricePoint]) -> Result<usize, AppError>;

    /// Full history, newest first.
    fn all_prices(&mut self, ticker: &str) -> Result<Vec<PricePoint>, AppError>;

    /// Inclusive range, oldest first.
    fn prices_between(
        &mut self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, AppError>;

    /// The `limit` most recent bars, newest first.
    fn latest_prices(&mut self, ticker: &str, limit: usize) -> Result<Vec<PricePoint>, AppError>;

    /// Insert-or-update keyed by `(comparison_date, ticker1, ticker2)`.
    /// Returns the row id.
    fn save_comparison(&mut self, metric: &ComparisonMetric) -> Result<i64, AppError>;

    /// Stored comparisons for a pair, oldest first.
    fn comparisons(
        &mut self,
        ticker1: &str,
        ticker2: &str,
    ) -> Result<Vec<ComparisonMetric>, AppError>;
}

/// Routes each ticker to its own database on the configured backend.
#[derive(Debug, Clone)]
pub struct ServiceStores {
    config: StorageConfig,
}

impl ServiceStores {
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }

    pub fn open_for_ticker(&self, ticker: &str) -> Result<Box<dyn MarketStore>, AppError> {
        let database = self.config.database_for(ticker)?;
        self.open_database(database)
    }

    pub fn open_metrics(&self) -> Result<Box<dyn MarketStore>, AppError> {
        self.open_database(&self.config.metrics_database)
    }

    pub fn open_database(&self, database: &str) -> Result<Box<dyn MarketStore>, AppError> {
        let mut store: Box<dyn MarketStore> = match self.config.backend {
            StorageBackend::Sqlite => {
                std::fs::create_dir_all(&self.config.data_dir)?;
                let path = self.config.data_dir.join(format!("{}.sqlite", database));
                Box::new(SqliteStore::open(&path, database)?)
            }
            StorageBackend::Postgres => Box::new(PostgresStore::connect(&self.config, database)?),
        };
        store.ensure_schema()?;
        tracing::debug!(database, backend = ?self.config.backend, "Opened service database");
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sql_limit_saturates() {
        assert_eq!(sql_limit(30), 30);
        assert_eq!(sql_limit(usize::MAX), i64::MAX);
    }
}
