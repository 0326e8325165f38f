use chrono::NaiveDate;
use postgres::{Client, NoTls, Row};

use crate::config::StorageConfig;
use crate::error::AppError;
use crate::model::comparison::ComparisonMetric;
use crate::model::price::PricePoint;

use super::{sql_limit, MarketStore};

/// One Postgres database per service on a shared host.
pub struct PostgresStore {
    client: Client,
    database: String,
}

impl PostgresStore {
    pub fn connect(config: &StorageConfig, database: &str) -> Result<Self, AppError> {
        let client = Client::configure()
            .host(&config.host)
            .port(config.port)
            .user(&config.user)
            .password(&config.password)
            .dbname(database)
            .connect(NoTls)
            .map_err(|e| {
                tracing::error!(database, host = %config.host, error = %e, "Error connecting to database");
                AppError::Postgres(e)
            })?;
        Ok(Self {
            client,
            database: database.to_string(),
        })
    }
}

/// Column types are checked per read; a table created with other types
/// (e.g. NUMERIC prices) surfaces as an error instead of a panic.
fn price_from_row(row: &Row) -> Result<PricePoint, AppError> {
    Ok(PricePoint {
        ticker: row.try_get(0)?,
        date: row.try_get(1)?,
        open: row.try_get(2)?,
        high: row.try_get(3)?,
        low: row.try_get(4)?,
        close: row.try_get(5)?,
        volume: row.try_get(6)?,
    })
}

fn comparison_from_row(row: &Row) -> Result<ComparisonMetric, AppError> {
    Ok(ComparisonMetric {
        id: Some(row.try_get(0)?),
        comparison_date: row.try_get(1)?,
        ticker1: row.try_get(2)?,
        ticker2: row.try_get(3)?,
        correlation: row.try_get(4)?,
        volatility1: row.try_get(5)?,
        volatility2: row.try_get(6)?,
        return1: row.try_get(7)?,
        return2: row.try_get(8)?,
    })
}

impl MarketStore for PostgresStore {
    fn database(&self) -> &str {
        &self.database
    }

    fn ensure_schema(&mut self) -> Result<(), AppError> {
        self.client.batch_execute(
            r#"
            CREATE TABLE IF NOT EXISTS stock_data (
                ticker VARCHAR(10) NOT NULL,
                date DATE NOT NULL,
                open DOUBLE PRECISION,
                high DOUBLE PRECISION,
                low DOUBLE PRECISION,
                close DOUBLE PRECISION,
                volume BIGINT,
                PRIMARY KEY (ticker, date)
            );

            CREATE TABLE IF NOT EXISTS comparison_metrics (
                comparison_id BIGSERIAL PRIMARY KEY,
                comparison_date DATE NOT NULL,
                ticker1 VARCHAR(10) NOT NULL,
                ticker2 VARCHAR(10) NOT NULL,
                correlation DOUBLE PRECISION,
                volatility1 DOUBLE PRECISION,
                volatility2 DOUBLE PRECISION,
                return1 DOUBLE PRECISION,
                return2 DOUBLE PRECISION,
                UNIQUE (comparison_date, ticker1, ticker2)
            );
            "#,
        )?;
        Ok(())
    }

    fn upsert_prices(&mut self, rows: &[PricePoint]) -> Result<usize, AppError> {
        let mut tx = self.client.transaction()?;
        let stmt = tx.prepare(
            r#"
            INSERT INTO stock_data (ticker, date, open, high, low, close, volume)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (ticker, date) DO UPDATE SET
                open = EXCLUDED.open,
                high = EXCLUDED.high,
                low = EXCLUDED.low,
                close = EXCLUDED.close,
                volume = EXCLUDED.volume
            "#,
        )?;
        for p in rows {
            tx.execute(
                &stmt,
                &[&p.ticker, &p.date, &p.open, &p.high, &p.low, &p.close, &p.volume],
            )?;
        }
        tx.commit()?;
        Ok(rows.len())
    }

    fn all_prices(&mut self, ticker: &str) -> Result<Vec<PricePoint>, AppError> {
        let rows = self.client.query(
            r#"
            SELECT ticker, date, open, high, low, close, volume
            FROM stock_data
            WHERE ticker = $1
            ORDER BY date DESC
            "#,
            &[&ticker],
        )?;
        rows.iter().map(price_from_row).collect()
    }

    fn prices_between(
        &mut self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, AppError> {
        let rows = self.client.query(
            r#"
            SELECT ticker, date, open, high, low, close, volume
            FROM stock_data
            WHERE ticker = $1 AND date BETWEEN $2 AND $3
            ORDER BY date ASC
            "#,
            &[&ticker, &start, &end],
        )?;
        rows.iter().map(price_from_row).collect()
    }

    fn latest_prices(&mut self, ticker: &str, limit: usize) -> Result<Vec<PricePoint>, AppError> {
        let limit = sql_limit(limit);
        let rows = self.client.query(
            r#"
            SELECT ticker, date, open, high, low, close, volume
            FROM stock_data
            WHERE ticker = $1
            ORDER BY date DESC
            LIMIT $2
            "#,
            &[&ticker, &limit],
        )?;
        rows.iter().map(price_from_row).collect()
    }

    fn save_comparison(&mut self, metric: &ComparisonMetric) -> Result<i64, AppError> {
        let row = self.client.query_one(
            r#"
            INSERT INTO comparison_metrics (
                comparison_date, ticker1, ticker2, correlation,
                volatility1, volatility2, return1, return2
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (comparison_date, ticker1, ticker2) DO UPDATE SET
                correlation = EXCLUDED.correlation,
                volatility1 = EXCLUDED.volatility1,
                volatility2 = EXCLUDED.volatility2,
                return1 = EXCLUDED.return1,
                return2 = EXCLUDED.return2
            RETURNING comparison_id
            "#,
            &[
                &metric.comparison_date,
                &metric.ticker1,
                &metric.ticker2,
                &metric.correlation,
                &metric.volatility1,
                &metric.volatility2,
                &metric.return1,
                &metric.return2,
            ],
        )?;
        Ok(row.try_get(0)?)
    }

    fn comparisons(
        &mut self,
        ticker1: &str,
        ticker2: &str,
    ) -> Result<Vec<ComparisonMetric>, AppError> {
        let rows = self.client.query(
            r#"
            SELECT comparison_id, comparison_date, ticker1, ticker2, correlation,
                   volatility1, volatility2, return1, return2
            FROM comparison_metrics
            WHERE ticker1 = $1 AND ticker2 = $2
            ORDER BY comparison_date ASC
            "#,
            &[&ticker1, &ticker2],
        )?;
        rows.iter().map(comparison_from_row).collect()
    }
}
