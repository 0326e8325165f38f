use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use std::path::Path;

use crate::error::AppError;
use crate::model::comparison::ComparisonMetric;
use crate::model::price::PricePoint;

use super::{sql_limit, MarketStore};

const DATE_FMT: &str = "%Y-%m-%d";

pub struct SqliteStore {
    conn: Connection,
    database: String,
}

impl SqliteStore {
    pub fn open(path: &Path, database: &str) -> Result<Self, AppError> {
        let conn = Connection::open(path)?;
        Ok(Self {
            conn,
            database: database.to_string(),
        })
    }

    pub fn open_in_memory(database: &str) -> Result<Self, AppError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn,
            database: database.to_string(),
        })
    }

    fn query_prices<P: rusqlite::Params>(
        &self,
        sql: &str,
        params: P,
    ) -> Result<Vec<PricePoint>, AppError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, price_from_row)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

fn date_text(date: NaiveDate) -> String {
    date.format(DATE_FMT).to_string()
}

fn date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, DATE_FMT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn price_from_row(row: &Row<'_>) -> rusqlite::Result<PricePoint> {
    Ok(PricePoint {
        ticker: row.get(0)?,
        date: date_column(row, 1)?,
        open: row.get(2)?,
        high: row.get(3)?,
        low: row.get(4)?,
        close: row.get(5)?,
        volume: row.get(6)?,
    })
}

impl MarketStore for SqliteStore {
    fn database(&self) -> &str {
        &self.database
    }

    fn ensure_schema(&mut self) -> Result<(), AppError> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS stock_data (
                ticker TEXT NOT NULL,
                date TEXT NOT NULL,
                open REAL,
                high REAL,
                low REAL,
                close REAL,
                volume INTEGER,
                PRIMARY KEY(ticker, date)
            );

            CREATE TABLE IF NOT EXISTS comparison_metrics (
                comparison_id INTEGER PRIMARY KEY AUTOINCREMENT,
                comparison_date TEXT NOT NULL,
                ticker1 TEXT NOT NULL,
                ticker2 TEXT NOT NULL,
                correlation REAL,
                volatility1 REAL,
                volatility2 REAL,
                return1 REAL,
                return2 REAL,
                UNIQUE(comparison_date, ticker1, ticker2)
            );
            "#,
        )?;
        Ok(())
    }

    fn upsert_prices(&mut self, rows: &[PricePoint]) -> Result<usize, AppError> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO stock_data (ticker, date, open, high, low, close, volume)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(ticker, date) DO UPDATE SET
                    open = excluded.open,
                    high = excluded.high,
                    low = excluded.low,
                    close = excluded.close,
                    volume = excluded.volume
                "#,
            )?;
            for p in rows {
                stmt.execute(params![
                    p.ticker,
                    date_text(p.date),
                    p.open,
                    p.high,
                    p.low,
                    p.close,
                    p.volume,
                ])?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    fn all_prices(&mut self, ticker: &str) -> Result<Vec<PricePoint>, AppError> {
        self.query_prices(
            r#"
            SELECT ticker, date, open, high, low, close, volume
            FROM stock_data
            WHERE ticker = ?1
            ORDER BY date DESC
            "#,
            params![ticker],
        )
    }

    fn prices_between(
        &mut self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, AppError> {
        self.query_prices(
            r#"
            SELECT ticker, date, open, high, low, close, volume
            FROM stock_data
            WHERE ticker = ?1 AND date BETWEEN ?2 AND ?3
            ORDER BY date ASC
            "#,
            params![ticker, date_text(start), date_text(end)],
        )
    }

    fn latest_prices(&mut self, ticker: &str, limit: usize) -> Result<Vec<PricePoint>, AppError> {
        self.query_prices(
            r#"
            SELECT ticker, date, open, high, low, close, volume
            FROM stock_data
            WHERE ticker = ?1
            ORDER BY date DESC
            LIMIT ?2
            "#,
            params![ticker, sql_limit(limit)],
        )
    }

    fn save_comparison(&mut self, metric: &ComparisonMetric) -> Result<i64, AppError> {
        let id = self.conn.query_row(
            r#"
            INSERT INTO comparison_metrics (
                comparison_date, ticker1, ticker2, correlation,
                volatility1, volatility2, return1, return2
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(comparison_date, ticker1, ticker2) DO UPDATE SET
                correlation = excluded.correlation,
                volatility1 = excluded.volatility1,
                volatility2 = excluded.volatility2,
                return1 = excluded.return1,
                return2 = excluded.return2
            RETURNING comparison_id
            "#,
            params![
                date_text(metric.comparison_date),
                metric.ticker1,
                metric.ticker2,
                metric.correlation,
                metric.volatility1,
                metric.volatility2,
                metric.return1,
                metric.return2,
            ],
            |row| row.get::<_, i64>(0),
        )?;
        Ok(id)
    }

    fn comparisons(
        &mut self,
        ticker1: &str,
        ticker2: &str,
    ) -> Result<Vec<ComparisonMetric>, AppError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT comparison_id, comparison_date, ticker1, ticker2, correlation,
                   volatility1, volatility2, return1, return2
            FROM comparison_metrics
            WHERE ticker1 = ?1 AND ticker2 = ?2
            ORDER BY comparison_date ASC
            "#,
        )?;
        let rows = stmt.query_map(params![ticker1, ticker2], |row| {
            Ok(ComparisonMetric {
                id: Some(row.get(0)?),
                comparison_date: date_column(row, 1)?,
                ticker1: row.get(2)?,
                ticker2: row.get(3)?,
                correlation: row.get(4)?,
                volatility1: row.get(5)?,
                volatility2: row.get(6)?,
                return1: row.get(7)?,
                return2: row.get(8)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
    }

    fn bar(ticker: &str, day: u32, close: f64) -> PricePoint {
        PricePoint {
            ticker: ticker.to_string(),
            date: d(day),
            open: close - 1.0,
            high: close + 1.0,
            low: close - 2.0,
            close,
            volume: 1_000 + i64::from(day),
        }
    }

    fn store() -> SqliteStore {
        let mut s = SqliteStore::open_in_memory("spotify_service").unwrap();
        s.ensure_schema().unwrap();
        s
    }

    #[test]
    fn upsert_replaces_existing_day() {
        let mut s = store();
        s.upsert_prices(&[bar("SPOT", 1, 10.0), bar("SPOT", 2, 11.0)])
            .unwrap();
        s.upsert_prices(&[bar("SPOT", 2, 12.5)]).unwrap();

        let all = s.all_prices("SPOT").unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].date, d(2));
        assert!((all[0].close - 12.5).abs() < f64::EPSILON);
    }

    #[test]
    fn range_and_latest_ordering() {
        let mut s = store();
        let rows: Vec<PricePoint> = (1..=6).map(|day| bar("SPOT", day, day as f64)).collect();
        s.upsert_prices(&rows).unwrap();

        let range = s.prices_between("SPOT", d(2), d(4)).unwrap();
        let dates: Vec<NaiveDate> = range.iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![d(2), d(3), d(4)]);

        let latest = s.latest_prices("SPOT", 2).unwrap();
        let dates: Vec<NaiveDate> = latest.iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![d(6), d(5)]);
    }

    #[test]
    fn huge_latest_limit_returns_everything() {
        let mut s = store();
        let rows: Vec<PricePoint> = (1..=3).map(|day| bar("SPOT", day, day as f64)).collect();
        s.upsert_prices(&rows).unwrap();
        assert_eq!(s.latest_prices("SPOT", usize::MAX).unwrap().len(), 3);
    }

    #[test]
    fn queries_are_scoped_to_ticker() {
        let mut s = store();
        s.upsert_prices(&[bar("SPOT", 1, 10.0), bar("SIRI", 1, 4.0)])
            .unwrap();
        assert_eq!(s.all_prices("SIRI").unwrap().len(), 1);
        assert!(s.all_prices("AAPL").unwrap().is_empty());
    }

    #[test]
    fn comparison_is_idempotent_per_day() {
        let mut s = store();
        let mut metric = ComparisonMetric {
            id: None,
            comparison_date: d(10),
            ticker1: "SPOT".to_string(),
            ticker2: "SIRI".to_string(),
            correlation: Some(0.42),
            volatility1: Some(0.02),
            volatility2: None,
            return1: 15.0,
            return2: -8.0,
        };
        let first = s.save_comparison(&metric).unwrap();
        metric.correlation = Some(0.5);
        let second = s.save_comparison(&metric).unwrap();
        assert_eq!(first, second);

        let stored = s.comparisons("SPOT", "SIRI").unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].correlation, Some(0.5));
        assert_eq!(stored[0].volatility2, None);
        assert_eq!(stored[0].id, Some(first));
    }
}
