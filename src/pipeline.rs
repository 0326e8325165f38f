use chrono::NaiveDate;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::alphavantage::DailySeriesSource;
use crate::analysis::{compare_series, Comparison};
use crate::chart;
use crate::config::Config;
use crate::error::AppError;
use crate::export;
use crate::model::price::PricePoint;
use crate::store::ServiceStores;

/// What a single pipeline run did. Failures are recorded, not raised.
#[derive(Debug, Default)]
pub struct RunReport {
    pub run_id: String,
    /// Rows written per ticker, in configured order.
    pub stored: Vec<(String, usize)>,
    /// Tickers whose fetch failed; they take no further part in the run.
    pub failed_fetches: Vec<String>,
    /// Tickers fetched fine but not written to their database.
    pub failed_uploads: Vec<String>,
    pub comparison: Option<Comparison>,
    pub metric_id: Option<i64>,
    pub exports: Vec<PathBuf>,
    pub chart: Option<PathBuf>,
}

impl RunReport {
    pub fn rows_stored(&self, ticker: &str) -> Option<usize> {
        self.stored
            .iter()
            .find(|(t, _)| t == ticker)
            .map(|(_, n)| *n)
    }

    /// Why the run has no comparison, or `None` when it has one.
    pub fn comparison_failure(&self, ticker1: &str, ticker2: &str) -> Option<String> {
        if self.comparison.is_some() {
            return None;
        }
        if self.failed_fetches.is_empty() {
            Some(format!(
                "comparison of {} and {} could not be computed",
                ticker1, ticker2
            ))
        } else {
            Some(format!("Data retrieval failed for {:?}", self.failed_fetches))
        }
    }
}

pub struct Pipeline<S> {
    source: S,
    config: Config,
    stores: ServiceStores,
}

impl<S: DailySeriesSource> Pipeline<S> {
    pub fn new(source: S, config: Config) -> Self {
        let stores = ServiceStores::new(config.storage.clone());
        Self {
            source,
            config,
            stores,
        }
    }

    /// fetch → reshape → upsert per ticker, then compare the configured pair,
    /// store the day's metric and optionally export/plot.
    pub fn run(&self, today: NaiveDate) -> RunReport {
        let mut report = RunReport {
            run_id: uuid::Uuid::new_v4().to_string(),
            ..RunReport::default()
        };
        let span = tracing::info_span!("pipeline", run_id = %report.run_id);
        let _guard = span.enter();

        let (start, end) = match self.config.alphavantage.fetch_window(today) {
            Ok(window) => window,
            Err(e) => {
                tracing::error!(error = %e, "Invalid fetch window; nothing fetched");
                report.failed_fetches = self.config.pipeline.tickers();
                return report;
            }
        };
        tracing::info!(%start, %end, tickers = ?self.config.pipeline.tickers(), "Pipeline started");

        let mut fetched: HashMap<String, Vec<PricePoint>> = HashMap::new();
        for ticker in self.config.pipeline.tickers() {
            let rows = match self.source.fetch_daily(&ticker, start, end) {
                Ok(rows) => rows,
                Err(e) => {
                    tracing::error!(ticker = %ticker, error = %e, "Error fetching ticker");
                    report.failed_fetches.push(ticker);
                    continue;
                }
            };

            if self.config.pipeline.export_csv {
                match export::export_prices(&self.config.pipeline.output_dir, &ticker, today, &rows) {
                    Ok(path) => report.exports.push(path),
                    Err(e) => tracing::warn!(ticker = %ticker, error = %e, "Price CSV export failed"),
                }
            }

            match self.upload(&ticker, &rows) {
                Ok(n) => report.stored.push((ticker.clone(), n)),
                Err(e) => {
                    tracing::error!(ticker = %ticker, error = %e, "Database error");
                    report.failed_uploads.push(ticker.clone());
                }
            }
            fetched.insert(ticker, rows);
        }

        let (t1, t2) = self.config.pipeline.pair();
        match (fetched.get(&t1), fetched.get(&t2)) {
            (Some(s1), Some(s2)) => self.compare_stage(&t1, s1, &t2, s2, today, &mut report),
            _ => tracing::error!(ticker1 = %t1, ticker2 = %t2, "Data retrieval failed; comparison skipped"),
        }

        tracing::info!(
            stored = report.stored.len(),
            failed_fetches = report.failed_fetches.len(),
            failed_uploads = report.failed_uploads.len(),
            compared = report.comparison.is_some(),
            "Pipeline finished"
        );
        report
    }

    fn upload(&self, ticker: &str, rows: &[PricePoint]) -> Result<usize, AppError> {
        let mut store = self.stores.open_for_ticker(ticker)?;
        let n = store.upsert_prices(rows)?;
        tracing::info!(ticker, rows = n, database = store.database(), "Uploaded records to stock_data");
        Ok(n)
    }

    fn compare_stage(
        &self,
        t1: &str,
        s1: &[PricePoint],
        t2: &str,
        s2: &[PricePoint],
        today: NaiveDate,
        report: &mut RunReport,
    ) {
        let comparison = match compare_series(t1, s1, t2, s2, today) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(ticker1 = t1, ticker2 = t2, error = %e, "Comparison failed");
                return;
            }
        };

        if self.config.pipeline.export_csv {
            match export::export_comparison(&self.config.pipeline.output_dir, t1, t2, &comparison.rows) {
                Ok(path) => report.exports.push(path),
                Err(e) => tracing::warn!(error = %e, "Comparison CSV export failed"),
            }
        }

        match self.save_metric(&comparison) {
            Ok(id) => report.metric_id = Some(id),
            Err(e) => tracing::error!(error = %e, "Error saving metrics"),
        }

        if self.config.pipeline.chart {
            match chart::render_normalized(&self.config.pipeline.output_dir, t1, t2, &comparison.rows) {
                Ok(path) => report.chart = Some(path),
                Err(e) => tracing::warn!(error = %e, "Chart not rendered"),
            }
        }

        report.comparison = Some(comparison);
    }

    fn save_metric(&self, comparison: &Comparison) -> Result<i64, AppError> {
        let mut store = self.stores.open_metrics()?;
        let id = store.save_comparison(&comparison.metric)?;
        tracing::info!(
            id,
            database = store.database(),
            date = %comparison.metric.comparison_date,
            "Saved comparison metrics"
        );
        Ok(id)
    }
}
