use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::error::AppError;
use crate::indicator::stats::{pct_change, pearson, sample_std_dev};
use crate::model::comparison::{ComparisonMetric, ComparisonRow};
use crate::model::price::PricePoint;

/// Result of comparing two daily series over their common dates.
#[derive(Debug, Clone)]
pub struct Comparison {
    pub metric: ComparisonMetric,
    pub rows: Vec<ComparisonRow>,
}

impl Comparison {
    /// Correlation of the two base-100 series (levels, not returns).
    pub fn normalized_correlation(&self) -> Option<f64> {
        normalized_correlation(&self.rows)
    }
}

pub fn normalized_correlation(rows: &[ComparisonRow]) -> Option<f64> {
    let n1: Vec<f64> = rows.iter().map(|r| r.norm1).collect();
    let n2: Vec<f64> = rows.iter().map(|r| r.norm2).collect();
    pearson(&n1, &n2)
}

/// Inner join of two bar series on date, ascending. Input order does not matter.
pub fn align_closes(a: &[PricePoint], b: &[PricePoint]) -> Vec<(NaiveDate, f64, f64)> {
    let left: BTreeMap<NaiveDate, f64> = a.iter().map(|p| (p.date, p.close)).collect();
    let right: BTreeMap<NaiveDate, f64> = b.iter().map(|p| (p.date, p.close)).collect();
    left.into_iter()
        .filter_map(|(date, c1)| right.get(&date).map(|c2| (date, c1, *c2)))
        .collect()
}

/// Rescale so the first observation equals 100. `None` when the series is
/// empty or starts at a non-positive price.
pub fn normalize(series: &[f64]) -> Option<Vec<f64>> {
    let first = *series.first()?;
    if !(first.is_finite() && first > 0.0) {
        return None;
    }
    Some(series.iter().map(|x| x / first * 100.0).collect())
}

/// Aligned closes plus their normalized values.
pub fn comparison_rows(aligned: &[(NaiveDate, f64, f64)]) -> Result<Vec<ComparisonRow>, AppError> {
    let c1: Vec<f64> = aligned.iter().map(|(_, a, _)| *a).collect();
    let c2: Vec<f64> = aligned.iter().map(|(_, _, b)| *b).collect();
    let (n1, n2) = match (normalize(&c1), normalize(&c2)) {
        (Some(n1), Some(n2)) => (n1, n2),
        _ => {
            return Err(AppError::InsufficientData(
                "cannot normalize: series empty or first close is not positive".to_string(),
            ))
        }
    };

    Ok(aligned
        .iter()
        .zip(n1.into_iter().zip(n2))
        .map(|(&(date, close1, close2), (norm1, norm2))| ComparisonRow {
            date,
            close1,
            close2,
            norm1,
            norm2,
        })
        .collect())
}

/// Correlation of daily returns, per-ticker return volatility and
/// cumulative return (last normalized value minus 100) over common dates.
pub fn compare_series(
    ticker1: &str,
    series1: &[PricePoint],
    ticker2: &str,
    series2: &[PricePoint],
    comparison_date: NaiveDate,
) -> Result<Comparison, AppError> {
    let aligned = align_closes(series1, series2);
    if aligned.len() < 2 {
        return Err(AppError::InsufficientData(format!(
            "{} and {} share {} trading day(s), need at least 2",
            ticker1,
            ticker2,
            aligned.len()
        )));
    }

    let rows = comparison_rows(&aligned)?;
    let closes1: Vec<f64> = rows.iter().map(|r| r.close1).collect();
    let closes2: Vec<f64> = rows.iter().map(|r| r.close2).collect();
    let returns1 = pct_change(&closes1);
    let returns2 = pct_change(&closes2);

    // `rows` has at least two entries here.
    let last = &rows[rows.len() - 1];
    let metric = ComparisonMetric {
        id: None,
        comparison_date,
        ticker1: ticker1.to_string(),
        ticker2: ticker2.to_string(),
        correlation: pearson(&returns1, &returns2),
        volatility1: sample_std_dev(&returns1),
        volatility2: sample_std_dev(&returns2),
        return1: last.norm1 - 100.0,
        return2: last.norm2 - 100.0,
    };

    tracing::debug!(
        ticker1,
        ticker2,
        days = rows.len(),
        correlation = ?metric.correlation,
        "Computed comparison metrics"
    );
    Ok(Comparison { metric, rows })
}
