use chrono::NaiveDate;
use serde::Serialize;

/// Derived pairwise statistics for one day. Unique on
/// `(comparison_date, ticker1, ticker2)`; `id` is assigned by the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonMetric {
    pub id: Option<i64>,
    pub comparison_date: NaiveDate,
    pub ticker1: String,
    pub ticker2: String,
    pub correlation: Option<f64>,
    pub volatility1: Option<f64>,
    pub volatility2: Option<f64>,
    pub return1: f64,
    pub return2: f64,
}

/// One aligned date of two close series plus their base-100 rescaling.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub date: NaiveDate,
    pub close1: f64,
    pub close2: f64,
    pub norm1: f64,
    pub norm2: f64,
}
