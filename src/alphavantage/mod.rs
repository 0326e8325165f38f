pub mod rest;
pub mod types;

use chrono::NaiveDate;

use crate::error::AppError;
use crate::model::price::PricePoint;

/// Where the pipeline gets daily bars from. `[start, end]` is inclusive and
/// the returned bars are sorted by ascending date.
pub trait DailySeriesSource {
    fn fetch_daily(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, AppError>;
}
