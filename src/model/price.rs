use chrono::NaiveDate;
use serde::Serialize;

/// One daily OHLCV bar for a ticker. Keyed by `(ticker, date)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricePoint {
    pub ticker: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl PricePoint {
    /// Bar is internally consistent: low <= open/close <= high, volume >= 0.
    pub fn is_consistent(&self) -> bool {
        let prices = [self.open, self.high, self.low, self.close];
        prices.iter().all(|p| p.is_finite())
            && self.low <= self.high
            && (self.low..=self.high).contains(&self.open)
            && (self.low..=self.high).contains(&self.close)
            && self.volume >= 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(open: f64, high: f64, low: f64, close: f64, volume: i64) -> PricePoint {
        PricePoint {
            ticker: "SPOT".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            open,
            high,
            low,
            close,
            volume,
        }
    }

    #[test]
    fn consistent_bar() {
        assert!(bar(10.0, 12.0, 9.5, 11.0, 1_000).is_consistent());
    }

    #[test]
    fn inconsistent_bars() {
        assert!(!bar(13.0, 12.0, 9.5, 11.0, 1_000).is_consistent());
        assert!(!bar(10.0, 12.0, 9.5, 9.0, 1_000).is_consistent());
        assert!(!bar(10.0, 12.0, 9.5, 11.0, -1).is_consistent());
        assert!(!bar(f64::NAN, 12.0, 9.5, 11.0, 1).is_consistent());
    }
}
