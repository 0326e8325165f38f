use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::error::AppError;
use crate::model::price::PricePoint;

/// Deserialize Alpha Vantage string-encoded numbers to f64.
pub fn string_to_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.trim().parse::<f64>().map_err(serde::de::Error::custom)
}

/// `TIME_SERIES_DAILY` response. On failure the API still answers 200 and
/// carries one of the message fields instead of the series.
#[derive(Debug, Deserialize)]
pub struct DailySeriesResponse {
    #[serde(rename = "Time Series (Daily)")]
    pub time_series: Option<BTreeMap<String, DailyBar>>,
    // Throttled: { "Note": "Thank you for using Alpha Vantage! ..." }
    #[serde(rename = "Note")]
    pub note: Option<String>,
    // Daily quota exhausted or premium-only endpoint.
    #[serde(rename = "Information")]
    pub information: Option<String>,
    // Bad symbol or malformed call.
    #[serde(rename = "Error Message")]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DailyBar {
    #[serde(rename = "1. open", deserialize_with = "string_to_f64")]
    pub open: f64,
    #[serde(rename = "2. high", deserialize_with = "string_to_f64")]
    pub high: f64,
    #[serde(rename = "3. low", deserialize_with = "string_to_f64")]
    pub low: f64,
    #[serde(rename = "4. close", deserialize_with = "string_to_f64")]
    pub close: f64,
    #[serde(rename = "5. volume", deserialize_with = "string_to_f64")]
    pub volume: f64,
}

/// Turn a raw response into the five-column table tagged with `ticker`,
/// keeping only dates in `[start, end]`, ascending.
pub fn reshape_daily(
    ticker: &str,
    resp: DailySeriesResponse,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<PricePoint>, AppError> {
    if let Some(msg) = resp.error_message {
        return Err(AppError::Api {
            ticker: ticker.to_string(),
            msg,
        });
    }
    let series = match resp.time_series {
        Some(series) => series,
        None => {
            if let Some(msg) = resp.note.or(resp.information) {
                return Err(AppError::RateLimited {
                    ticker: ticker.to_string(),
                    msg,
                });
            }
            return Err(AppError::MissingSeries {
                ticker: ticker.to_string(),
            });
        }
    };

    let mut out = Vec::with_capacity(series.len());
    for (date_str, bar) in series {
        let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
            .map_err(|e| AppError::Parse(format!("{} date '{}': {}", ticker, date_str, e)))?;
        if date < start || date > end {
            continue;
        }
        if !bar.volume.is_finite() {
            return Err(AppError::Parse(format!(
                "{} volume on {} is not a number",
                ticker, date_str
            )));
        }
        out.push(PricePoint {
            ticker: ticker.to_string(),
            date,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume as i64,
        });
    }
    out.sort_by_key(|p| p.date);

    let inconsistent = out.iter().filter(|p| !p.is_consistent()).count();
    if inconsistent > 0 {
        tracing::warn!(ticker, inconsistent, "Daily bars with inconsistent OHLCV values");
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    const BODY: &str = r#"{
        "Meta Data": { "2. Symbol": "SPOT" },
        "Time Series (Daily)": {
            "2024-03-04": { "1. open": "250.10", "2. high": "255.00", "3. low": "249.00", "4. close": "254.20", "5. volume": "1500000" },
            "2024-03-01": { "1. open": "245.00", "2. high": "251.00", "3. low": "244.50", "4. close": "250.00", "5. volume": "1200000" },
            "2023-01-03": { "1. open": "80.00", "2. high": "82.00", "3. low": "79.00", "4. close": "81.00", "5. volume": "900000" }
        }
    }"#;

    #[test]
    fn reshape_sorts_and_filters() {
        let resp: DailySeriesResponse = serde_json::from_str(BODY).unwrap();
        let rows = reshape_daily("SPOT", resp, d(2024, 1, 1), d(2024, 3, 31)).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, d(2024, 3, 1));
        assert_eq!(rows[1].date, d(2024, 3, 4));
        assert!((rows[1].close - 254.2).abs() < f64::EPSILON);
        assert_eq!(rows[1].volume, 1_500_000);
        assert!(rows.iter().all(|r| r.ticker == "SPOT"));
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let resp: DailySeriesResponse = serde_json::from_str(BODY).unwrap();
        let rows = reshape_daily("SPOT", resp, d(2024, 3, 1), d(2024, 3, 4)).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn note_maps_to_rate_limited() {
        let resp: DailySeriesResponse =
            serde_json::from_str(r#"{ "Note": "Thank you for using Alpha Vantage!" }"#).unwrap();
        let err = reshape_daily("SIRI", resp, d(2024, 1, 1), d(2024, 2, 1)).unwrap_err();
        assert!(matches!(err, AppError::RateLimited { .. }));
    }

    #[test]
    fn information_maps_to_rate_limited() {
        let resp: DailySeriesResponse = serde_json::from_str(
            r#"{ "Information": "Our standard API rate limit is 25 requests per day." }"#,
        )
        .unwrap();
        let err = reshape_daily("SPOT", resp, d(2024, 1, 1), d(2024, 2, 1)).unwrap_err();
        match err {
            AppError::RateLimited { ticker, msg } => {
                assert_eq!(ticker, "SPOT");
                assert!(msg.contains("25 requests"));
            }
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[test]
    fn error_message_maps_to_api_error() {
        let resp: DailySeriesResponse =
            serde_json::from_str(r#"{ "Error Message": "Invalid API call." }"#).unwrap();
        let err = reshape_daily("XXXX", resp, d(2024, 1, 1), d(2024, 2, 1)).unwrap_err();
        assert!(matches!(err, AppError::Api { .. }));
    }

    #[test]
    fn empty_object_is_missing_series() {
        let resp: DailySeriesResponse = serde_json::from_str("{}").unwrap();
        let err = reshape_daily("SPOT", resp, d(2024, 1, 1), d(2024, 2, 1)).unwrap_err();
        assert!(matches!(err, AppError::MissingSeries { .. }));
    }

    #[test]
    fn non_numeric_value_fails_to_deserialize() {
        let body = r#"{ "Time Series (Daily)": { "2024-03-01": { "1. open": "n/a", "2. high": "1", "3. low": "1", "4. close": "1", "5. volume": "1" } } }"#;
        assert!(serde_json::from_str::<DailySeriesResponse>(body).is_err());
    }
}
