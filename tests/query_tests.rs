use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use stockpair::config::Config;
use stockpair::error::AppError;
use stockpair::model::price::PricePoint;
use stockpair::query::{DataAccess, DEFAULT_LATEST_DAYS};
use stockpair::store::ServiceStores;

fn d(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, month, day).unwrap()
}

fn temp_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("stockpair-{}-{}", name, uuid::Uuid::new_v4()))
}

fn test_config(root: &Path) -> Config {
    let toml_str = format!(
        r#"
[alphavantage]

[pipeline]
tickers = ["SPOT", "SIRI"]
pair = ["SPOT", "SIRI"]

[storage]
backend = "sqlite"
data_dir = '{}'
metrics_database = "spotify_service"

[[storage.services]]
ticker = "SPOT"
database = "spotify_service"

[[storage.services]]
ticker = "SIRI"
database = "siriusxm_service"
"#,
        root.display()
    );
    Config::from_toml_str(&toml_str).unwrap()
}

fn bar(ticker: &str, date: NaiveDate, close: f64) -> PricePoint {
    PricePoint {
        ticker: ticker.to_string(),
        date,
        open: close,
        high: close,
        low: close,
        close,
        volume: 10,
    }
}

fn seeded(name: &str) -> (Config, DataAccess) {
    let config = test_config(&temp_dir(name));
    let stores = ServiceStores::new(config.storage.clone());

    let spot: Vec<PricePoint> = (1..=40)
        .map(|day| bar("SPOT", d(3, 1) + chrono::Duration::days(day - 1), 200.0 + day as f64))
        .collect();
    stores
        .open_for_ticker("SPOT")
        .unwrap()
        .upsert_prices(&spot)
        .unwrap();

    let siri = vec![
        bar("SIRI", d(3, 4), 4.0),
        bar("SIRI", d(3, 5), 5.0),
        bar("SIRI", d(3, 6), 3.0),
        // Not a SPOT trading day in range below.
        bar("SIRI", d(5, 1), 9.0),
    ];
    stores
        .open_for_ticker("SIRI")
        .unwrap()
        .upsert_prices(&siri)
        .unwrap();

    let access = DataAccess::from_config(&config);
    (config, access)
}

#[test]
fn all_data_is_newest_first() {
    let (_, access) = seeded("all");
    let rows = access.get_all_data("SPOT").unwrap();
    assert_eq!(rows.len(), 40);
    assert!(rows.windows(2).all(|w| w[0].date > w[1].date));
}

#[test]
fn date_range_is_inclusive_and_ascending() {
    let (_, access) = seeded("range");
    let rows = access.get_data_by_date_range("SPOT", d(3, 5), d(3, 8)).unwrap();
    let dates: Vec<NaiveDate> = rows.iter().map(|p| p.date).collect();
    assert_eq!(dates, vec![d(3, 5), d(3, 6), d(3, 7), d(3, 8)]);
}

#[test]
fn latest_records_defaults_to_thirty() {
    let (_, access) = seeded("latest");
    let rows = access.get_latest_records("SPOT", DEFAULT_LATEST_DAYS).unwrap();
    assert_eq!(rows.len(), 30);
    assert_eq!(rows[0].date, d(4, 9));
    assert_eq!(access.get_latest_records("SIRI", 2).unwrap()[0].date, d(5, 1));
}

#[test]
fn unknown_ticker_lists_valid_choices() {
    let (_, access) = seeded("unknown");
    let err = access.get_all_data("AAPL").unwrap_err();
    match err {
        AppError::UnknownTicker { ticker, valid } => {
            assert_eq!(ticker, "AAPL");
            assert_eq!(valid, vec!["SPOT".to_string(), "SIRI".to_string()]);
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn compare_services_normalizes_common_dates() {
    let (_, access) = seeded("compare");
    let rows = access.compare_services(d(3, 1), d(3, 31)).unwrap().unwrap();
    let dates: Vec<NaiveDate> = rows.iter().map(|r| r.date).collect();
    assert_eq!(dates, vec![d(3, 4), d(3, 5), d(3, 6)]);

    assert!((rows[0].norm1 - 100.0).abs() < 1e-12);
    assert!((rows[0].norm2 - 100.0).abs() < 1e-12);
    assert!((rows[1].norm2 - 125.0).abs() < 1e-12);
    assert!((rows[2].norm2 - 75.0).abs() < 1e-12);
    assert!((rows[2].norm1 - 206.0 / 204.0 * 100.0).abs() < 1e-9);
}

#[test]
fn compare_services_without_data_is_none() {
    let (_, access) = seeded("compare-empty");
    assert!(access.compare_services(d(1, 1), d(1, 31)).unwrap().is_none());
}

#[test]
fn stored_comparisons_empty_before_first_run() {
    let (_, access) = seeded("metrics-empty");
    assert!(access.stored_comparisons().unwrap().is_empty());
}
