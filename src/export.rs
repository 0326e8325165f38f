use chrono::NaiveDate;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::AppError;
use crate::model::comparison::ComparisonRow;
use crate::model::price::PricePoint;

pub fn price_csv_name(ticker: &str, day: NaiveDate) -> String {
    format!("{}_stock_data_{}.csv", ticker, day.format("%Y%m%d"))
}

pub fn comparison_csv_name(ticker1: &str, ticker2: &str) -> String {
    format!("{}_{}_comparison.csv", ticker1, ticker2)
}

pub fn write_prices<W: Write>(out: W, rows: &[PricePoint]) -> Result<(), AppError> {
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record(["Date", "Open", "High", "Low", "Close", "Volume", "Ticker"])?;
    for p in rows {
        wtr.write_record([
            p.date.to_string(),
            p.open.to_string(),
            p.high.to_string(),
            p.low.to_string(),
            p.close.to_string(),
            p.volume.to_string(),
            p.ticker.clone(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_comparison<W: Write>(
    out: W,
    ticker1: &str,
    ticker2: &str,
    rows: &[ComparisonRow],
) -> Result<(), AppError> {
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record([
        "Date".to_string(),
        format!("Close_{}", ticker1),
        format!("Close_{}", ticker2),
        format!("{}_Norm", ticker1),
        format!("{}_Norm", ticker2),
    ])?;
    for r in rows {
        wtr.write_record([
            r.date.to_string(),
            r.close1.to_string(),
            r.close2.to_string(),
            r.norm1.to_string(),
            r.norm2.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write one ticker's fetched bars to `{dir}/{TICKER}_stock_data_{YYYYMMDD}.csv`.
pub fn export_prices(
    dir: &Path,
    ticker: &str,
    day: NaiveDate,
    rows: &[PricePoint],
) -> Result<PathBuf, AppError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(price_csv_name(ticker, day));
    write_prices(std::fs::File::create(&path)?, rows)?;
    tracing::info!(ticker, path = %path.display(), rows = rows.len(), "Exported price CSV");
    Ok(path)
}

pub fn export_comparison(
    dir: &Path,
    ticker1: &str,
    ticker2: &str,
    rows: &[ComparisonRow],
) -> Result<PathBuf, AppError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(comparison_csv_name(ticker1, ticker2));
    write_comparison(std::fs::File::create(&path)?, ticker1, ticker2, rows)?;
    tracing::info!(ticker1, ticker2, path = %path.display(), "Exported comparison CSV");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names() {
        let day = NaiveDate::from_ymd_opt(2024, 7, 4).unwrap();
        assert_eq!(price_csv_name("SPOT", day), "SPOT_stock_data_20240704.csv");
        assert_eq!(comparison_csv_name("SPOT", "SIRI"), "SPOT_SIRI_comparison.csv");
    }

    #[test]
    fn price_csv_layout() {
        let rows = vec![PricePoint {
            ticker: "SIRI".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 7, 3).unwrap(),
            open: 3.5,
            high: 3.75,
            low: 3.25,
            close: 3.5,
            volume: 42,
        }];
        let mut buf = Vec::new();
        write_prices(&mut buf, &rows).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "Date,Open,High,Low,Close,Volume,Ticker\n2024-07-03,3.5,3.75,3.25,3.5,42,SIRI\n"
        );
    }

    #[test]
    fn comparison_csv_header_names_tickers() {
        let rows = vec![ComparisonRow {
            date: NaiveDate::from_ymd_opt(2024, 7, 3).unwrap(),
            close1: 250.0,
            close2: 4.0,
            norm1: 100.0,
            norm2: 100.0,
        }];
        let mut buf = Vec::new();
        write_comparison(&mut buf, "SPOT", "SIRI", &rows).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let header = text.lines().next().unwrap();
        assert_eq!(header, "Date,Close_SPOT,Close_SIRI,SPOT_Norm,SIRI_Norm");
        assert_eq!(text.lines().count(), 2);
    }
}
