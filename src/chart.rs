use std::path::{Path, PathBuf};

use crate::error::AppError;
use crate::model::comparison::ComparisonRow;

pub const CHART_TITLE: &str = "Normalized Price Performance Comparison";
pub const CHART_Y_LABEL: &str = "Normalized Price (Base=100)";

pub fn chart_file_name(ticker1: &str, ticker2: &str) -> String {
    format!(
        "{}_vs_{}_performance.png",
        ticker1.to_ascii_lowercase(),
        ticker2.to_ascii_lowercase()
    )
}

/// Min/max over both normalized series, padded by 5% of the span.
pub fn value_bounds(rows: &[ComparisonRow]) -> Option<(f64, f64)> {
    let values = rows.iter().flat_map(|r| [r.norm1, r.norm2]);
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !lo.is_finite() || !hi.is_finite() {
        return None;
    }
    let pad = ((hi - lo) * 0.05).max(1.0);
    Some((lo - pad, hi + pad))
}

#[cfg(feature = "chart")]
fn chart_err<E: std::fmt::Display>(e: E) -> AppError {
    AppError::Chart(e.to_string())
}

/// Render both base-100 series as a PNG line chart in `dir`.
#[cfg(feature = "chart")]
pub fn render_normalized(
    dir: &Path,
    ticker1: &str,
    ticker2: &str,
    rows: &[ComparisonRow],
) -> Result<PathBuf, AppError> {
    use plotters::prelude::*;

    let (first, last) = match (rows.first(), rows.last()) {
        (Some(f), Some(l)) if f.date < l.date => (f.date, l.date),
        _ => {
            return Err(AppError::InsufficientData(
                "chart needs at least two distinct dates".to_string(),
            ))
        }
    };
    let (y_min, y_max) = value_bounds(rows)
        .ok_or_else(|| AppError::InsufficientData("no finite values to chart".to_string()))?;

    std::fs::create_dir_all(dir)?;
    let path = dir.join(chart_file_name(ticker1, ticker2));

    {
        let root = BitMapBackend::new(&path, (1200, 600)).into_drawing_area();
        root.fill(&WHITE).map_err(chart_err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(CHART_TITLE, ("sans-serif", 24))
            .margin(12)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(first..last, y_min..y_max)
            .map_err(chart_err)?;

        chart
            .configure_mesh()
            .y_desc(CHART_Y_LABEL)
            .draw()
            .map_err(chart_err)?;

        chart
            .draw_series(LineSeries::new(rows.iter().map(|r| (r.date, r.norm1)), &BLUE))
            .map_err(chart_err)?
            .label(ticker1)
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE));

        chart
            .draw_series(LineSeries::new(rows.iter().map(|r| (r.date, r.norm2)), &RED))
            .map_err(chart_err)?
            .label(ticker2)
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(chart_err)?;

        root.present().map_err(chart_err)?;
    }

    tracing::info!(ticker1, ticker2, path = %path.display(), "Rendered performance chart");
    Ok(path)
}

#[cfg(not(feature = "chart"))]
pub fn render_normalized(
    _dir: &Path,
    _ticker1: &str,
    _ticker2: &str,
    _rows: &[ComparisonRow],
) -> Result<PathBuf, AppError> {
    Err(AppError::Chart(
        "charting disabled: rebuild with `--features chart`".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(day: u32, norm1: f64, norm2: f64) -> ComparisonRow {
        ComparisonRow {
            date: NaiveDate::from_ymd_opt(2024, 8, day).unwrap(),
            close1: 0.0,
            close2: 0.0,
            norm1,
            norm2,
        }
    }

    #[test]
    fn file_name_is_lowercase() {
        assert_eq!(chart_file_name("SPOT", "SIRI"), "spot_vs_siri_performance.png");
    }

    #[test]
    fn bounds_cover_both_series() {
        let rows = vec![row(1, 100.0, 100.0), row(2, 140.0, 60.0)];
        let (lo, hi) = value_bounds(&rows).unwrap();
        assert!(lo < 60.0 && hi > 140.0);
        assert_eq!(value_bounds(&[]), None);
    }
}
