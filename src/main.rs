//! stockpair CLI: run the daily pipeline and query stored series.
//!
//! Commands:
//! - `run`: fetch every configured ticker, upsert, compare the pair
//! - `history`: print stored bars for one ticker
//! - `compare`: normalized performance of the pair over a date range
//! - `metrics`: stored daily comparison metrics

use anyhow::{bail, Context, Result};
use chrono::{Duration, Local, NaiveDate};
use clap::{Parser, Subcommand};

use stockpair::alphavantage::rest::AlphaVantageClient;
use stockpair::analysis::normalized_correlation;
use stockpair::config::Config;
use stockpair::model::price::PricePoint;
use stockpair::pipeline::Pipeline;
use stockpair::query::{DataAccess, DEFAULT_LATEST_DAYS};

const DEFAULT_COMPARE_DAYS: i64 = 180;

#[derive(Parser)]
#[command(
    name = "stockpair",
    about = "Daily equity prices per ticker, stored and compared pairwise"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch all configured tickers, store them, and compare the pair.
    Run {
        /// Treat this date (YYYY-MM-DD) as today.
        #[arg(long)]
        date: Option<String>,

        /// Render the normalized performance chart (needs the `chart` feature).
        #[arg(long, default_value_t = false)]
        chart: bool,

        /// Skip CSV exports.
        #[arg(long, default_value_t = false)]
        no_csv: bool,
    },
    /// Print stored bars for a ticker.
    History {
        ticker: String,

        /// Range start (YYYY-MM-DD).
        #[arg(long)]
        start: Option<String>,

        /// Range end (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        end: Option<String>,

        /// Most recent N bars.
        #[arg(long, conflicts_with_all = ["start", "end", "all"])]
        latest: Option<usize>,

        /// Entire stored history.
        #[arg(long, default_value_t = false, conflicts_with_all = ["start", "end"])]
        all: bool,
    },
    /// Normalized performance of the configured pair.
    Compare {
        /// Range start (YYYY-MM-DD). Defaults to 180 days before end.
        #[arg(long)]
        start: Option<String>,

        /// Range end (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        end: Option<String>,

        /// Number of trailing rows to print.
        #[arg(long, default_value_t = 5)]
        tail: usize,
    },
    /// Stored comparison metrics for the configured pair.
    Metrics,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {:#}", e);
            eprintln!("Make sure config/default.toml exists (or set STOCKPAIR_CONFIG)");
            std::process::exit(1);
        }
    };
    init_tracing(&config.logging.level);

    match cli.command {
        Commands::Run {
            date,
            chart,
            no_csv,
        } => run_pipeline(config, date, chart, no_csv),
        Commands::History {
            ticker,
            start,
            end,
            latest,
            all,
        } => run_history(&config, &ticker, start, end, latest, all),
        Commands::Compare { start, end, tail } => run_compare(&config, start, end, tail),
        Commands::Metrics => run_metrics(&config),
    }
}

fn init_tracing(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    let json = std::env::var("STOCKPAIR_LOG_JSON")
        .map(|v| v == "1")
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{}': expected YYYY-MM-DD", s))
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn run_pipeline(mut config: Config, date: Option<String>, chart: bool, no_csv: bool) -> Result<()> {
    let today = match date {
        Some(d) => parse_date(&d)?,
        None => today(),
    };
    config.pipeline.chart |= chart;
    if no_csv {
        config.pipeline.export_csv = false;
    }

    let client = AlphaVantageClient::new(&config.alphavantage)?;
    let (t1, t2) = config.pipeline.pair();
    let report = Pipeline::new(client, config).run(today);

    for (ticker, rows) in &report.stored {
        println!("Uploaded {} records for {}", rows, ticker);
    }
    for path in &report.exports {
        println!("Wrote {}", path.display());
    }
    if let Some(path) = &report.chart {
        println!("Chart saved to {}", path.display());
    }

    let Some(comparison) = &report.comparison else {
        let reason = report.comparison_failure(&t1, &t2).unwrap_or_default();
        bail!(reason);
    };
    let m = &comparison.metric;
    println!();
    println!("Latest Comparison Metrics:");
    println!("Correlation: {}", fmt_pct(m.correlation.map(|c| c * 100.0)));
    println!("{} Return: {:.2}%", t1, m.return1);
    println!("{} Return: {:.2}%", t2, m.return2);
    if !report.failed_uploads.is_empty() {
        bail!("database upload failed for {:?}", report.failed_uploads);
    }
    Ok(())
}

fn run_history(
    config: &Config,
    ticker: &str,
    start: Option<String>,
    end: Option<String>,
    latest: Option<usize>,
    all: bool,
) -> Result<()> {
    let access = DataAccess::from_config(config);
    let rows = if all {
        access.get_all_data(ticker)?
    } else if start.is_some() || end.is_some() {
        let (start, end) = resolve_range(start, end)?;
        access.get_data_by_date_range(ticker, start, end)?
    } else {
        access.get_latest_records(ticker, latest.unwrap_or(DEFAULT_LATEST_DAYS))?
    };

    if rows.is_empty() {
        println!("No stored data for {}", ticker.to_ascii_uppercase());
        return Ok(());
    }
    print_prices(&rows);
    Ok(())
}

fn resolve_range(start: Option<String>, end: Option<String>) -> Result<(NaiveDate, NaiveDate)> {
    let end = match end {
        Some(e) => parse_date(&e)?,
        None => today(),
    };
    let start = match start {
        Some(s) => parse_date(&s)?,
        None => end - Duration::days(DEFAULT_COMPARE_DAYS),
    };
    if start > end {
        bail!("start {} is after end {}", start, end);
    }
    Ok((start, end))
}

fn run_compare(
    config: &Config,
    start: Option<String>,
    end: Option<String>,
    tail: usize,
) -> Result<()> {
    let (start, end) = resolve_range(start, end)?;
    let access = DataAccess::from_config(config);
    let (t1, t2) = access.pair();

    let Some(rows) = access.compare_services(start, end)? else {
        println!("No comparison data for {} vs {} between {} and {}", t1, t2, start, end);
        return Ok(());
    };

    println!("Performance Comparison:");
    println!("{:<12} {:>12} {:>12}", "date", format!("{}_Norm", t1), format!("{}_Norm", t2));
    for r in rows.iter().skip(rows.len().saturating_sub(tail)) {
        println!("{:<12} {:>12.4} {:>12.4}", r.date, r.norm1, r.norm2);
    }
    println!();
    println!(
        "Correlation: {}",
        fmt_pct(normalized_correlation(&rows).map(|c| c * 100.0))
    );
    Ok(())
}

fn run_metrics(config: &Config) -> Result<()> {
    let access = DataAccess::from_config(config);
    let (t1, t2) = access.pair();
    let metrics = access.stored_comparisons()?;
    if metrics.is_empty() {
        println!("No stored metrics for {} vs {}", t1, t2);
        return Ok(());
    }

    println!(
        "{:<12} {:>12} {:>10} {:>10} {:>10} {:>10}",
        "date", "correlation", "vol1", "vol2", "ret1", "ret2"
    );
    for m in &metrics {
        println!(
            "{:<12} {:>12} {:>10} {:>10} {:>9.2}% {:>9.2}%",
            m.comparison_date,
            fmt_pct(m.correlation.map(|c| c * 100.0)),
            fmt_opt(m.volatility1),
            fmt_opt(m.volatility2),
            m.return1,
            m.return2,
        );
    }
    Ok(())
}

fn print_prices(rows: &[PricePoint]) {
    println!(
        "{:<12} {:<6} {:>10} {:>10} {:>10} {:>10} {:>12}",
        "date", "ticker", "open", "high", "low", "close", "volume"
    );
    for p in rows {
        println!(
            "{:<12} {:<6} {:>10.4} {:>10.4} {:>10.4} {:>10.4} {:>12}",
            p.date, p.ticker, p.open, p.high, p.low, p.close, p.volume
        );
    }
}

fn fmt_pct(v: Option<f64>) -> String {
    v.map(|v| format!("{:.2}%", v))
        .unwrap_or_else(|| "n/a".to_string())
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(|v| format!("{:.4}", v))
        .unwrap_or_else(|| "n/a".to_string())
}
