//! pattern-scanner: scan OHLCV histories for chart patterns and write the
//! labeled records to CSV.
//!
//! Usage:
//!   pattern-scanner --tickers BTC-USD,ETH-USD --output patterns.csv
//!   pattern-scanner --tickers AAPL --intervals 1d,1h --patterns DTB \
//!       --strategies swing_short --period 1y --output out.csv
//!   pattern-scanner --tickers BTC --data-dir fixtures/ --output out.csv
//!   pattern-scanner --tickers BTC-USD --output out.csv --debug DTB \
//!       --debug-dir /tmp/scan-debug

mod driver;
mod sink;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use market_data::{CsvBarFeed, YahooChartClient};
use pattern_core::{PatternFamily, PriceFeed};
use pattern_engine::{DebugLog, ScanConfig};

use crate::driver::{run_scan, ScanRequest};
use crate::sink::CsvSink;

#[derive(Parser, Debug)]
#[command(name = "pattern-scanner", about = "Chart pattern scanner over OHLCV series")]
struct Cli {
    /// Comma-separated tickers to scan.
    #[arg(long, value_delimiter = ',', required = true)]
    tickers: Vec<String>,

    /// Comma-separated ZigZag strategy presets.
    #[arg(long, value_delimiter = ',', default_value = "swing_short")]
    strategies: Vec<String>,

    /// Comma-separated bar intervals.
    #[arg(long, value_delimiter = ',', default_value = "1d")]
    intervals: Vec<String>,

    /// History length requested from the producer.
    #[arg(long, default_value = "1y")]
    period: String,

    /// Pattern families: HNS, DTB, TTB or ALL.
    #[arg(long, default_value = "ALL")]
    patterns: String,

    /// Output CSV path.
    #[arg(long, required = true)]
    output: PathBuf,

    /// Optional TOML file overlaid on the default configuration.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Pattern families whose candidate log is written: HNS, DTB, TTB or ALL.
    #[arg(long)]
    debug: Option<String>,

    /// Directory for the per-family debug logs.
    #[arg(long)]
    debug_dir: Option<PathBuf>,

    /// Replay `<dir>/<ticker>.csv` files instead of fetching over HTTP.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Maximum tuples scanned concurrently.
    #[arg(long, default_value_t = 4)]
    concurrency: usize,
}

fn families_or_exit(text: &str) -> Vec<PatternFamily> {
    match parse_families(text) {
        Ok(families) => families,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(2);
        }
    }
}

fn parse_families(text: &str) -> anyhow::Result<Vec<PatternFamily>> {
    let mut families = Vec::new();
    for part in text.split(',') {
        match part.trim().to_ascii_uppercase().as_str() {
            "ALL" => {
                return Ok(vec![
                    PatternFamily::Hns,
                    PatternFamily::Dtb,
                    PatternFamily::Ttb,
                ])
            }
            "HNS" => families.push(PatternFamily::Hns),
            "DTB" => families.push(PatternFamily::Dtb),
            "TTB" => families.push(PatternFamily::Ttb),
            other => anyhow::bail!("unknown pattern family: {other}"),
        }
    }
    Ok(families)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pattern_scanner=info,pattern_engine=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let families = families_or_exit(&cli.patterns);

    let mut config = match &cli.config {
        Some(path) => ScanConfig::from_toml_str(&std::fs::read_to_string(path)?)?,
        None => ScanConfig::default(),
    };
    if let Some(dir) = &cli.debug_dir {
        config.debug.debug_dir = dir.clone();
    }
    if let Some(debug_families) = &cli.debug {
        for family in families_or_exit(debug_families) {
            match family {
                PatternFamily::Hns => config.debug.hns_debug = true,
                PatternFamily::Dtb => config.debug.dtb_debug = true,
                PatternFamily::Ttb => config.debug.ttb_debug = true,
            }
        }
    }
    let config = Arc::new(config);
    let debug = Arc::new(DebugLog::new(&config.debug));

    let feed: Arc<dyn PriceFeed> = match &cli.data_dir {
        Some(dir) => Arc::new(CsvBarFeed::new(dir.clone())),
        None => Arc::new(YahooChartClient::new()),
    };

    let request = ScanRequest {
        tickers: cli.tickers,
        intervals: cli.intervals,
        strategies: cli.strategies,
        period: cli.period,
        families,
        concurrency: cli.concurrency,
    };

    let mut sink = CsvSink::create(&cli.output)?;
    let summary = run_scan(feed, &request, config, debug, &mut sink).await?;

    tracing::info!(
        tuples = summary.tuples,
        fetch_failures = summary.fetch_failures,
        records = summary.records,
        output = %cli.output.display(),
        "scan finished"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_expands_to_every_family() {
        let families = parse_families("ALL").unwrap();
        assert_eq!(families.len(), 3);
    }

    #[test]
    fn family_lists_parse_case_insensitively() {
        let families = parse_families("hns,ttb").unwrap();
        assert_eq!(families, vec![PatternFamily::Hns, PatternFamily::Ttb]);
        assert!(parse_families("BOGUS").is_err());
    }

    #[test]
    fn cli_requires_tickers_and_output() {
        assert!(Cli::try_parse_from(["pattern-scanner"]).is_err());
        let cli = Cli::try_parse_from([
            "pattern-scanner",
            "--tickers",
            "BTC-USD,ETH-USD",
            "--output",
            "out.csv",
        ])
        .unwrap();
        assert_eq!(cli.tickers.len(), 2);
        assert_eq!(cli.patterns, "ALL");
        assert!(cli.debug.is_none());
        assert!(cli.debug_dir.is_none());
    }

    #[test]
    fn debug_flags_parse_into_cli() {
        let cli = Cli::try_parse_from([
            "pattern-scanner",
            "--tickers",
            "BTC-USD",
            "--output",
            "out.csv",
            "--debug",
            "HNS,DTB",
            "--debug-dir",
            "/tmp/scan-debug",
        ])
        .unwrap();
        assert_eq!(cli.debug.as_deref(), Some("HNS,DTB"));
        assert_eq!(cli.debug_dir, Some(PathBuf::from("/tmp/scan-debug")));
    }
}
