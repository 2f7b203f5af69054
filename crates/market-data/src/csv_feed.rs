//! CSV replayer: serves `<data_dir>/<ticker>.csv` as a `PriceFeed`, useful
//! for offline runs and fixtures. The requested period is ignored; the file
//! is replayed whole.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use pattern_core::{Bar, PriceFeed, PriceSeries, ScanError};
use serde::Deserialize;

#[derive(Debug, Clone)]
pub struct CsvBarFeed {
    data_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

impl CsvBarFeed {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn read_bars(&self, ticker: &str) -> Result<Vec<Bar>, ScanError> {
        let path = self.data_dir.join(format!("{ticker}.csv"));
        let mut reader = csv::Reader::from_path(&path)
            .map_err(|e| ScanError::fetch(ticker, format!("{}: {e}", path.display())))?;

        let mut bars = Vec::new();
        for row in reader.deserialize::<CsvRow>() {
            let row = row.map_err(|e| ScanError::fetch(ticker, e.to_string()))?;
            bars.push(Bar {
                timestamp: parse_timestamp(&row.timestamp)
                    .ok_or_else(|| {
                        ScanError::fetch(ticker, format!("bad timestamp: {}", row.timestamp))
                    })?,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
            });
        }
        bars.sort_by_key(|b| b.timestamp);
        Ok(bars)
    }
}

fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Some(dt);
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[async_trait]
impl PriceFeed for CsvBarFeed {
    async fn fetch(
        &self,
        ticker: &str,
        interval: &str,
        _period: &str,
    ) -> Result<PriceSeries, ScanError> {
        let bars = self.read_bars(ticker)?;
        Ok(PriceSeries::new(ticker, interval, bars))
    }
}
