//! Pipeline driver: fans (ticker x interval x strategy) tuples out over a
//! bounded number of tokio tasks, scans each fetched series, and emits the
//! per-tuple record blocks in request order so output stays deterministic.

use std::sync::Arc;

use pattern_core::{PatternFamily, PatternRecord, PriceFeed, RecordSink, ScanError};
use pattern_engine::{scan_series, DebugLog, ScanConfig};
use tokio::sync::Semaphore;

#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub tickers: Vec<String>,
    pub intervals: Vec<String>,
    pub strategies: Vec<String>,
    pub period: String,
    pub families: Vec<PatternFamily>,
    pub concurrency: usize,
}

#[derive(Debug, Default)]
pub struct ScanSummary {
    pub tuples: usize,
    pub fetch_failures: usize,
    pub records: usize,
}

/// Run every requested tuple. Fetch failures are logged and skipped; sink
/// and configuration errors abort the run.
pub async fn run_scan(
    feed: Arc<dyn PriceFeed>,
    request: &ScanRequest,
    config: Arc<ScanConfig>,
    debug: Arc<DebugLog>,
    sink: &mut dyn RecordSink,
) -> Result<ScanSummary, ScanError> {
    let concurrency = request.concurrency.max(1);
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut handles = Vec::new();

    for ticker in &request.tickers {
        for interval in &request.intervals {
            for strategy in &request.strategies {
                let feed = Arc::clone(&feed);
                let config = Arc::clone(&config);
                let debug = Arc::clone(&debug);
                let semaphore = Arc::clone(&semaphore);
                let families = request.families.clone();
                let (ticker, interval, strategy, period) = (
                    ticker.clone(),
                    interval.clone(),
                    strategy.clone(),
                    request.period.clone(),
                );

                handles.push(tokio::spawn(async move {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .expect("scan semaphore never closes");
                    let series = feed.fetch(&ticker, &interval, &period).await?;
                    scan_series(&series, &strategy, &families, &config, &debug)
                }));
            }
        }
    }

    let mut summary = ScanSummary {
        tuples: handles.len(),
        ..ScanSummary::default()
    };

    // Joining in spawn order keeps the output independent of task timing.
    for handle in handles {
        let result: Result<Vec<PatternRecord>, ScanError> = handle
            .await
            .map_err(|e| ScanError::Sink(format!("scan task panicked: {e}")))?;
        match result {
            Ok(records) => {
                for record in &records {
                    sink.emit(record)?;
                }
                summary.records += records.len();
            }
            Err(e @ ScanError::Fetch { .. }) => {
                tracing::warn!(error = %e, "tuple skipped");
                summary.fetch_failures += 1;
            }
            Err(e) => return Err(e),
        }
    }

    sink.finalize()?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use pattern_core::{Bar, PriceSeries};

    /// Deterministic in-memory feed: every ticker gets the same inverse
    /// head-and-shoulders shape at a per-ticker price offset.
    struct SyntheticFeed;

    #[async_trait]
    impl PriceFeed for SyntheticFeed {
        async fn fetch(
            &self,
            ticker: &str,
            interval: &str,
            _period: &str,
        ) -> Result<PriceSeries, ScanError> {
            if ticker == "BROKEN" {
                return Err(ScanError::fetch(ticker, "synthetic outage"));
            }
            let offset = ticker.bytes().map(|b| b as u64).sum::<u64>() % 7;
            let offset = offset as f64;
            let mut closes = vec![100.0 + offset; 40];
            closes.extend(
                [
                    95.0, 85.0, 92.0, 75.0, 92.0, 85.0, 95.0, 100.0, 105.0, 98.0, 100.0,
                ]
                .map(|c| c + offset),
            );
            let day0 = NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap();
            let bars = closes
                .iter()
                .enumerate()
                .map(|(i, &close)| Bar {
                    timestamp: day0 + chrono::Duration::days(i as i64),
                    open: close,
                    high: close + 1.5,
                    low: close - 1.5,
                    close,
                    volume: if i == 46 { 2000.0 } else { 1000.0 },
                })
                .collect();
            Ok(PriceSeries::new(ticker, interval, bars))
        }
    }

    #[derive(Default)]
    struct VecSink {
        records: Vec<PatternRecord>,
        finalized: bool,
    }

    impl RecordSink for VecSink {
        fn emit(&mut self, record: &PatternRecord) -> Result<(), ScanError> {
            self.records.push(record.clone());
            Ok(())
        }

        fn finalize(&mut self) -> Result<(), ScanError> {
            self.finalized = true;
            Ok(())
        }
    }

    fn request(concurrency: usize) -> ScanRequest {
        ScanRequest {
            tickers: vec!["BTC".into(), "ETH".into(), "ADA".into()],
            intervals: vec!["1d".into()],
            strategies: vec!["swing_short".into()],
            period: "1y".into(),
            families: vec![PatternFamily::Hns, PatternFamily::Dtb, PatternFamily::Ttb],
            concurrency,
        }
    }

    async fn run_with_concurrency(concurrency: usize) -> Vec<PatternRecord> {
        let mut sink = VecSink::default();
        let summary = run_scan(
            Arc::new(SyntheticFeed),
            &request(concurrency),
            Arc::new(ScanConfig::default()),
            Arc::new(DebugLog::disabled()),
            &mut sink,
        )
        .await
        .unwrap();
        assert_eq!(summary.tuples, 3);
        assert!(sink.finalized);
        sink.records
    }

    #[tokio::test]
    async fn serial_and_concurrent_runs_emit_the_same_records() {
        let serial = run_with_concurrency(1).await;
        let concurrent = run_with_concurrency(3).await;

        assert!(!serial.is_empty());
        assert_eq!(serial, concurrent);
        // Request order: one record block per ticker, in ticker order.
        assert_eq!(serial[0].ticker, "BTC");
        assert_eq!(serial.last().unwrap().ticker, "ADA");
    }

    #[tokio::test]
    async fn fetch_failures_skip_the_tuple_and_continue() {
        let mut sink = VecSink::default();
        let mut req = request(2);
        req.tickers = vec!["BTC".into(), "BROKEN".into(), "ETH".into()];

        let summary = run_scan(
            Arc::new(SyntheticFeed),
            &req,
            Arc::new(ScanConfig::default()),
            Arc::new(DebugLog::disabled()),
            &mut sink,
        )
        .await
        .unwrap();

        assert_eq!(summary.tuples, 3);
        assert_eq!(summary.fetch_failures, 1);
        assert!(sink.records.iter().all(|r| r.ticker != "BROKEN"));
        assert!(!sink.records.is_empty());
    }
}
