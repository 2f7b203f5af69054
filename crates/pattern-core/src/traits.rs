use async_trait::async_trait;

use crate::{PatternRecord, PriceSeries, ScanError};

/// Trait for OHLCV producers (HTTP providers, CSV replayers).
///
/// Bars must come back timezone-naive and in ascending time order.
#[async_trait]
pub trait PriceFeed: Send + Sync {
    async fn fetch(
        &self,
        ticker: &str,
        interval: &str,
        period: &str,
    ) -> Result<PriceSeries, ScanError>;
}

/// Trait for record sinks (CSV writer, collectors in tests).
pub trait RecordSink {
    fn emit(&mut self, record: &PatternRecord) -> Result<(), ScanError>;

    fn finalize(&mut self) -> Result<(), ScanError>;
}
