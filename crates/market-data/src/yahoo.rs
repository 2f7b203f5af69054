//! Yahoo-style chart endpoint producer.

use async_trait::async_trait;
use chrono::DateTime;
use pattern_core::{Bar, PriceFeed, PriceSeries, ScanError};

const CHART_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";

#[derive(Clone)]
pub struct YahooChartClient {
    client: reqwest::Client,
}

impl YahooChartClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }
}

impl Default for YahooChartClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceFeed for YahooChartClient {
    async fn fetch(
        &self,
        ticker: &str,
        interval: &str,
        period: &str,
    ) -> Result<PriceSeries, ScanError> {
        let url = format!("{CHART_URL}/{ticker}?interval={interval}&range={period}");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ScanError::fetch(ticker, e.to_string()))?;

        if !response.status().is_success() {
            return Err(ScanError::fetch(
                ticker,
                format!("HTTP {}", response.status()),
            ));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ScanError::fetch(ticker, e.to_string()))?;

        parse_chart(ticker, interval, &json)
    }
}

/// Navigate the chart payload into timezone-naive ascending bars. Bars with
/// any null OHLCV field are skipped.
pub fn parse_chart(
    ticker: &str,
    interval: &str,
    json: &serde_json::Value,
) -> Result<PriceSeries, ScanError> {
    let result = json
        .get("chart")
        .and_then(|v| v.get("result"))
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
        .ok_or_else(|| ScanError::fetch(ticker, "no chart result in payload"))?;

    let timestamps = result
        .get("timestamp")
        .and_then(|v| v.as_array())
        .ok_or_else(|| ScanError::fetch(ticker, "no timestamps in payload"))?;

    let quote = result
        .get("indicators")
        .and_then(|v| v.get("quote"))
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
        .ok_or_else(|| ScanError::fetch(ticker, "no quote block in payload"))?;

    let column = |name: &str| -> &[serde_json::Value] {
        quote
            .get(name)
            .and_then(|v| v.as_array())
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    };
    let opens = column("open");
    let highs = column("high");
    let lows = column("low");
    let closes = column("close");
    let volumes = column("volume");

    let mut bars = Vec::with_capacity(timestamps.len());
    for (i, ts) in timestamps.iter().enumerate() {
        let (Some(ts), Some(open), Some(high), Some(low), Some(close), Some(volume)) = (
            ts.as_i64(),
            opens.get(i).and_then(|v| v.as_f64()),
            highs.get(i).and_then(|v| v.as_f64()),
            lows.get(i).and_then(|v| v.as_f64()),
            closes.get(i).and_then(|v| v.as_f64()),
            volumes.get(i).and_then(|v| v.as_f64()),
        ) else {
            continue;
        };
        let Some(timestamp) = DateTime::from_timestamp(ts, 0) else {
            continue;
        };
        bars.push(Bar {
            timestamp: timestamp.naive_utc(),
            open,
            high,
            low,
            close,
            volume,
        });
    }
    bars.sort_by_key(|b| b.timestamp);

    if bars.is_empty() {
        tracing::debug!(ticker, "chart payload carried no usable bars");
    }
    Ok(PriceSeries::new(ticker, interval, bars))
}
