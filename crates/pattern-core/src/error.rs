use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Indicator computation failed: {0}")]
    IndicatorCompute(String),

    #[error("Pivot starvation: {0}")]
    PivotStarvation(String),

    #[error("Fetch failed for {ticker}: {message}")]
    Fetch { ticker: String, message: String },

    #[error("Sink error: {0}")]
    Sink(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ScanError {
    pub fn fetch(ticker: impl Into<String>, message: impl Into<String>) -> Self {
        ScanError::Fetch {
            ticker: ticker.into(),
            message: message.into(),
        }
    }
}
