use pattern_core::PriceSeries;

use crate::indicators::{atr, macd, obv, rsi, stochastic};

/// Periods for the precomputed indicator set.
#[derive(Debug, Clone)]
pub struct IndicatorParams {
    pub rsi_length: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub stoch_k: usize,
    pub stoch_d: usize,
    pub stoch_smooth_k: usize,
    pub atr_length: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            rsi_length: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            stoch_k: 14,
            stoch_d: 3,
            stoch_smooth_k: 3,
            atr_length: 14,
        }
    }
}

/// All indicator columns for one series, computed once and shared by every
/// rule. Each column has exactly one value per bar; indices where an
/// indicator is undefined hold NaN.
#[derive(Debug, Clone)]
pub struct IndicatorSet {
    pub rsi_close: Vec<f64>,
    pub rsi_high: Vec<f64>,
    pub rsi_low: Vec<f64>,
    pub macd: Vec<f64>,
    pub macd_signal: Vec<f64>,
    pub macd_hist: Vec<f64>,
    pub stoch_k: Vec<f64>,
    pub stoch_d: Vec<f64>,
    pub obv: Vec<f64>,
    pub atr: Vec<f64>,
}

impl IndicatorSet {
    pub fn compute(series: &PriceSeries, params: &IndicatorParams) -> Self {
        let closes = series.closes();
        let highs = series.highs();
        let lows = series.lows();
        let volumes = series.volumes();

        let macd_cols = macd(
            &closes,
            params.macd_fast,
            params.macd_slow,
            params.macd_signal,
        );
        let stoch_cols = stochastic(
            &highs,
            &lows,
            &closes,
            params.stoch_k,
            params.stoch_smooth_k,
            params.stoch_d,
        );

        Self {
            rsi_close: rsi(&closes, params.rsi_length),
            rsi_high: rsi(&highs, params.rsi_length),
            rsi_low: rsi(&lows, params.rsi_length),
            macd: macd_cols.macd,
            macd_signal: macd_cols.signal,
            macd_hist: macd_cols.histogram,
            stoch_k: stoch_cols.k,
            stoch_d: stoch_cols.d,
            obv: obv(&closes, &volumes),
            atr: atr(&highs, &lows, &closes, params.atr_length),
        }
    }

    pub fn len(&self) -> usize {
        self.rsi_close.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rsi_close.is_empty()
    }
}
