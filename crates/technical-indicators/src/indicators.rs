//! Indicator primitives over plain `f64` columns.
//!
//! Every function returns a column exactly as long as its input, with NaN at
//! the head indices where the indicator is not yet defined. Downstream rules
//! read bar indices directly and treat NaN as insufficient evidence.

/// A column of NaN, the starting point for every indicator.
pub fn nan_series(len: usize) -> Vec<f64> {
    vec![f64::NAN; len]
}

/// Simple Moving Average. NaN until the window is complete; a window that
/// contains NaN stays NaN.
pub fn sma(data: &[f64], period: usize) -> Vec<f64> {
    let mut out = nan_series(data.len());
    if period == 0 || data.len() < period {
        return out;
    }

    for i in period - 1..data.len() {
        let window = &data[i + 1 - period..=i];
        if window.iter().all(|v| v.is_finite()) {
            out[i] = window.iter().sum::<f64>() / period as f64;
        }
    }
    out
}

/// Exponential Moving Average seeded with the SMA of the first full finite
/// window. Inputs may carry a NaN head (MACD signal line relies on this).
pub fn ema(data: &[f64], period: usize) -> Vec<f64> {
    let mut out = nan_series(data.len());
    if period == 0 || data.is_empty() {
        return out;
    }

    let first = match data.iter().position(|v| v.is_finite()) {
        Some(p) => p,
        None => return out,
    };
    let seed_end = first + period - 1;
    if seed_end >= data.len() {
        return out;
    }

    let seed: f64 = data[first..=seed_end].iter().sum::<f64>() / period as f64;
    out[seed_end] = seed;

    let multiplier = 2.0 / (period as f64 + 1.0);
    for i in seed_end + 1..data.len() {
        let prev = out[i - 1];
        out[i] = (data[i] - prev) * multiplier + prev;
    }
    out
}

/// Relative Strength Index with Wilder smoothing. Defined from index
/// `period` onward (needs `period` changes).
pub fn rsi(data: &[f64], period: usize) -> Vec<f64> {
    let mut out = nan_series(data.len());
    if period == 0 || data.len() < period + 1 {
        return out;
    }

    let mut gains = Vec::with_capacity(data.len() - 1);
    let mut losses = Vec::with_capacity(data.len() - 1);
    for i in 1..data.len() {
        let change = data[i] - data[i - 1];
        if change > 0.0 {
            gains.push(change);
            losses.push(0.0);
        } else {
            gains.push(0.0);
            losses.push(change.abs());
        }
    }

    let mut avg_gain = gains[..period].iter().sum::<f64>() / period as f64;
    let mut avg_loss = losses[..period].iter().sum::<f64>() / period as f64;
    out[period] = rsi_from_averages(avg_gain, avg_loss);

    for i in period + 1..data.len() {
        avg_gain = (avg_gain * (period - 1) as f64 + gains[i - 1]) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + losses[i - 1]) / period as f64;
        out[i] = rsi_from_averages(avg_gain, avg_loss);
    }
    out
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - (100.0 / (1.0 + rs))
}

/// MACD columns, all bar-aligned.
pub struct MacdColumns {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

pub fn macd(
    data: &[f64],
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
) -> MacdColumns {
    let n = data.len();
    let mut cols = MacdColumns {
        macd: nan_series(n),
        signal: nan_series(n),
        histogram: nan_series(n),
    };
    if fast_period == 0 || slow_period == 0 || signal_period == 0 || slow_period < fast_period {
        return cols;
    }

    let ema_fast = ema(data, fast_period);
    let ema_slow = ema(data, slow_period);
    for i in 0..n {
        if ema_fast[i].is_finite() && ema_slow[i].is_finite() {
            cols.macd[i] = ema_fast[i] - ema_slow[i];
        }
    }

    cols.signal = ema(&cols.macd, signal_period);
    for i in 0..n {
        if cols.macd[i].is_finite() && cols.signal[i].is_finite() {
            cols.histogram[i] = cols.macd[i] - cols.signal[i];
        }
    }
    cols
}

/// Stochastic oscillator columns, bar-aligned.
pub struct StochColumns {
    pub k: Vec<f64>,
    pub d: Vec<f64>,
}

pub fn stochastic(
    highs: &[f64],
    lows: &[f64],
    closes: &[f64],
    k_period: usize,
    smooth_k: usize,
    d_period: usize,
) -> StochColumns {
    let n = closes.len();
    let mut raw = nan_series(n);
    if k_period == 0 || n < k_period {
        return StochColumns {
            k: raw,
            d: nan_series(n),
        };
    }

    for i in k_period - 1..n {
        let window = i + 1 - k_period..=i;
        let highest = highs[window.clone()]
            .iter()
            .fold(f64::NEG_INFINITY, |a, &b| a.max(b));
        let lowest = lows[window].iter().fold(f64::INFINITY, |a, &b| a.min(b));
        raw[i] = if highest == lowest {
            50.0
        } else {
            100.0 * (closes[i] - lowest) / (highest - lowest)
        };
    }

    let k = if smooth_k > 1 { sma(&raw, smooth_k) } else { raw };
    let d = sma(&k, d_period);
    StochColumns { k, d }
}

/// On-Balance Volume: running cumulative signed volume, defined everywhere.
pub fn obv(closes: &[f64], volumes: &[f64]) -> Vec<f64> {
    let n = closes.len();
    if n == 0 {
        return vec![];
    }

    let mut out = Vec::with_capacity(n);
    out.push(volumes[0]);
    for i in 1..n {
        let prev = out[i - 1];
        let next = if closes[i] > closes[i - 1] {
            prev + volumes[i]
        } else if closes[i] < closes[i - 1] {
            prev - volumes[i]
        } else {
            prev
        };
        out.push(next);
    }
    out
}

/// Average True Range with Wilder smoothing. Defined from index `period`.
pub fn atr(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> Vec<f64> {
    let n = closes.len();
    let mut out = nan_series(n);
    if period == 0 || n < period + 1 {
        return out;
    }

    let mut true_ranges = Vec::with_capacity(n - 1);
    for i in 1..n {
        let high_low = highs[i] - lows[i];
        let high_close = (highs[i] - closes[i - 1]).abs();
        let low_close = (lows[i] - closes[i - 1]).abs();
        true_ranges.push(high_low.max(high_close).max(low_close));
    }

    let mut value = true_ranges[..period].iter().sum::<f64>() / period as f64;
    out[period] = value;
    for i in period + 1..n {
        value = (value * (period - 1) as f64 + true_ranges[i - 1]) / period as f64;
        out[i] = value;
    }
    out
}
