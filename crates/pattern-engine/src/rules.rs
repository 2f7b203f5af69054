//! Stateless rule evaluators shared by every family validator.
//!
//! Each rule is a pure function of (candidate, series columns, indicators,
//! config); NaN indicator reads count as insufficient evidence and fail the
//! rule. Evaluation order never changes a rule's outcome.

use pattern_core::{PatternFamily, Pivot, PivotKind};
use technical_indicators::IndicatorSet;

use crate::candidates::PatternCandidate;
use crate::config::{
    ContextConfig, MacdConfig, RetestConfig, RsiConfig, StochConfig, ToleranceConfig, VolumeConfig,
};

/// Canonical rule names, shared by the scoring tables, the validators and
/// the sink's column layout.
pub mod names {
    pub const ESTRUTURA: &str = "estrutura";
    pub const EXTREMO_CONTEXTO_CABECA: &str = "extremo_contexto_cabeca";
    pub const SIMETRIA_OMBROS: &str = "simetria_ombros";
    pub const NECKLINE_PLANA: &str = "neckline_plana";
    pub const TENDENCIA_BASE: &str = "tendencia_base";
    pub const ROMPIMENTO: &str = "rompimento";
    pub const RETESTE_NECKLINE: &str = "reteste_neckline";
    pub const EXTREMO_CONTEXTO_P1: &str = "extremo_contexto_p1";
    pub const EXTREMO_CONTEXTO_P3: &str = "extremo_contexto_p3";
    pub const EXTREMO_CONTEXTO_P5: &str = "extremo_contexto_p5";
    pub const CONTEXTO_TENDENCIA: &str = "contexto_tendencia";
    pub const SIMETRIA_EXTREMOS: &str = "simetria_extremos";
    pub const NECKLINE_RETEST_P4: &str = "neckline_retest_p4";
    pub const NECKLINE_RETEST_P6: &str = "neckline_retest_p6";
    pub const DIVERGENCIA_RSI: &str = "divergencia_rsi";
    pub const DIVERGENCIA_RSI_FORTE: &str = "divergencia_rsi_forte";
    pub const CRUZAMENTO_MACD: &str = "cruzamento_macd";
    pub const DIVERGENCIA_MACD_HIST: &str = "divergencia_macd_hist";
    pub const CONFIRMACAO_ESTOCASTICO: &str = "confirmacao_estocastico";
    pub const DIVERGENCIA_OBV: &str = "divergencia_obv";
    pub const VOLUME_ROMPIMENTO: &str = "volume_rompimento";
    pub const PERFIL_VOLUME: &str = "perfil_volume";
}

/// Vertical size of the pattern, the unit for every tolerance.
pub fn pattern_height(candidate: &PatternCandidate) -> f64 {
    let p = &candidate.pivots;
    match candidate.family() {
        PatternFamily::Hns => (p[3].price - (p[2].price + p[4].price) / 2.0).abs(),
        PatternFamily::Dtb => ((p[1].price + p[3].price) / 2.0 - p[2].price).abs(),
        PatternFamily::Ttb => {
            let extremes = (p[1].price + p[3].price + p[5].price) / 3.0;
            let neck = (p[2].price + p[4].price) / 2.0;
            (extremes - neck).abs()
        }
    }
}

/// Neckline value at a bar index: the interpolated p2-p4 line for HNS/TTB,
/// the single p2 level for DTB.
pub fn neckline_at(candidate: &PatternCandidate, idx: usize) -> f64 {
    let p = &candidate.pivots;
    match candidate.family() {
        PatternFamily::Dtb => p[2].price,
        _ => {
            let (p2, p4) = (p[2], p[4]);
            if p4.idx == p2.idx {
                p2.price
            } else {
                let slope = (p4.price - p2.price) / (p4.idx - p2.idx) as f64;
                p2.price + slope * (idx as f64 - p2.idx as f64)
            }
        }
    }
}

/// Correct alternation of kinds for the family; for HNS the head must also
/// sit strictly beyond both shoulders.
pub fn estrutura(candidate: &PatternCandidate) -> bool {
    let p = &candidate.pivots;
    let width = crate::candidates::structural_width(candidate.family());
    if p.len() != width {
        return false;
    }
    if p.windows(2).any(|pair| pair[0].kind == pair[1].kind) {
        return false;
    }
    if p[1].kind != candidate.kind.extreme_kind() {
        return false;
    }
    if candidate.family() == PatternFamily::Hns {
        let (left, head, right) = (p[1].price, p[3].price, p[5].price);
        return match candidate.kind.extreme_kind() {
            PivotKind::Peak => head > left && head > right,
            PivotKind::Valley => head < left && head < right,
        };
    }
    true
}

/// How the extremity window relates to the pivot under test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContextMode {
    Centered,
    PastOnly,
}

/// Window width for extremity checks: `factor x average pivot separation`
/// bars, floored at `min_bars`.
pub fn context_window_bars(pivots: &[Pivot], config: &ContextConfig) -> usize {
    if pivots.len() < 2 {
        return config.min_bars;
    }
    let first = pivots[0].idx;
    let last = pivots[pivots.len() - 1].idx;
    let avg_separation = (last - first) as f64 / (pivots.len() - 1) as f64;
    let scaled = (config.head_extreme_lookback_factor as f64 * avg_separation).round() as usize;
    scaled.max(config.min_bars)
}

/// The pivot must be the strict extremum of its context window. The pivot's
/// own bar is excluded; an empty window fails closed.
pub fn extremity_in_context(
    closes: &[f64],
    pivot: Pivot,
    window_bars: usize,
    mode: ContextMode,
) -> bool {
    let n = closes.len();
    if n == 0 || pivot.idx >= n {
        return false;
    }

    let (start, end) = match mode {
        ContextMode::Centered => {
            let half = window_bars / 2;
            (
                pivot.idx.saturating_sub(half),
                (pivot.idx + half + 1).min(n),
            )
        }
        ContextMode::PastOnly => (pivot.idx.saturating_sub(window_bars), pivot.idx),
    };

    let mut compared = 0usize;
    for i in start..end {
        if i == pivot.idx {
            continue;
        }
        compared += 1;
        let beats = match pivot.kind {
            PivotKind::Peak => pivot.price > closes[i],
            PivotKind::Valley => pivot.price < closes[i],
        };
        if !beats {
            return false;
        }
    }
    compared > 0
}

/// HNS shoulders must match within the symmetry tolerance.
pub fn shoulder_symmetry(candidate: &PatternCandidate, tolerances: &ToleranceConfig) -> bool {
    let p = &candidate.pivots;
    let height = pattern_height(candidate);
    (p[1].price - p[5].price).abs() <= tolerances.symmetry_tolerance_factor * height
}

/// DTB/TTB extremes must all lie within the symmetry tolerance band.
pub fn extremes_symmetry(candidate: &PatternCandidate, tolerances: &ToleranceConfig) -> bool {
    let extremes = candidate.extremes();
    let height = pattern_height(candidate);
    let max = extremes.iter().map(|p| p.price).fold(f64::MIN, f64::max);
    let min = extremes.iter().map(|p| p.price).fold(f64::MAX, f64::min);
    max - min <= tolerances.symmetry_tolerance_factor * height
}

/// Neckline anchors must be level, within a tolerance scaled by the mean
/// shoulder height (HNS) or the pattern height (TTB). The DTB neckline is a
/// single point.
pub fn neckline_flatness(candidate: &PatternCandidate, tolerances: &ToleranceConfig) -> bool {
    let p = &candidate.pivots;
    match candidate.family() {
        PatternFamily::Dtb => true,
        PatternFamily::Hns => {
            let neck_mid = (p[2].price + p[4].price) / 2.0;
            let mean_shoulder =
                ((p[1].price - neck_mid).abs() + (p[5].price - neck_mid).abs()) / 2.0;
            (p[2].price - p[4].price).abs()
                <= tolerances.symmetry_tolerance_factor * mean_shoulder
        }
        PatternFamily::Ttb => {
            (p[2].price - p[4].price).abs()
                <= tolerances.symmetry_tolerance_factor * pattern_height(candidate)
        }
    }
}

/// The HNS base must sit strictly beyond both neckline anchors: below for
/// OCO, above for OCOI. No tolerance.
pub fn base_trend(candidate: &PatternCandidate) -> bool {
    let p = &candidate.pivots;
    match candidate.kind.extreme_kind() {
        PivotKind::Peak => p[0].price < p[2].price && p[0].price < p[4].price,
        PivotKind::Valley => p[0].price > p[2].price && p[0].price > p[4].price,
    }
}

/// DTB/TTB prior-trend gate: tops need higher highs and higher lows coming
/// in, bottoms the mirror image, by at least `trend_min_diff_factor x
/// pattern height`. Without any prior pivot history the rule fails closed.
pub fn trend_context(
    candidate: &PatternCandidate,
    pivots: &[Pivot],
    tolerances: &ToleranceConfig,
) -> bool {
    let min_diff = tolerances.trend_min_diff_factor * pattern_height(candidate);
    let p0 = candidate.pivots[0];
    let p1 = candidate.pivots[1];
    let prior = &pivots[..candidate.pivot_offset];

    let prev_like_p0 = prior.iter().rev().find(|p| p.kind == p0.kind);
    let prev_like_p1 = prior.iter().rev().find(|p| p.kind == p1.kind);
    let (Some(prev0), Some(prev1)) = (prev_like_p0, prev_like_p1) else {
        return false;
    };

    match candidate.kind.extreme_kind() {
        PivotKind::Peak => {
            p0.price > prev0.price + min_diff && p1.price > prev1.price + min_diff
        }
        PivotKind::Valley => {
            p0.price < prev0.price - min_diff && p1.price < prev1.price - min_diff
        }
    }
}

/// First bar after the last structural pivot whose close crosses the
/// neckline strictly, within `search_max_bars`.
pub fn find_breakout(
    candidate: &PatternCandidate,
    closes: &[f64],
    search_max_bars: usize,
) -> Option<usize> {
    let from = candidate.last_structural().idx + 1;
    let to = (from + search_max_bars).min(closes.len());
    for i in from..to {
        let neckline = neckline_at(candidate, i);
        let broke = match candidate.kind.extreme_kind() {
            // Tops break down through the neckline, bottoms break up.
            PivotKind::Peak => closes[i] < neckline,
            PivotKind::Valley => closes[i] > neckline,
        };
        if broke {
            return Some(i);
        }
    }
    None
}

/// The retest pivot: first pivot after the breakout bar whose kind matches
/// the structural extremes (the pullback leg toward the broken neckline).
pub fn find_retest(
    candidate: &PatternCandidate,
    pivots: &[Pivot],
    breakout_idx: usize,
) -> Option<Pivot> {
    let kind = candidate.kind.extreme_kind();
    pivots
        .iter()
        .find(|p| p.idx > breakout_idx && p.kind == kind)
        .copied()
}

/// Retest proximity: within `atr_multiplier x ATR` of the neckline, with a
/// percent-of-neckline fallback when ATR is unavailable at that bar.
pub fn neckline_retest(
    candidate: &PatternCandidate,
    retest: Pivot,
    atr: &[f64],
    config: &RetestConfig,
) -> bool {
    let neckline = neckline_at(candidate, retest.idx);
    let pct_band = config.pct_of_neckline * neckline.abs();
    let atr_value = atr.get(retest.idx).copied().unwrap_or(f64::NAN);
    let band = if atr_value.is_finite() && atr_value > 0.0 {
        (config.atr_multiplier * atr_value).max(pct_band)
    } else {
        pct_band
    };
    (retest.price - neckline).abs() <= band
}

/// RSI divergence between the first extreme and the key extreme, gated on
/// the overbought/oversold side. Returns (divergence, strong divergence).
pub fn rsi_divergence(
    candidate: &PatternCandidate,
    indicators: &IndicatorSet,
    config: &RsiConfig,
) -> (bool, bool) {
    let first = candidate.pivots[1];
    let key = candidate.key_pivot();

    match candidate.kind.extreme_kind() {
        PivotKind::Peak => {
            let (Some(r1), Some(r2)) = (
                finite_at(&indicators.rsi_high, first.idx),
                finite_at(&indicators.rsi_high, key.idx),
            ) else {
                return (false, false);
            };
            if r1 < config.overbought && r2 < config.overbought {
                return (false, false);
            }
            let divergence = r2 < r1;
            let strong = divergence
                && (r1 >= config.strong_overbought || r1 - r2 >= config.divergence_min_delta);
            (divergence, strong)
        }
        PivotKind::Valley => {
            let (Some(r1), Some(r2)) = (
                finite_at(&indicators.rsi_low, first.idx),
                finite_at(&indicators.rsi_low, key.idx),
            ) else {
                return (false, false);
            };
            if r1 > config.oversold && r2 > config.oversold {
                return (false, false);
            }
            let divergence = r2 > r1;
            let strong = divergence
                && (r1 <= config.strong_oversold || r2 - r1 >= config.divergence_min_delta);
            (divergence, strong)
        }
    }
}

/// MACD line/signal crossover in the pattern direction, no older than
/// `cross_max_age_bars` at the window end.
pub fn macd_signal_cross(
    candidate: &PatternCandidate,
    indicators: &IndicatorSet,
    config: &MacdConfig,
    window_end: usize,
) -> bool {
    let n = indicators.macd.len();
    if n == 0 || window_end >= n {
        return false;
    }
    let bullish = candidate.kind.extreme_kind() == PivotKind::Valley;
    let start = window_end
        .saturating_sub(config.signal_cross_lookback_bars)
        .max(1);

    let mut latest: Option<usize> = None;
    for i in start..=window_end {
        let (Some(m0), Some(s0), Some(m1), Some(s1)) = (
            finite_at(&indicators.macd, i - 1),
            finite_at(&indicators.macd_signal, i - 1),
            finite_at(&indicators.macd, i),
            finite_at(&indicators.macd_signal, i),
        ) else {
            continue;
        };
        let crossed = if bullish {
            m0 <= s0 && m1 > s1
        } else {
            m0 >= s0 && m1 < s1
        };
        if crossed {
            latest = Some(i);
        }
    }
    latest.is_some_and(|i| window_end - i <= config.cross_max_age_bars)
}

/// Histogram momentum fades (tops) or builds (bottoms) between the two
/// extremes.
pub fn macd_hist_divergence(candidate: &PatternCandidate, indicators: &IndicatorSet) -> bool {
    let first = candidate.pivots[1];
    let key = candidate.key_pivot();
    let (Some(h1), Some(h2)) = (
        finite_at(&indicators.macd_hist, first.idx),
        finite_at(&indicators.macd_hist, key.idx),
    ) else {
        return false;
    };
    match candidate.kind.extreme_kind() {
        PivotKind::Peak => h2 < h1,
        PivotKind::Valley => h2 > h1,
    }
}

/// Stochastic confirmation: %K divergence at the extremes or a %K/%D cross
/// in the pattern direction near the window end. Optionally gated on the
/// extreme side having reached overbought/oversold.
pub fn stochastic_confirmation(
    candidate: &PatternCandidate,
    indicators: &IndicatorSet,
    config: &StochConfig,
    window_end: usize,
) -> bool {
    let first = candidate.pivots[1];
    let key = candidate.key_pivot();
    let tops = candidate.kind.extreme_kind() == PivotKind::Peak;

    let k1 = finite_at(&indicators.stoch_k, first.idx);
    let k2 = finite_at(&indicators.stoch_k, key.idx);

    if config.require_obos {
        let reached = match (k1, k2) {
            (Some(a), Some(b)) if tops => {
                a >= config.overbought || b >= config.overbought
            }
            (Some(a), Some(b)) => a <= config.oversold || b <= config.oversold,
            _ => false,
        };
        if !reached {
            return false;
        }
    }

    let divergence = match (k1, k2) {
        (Some(a), Some(b)) if tops => a - b >= config.divergence_min_delta,
        (Some(a), Some(b)) => b - a >= config.divergence_min_delta,
        _ => false,
    };
    if divergence {
        return true;
    }

    // %K crossing %D in the pattern direction.
    let n = indicators.stoch_k.len();
    if n == 0 || window_end >= n {
        return false;
    }
    let start = window_end.saturating_sub(config.cross_lookback_bars).max(1);
    for i in start..=window_end {
        let (Some(k0), Some(d0), Some(k1), Some(d1)) = (
            finite_at(&indicators.stoch_k, i - 1),
            finite_at(&indicators.stoch_d, i - 1),
            finite_at(&indicators.stoch_k, i),
            finite_at(&indicators.stoch_d, i),
        ) else {
            continue;
        };
        let crossed = if tops {
            k0 >= d0 && k1 < d1
        } else {
            k0 <= d0 && k1 > d1
        };
        if crossed {
            return true;
        }
    }
    false
}

/// OBV contradicts price between the two extremes.
pub fn obv_divergence(candidate: &PatternCandidate, indicators: &IndicatorSet) -> bool {
    let first = candidate.pivots[1];
    let key = candidate.key_pivot();
    let (Some(o1), Some(o2)) = (
        finite_at(&indicators.obv, first.idx),
        finite_at(&indicators.obv, key.idx),
    ) else {
        return false;
    };
    match candidate.kind.extreme_kind() {
        PivotKind::Peak => o2 < o1,
        PivotKind::Valley => o2 > o1,
    }
}

/// Breakout bar volume reaches `multiplier x` the mean volume of the
/// preceding lookback window.
pub fn breakout_volume(volumes: &[f64], breakout_idx: usize, config: &VolumeConfig) -> bool {
    if breakout_idx == 0 || breakout_idx >= volumes.len() {
        return false;
    }
    let start = breakout_idx.saturating_sub(config.lookback_bars);
    let window = &volumes[start..breakout_idx];
    if window.is_empty() {
        return false;
    }
    let mean = window.iter().sum::<f64>() / window.len() as f64;
    mean > 0.0 && volumes[breakout_idx] >= config.multiplier * mean
}

/// Volume dries up across successive structural extremes. Each extreme must
/// be at least one bar into the series.
pub fn volume_profile(candidate: &PatternCandidate, volumes: &[f64]) -> bool {
    let extremes = candidate.extremes();
    if extremes.iter().any(|p| p.idx < 1 || p.idx >= volumes.len()) {
        return false;
    }
    extremes
        .windows(2)
        .all(|pair| volumes[pair[0].idx] > volumes[pair[1].idx])
}

fn finite_at(column: &[f64], idx: usize) -> Option<f64> {
    column.get(idx).copied().filter(|v| v.is_finite())
}
