//! Immutable scan configuration: every threshold, tolerance, lookback and
//! score weight recognized by the pipeline. A single `ScanConfig` value is
//! built once (defaults, optionally overlaid from TOML) and passed by
//! reference to every component; nothing here mutates after construction.

use std::collections::BTreeMap;
use std::path::PathBuf;

use pattern_core::{PatternFamily, ScanError};
use serde::{Deserialize, Serialize};
use technical_indicators::IndicatorParams;

use crate::rules::names;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RsiConfig {
    pub length: usize,
    pub overbought: f64,
    pub oversold: f64,
    pub strong_overbought: f64,
    pub strong_oversold: f64,
    /// Minimum RSI delta between the two extremes to call a divergence strong.
    pub divergence_min_delta: f64,
}

impl Default for RsiConfig {
    fn default() -> Self {
        Self {
            length: 14,
            overbought: 70.0,
            oversold: 30.0,
            strong_overbought: 80.0,
            strong_oversold: 20.0,
            divergence_min_delta: 5.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StochConfig {
    pub k: usize,
    pub d: usize,
    pub smooth_k: usize,
    pub overbought: f64,
    pub oversold: f64,
    pub cross_lookback_bars: usize,
    pub divergence_min_delta: f64,
    /// When true, the stochastic confirmation only counts if the extreme
    /// side reached overbought/oversold first.
    pub require_obos: bool,
}

impl Default for StochConfig {
    fn default() -> Self {
        Self {
            k: 14,
            d: 3,
            smooth_k: 3,
            overbought: 80.0,
            oversold: 20.0,
            cross_lookback_bars: 5,
            divergence_min_delta: 5.0,
            require_obos: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MacdConfig {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
    pub signal_cross_lookback_bars: usize,
    pub cross_max_age_bars: usize,
}

impl Default for MacdConfig {
    fn default() -> Self {
        Self {
            fast: 12,
            slow: 26,
            signal: 9,
            signal_cross_lookback_bars: 10,
            cross_max_age_bars: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VolumeConfig {
    /// Bars averaged before the breakout bar.
    pub lookback_bars: usize,
    /// Breakout volume must reach `multiplier` times that average.
    pub multiplier: f64,
    /// How far past the last structural pivot to search for the breakout.
    pub search_max_bars: usize,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            lookback_bars: 20,
            multiplier: 1.5,
            search_max_bars: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetestConfig {
    pub atr_multiplier: f64,
    /// Fallback proximity band when ATR is NaN or zero at the retest bar.
    pub pct_of_neckline: f64,
}

impl Default for RetestConfig {
    fn default() -> Self {
        Self {
            atr_multiplier: 5.0,
            pct_of_neckline: 0.01,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ZigZagConfig {
    pub extend_to_last_bar: bool,
    /// Fraction of `deviation_percent` the unconfirmed trailing leg must
    /// reach before a provisional pivot is appended.
    pub extension_deviation_factor: f64,
    /// Named strategy presets: strategy name -> deviation percent.
    pub strategies: BTreeMap<String, f64>,
}

impl Default for ZigZagConfig {
    fn default() -> Self {
        let mut strategies = BTreeMap::new();
        strategies.insert("swing_short".to_string(), 5.0);
        strategies.insert("intraday_momentum".to_string(), 3.0);
        Self {
            extend_to_last_bar: true,
            extension_deviation_factor: 0.25,
            strategies,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContextConfig {
    /// Context window is `factor x average pivot separation` bars, floored
    /// at `min_bars`.
    pub head_extreme_lookback_factor: usize,
    pub min_bars: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            head_extreme_lookback_factor: 2,
            min_bars: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToleranceConfig {
    /// Fraction of pattern height extremes may differ by and still match.
    pub symmetry_tolerance_factor: f64,
    /// Minimum pivot-to-pivot difference, as a fraction of pattern height,
    /// for the prior trend to count.
    pub trend_min_diff_factor: f64,
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            symmetry_tolerance_factor: 0.35,
            trend_min_diff_factor: 0.01,
        }
    }
}

/// One rule's scoring entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleWeight {
    pub name: String,
    pub weight: i64,
    pub mandatory: bool,
}

impl RuleWeight {
    pub fn mandatory(name: &str, weight: i64) -> Self {
        Self {
            name: name.to_string(),
            weight,
            mandatory: true,
        }
    }

    pub fn optional(name: &str, weight: i64) -> Self {
        Self {
            name: name.to_string(),
            weight,
            mandatory: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScoringConfig {
    pub weights_hns: Vec<RuleWeight>,
    pub weights_dtb: Vec<RuleWeight>,
    pub weights_ttb: Vec<RuleWeight>,
    pub minimum_score_hns: i64,
    pub minimum_score_dtb: i64,
    pub minimum_score_ttb: i64,
}

fn optional_weights() -> Vec<RuleWeight> {
    vec![
        RuleWeight::optional(names::DIVERGENCIA_RSI, 8),
        RuleWeight::optional(names::DIVERGENCIA_RSI_FORTE, 4),
        RuleWeight::optional(names::CRUZAMENTO_MACD, 6),
        RuleWeight::optional(names::DIVERGENCIA_MACD_HIST, 5),
        RuleWeight::optional(names::CONFIRMACAO_ESTOCASTICO, 5),
        RuleWeight::optional(names::DIVERGENCIA_OBV, 4),
        RuleWeight::optional(names::VOLUME_ROMPIMENTO, 8),
        RuleWeight::optional(names::PERFIL_VOLUME, 4),
    ]
}

impl Default for ScoringConfig {
    fn default() -> Self {
        let mut weights_hns = vec![
            RuleWeight::mandatory(names::ESTRUTURA, 10),
            RuleWeight::mandatory(names::EXTREMO_CONTEXTO_CABECA, 10),
            RuleWeight::mandatory(names::SIMETRIA_OMBROS, 10),
            RuleWeight::mandatory(names::NECKLINE_PLANA, 10),
            RuleWeight::mandatory(names::TENDENCIA_BASE, 10),
            RuleWeight::mandatory(names::ROMPIMENTO, 10),
            RuleWeight::mandatory(names::RETESTE_NECKLINE, 10),
        ];
        weights_hns.extend(optional_weights());

        let mut weights_dtb = vec![
            RuleWeight::mandatory(names::ESTRUTURA, 10),
            RuleWeight::mandatory(names::EXTREMO_CONTEXTO_P1, 8),
            RuleWeight::mandatory(names::EXTREMO_CONTEXTO_P3, 8),
            RuleWeight::mandatory(names::CONTEXTO_TENDENCIA, 10),
            RuleWeight::mandatory(names::SIMETRIA_EXTREMOS, 10),
            RuleWeight::mandatory(names::NECKLINE_PLANA, 4),
            RuleWeight::mandatory(names::ROMPIMENTO, 10),
            RuleWeight::mandatory(names::NECKLINE_RETEST_P4, 10),
        ];
        weights_dtb.extend(optional_weights());

        let mut weights_ttb = vec![
            RuleWeight::mandatory(names::ESTRUTURA, 8),
            RuleWeight::mandatory(names::EXTREMO_CONTEXTO_P1, 6),
            RuleWeight::mandatory(names::EXTREMO_CONTEXTO_P3, 6),
            RuleWeight::mandatory(names::EXTREMO_CONTEXTO_P5, 6),
            RuleWeight::mandatory(names::CONTEXTO_TENDENCIA, 8),
            RuleWeight::mandatory(names::SIMETRIA_EXTREMOS, 10),
            RuleWeight::mandatory(names::NECKLINE_PLANA, 6),
            RuleWeight::mandatory(names::ROMPIMENTO, 10),
            RuleWeight::mandatory(names::NECKLINE_RETEST_P6, 10),
        ];
        weights_ttb.extend(optional_weights());

        Self {
            weights_hns,
            weights_dtb,
            weights_ttb,
            minimum_score_hns: 70,
            minimum_score_dtb: 70,
            minimum_score_ttb: 70,
        }
    }
}

impl ScoringConfig {
    pub fn weights(&self, family: PatternFamily) -> &[RuleWeight] {
        match family {
            PatternFamily::Hns => &self.weights_hns,
            PatternFamily::Dtb => &self.weights_dtb,
            PatternFamily::Ttb => &self.weights_ttb,
        }
    }

    pub fn minimum_score(&self, family: PatternFamily) -> i64 {
        match family {
            PatternFamily::Hns => self.minimum_score_hns,
            PatternFamily::Dtb => self.minimum_score_dtb,
            PatternFamily::Ttb => self.minimum_score_ttb,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DebugConfig {
    pub hns_debug: bool,
    pub dtb_debug: bool,
    pub ttb_debug: bool,
    pub debug_dir: PathBuf,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            hns_debug: false,
            dtb_debug: false,
            ttb_debug: false,
            debug_dir: PathBuf::from("debug"),
        }
    }
}

/// The complete, immutable pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanConfig {
    pub rsi: RsiConfig,
    pub stochastic: StochConfig,
    pub macd: MacdConfig,
    pub volume: VolumeConfig,
    pub retest: RetestConfig,
    pub zigzag: ZigZagConfig,
    pub context: ContextConfig,
    pub tolerances: ToleranceConfig,
    pub scoring: ScoringConfig,
    /// Only candidates whose key pivot falls within the last N pivots are
    /// scanned.
    pub recent_patterns_lookback_count: usize,
    pub debug: DebugConfig,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            rsi: RsiConfig::default(),
            stochastic: StochConfig::default(),
            macd: MacdConfig::default(),
            volume: VolumeConfig::default(),
            retest: RetestConfig::default(),
            zigzag: ZigZagConfig::default(),
            context: ContextConfig::default(),
            tolerances: ToleranceConfig::default(),
            scoring: ScoringConfig::default(),
            recent_patterns_lookback_count: 30,
            debug: DebugConfig::default(),
        }
    }
}

impl ScanConfig {
    /// Overlay TOML onto defaults. Unknown keys are rejected.
    pub fn from_toml_str(text: &str) -> Result<Self, ScanError> {
        let config: ScanConfig =
            toml::from_str(text).map_err(|e| ScanError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ScanError> {
        if self.zigzag.strategies.is_empty() {
            return Err(ScanError::InvalidConfig(
                "no ZigZag strategies configured".to_string(),
            ));
        }
        for (name, deviation) in &self.zigzag.strategies {
            if *deviation <= 0.0 {
                return Err(ScanError::InvalidConfig(format!(
                    "strategy {name} has non-positive deviation percent {deviation}"
                )));
            }
        }
        if self.zigzag.extension_deviation_factor < 0.0 {
            return Err(ScanError::InvalidConfig(
                "extension_deviation_factor must be non-negative".to_string(),
            ));
        }
        for weights in [
            &self.scoring.weights_hns,
            &self.scoring.weights_dtb,
            &self.scoring.weights_ttb,
        ] {
            for rule in weights {
                if rule.weight < 0 {
                    return Err(ScanError::InvalidConfig(format!(
                        "rule {} has negative weight",
                        rule.name
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn deviation_for(&self, strategy: &str) -> Result<f64, ScanError> {
        self.zigzag
            .strategies
            .get(strategy)
            .copied()
            .ok_or_else(|| ScanError::InvalidConfig(format!("unknown strategy: {strategy}")))
    }

    pub fn indicator_params(&self) -> IndicatorParams {
        IndicatorParams {
            rsi_length: self.rsi.length,
            macd_fast: self.macd.fast,
            macd_slow: self.macd.slow,
            macd_signal: self.macd.signal,
            stoch_k: self.stochastic.k,
            stoch_d: self.stochastic.d,
            stoch_smooth_k: self.stochastic.smooth_k,
            atr_length: 14,
        }
    }
}
