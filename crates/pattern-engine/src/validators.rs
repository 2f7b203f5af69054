//! Per-family validation: evaluate every configured rule, sum the weighted
//! flags, and accept only when all mandatory rules hold and the score clears
//! the family minimum.
//!
//! A candidate moves linearly through collected -> mandatory gate -> scored
//! -> accepted/rejected; flags are fully populated on every path so that
//! rejections stay diagnosable.

use std::collections::BTreeMap;

use pattern_core::{PatternFamily, PatternRecord, Pivot};
use technical_indicators::IndicatorSet;

use crate::candidates::PatternCandidate;
use crate::config::ScanConfig;
use crate::rules::{self, names, ContextMode};

/// Outcome of validating one candidate.
#[derive(Debug, Clone)]
pub struct Validation {
    pub flags: BTreeMap<String, bool>,
    pub score_total: i64,
    pub accepted: bool,
    pub breakout_idx: Option<usize>,
    pub retest: Option<Pivot>,
}

impl Validation {
    /// Rule names that failed, for the family debug sink.
    pub fn failed_rules(&self) -> Vec<&str> {
        self.flags
            .iter()
            .filter(|(_, pass)| !**pass)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// Evaluate every rule in the family's scoring table against one candidate.
pub fn validate_and_score(
    candidate: &PatternCandidate,
    pivots: &[Pivot],
    closes: &[f64],
    volumes: &[f64],
    indicators: &IndicatorSet,
    config: &ScanConfig,
) -> Validation {
    let family = candidate.family();
    let breakout_idx = rules::find_breakout(candidate, closes, config.volume.search_max_bars);
    let retest = breakout_idx.and_then(|b| rules::find_retest(candidate, pivots, b));
    let window_end = breakout_idx.unwrap_or(candidate.last_structural().idx);
    let window_bars = rules::context_window_bars(pivots, &config.context);
    let (rsi_div, rsi_strong) = rules::rsi_divergence(candidate, indicators, &config.rsi);

    let extremity = |pivot: Pivot, mode: ContextMode| {
        rules::extremity_in_context(closes, pivot, window_bars, mode)
    };
    // TTB looks only backward at its first extreme; everything else centers.
    let p1_mode = if family == PatternFamily::Ttb {
        ContextMode::PastOnly
    } else {
        ContextMode::Centered
    };

    // Family-specific rules are guarded so a misassigned scoring table can
    // never index past a narrower family's tuple.
    let is_hns = family == PatternFamily::Hns;
    let evaluate = |name: &str| -> bool {
        match name {
            names::ESTRUTURA => rules::estrutura(candidate),
            names::EXTREMO_CONTEXTO_CABECA => {
                is_hns && extremity(candidate.pivots[3], ContextMode::Centered)
            }
            names::EXTREMO_CONTEXTO_P1 => extremity(candidate.pivots[1], p1_mode),
            names::EXTREMO_CONTEXTO_P3 => extremity(candidate.pivots[3], ContextMode::Centered),
            names::EXTREMO_CONTEXTO_P5 => candidate
                .pivots
                .get(5)
                .is_some_and(|p| extremity(*p, ContextMode::Centered)),
            names::SIMETRIA_OMBROS => {
                is_hns && rules::shoulder_symmetry(candidate, &config.tolerances)
            }
            names::SIMETRIA_EXTREMOS => rules::extremes_symmetry(candidate, &config.tolerances),
            names::NECKLINE_PLANA => rules::neckline_flatness(candidate, &config.tolerances),
            names::TENDENCIA_BASE => is_hns && rules::base_trend(candidate),
            names::CONTEXTO_TENDENCIA => {
                rules::trend_context(candidate, pivots, &config.tolerances)
            }
            names::ROMPIMENTO => breakout_idx.is_some(),
            names::RETESTE_NECKLINE | names::NECKLINE_RETEST_P4 | names::NECKLINE_RETEST_P6 => {
                retest.is_some_and(|r| {
                    rules::neckline_retest(candidate, r, &indicators.atr, &config.retest)
                })
            }
            names::DIVERGENCIA_RSI => rsi_div,
            names::DIVERGENCIA_RSI_FORTE => rsi_strong,
            names::CRUZAMENTO_MACD => {
                rules::macd_signal_cross(candidate, indicators, &config.macd, window_end)
            }
            names::DIVERGENCIA_MACD_HIST => rules::macd_hist_divergence(candidate, indicators),
            names::CONFIRMACAO_ESTOCASTICO => rules::stochastic_confirmation(
                candidate,
                indicators,
                &config.stochastic,
                window_end,
            ),
            names::DIVERGENCIA_OBV => rules::obv_divergence(candidate, indicators),
            names::VOLUME_ROMPIMENTO => {
                breakout_idx.is_some_and(|b| rules::breakout_volume(volumes, b, &config.volume))
            }
            names::PERFIL_VOLUME => rules::volume_profile(candidate, volumes),
            other => {
                tracing::trace!(rule = other, "unknown rule name in scoring table");
                false
            }
        }
    };

    let mut flags = BTreeMap::new();
    let mut score_total = 0i64;
    let mut all_mandatory = true;
    for rule in config.scoring.weights(family) {
        let pass = evaluate(&rule.name);
        flags.insert(rule.name.clone(), pass);
        if pass {
            score_total += rule.weight;
        } else if rule.mandatory {
            all_mandatory = false;
        }
    }

    let accepted = all_mandatory && score_total >= config.scoring.minimum_score(family);
    Validation {
        flags,
        score_total,
        accepted,
        breakout_idx,
        retest,
    }
}

/// Assemble the output row for an accepted candidate.
pub fn to_record(
    candidate: &PatternCandidate,
    validation: &Validation,
    ticker: &str,
    interval: &str,
    strategy: &str,
) -> PatternRecord {
    let mut pivots = candidate.pivots.clone();
    if let Some(retest) = validation.retest {
        pivots.push(retest);
    }
    let end_idx = validation
        .retest
        .map(|r| r.idx)
        .or(validation.breakout_idx)
        .unwrap_or_else(|| candidate.last_structural().idx);

    PatternRecord {
        ticker: ticker.to_string(),
        interval: interval.to_string(),
        strategy: strategy.to_string(),
        kind: candidate.kind,
        start_idx: candidate.pivots[0].idx,
        end_idx,
        key_idx: candidate.key_pivot().idx,
        retest_idx: validation.retest.map(|r| r.idx),
        flags: validation.flags.clone(),
        pivots,
        score_total: validation.score_total,
    }
}
