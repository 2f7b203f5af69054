//! Per-tuple scan: indicators, pivots, candidate enumeration, validation and
//! deduplication for one (ticker, interval, strategy) evaluation. Pure CPU
//! work; the driver owns fetching and sinking.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use pattern_core::{PatternFamily, PatternRecord, PriceSeries, ScanError};
use technical_indicators::IndicatorSet;

use crate::candidates::{enumerate_family, structural_width};
use crate::config::ScanConfig;
use crate::debug_log::DebugLog;
use crate::validators::{to_record, validate_and_score};
use crate::zigzag;

/// Scan one series with one strategy preset. Returns accepted records,
/// deduplicated per family by identity key and sorted by non-decreasing
/// `end_idx`. Degenerate inputs (empty, flat, too few pivots) yield zero
/// records rather than errors.
pub fn scan_series(
    series: &PriceSeries,
    strategy: &str,
    families: &[PatternFamily],
    config: &ScanConfig,
    debug: &DebugLog,
) -> Result<Vec<PatternRecord>, ScanError> {
    if series.is_empty() || families.is_empty() {
        return Ok(Vec::new());
    }
    let deviation = config.deviation_for(strategy)?;

    let closes = series.closes();
    let volumes = series.volumes();
    let indicators = IndicatorSet::compute(series, &config.indicator_params());
    let pivots = zigzag::extract(&closes, deviation, &config.zigzag);

    let narrowest = families
        .iter()
        .map(|f| structural_width(*f))
        .min()
        .unwrap_or(usize::MAX);
    if pivots.len() < narrowest {
        tracing::debug!(
            ticker = %series.ticker,
            strategy,
            pivots = pivots.len(),
            "pivot starvation, tuple yields no records"
        );
        return Ok(Vec::new());
    }

    let mut records: Vec<PatternRecord> = Vec::new();
    for &family in families {
        let mut best: BTreeMap<usize, PatternRecord> = BTreeMap::new();

        for candidate in
            enumerate_family(&pivots, family, config.recent_patterns_lookback_count)
        {
            let validation =
                validate_and_score(&candidate, &pivots, &closes, &volumes, &indicators, config);

            if debug.enabled(family) {
                let line = if validation.accepted {
                    format!(
                        "{} {} accepted kind={} key={} score={}",
                        series.ticker,
                        strategy,
                        candidate.kind.as_str(),
                        candidate.key_pivot().idx,
                        validation.score_total,
                    )
                } else {
                    format!(
                        "{} {} rejected kind={} key={} score={} failed={:?}",
                        series.ticker,
                        strategy,
                        candidate.kind.as_str(),
                        candidate.key_pivot().idx,
                        validation.score_total,
                        validation.failed_rules(),
                    )
                };
                debug.write(family, &line);
            }

            if !validation.accepted {
                continue;
            }
            let record = to_record(
                &candidate,
                &validation,
                &series.ticker,
                &series.interval,
                strategy,
            );
            match best.entry(record.key_idx) {
                Entry::Vacant(slot) => {
                    slot.insert(record);
                }
                Entry::Occupied(mut slot) => {
                    if beats(&record, slot.get()) {
                        slot.insert(record);
                    }
                }
            }
        }
        records.extend(best.into_values());
    }

    records.sort_by_key(|r| r.end_idx);
    Ok(records)
}

/// Deduplication order: higher score wins, then later `end_idx`, then the
/// incumbent stays.
fn beats(challenger: &PatternRecord, incumbent: &PatternRecord) -> bool {
    challenger.score_total > incumbent.score_total
        || (challenger.score_total == incumbent.score_total
            && challenger.end_idx > incumbent.end_idx)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use pattern_core::PatternKind;

    use super::*;

    fn record(score_total: i64, end_idx: usize) -> PatternRecord {
        PatternRecord {
            ticker: "TEST".into(),
            interval: "1d".into(),
            strategy: "swing_short".into(),
            kind: PatternKind::DoubleTop,
            start_idx: 0,
            end_idx,
            key_idx: 10,
            retest_idx: Some(end_idx),
            flags: BTreeMap::new(),
            pivots: vec![],
            score_total,
        }
    }

    #[test]
    fn dedup_prefers_score_then_later_end() {
        assert!(beats(&record(90, 20), &record(80, 25)));
        assert!(!beats(&record(80, 25), &record(90, 20)));
        assert!(beats(&record(80, 30), &record(80, 25)));
        // Equal on both counts: the incumbent stays.
        assert!(!beats(&record(80, 25), &record(80, 25)));
    }
}
