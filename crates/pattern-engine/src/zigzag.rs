//! ZigZag reduction of a close series to alternating peaks and valleys.
//!
//! A pivot is confirmed when price reverses from the running extremum of the
//! current leg by at least `deviation_percent` of the extremum price. The
//! output list strictly alternates kinds and strictly increases in index.

use pattern_core::{Pivot, PivotKind};

use crate::config::ZigZagConfig;

#[derive(Clone, Copy, PartialEq)]
enum Leg {
    Up,
    Down,
}

/// Extract the pivot list for one series.
///
/// `deviation_percent` is the strategy preset (5.0 means 5%).
pub fn extract(closes: &[f64], deviation_percent: f64, config: &ZigZagConfig) -> Vec<Pivot> {
    let mut pivots: Vec<Pivot> = Vec::new();
    let d = deviation_percent / 100.0;
    if closes.len() < 2 || d <= 0.0 {
        return pivots;
    }

    // Direction is unknown at the start: track both extremes until one
    // reversal reaches the deviation first.
    let mut max_idx = 0usize;
    let mut min_idx = 0usize;
    let mut leg: Option<Leg> = None;
    let mut candidate_idx = 0usize;
    let mut resume_at = closes.len();

    for i in 1..closes.len() {
        let close = closes[i];
        if close > closes[max_idx] {
            max_idx = i;
        }
        if close < closes[min_idx] {
            min_idx = i;
        }

        if closes[max_idx] > 0.0 && close <= closes[max_idx] * (1.0 - d) {
            push_pivot(
                &mut pivots,
                Pivot::new(max_idx, closes[max_idx], PivotKind::Peak),
            );
            leg = Some(Leg::Down);
            candidate_idx = i;
            resume_at = i + 1;
            break;
        }
        if closes[min_idx] > 0.0 && close >= closes[min_idx] * (1.0 + d) {
            push_pivot(
                &mut pivots,
                Pivot::new(min_idx, closes[min_idx], PivotKind::Valley),
            );
            leg = Some(Leg::Up);
            candidate_idx = i;
            resume_at = i + 1;
            break;
        }
    }

    let mut leg = match leg {
        Some(leg) => leg,
        // Flat (or too-short) series: nothing ever deviated far enough.
        None => return pivots,
    };

    for i in resume_at..closes.len() {
        let close = closes[i];
        match leg {
            Leg::Down => {
                if close < closes[candidate_idx] {
                    candidate_idx = i;
                } else if closes[candidate_idx] > 0.0
                    && close >= closes[candidate_idx] * (1.0 + d)
                {
                    push_pivot(
                        &mut pivots,
                        Pivot::new(candidate_idx, closes[candidate_idx], PivotKind::Valley),
                    );
                    leg = Leg::Up;
                    candidate_idx = i;
                }
            }
            Leg::Up => {
                if close > closes[candidate_idx] {
                    candidate_idx = i;
                } else if closes[candidate_idx] > 0.0
                    && close <= closes[candidate_idx] * (1.0 - d)
                {
                    push_pivot(
                        &mut pivots,
                        Pivot::new(candidate_idx, closes[candidate_idx], PivotKind::Peak),
                    );
                    leg = Leg::Down;
                    candidate_idx = i;
                }
            }
        }
    }

    // Provisional trailing pivot: the unconfirmed leg's extremum counts once
    // it has moved a fraction of the full deviation away from the last
    // confirmed pivot.
    if config.extend_to_last_bar {
        if let Some(last) = pivots.last().copied() {
            if candidate_idx > last.idx && last.price > 0.0 {
                let deviation = (closes[candidate_idx] - last.price).abs() / last.price;
                if deviation >= config.extension_deviation_factor * d {
                    let kind = match leg {
                        Leg::Up => PivotKind::Peak,
                        Leg::Down => PivotKind::Valley,
                    };
                    push_pivot(
                        &mut pivots,
                        Pivot::new(candidate_idx, closes[candidate_idx], kind),
                    );
                }
            }
        }
    }

    pivots
}

/// Append while preserving the output invariants: strictly increasing
/// indices, strictly alternating kinds. At an index collision the kind that
/// alternates with the preceding pivot wins; a same-kind collision keeps the
/// more extreme price.
fn push_pivot(pivots: &mut Vec<Pivot>, pivot: Pivot) {
    let Some(last) = pivots.last().copied() else {
        pivots.push(pivot);
        return;
    };

    if pivot.idx == last.idx {
        if pivot.kind == last.kind {
            if more_extreme(pivot, last) {
                *pivots.last_mut().unwrap() = pivot;
            }
        } else {
            let prev_kind = pivots.len().checked_sub(2).map(|i| pivots[i].kind);
            // Keep whichever of the two alternates with the pivot before.
            if prev_kind == Some(last.kind) {
                *pivots.last_mut().unwrap() = pivot;
            }
        }
        return;
    }

    if pivot.kind == last.kind {
        // Two same-kind confirmations in a row: merge, keeping the extreme.
        if more_extreme(pivot, last) {
            *pivots.last_mut().unwrap() = pivot;
        }
        return;
    }

    pivots.push(pivot);
}

fn more_extreme(a: Pivot, b: Pivot) -> bool {
    match a.kind {
        PivotKind::Peak => a.price > b.price,
        PivotKind::Valley => a.price < b.price,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(pivots: &[Pivot]) -> Vec<PivotKind> {
        pivots.iter().map(|p| p.kind).collect()
    }

    fn assert_invariants(pivots: &[Pivot]) {
        for pair in pivots.windows(2) {
            assert!(pair[0].idx < pair[1].idx, "indices must strictly increase");
            assert_ne!(pair[0].kind, pair[1].kind, "kinds must alternate");
        }
    }

    #[test]
    fn alternation_over_a_wave() {
        let closes = vec![
            100.0, 95.0, 85.0, 92.0, 75.0, 92.0, 85.0, 95.0, 100.0, 105.0, 98.0, 100.0,
        ];
        let config = ZigZagConfig::default();
        let pivots = extract(&closes, 5.0, &config);

        assert_invariants(&pivots);
        assert_eq!(
            pivots
                .iter()
                .map(|p| (p.idx, p.price))
                .collect::<Vec<_>>(),
            vec![
                (0, 100.0),
                (2, 85.0),
                (3, 92.0),
                (4, 75.0),
                (5, 92.0),
                (6, 85.0),
                (9, 105.0),
                (10, 98.0),
            ]
        );
        assert_eq!(
            kinds(&pivots),
            vec![
                PivotKind::Peak,
                PivotKind::Valley,
                PivotKind::Peak,
                PivotKind::Valley,
                PivotKind::Peak,
                PivotKind::Valley,
                PivotKind::Peak,
                PivotKind::Valley,
            ]
        );
    }

    #[test]
    fn flat_series_produces_no_pivots() {
        let closes = vec![50.0; 40];
        let pivots = extract(&closes, 3.0, &ZigZagConfig::default());
        assert!(pivots.is_empty());
    }

    #[test]
    fn starting_direction_follows_first_reversal() {
        // Rises first: the initial pivot is the valley at the start.
        let closes = vec![100.0, 102.0, 106.0, 104.0, 100.0, 107.0];
        let pivots = extract(&closes, 5.0, &ZigZagConfig::default());

        assert_invariants(&pivots);
        assert_eq!(pivots[0].kind, PivotKind::Valley);
        assert_eq!(pivots[0].idx, 0);
        assert_eq!(pivots[1].kind, PivotKind::Peak);
        assert_eq!(pivots[1].idx, 2);
    }

    #[test]
    fn trailing_extremum_becomes_provisional_pivot() {
        let closes = vec![100.0, 106.0, 100.0, 106.5, 106.0];
        let mut config = ZigZagConfig::default();
        config.extension_deviation_factor = 0.25;
        let pivots = extract(&closes, 5.0, &config);

        assert_invariants(&pivots);
        // The unconfirmed up-leg extremum 106.5@3 sits 6.5% above the last
        // confirmed valley (threshold 1.25%), so it is appended as a
        // provisional peak; the final bar at 106.0 is not a pivot.
        assert_eq!(pivots.len(), 4);
        assert_eq!(pivots[3].idx, 3);
        assert_eq!(pivots[3].kind, PivotKind::Peak);
    }

    #[test]
    fn extension_disabled_by_config() {
        let closes = vec![
            100.0, 95.0, 85.0, 92.0, 75.0, 92.0, 85.0, 95.0, 100.0, 105.0, 98.0, 100.0,
        ];
        let mut config = ZigZagConfig::default();
        config.extend_to_last_bar = false;
        let pivots = extract(&closes, 5.0, &config);

        assert_invariants(&pivots);
        assert_eq!(pivots.last().unwrap().idx, 9);
    }

    #[test]
    fn monster_gap_yields_single_pivot_pair() {
        let mut closes = vec![100.0; 10];
        closes.extend(vec![300.0; 10]);
        let pivots = extract(&closes, 5.0, &ZigZagConfig::default());

        assert_invariants(&pivots);
        // One valley on the low plateau, at most a trailing peak after it.
        assert!(pivots.len() <= 2);
        assert_eq!(pivots[0].kind, PivotKind::Valley);
    }

    #[test]
    fn recomputation_is_deterministic() {
        let closes: Vec<f64> = (0..200)
            .map(|i| 100.0 + (i as f64 * 0.37).sin() * 12.0 + (i as f64 * 0.11).cos() * 5.0)
            .collect();
        let config = ZigZagConfig::default();
        let first = extract(&closes, 4.0, &config);
        let second = extract(&closes, 4.0, &config);

        assert_invariants(&first);
        assert!(!first.is_empty());
        assert_eq!(first, second);
    }
}
