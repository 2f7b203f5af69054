//! Windowed selection of pivot tuples that could form each pattern family.
//!
//! Enumerators check only kind alternation and recency; every other
//! judgement belongs to the rule library and validators.

use pattern_core::{PatternFamily, PatternKind, Pivot, PivotKind};

/// A structural pivot tuple for one family: 6 pivots (p0..p5) for HNS and
/// TTB, 4 (p0..p3) for DTB. The retest pivot is resolved during validation.
#[derive(Debug, Clone)]
pub struct PatternCandidate {
    pub kind: PatternKind,
    pub pivots: Vec<Pivot>,
    /// Offset of `pivots[0]` within the full pivot list.
    pub pivot_offset: usize,
}

impl PatternCandidate {
    pub fn family(&self) -> PatternFamily {
        self.kind.family()
    }

    /// The identity/key pivot: head for HNS, second extreme for DTB, third
    /// extreme for TTB.
    pub fn key_pivot(&self) -> Pivot {
        self.pivots[key_offset(self.family())]
    }

    /// Structural extremes (shoulders and head, or the matched tops/bottoms).
    pub fn extremes(&self) -> Vec<Pivot> {
        match self.family() {
            PatternFamily::Dtb => vec![self.pivots[1], self.pivots[3]],
            _ => vec![self.pivots[1], self.pivots[3], self.pivots[5]],
        }
    }

    pub fn last_structural(&self) -> Pivot {
        *self.pivots.last().expect("candidate tuple is never empty")
    }
}

/// Width of the structural window for a family.
pub fn structural_width(family: PatternFamily) -> usize {
    match family {
        PatternFamily::Dtb => 4,
        PatternFamily::Hns | PatternFamily::Ttb => 6,
    }
}

/// Offset of the identity/key pivot within the structural tuple.
pub fn key_offset(family: PatternFamily) -> usize {
    match family {
        PatternFamily::Hns | PatternFamily::Dtb => 3,
        PatternFamily::Ttb => 5,
    }
}

fn kind_for(family: PatternFamily, first: PivotKind) -> PatternKind {
    // The tuple starts with the base pivot, whose kind is opposite to the
    // structural extremes: V-P-V-P-V-P carries peak extremes.
    match (family, first) {
        (PatternFamily::Hns, PivotKind::Valley) => PatternKind::Oco,
        (PatternFamily::Hns, PivotKind::Peak) => PatternKind::Ocoi,
        (PatternFamily::Dtb, PivotKind::Valley) => PatternKind::DoubleTop,
        (PatternFamily::Dtb, PivotKind::Peak) => PatternKind::DoubleBottom,
        (PatternFamily::Ttb, PivotKind::Valley) => PatternKind::TripleTop,
        (PatternFamily::Ttb, PivotKind::Peak) => PatternKind::TripleBottom,
    }
}

/// Slide the family's window across the pivot list, restricted to windows
/// whose key pivot falls within the last `recent_lookback` pivots.
pub fn enumerate_family(
    pivots: &[Pivot],
    family: PatternFamily,
    recent_lookback: usize,
) -> Vec<PatternCandidate> {
    let width = structural_width(family);
    let mut candidates = Vec::new();
    if pivots.len() < width {
        return candidates;
    }

    let key = key_offset(family);
    let recent_floor = pivots.len().saturating_sub(recent_lookback);

    for start in 0..=pivots.len() - width {
        if start + key < recent_floor {
            continue;
        }
        let window = &pivots[start..start + width];
        if !alternates(window) {
            continue;
        }
        candidates.push(PatternCandidate {
            kind: kind_for(family, window[0].kind),
            pivots: window.to_vec(),
            pivot_offset: start,
        });
    }
    candidates
}

fn alternates(window: &[Pivot]) -> bool {
    window.windows(2).all(|pair| pair[0].kind != pair[1].kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alternating_pivots(n: usize, first: PivotKind) -> Vec<Pivot> {
        (0..n)
            .map(|i| {
                let kind = if i % 2 == 0 { first } else { first.opposite() };
                let price = match kind {
                    PivotKind::Peak => 110.0 + i as f64,
                    PivotKind::Valley => 90.0 - i as f64,
                };
                Pivot::new(i * 3, price, kind)
            })
            .collect()
    }

    #[test]
    fn hns_windows_carry_six_pivots_and_both_variants() {
        let pivots = alternating_pivots(8, PivotKind::Valley);
        let candidates = enumerate_family(&pivots, PatternFamily::Hns, 100);

        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0].kind, PatternKind::Oco);
        assert_eq!(candidates[1].kind, PatternKind::Ocoi);
        assert_eq!(candidates[0].pivots.len(), 6);
        assert_eq!(candidates[0].pivot_offset, 0);
    }

    #[test]
    fn dtb_windows_carry_four_pivots() {
        let pivots = alternating_pivots(6, PivotKind::Peak);
        let candidates = enumerate_family(&pivots, PatternFamily::Dtb, 100);

        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0].kind, PatternKind::DoubleBottom);
        assert_eq!(candidates[0].pivots.len(), 4);
        assert_eq!(candidates[0].key_pivot().idx, pivots[3].idx);
    }

    #[test]
    fn recency_restricts_old_windows() {
        let pivots = alternating_pivots(20, PivotKind::Valley);
        let all = enumerate_family(&pivots, PatternFamily::Dtb, 100);
        let recent = enumerate_family(&pivots, PatternFamily::Dtb, 5);

        assert_eq!(all.len(), 17);
        // Key pivot (start + 3) must land in the last 5 pivots (offset >= 15).
        assert_eq!(recent.len(), 5);
        assert!(recent.iter().all(|c| c.pivot_offset + 3 >= 15));
    }

    #[test]
    fn starving_pivot_list_yields_nothing() {
        let pivots = alternating_pivots(3, PivotKind::Valley);
        assert!(enumerate_family(&pivots, PatternFamily::Hns, 100).is_empty());
        assert!(enumerate_family(&pivots, PatternFamily::Ttb, 100).is_empty());
    }
}
