use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// OHLCV bar data. Timestamps are timezone-naive and strictly ascending
/// within a series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// One fetched price history for a (ticker, interval) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSeries {
    pub ticker: String,
    pub interval: String,
    pub bars: Vec<Bar>,
}

impl PriceSeries {
    pub fn new(ticker: impl Into<String>, interval: impl Into<String>, bars: Vec<Bar>) -> Self {
        Self {
            ticker: ticker.into(),
            interval: interval.into(),
            bars,
        }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.low).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume).collect()
    }
}

/// Kind of a ZigZag pivot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PivotKind {
    Peak,
    Valley,
}

impl PivotKind {
    pub fn opposite(self) -> Self {
        match self {
            PivotKind::Peak => PivotKind::Valley,
            PivotKind::Valley => PivotKind::Peak,
        }
    }
}

/// A confirmed (or provisional trailing) extremum in a ZigZag reduction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pivot {
    pub idx: usize,
    pub price: f64,
    pub kind: PivotKind,
}

impl Pivot {
    pub fn new(idx: usize, price: f64, kind: PivotKind) -> Self {
        Self { idx, price, kind }
    }
}

/// Pattern family: Head-and-Shoulders, Double Top/Bottom, Triple Top/Bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatternFamily {
    Hns,
    Dtb,
    Ttb,
}

impl PatternFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternFamily::Hns => "HNS",
            PatternFamily::Dtb => "DTB",
            PatternFamily::Ttb => "TTB",
        }
    }
}

/// Pattern variant within a family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatternKind {
    /// Head-and-Shoulders (bearish, peaks).
    Oco,
    /// Inverse Head-and-Shoulders (bullish, valleys).
    Ocoi,
    DoubleTop,
    DoubleBottom,
    TripleTop,
    TripleBottom,
}

impl PatternKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternKind::Oco => "OCO",
            PatternKind::Ocoi => "OCOI",
            PatternKind::DoubleTop => "DT",
            PatternKind::DoubleBottom => "DB",
            PatternKind::TripleTop => "TT",
            PatternKind::TripleBottom => "TB",
        }
    }

    pub fn family(&self) -> PatternFamily {
        match self {
            PatternKind::Oco | PatternKind::Ocoi => PatternFamily::Hns,
            PatternKind::DoubleTop | PatternKind::DoubleBottom => PatternFamily::Dtb,
            PatternKind::TripleTop | PatternKind::TripleBottom => PatternFamily::Ttb,
        }
    }

    /// Kind of the structural extremes (head, tops, bottoms).
    pub fn extreme_kind(&self) -> PivotKind {
        match self {
            PatternKind::Oco | PatternKind::DoubleTop | PatternKind::TripleTop => PivotKind::Peak,
            _ => PivotKind::Valley,
        }
    }
}

/// One validated pattern occurrence, ready for the sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternRecord {
    pub ticker: String,
    pub interval: String,
    pub strategy: String,
    pub kind: PatternKind,
    pub start_idx: usize,
    pub end_idx: usize,
    /// Identity key for intra-tuple deduplication: head idx for HNS,
    /// p3 idx for DTB, p5 idx for TTB.
    pub key_idx: usize,
    pub retest_idx: Option<usize>,
    /// Per-rule validity flags, keyed by rule name.
    pub flags: BTreeMap<String, bool>,
    /// Structural pivots plus the retest pivot, in tuple order.
    pub pivots: Vec<Pivot>,
    pub score_total: i64,
}

impl PatternRecord {
    pub fn family(&self) -> PatternFamily {
        self.kind.family()
    }

    /// Pivot tuple as a JSON array of `{idx, price, kind}` objects.
    pub fn pivots_json(&self) -> String {
        serde_json::to_string(&self.pivots).unwrap_or_else(|_| "[]".to_string())
    }
}
