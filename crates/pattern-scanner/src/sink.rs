//! CSV record sink with a fixed header: identity columns, score, every
//! per-rule validity column, pivot (idx, price) pairs, and the passthrough
//! duplicates (`tipo`, `score`, `pivos`).

use std::fs::File;
use std::path::Path;

use pattern_core::{PatternRecord, RecordSink, ScanError};
use pattern_engine::rules::names;

/// All rule columns across the three families, in stable output order.
/// Cells stay empty for rules the record's family does not score.
const RULE_COLUMNS: &[&str] = &[
    names::ESTRUTURA,
    names::EXTREMO_CONTEXTO_CABECA,
    names::SIMETRIA_OMBROS,
    names::NECKLINE_PLANA,
    names::TENDENCIA_BASE,
    names::ROMPIMENTO,
    names::RETESTE_NECKLINE,
    names::EXTREMO_CONTEXTO_P1,
    names::EXTREMO_CONTEXTO_P3,
    names::EXTREMO_CONTEXTO_P5,
    names::CONTEXTO_TENDENCIA,
    names::SIMETRIA_EXTREMOS,
    names::NECKLINE_RETEST_P4,
    names::NECKLINE_RETEST_P6,
    names::DIVERGENCIA_RSI,
    names::DIVERGENCIA_RSI_FORTE,
    names::CRUZAMENTO_MACD,
    names::DIVERGENCIA_MACD_HIST,
    names::CONFIRMACAO_ESTOCASTICO,
    names::DIVERGENCIA_OBV,
    names::VOLUME_ROMPIMENTO,
    names::PERFIL_VOLUME,
];

const MAX_PIVOTS: usize = 7;

pub struct CsvSink {
    writer: csv::Writer<File>,
}

impl CsvSink {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, ScanError> {
        let writer =
            csv::Writer::from_path(path.as_ref()).map_err(|e| ScanError::Sink(e.to_string()))?;
        let mut sink = Self { writer };
        sink.write_header()?;
        Ok(sink)
    }

    fn write_header(&mut self) -> Result<(), ScanError> {
        let mut header: Vec<String> = vec![
            "ticker".into(),
            "timeframe".into(),
            "strategy".into(),
            "padrao_tipo".into(),
            "score_total".into(),
        ];
        for rule in RULE_COLUMNS {
            header.push(format!("valid_{rule}"));
        }
        for i in 0..MAX_PIVOTS {
            header.push(format!("p{i}_idx"));
            header.push(format!("p{i}_preco"));
        }
        header.extend(["tipo".into(), "score".into(), "pivos".into()]);
        self.writer
            .write_record(&header)
            .map_err(|e| ScanError::Sink(e.to_string()))
    }

    pub fn row_for(record: &PatternRecord) -> Vec<String> {
        let mut row: Vec<String> = vec![
            record.ticker.clone(),
            record.interval.clone(),
            record.strategy.clone(),
            record.kind.as_str().to_string(),
            record.score_total.to_string(),
        ];
        for rule in RULE_COLUMNS {
            row.push(match record.flags.get(*rule) {
                Some(true) => "1".to_string(),
                Some(false) => "0".to_string(),
                None => String::new(),
            });
        }
        for i in 0..MAX_PIVOTS {
            match record.pivots.get(i) {
                Some(pivot) => {
                    row.push(pivot.idx.to_string());
                    row.push(pivot.price.to_string());
                }
                None => {
                    row.push(String::new());
                    row.push(String::new());
                }
            }
        }
        row.push(record.kind.as_str().to_string());
        row.push(record.score_total.to_string());
        row.push(record.pivots_json());
        row
    }
}

impl RecordSink for CsvSink {
    fn emit(&mut self, record: &PatternRecord) -> Result<(), ScanError> {
        self.writer
            .write_record(Self::row_for(record))
            .map_err(|e| ScanError::Sink(e.to_string()))
    }

    fn finalize(&mut self) -> Result<(), ScanError> {
        self.writer.flush().map_err(|e| ScanError::Sink(e.to_string()))
    }
}
