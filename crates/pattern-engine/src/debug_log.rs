//! Per-family debug sinks: append-only line files under `debug_dir`, one per
//! pattern family, opened lazily and written only when that family's debug
//! flag is on. Writes are line-atomic within the process.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use pattern_core::PatternFamily;

use crate::config::DebugConfig;

pub struct DebugLog {
    dir: PathBuf,
    hns: bool,
    dtb: bool,
    ttb: bool,
    files: Mutex<BTreeMap<&'static str, File>>,
}

impl DebugLog {
    pub fn new(config: &DebugConfig) -> Self {
        Self {
            dir: config.debug_dir.clone(),
            hns: config.hns_debug,
            dtb: config.dtb_debug,
            ttb: config.ttb_debug,
            files: Mutex::new(BTreeMap::new()),
        }
    }

    /// All sinks off; for callers that do not want debug output.
    pub fn disabled() -> Self {
        Self::new(&DebugConfig::default())
    }

    pub fn enabled(&self, family: PatternFamily) -> bool {
        match family {
            PatternFamily::Hns => self.hns,
            PatternFamily::Dtb => self.dtb,
            PatternFamily::Ttb => self.ttb,
        }
    }

    /// Append one line to the family's sink. Callers are expected to check
    /// `enabled` first so the line is only formatted when needed.
    pub fn write(&self, family: PatternFamily, line: &str) {
        if !self.enabled(family) {
            return;
        }
        let name = match family {
            PatternFamily::Hns => "hns.log",
            PatternFamily::Dtb => "dtb.log",
            PatternFamily::Ttb => "ttb.log",
        };

        let mut files = match self.files.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if !files.contains_key(name) {
            if let Err(e) = fs::create_dir_all(&self.dir) {
                tracing::debug!(error = %e, "could not create debug dir");
                return;
            }
            match OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.dir.join(name))
            {
                Ok(file) => {
                    files.insert(name, file);
                }
                Err(e) => {
                    tracing::debug!(error = %e, "could not open debug sink");
                    return;
                }
            }
        }

        if let Some(file) = files.get_mut(name) {
            let mut buf = String::with_capacity(line.len() + 1);
            buf.push_str(line);
            buf.push('\n');
            if let Err(e) = file.write_all(buf.as_bytes()) {
                tracing::debug!(error = %e, "debug sink write failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_families_write_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = DebugConfig::default();
        config.debug_dir = dir.path().join("debug");
        config.dtb_debug = true;

        let log = DebugLog::new(&config);
        log.write(PatternFamily::Hns, "should not appear");
        log.write(PatternFamily::Dtb, "rejected: estrutura");

        assert!(!config.debug_dir.join("hns.log").exists());
        let content = fs::read_to_string(config.debug_dir.join("dtb.log")).unwrap();
        assert_eq!(content, "rejected: estrutura\n");
    }
}
