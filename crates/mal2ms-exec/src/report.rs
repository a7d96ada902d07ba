//! Run report: what a translation produced, for audit and comparison.
//!
//! Two runs with the same MAL text, inputs and config produce the same
//! fingerprint; only the timestamps differ.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use mal2ms_core::config::{Strategy, TranslatorConfig};
use mal2ms_core::hash::Hash256;
use mal2ms_core::style::ProcessingStyle;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Stable hash of the final translation result.
    pub fingerprint: Hash256,
    pub translator_version: String,
    pub style: ProcessingStyle,
    pub strategy: Strategy,

    /// Nodes of the final program, morphs included.
    pub nodes: usize,
    pub morphs_inserted: usize,
    pub base_morphs: usize,
    pub result_morphs: usize,
    pub result_cols: Vec<String>,

    /// Chosen format (simple name) per column.
    pub formats: BTreeMap<String, String>,
    pub never_used: Vec<String>,
    pub limitations: Vec<String>,

    /// Milliseconds since Unix epoch (UTC).
    pub started_ms: u64,
    pub finished_ms: u64,
}

impl RunReport {
    pub fn new(fingerprint: Hash256, cfg: &TranslatorConfig, started_ms: u64) -> Self {
        Self {
            fingerprint,
            translator_version: mal2ms_core::VERSION.to_string(),
            style: cfg.style,
            strategy: cfg.compr.strategy,
            nodes: 0,
            morphs_inserted: 0,
            base_morphs: 0,
            result_morphs: 0,
            result_cols: Vec::new(),
            formats: BTreeMap::new(),
            never_used: Vec::new(),
            limitations: Vec::new(),
            started_ms,
            finished_ms: started_ms,
        }
    }

    pub fn finish(mut self, finished_ms: u64) -> Self {
        self.finished_ms = finished_ms;
        self
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
