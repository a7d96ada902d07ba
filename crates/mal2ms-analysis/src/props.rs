//! Per-column facts produced by the analyzer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// How a column is read by its consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AccessClass {
    /// Not read yet (dead columns and result-only columns stay here).
    #[default]
    NoneYet,
    Sequential,
    /// Random reads at positions in no particular order.
    RandomUnsorted,
    /// Random reads at ascending positions.
    RandomSorted,
}

impl AccessClass {
    pub fn is_random(self) -> bool {
        matches!(self, AccessClass::RandomUnsorted | AccessClass::RandomSorted)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnProps {
    pub is_unique: bool,
    pub is_sorted: bool,
    pub max_card: Option<u64>,
    pub max_bw: Option<u8>,
    pub access: AccessClass,
    /// Number of operators reading the column sequentially.
    pub seq_access_count: u32,
    pub forced_uncompr: bool,
    pub is_base: bool,
    pub is_result: bool,
}

impl ColumnProps {
    /// Keep the tighter of two cardinality bounds.
    pub(crate) fn bound_card(&mut self, card: Option<u64>) {
        self.max_card = match (self.max_card, card) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
    }

    pub(crate) fn bound_bw(&mut self, bw: Option<u8>) {
        self.max_bw = match (self.max_bw, bw) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
    }

    /// First random classification wins; a sequential one never overrides it.
    pub(crate) fn mark_random(&mut self, sorted: bool) {
        if !self.access.is_random() {
            self.access = if sorted {
                AccessClass::RandomSorted
            } else {
                AccessClass::RandomUnsorted
            };
        }
    }

    pub(crate) fn mark_sequential(&mut self) {
        self.seq_access_count += 1;
        if self.access == AccessClass::NoneYet {
            self.access = AccessClass::Sequential;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub props: BTreeMap<String, ColumnProps>,
    /// Intermediates that are assigned but never read, in assignment order.
    pub never_used: Vec<String>,
}

impl AnalysisResult {
    pub fn get(&self, col: &str) -> Option<&ColumnProps> {
        self.props.get(col)
    }

    pub fn is_unique(&self, col: &str) -> bool {
        self.get(col).is_some_and(|p| p.is_unique)
    }

    pub fn is_sorted(&self, col: &str) -> bool {
        self.get(col).is_some_and(|p| p.is_sorted)
    }

    pub fn unique_columns(&self) -> Vec<&str> {
        self.props
            .iter()
            .filter(|(_, p)| p.is_unique)
            .map(|(c, _)| c.as_str())
            .collect()
    }
}
