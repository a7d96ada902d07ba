//! Value types supplied by the external collaborators: base-column statistics,
//! per-column bit-width histograms, calibration profiles and measured sizes.
//! Readers for their on-disk forms live in `mal2ms-io`.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::result::BaseColumn;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnStats {
    /// Largest value stored in the column.
    pub max: u64,
    /// Declared unique, e.g. a primary key.
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub sorted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableStats {
    pub row_count: u64,
    #[serde(default)]
    pub columns: BTreeMap<String, ColumnStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseStats {
    pub tables: BTreeMap<String, TableStats>,
}

impl BaseStats {
    /// Statistics for `table.column`.
    pub fn column(&self, name: &str) -> Option<(&TableStats, &ColumnStats)> {
        let bc = BaseColumn::parse(name)?;
        let table = self.tables.get(&bc.table)?;
        Some((table, table.columns.get(&bc.column)?))
    }

    pub fn row_count(&self, table: &str) -> Option<u64> {
        self.tables.get(table).map(|t| t.row_count)
    }
}

/// Data characteristics of one column observed in an uncompressed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub col: String,
    /// `bw_hist[i]` counts the values needing exactly `i + 1` bits.
    pub bw_hist: Vec<u64>,
    pub value_count: u64,
    pub is_result: bool,
}

impl ColumnInfo {
    /// Histogram assuming every value needs `bw` bits.
    pub fn uniform(col: impl Into<String>, value_count: u64, bw: u8) -> Self {
        let mut bw_hist = vec![0; 64];
        let idx = usize::from(bw.clamp(1, 64)) - 1;
        bw_hist[idx] = value_count;
        Self {
            col: col.into(),
            bw_hist,
            value_count,
            is_result: false,
        }
    }

    /// (bit width, count) pairs with non-zero count.
    pub fn histogram(&self) -> impl Iterator<Item = (u8, u64)> + '_ {
        self.bw_hist
            .iter()
            .enumerate()
            .filter(|(_, n)| **n > 0)
            .map(|(i, n)| ((i + 1) as u8, *n))
    }

    pub fn max_bw(&self) -> Option<u8> {
        self.histogram().map(|(bw, _)| bw).max()
    }
}

/// One calibration measurement of a format at one data bit width.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileEntry {
    pub format: String,
    pub bw: u8,
    pub bits_per_value: f64,
    pub compr_ns_per_value: f64,
    pub decompr_ns_per_value: f64,
}

/// Calibration profiles keyed by (format simple name, data bit width).
///
/// For `static_vbp_<n>` the key's bit width is the packing width `n`, since
/// every value is stored at that width irrespective of its own.
#[derive(Debug, Clone, Default)]
pub struct CalibrationProfile {
    entries: HashMap<(String, u8), ProfileEntry>,
}

impl CalibrationProfile {
    pub fn new(entries: impl IntoIterator<Item = ProfileEntry>) -> Self {
        let entries = entries
            .into_iter()
            .map(|e| ((e.format.clone(), e.bw), e))
            .collect();
        Self { entries }
    }

    pub fn get(&self, format: &str, bw: u8) -> Option<&ProfileEntry> {
        self.entries.get(&(format.to_string(), bw))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Physical sizes measured per (column, format simple name).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeMeasurements {
    pub sizes: BTreeMap<String, BTreeMap<String, u64>>,
}

impl SizeMeasurements {
    pub fn insert(&mut self, col: impl Into<String>, format: impl Into<String>, bytes: u64) {
        self.sizes
            .entry(col.into())
            .or_default()
            .insert(format.into(), bytes);
    }

    pub fn for_column(&self, col: &str) -> Option<&BTreeMap<String, u64>> {
        self.sizes.get(col)
    }
}
