//! Tab-separated measurement files written by query programs.
//!
//! Such a file may wrap its table in a `[MEA]` ... `[RES]` section; only the
//! lines strictly between the markers are data then. Files without markers are
//! read as a whole.

use std::collections::BTreeMap;
use std::path::Path;

use mal2ms_core::config::parse_bool;
use mal2ms_core::stats::{ColumnInfo, SizeMeasurements};
use serde::Deserialize;

use crate::error::{Error, Result};

const SECTION_START: &str = "[MEA]";
const SECTION_END: &str = "[RES]";

/// The measurement section of `text`.
pub fn measurement_section(text: &str) -> String {
    let mut inside = false;
    let mut seen_start = false;
    let mut out = Vec::new();
    for line in text.lines() {
        match line.trim() {
            SECTION_START => {
                inside = true;
                seen_start = true;
            }
            SECTION_END if inside => inside = false,
            _ if inside => out.push(line),
            _ => {}
        }
    }
    if seen_start {
        out.join("\n")
    } else {
        text.to_string()
    }
}

fn tsv_reader(text: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        // Rows may carry a trailing separator.
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes())
}

fn read_section(path: &Path) -> Result<String> {
    let text = std::fs::read_to_string(path)?;
    Ok(measurement_section(&text))
}

/// Column infos by column name; later duplicates of a name are ignored.
pub fn read_col_infos(path: &Path) -> Result<BTreeMap<String, ColumnInfo>> {
    let text = read_section(path)?;
    let mut rdr = tsv_reader(&text);
    let headers = rdr.headers()?.clone();
    let idx = |name: &str| -> Result<usize> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| Error::parse(path, format!("missing column '{name}'")))
    };
    let col_idx = idx("colName")?;
    let count_idx = idx("valueCount")?;
    let result_idx = headers.iter().position(|h| h == "isResult");
    let hist_idx = (1..=64)
        .map(|bw| idx(&format!("bwHist_{bw}")))
        .collect::<Result<Vec<_>>>()?;

    let mut out = BTreeMap::new();
    for (row, rec) in rdr.records().enumerate() {
        let rec = rec?;
        let field = |i: usize| rec.get(i).unwrap_or("");
        let num = |i: usize| -> Result<u64> {
            field(i).parse::<u64>().map_err(|e| {
                Error::parse(path, format!("row {}: '{}': {e}", row + 1, field(i)))
            })
        };
        let col = field(col_idx).to_string();
        if out.contains_key(&col) {
            continue;
        }
        let bw_hist = hist_idx.iter().map(|i| num(*i)).collect::<Result<Vec<_>>>()?;
        let is_result = match result_idx {
            Some(i) => parse_bool(field(i)).map_err(|e| Error::parse(path, e.to_string()))?,
            None => false,
        };
        let info = ColumnInfo {
            col: col.clone(),
            bw_hist,
            value_count: num(count_idx)?,
            is_result,
        };
        out.insert(col, info);
    }
    Ok(out)
}

#[derive(Debug, Deserialize)]
struct SizeRow {
    #[serde(rename = "colName")]
    col: String,
    format: String,
    #[serde(rename = "sizeUsedByte")]
    bytes: u64,
}

pub fn read_sizes(path: &Path) -> Result<SizeMeasurements> {
    let text = read_section(path)?;
    let mut out = SizeMeasurements::default();
    for row in tsv_reader(&text).deserialize::<SizeRow>() {
        let row = row?;
        out.insert(row.col, row.format, row.bytes);
    }
    Ok(out)
}

#[derive(Debug, Deserialize)]
struct ManualRow {
    #[serde(rename = "colName")]
    col: String,
    format: String,
}

/// Format simple names by column; a column listed twice is an error.
pub fn read_manual_formats(path: &Path) -> Result<BTreeMap<String, String>> {
    let text = read_section(path)?;
    let mut out = BTreeMap::new();
    for row in tsv_reader(&text).deserialize::<ManualRow>() {
        let row = row?;
        if out.contains_key(&row.col) {
            return Err(Error::parse(path, format!("column '{}' is listed twice", row.col)));
        }
        out.insert(row.col, row.format);
    }
    Ok(out)
}
