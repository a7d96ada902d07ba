//! Format selection: one physical format per column.
//!
//! Every strategy except `Uncompr` first splits the columns into those that
//! must stay uncompressed (forced by an operator, declared results, pinned by
//! configuration) and the rest, then decides the rest column by column.
//! Symbolic static_vbp widths are resolved with the column's maximum bit width.

use std::collections::{BTreeMap, BTreeSet};

use mal2ms_analysis::{AccessClass, AnalysisResult, ColumnProps};
use mal2ms_core::config::{ComprConfig, Strategy, TranslatorConfig};
use mal2ms_core::error::{Error, Result};
use mal2ms_core::format::{BitWidth, Format};
use mal2ms_core::ops::Op;
use mal2ms_core::result::TranslationResult;
use mal2ms_core::stats::{CalibrationProfile, ColumnInfo, SizeMeasurements};
use mal2ms_core::style::ProcessingStyle;
use serde::{Deserialize, Serialize};

use crate::cost::{candidates, AccessCounts, CostModel};

/// Data the strategies consult besides the analysis.
#[derive(Debug, Clone, Default)]
pub struct SelectionInputs {
    /// Bit-width histograms by column name.
    pub col_infos: BTreeMap<String, ColumnInfo>,
    pub profile: Option<CalibrationProfile>,
    pub sizes: Option<SizeMeasurements>,
    /// Format simple name by column name.
    pub manual: BTreeMap<String, String>,
}

/// The chosen format of every column, in first-appearance order of the program.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub order: Vec<String>,
    pub formats: BTreeMap<String, Format>,
}

impl Assignment {
    pub fn get(&self, col: &str) -> Option<&Format> {
        self.formats.get(col)
    }

    fn set(&mut self, col: &str, fmt: Format) {
        if self.formats.insert(col.to_string(), fmt).is_none() {
            self.order.push(col.to_string());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Format)> {
        self.order
            .iter()
            .filter_map(|c| self.formats.get(c).map(|f| (c.as_str(), f)))
    }
}

/// Columns referenced by the program's non-morph nodes, in first-appearance order.
fn program_columns(tr: &TranslationResult) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for op in tr.ops().filter(|op| !matches!(op, Op::Morph { .. })) {
        for (_, slot) in op.slots() {
            if seen.insert(slot.col.as_str()) {
                out.push(slot.col.clone());
            }
        }
    }
    out
}

/// Why a column is kept uncompressed, if it is.
fn pinned(props: &ColumnProps, compr: &ComprConfig) -> Option<&'static str> {
    if props.forced_uncompr {
        Some("forced by an operator")
    } else if props.is_result {
        Some("query result")
    } else if props.is_base && compr.uncompr_base {
        Some("base columns pinned")
    } else if !props.is_base && compr.uncompr_interm {
        Some("intermediates pinned")
    } else {
        None
    }
}

struct Selector<'a> {
    cfg: &'a TranslatorConfig,
    inputs: &'a SelectionInputs,
}

impl<'a> Selector<'a> {
    fn ps(&self) -> ProcessingStyle {
        self.cfg.style
    }

    fn by_name(&self, name: &str) -> Result<Format> {
        Format::by_name(name, self.ps(), self.cfg.compr.casc_block_size)
    }

    fn max_bw(&self, col: &str, props: &ColumnProps) -> Option<u8> {
        props
            .max_bw
            .or_else(|| self.inputs.col_infos.get(col).and_then(ColumnInfo::max_bw))
    }

    /// Fix a symbolic width; check a literal one against the data if known.
    fn resolve(&self, col: &str, props: &ColumnProps, fmt: Format) -> Result<Format> {
        match (fmt.bit_width(), self.max_bw(col, props)) {
            (None, _) => Ok(fmt),
            (Some(_), Some(max_bw)) => fmt.resolve_bw(max_bw),
            (Some(BitWidth::Symbolic(_)), None) => Err(Error::MissingBitWidth(col.to_string())),
            (Some(BitWidth::Fixed(_)), None) => Ok(fmt),
        }
    }

    fn histogram(&self, col: &str, props: &ColumnProps) -> Result<ColumnInfo> {
        if let Some(info) = self.inputs.col_infos.get(col) {
            return Ok(info.clone());
        }
        match (props.max_card, props.max_bw) {
            (Some(card), Some(bw)) => Ok(ColumnInfo::uniform(col, card, bw)),
            _ => Err(Error::MissingBitWidth(col.to_string())),
        }
    }

    fn rule_based(&self, col: &str, props: &ColumnProps) -> Result<Format> {
        let compr = &self.cfg.compr;
        let rnd = match &compr.rnd_format {
            Some(name) => self.by_name(name)?,
            None => Format::Uncompr,
        };
        let seq_unsorted = match &compr.seq_unsorted_format {
            Some(name) => self.by_name(name)?,
            None => rnd,
        };
        let seq_sorted = match &compr.seq_sorted_format {
            Some(name) => self.by_name(name)?,
            None => seq_unsorted,
        };
        if !rnd.supports_random_access() {
            return Err(Error::Config(format!(
                "the format '{}' chosen for randomly accessed columns does not support random access",
                rnd.simple_name()
            )));
        }
        let fmt = match props.access {
            AccessClass::RandomUnsorted => rnd,
            AccessClass::RandomSorted => seq_sorted,
            AccessClass::Sequential | AccessClass::NoneYet if props.is_sorted => seq_sorted,
            AccessClass::Sequential | AccessClass::NoneYet => seq_unsorted,
        };
        self.resolve(col, props, fmt)
    }

    fn cost_based(&self, col: &str, props: &ColumnProps) -> Result<Format> {
        let profile = self.inputs.profile.as_ref().ok_or_else(|| {
            Error::Config("the cost-based strategy needs calibration profiles".into())
        })?;
        let info = self.histogram(col, props)?;
        let max_bw = info
            .max_bw()
            .ok_or_else(|| Error::MissingBitWidth(col.to_string()))?;
        let cands = candidates(
            self.ps(),
            self.cfg.compr.casc_block_size,
            max_bw,
            props.access == AccessClass::RandomUnsorted,
        );
        let counts = AccessCounts {
            compressions: u32::from(!props.is_base),
            decompressions: props.seq_access_count,
        };
        let model = CostModel::new(profile, self.cfg.compr.objective);
        let (fmt, _cost) = model
            .cheapest(&cands, &info, counts)
            .ok_or_else(|| Error::Config(format!("no profiled format fits column '{col}'")))?;
        Ok(fmt)
    }

    fn measured(&self, col: &str, props: &ColumnProps, best: bool) -> Result<Format> {
        let sizes = self
            .inputs
            .sizes
            .as_ref()
            .and_then(|s| s.for_column(col))
            .ok_or_else(|| Error::Config(format!("no size measurements for column '{col}'")))?;
        let mut chosen: Option<(Format, u64)> = None;
        for (name, bytes) in sizes {
            let fmt = self.by_name(name)?;
            if props.access == AccessClass::RandomUnsorted && !fmt.supports_random_access() {
                continue;
            }
            let better = match chosen {
                None => true,
                Some((_, b)) if best => *bytes < b,
                Some((_, b)) => *bytes > b,
            };
            if better {
                chosen = Some((fmt, *bytes));
            }
        }
        let (fmt, _) = chosen.ok_or_else(|| {
            Error::Config(format!("no measured format of column '{col}' is applicable"))
        })?;
        self.resolve(col, props, fmt)
    }

    fn manual(&self, col: &str, props: &ColumnProps) -> Result<Format> {
        let name = self.inputs.manual.get(col).ok_or_else(|| {
            Error::Config(format!("no format configured for column '{col}'"))
        })?;
        let fmt = self.by_name(name)?;
        if props.forced_uncompr && !fmt.is_uncompr() {
            return Err(Error::Config(format!(
                "column '{col}' must stay uncompressed, but '{name}' is configured"
            )));
        }
        if props.access == AccessClass::RandomUnsorted && !fmt.supports_random_access() {
            return Err(Error::Config(format!(
                "column '{col}' is accessed randomly, but '{name}' does not support random access"
            )));
        }
        self.resolve(col, props, fmt)
    }

    fn choose(&self, col: &str, props: &ColumnProps) -> Result<Format> {
        let compr = &self.cfg.compr;
        if compr.strategy == Strategy::Uncompr {
            return Ok(Format::Uncompr);
        }
        // Manual files may also configure pinned columns, which are checked there.
        if compr.strategy != Strategy::Manual {
            if let Some(_why) = pinned(props, compr) {
                #[cfg(feature = "tracing")]
                tracing::trace!(col, why = _why, "kept uncompressed");
                return Ok(Format::Uncompr);
            }
        }
        match compr.strategy {
            Strategy::Uncompr => Ok(Format::Uncompr),
            Strategy::RuleBased => self.rule_based(col, props),
            Strategy::CostBased => self.cost_based(col, props),
            Strategy::RealBest => self.measured(col, props, true),
            Strategy::RealWorst => self.measured(col, props, false),
            Strategy::Manual => self.manual(col, props),
        }
    }
}

/// Choose a format for every column of `tr` without touching the program.
pub fn choose_formats(
    tr: &TranslationResult,
    facts: &AnalysisResult,
    cfg: &TranslatorConfig,
    inputs: &SelectionInputs,
) -> Result<Assignment> {
    cfg.compr.validate()?;
    let sel = Selector { cfg, inputs };
    let mut out = Assignment::default();
    let fallback = ColumnProps::default();
    for col in program_columns(tr) {
        let props = facts.get(&col).unwrap_or(&fallback);
        let fmt = sel.choose(&col, props)?;
        #[cfg(feature = "tracing")]
        tracing::debug!(col = %col, format = %fmt.simple_name(), "chose format");
        out.set(&col, fmt);
    }
    Ok(out)
}

/// Write the assignment into every slot of every non-morph node.
///
/// Morph nodes keep the formats they were created with.
pub fn apply_formats(tr: &mut TranslationResult, assignment: &Assignment) -> Result<()> {
    for op in tr.ops_mut() {
        if matches!(op, Op::Morph { .. }) {
            continue;
        }
        for (_, slot) in op.slots_mut() {
            let fmt = assignment.get(&slot.col).ok_or_else(|| {
                Error::Invariant(format!("no format chosen for column '{}'", slot.col))
            })?;
            slot.format = Some(*fmt);
        }
    }
    Ok(())
}

/// Choose and apply formats in one step.
pub fn select_formats(
    tr: &mut TranslationResult,
    facts: &AnalysisResult,
    cfg: &TranslatorConfig,
    inputs: &SelectionInputs,
) -> Result<Assignment> {
    let assignment = choose_formats(tr, facts, cfg, inputs)?;
    apply_formats(tr, &assignment)?;
    Ok(assignment)
}
