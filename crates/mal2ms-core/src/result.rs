//! The translation result passed by ownership from stage to stage.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ops::{Op, Stmt};

/// A column of a base table, rendered as `table.column`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BaseColumn {
    pub table: String,
    pub column: String,
}

impl BaseColumn {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Split `table.column`; `None` for names without a dot.
    pub fn parse(name: &str) -> Option<Self> {
        let (t, c) = name.split_once('.')?;
        if t.is_empty() || c.is_empty() {
            return None;
        }
        Some(Self::new(t, c))
    }
}

impl fmt::Display for BaseColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

/// Behavior of the generated program that differs from the MAL program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Limitation {
    /// Sorts were dropped; the listed variables' consumers see unsorted data
    /// and the result comes out in the engine's native order.
    SortErased { vars: Vec<String> },
}

impl fmt::Display for Limitation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limitation::SortErased { vars } => write!(
                f,
                "sort not supported, result order is not guaranteed (sort outputs: {})",
                vars.join(", ")
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationResult {
    /// Headers required by the program beyond those of its operators and formats.
    pub headers: BTreeSet<String>,
    pub prog: Vec<Stmt>,
    /// Morphs whose input is a base column, run before `prog`.
    pub base_morphs: Vec<Op>,
    /// Morphs producing a result column, run after `prog`.
    pub result_morphs: Vec<Op>,
    /// Output columns in declared order.
    pub result_cols: Vec<String>,
    pub cols_by_table: BTreeMap<String, BTreeSet<String>>,
    pub limitations: Vec<Limitation>,
}

impl TranslationResult {
    pub fn add_base_column(&mut self, col: &BaseColumn) {
        self.cols_by_table
            .entry(col.table.clone())
            .or_default()
            .insert(col.column.clone());
    }

    /// All referenced base columns as `table.column`, sorted.
    pub fn base_columns(&self) -> Vec<String> {
        self.cols_by_table
            .iter()
            .flat_map(|(t, cols)| cols.iter().map(move |c| format!("{t}.{c}")))
            .collect()
    }

    pub fn is_base_column(&self, name: &str) -> bool {
        BaseColumn::parse(name)
            .and_then(|bc| self.cols_by_table.get(&bc.table).map(|c| c.contains(&bc.column)))
            .unwrap_or(false)
    }

    /// Nodes in data-flow order: base morphs, program, result morphs.
    pub fn ops(&self) -> impl Iterator<Item = &Op> {
        self.base_morphs
            .iter()
            .chain(self.prog.iter().filter_map(Stmt::as_op))
            .chain(self.result_morphs.iter())
    }

    pub fn ops_mut(&mut self) -> impl Iterator<Item = &mut Op> {
        self.base_morphs
            .iter_mut()
            .chain(self.prog.iter_mut().filter_map(Stmt::as_op_mut))
            .chain(self.result_morphs.iter_mut())
    }

    pub fn op_count(&self) -> usize {
        self.ops().count()
    }
}
