//! Forward pass driver: seeds base columns, then applies the transfer
//! functions node by node in data-flow order.

use std::collections::{BTreeMap, BTreeSet};

use mal2ms_core::error::{Error, Result};
use mal2ms_core::format::effective_bit_width;
use mal2ms_core::ops::Op;
use mal2ms_core::result::TranslationResult;
use mal2ms_core::stats::BaseStats;

use crate::props::{AnalysisResult, ColumnProps};
use crate::transfer::{self, Facts};

#[derive(Debug, Clone, Default)]
pub struct AnalysisOptions {
    /// Base columns known to be unique beyond what the statistics say.
    pub unique_columns: BTreeSet<String>,
    pub stats: Option<BaseStats>,
    /// Infer maximum cardinality and bit width (needs `stats` for base columns).
    pub cardinalities: bool,
    /// Facts carried over from an earlier analysis. Seeded columns count as
    /// assigned; only uniqueness, sortedness, bounds and the forced flag are
    /// taken over, access counts are recomputed.
    pub seed: BTreeMap<String, ColumnProps>,
}

impl AnalysisOptions {
    /// Options that re-analyze a program with everything `prev` proved.
    pub fn reseeded(&self, prev: &AnalysisResult) -> Self {
        Self {
            seed: prev.props.clone(),
            ..self.clone()
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Full,
    UniquenessOnly,
}

struct Analyzer<'a> {
    opts: &'a AnalysisOptions,
    mode: Mode,
    facts: Facts,
    assigned: BTreeSet<String>,
    never_used: Vec<String>,
    used_before_assign: Vec<String>,
}

impl<'a> Analyzer<'a> {
    fn new(opts: &'a AnalysisOptions, mode: Mode) -> Self {
        Self {
            opts,
            mode,
            facts: Facts::new(),
            assigned: BTreeSet::new(),
            never_used: Vec::new(),
            used_before_assign: Vec::new(),
        }
    }

    fn seed_base_columns(&mut self, tr: &TranslationResult) {
        for col in tr.base_columns() {
            let mut p = ColumnProps {
                is_base: true,
                is_unique: self.opts.unique_columns.contains(&col),
                ..Default::default()
            };
            if let Some((table, stats)) = self.opts.stats.as_ref().and_then(|s| s.column(&col)) {
                p.is_unique |= stats.unique;
                p.is_sorted |= stats.sorted;
                if self.opts.cardinalities {
                    p.max_card = Some(table.row_count);
                    p.max_bw = Some(effective_bit_width(stats.max));
                }
            }
            self.assigned.insert(col.clone());
            self.facts.insert(col, p);
        }
    }

    fn seed_carried_facts(&mut self) {
        for (col, seed) in &self.opts.seed {
            let p = self.facts.entry(col.clone()).or_default();
            p.is_unique |= seed.is_unique;
            p.is_sorted |= seed.is_sorted;
            p.is_base |= seed.is_base;
            p.forced_uncompr |= seed.forced_uncompr;
            if self.opts.cardinalities {
                p.bound_card(seed.max_card);
                p.bound_bw(seed.max_bw);
            }
            self.assigned.insert(col.clone());
        }
    }

    fn track_assignments(&mut self, op: &Op) {
        for (_, slot) in op.inputs() {
            if !self.assigned.contains(&slot.col) {
                if !self.used_before_assign.contains(&slot.col) {
                    self.used_before_assign.push(slot.col.clone());
                }
                continue;
            }
            self.never_used.retain(|c| c != &slot.col);
        }
        // Seeded columns count as assigned but are still tracked from their writer on.
        for (_, slot) in op.outputs() {
            self.assigned.insert(slot.col.clone());
            if !self.never_used.contains(&slot.col) {
                self.never_used.push(slot.col.clone());
            }
            self.facts.entry(slot.col.clone()).or_default();
        }
    }

    fn visit(&mut self, op: &Op) -> Result<()> {
        self.track_assignments(op);
        transfer::uniqueness(&mut self.facts, op)?;
        if self.mode == Mode::UniquenessOnly {
            return Ok(());
        }
        transfer::sortedness(&mut self.facts, op)?;
        transfer::random_access(&mut self.facts, op);
        transfer::sequential_access(&mut self.facts, op);
        if self.opts.cardinalities {
            transfer::cardinality(&mut self.facts, op)?;
        }
        transfer::forced_uncompr(&mut self.facts, op);
        Ok(())
    }

    fn finish(mut self, tr: &TranslationResult) -> Result<AnalysisResult> {
        for col in &tr.result_cols {
            if !self.assigned.contains(col) && !self.used_before_assign.contains(col) {
                self.used_before_assign.push(col.clone());
            }
            self.never_used.retain(|c| c != col);
            self.facts.entry(col.clone()).or_default().is_result = true;
        }
        if !self.used_before_assign.is_empty() {
            return Err(Error::UseBeforeAssign(self.used_before_assign));
        }
        #[cfg(feature = "tracing")]
        for col in &self.never_used {
            tracing::debug!(%col, "column is assigned but never used");
        }
        Ok(AnalysisResult {
            props: self.facts,
            never_used: self.never_used,
        })
    }
}

fn run(tr: &TranslationResult, opts: &AnalysisOptions, mode: Mode) -> Result<AnalysisResult> {
    let mut a = Analyzer::new(opts, mode);
    a.seed_base_columns(tr);
    a.seed_carried_facts();
    for op in tr.ops() {
        a.visit(op)?;
    }
    #[cfg(feature = "tracing")]
    tracing::trace!(nodes = tr.op_count(), columns = a.facts.len(), "analysis pass done");
    a.finish(tr)
}

/// Infer all column properties of `tr`.
///
/// Fails on the first operator whose input cannot be proven unique or
/// sorted, on a generic `Join` when cardinalities are requested, and, after
/// the whole pass, with every column read before being assigned.
pub fn analyze(tr: &TranslationResult, opts: &AnalysisOptions) -> Result<AnalysisResult> {
    run(tr, opts, Mode::Full)
}

/// Uniqueness only. Used while generic joins are still in the program, where
/// sortedness of their outputs is not known yet.
pub fn infer_uniqueness(tr: &TranslationResult, opts: &AnalysisOptions) -> Result<AnalysisResult> {
    run(tr, opts, Mode::UniquenessOnly)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props::AccessClass;
    use mal2ms_core::ops::{CmpOp, Slot, Stmt};
    use mal2ms_core::result::BaseColumn;
    use mal2ms_core::stats::{ColumnStats, TableStats};

    fn stats() -> BaseStats {
        let mut t = TableStats {
            row_count: 1000,
            ..Default::default()
        };
        t.columns.insert(
            "a".into(),
            ColumnStats {
                max: 200,
                ..Default::default()
            },
        );
        t.columns.insert(
            "b".into(),
            ColumnStats {
                max: 70_000,
                ..Default::default()
            },
        );
        let mut s = BaseStats::default();
        s.tables.insert("t".into(), t);
        s
    }

    /// `X_1 := select(t.a < 5); X_2 := project(t.b, X_1); X_3 := sum(X_2)`
    fn program() -> TranslationResult {
        let mut tr = TranslationResult::default();
        tr.add_base_column(&BaseColumn::new("t", "a"));
        tr.add_base_column(&BaseColumn::new("t", "b"));
        tr.prog = vec![
            Stmt::Op(Op::Select {
                out_pos: Slot::new("X_1"),
                cmp: CmpOp::Less,
                in_data: Slot::new("t.a"),
                val: "5".into(),
            }),
            Stmt::Op(Op::Project {
                out_data: Slot::new("X_2"),
                in_data: Slot::new("t.b"),
                in_pos: Slot::new("X_1"),
            }),
            Stmt::Op(Op::SumWholeCol {
                out_data: Slot::new("X_3"),
                in_data: Slot::new("X_2"),
            }),
        ];
        tr.result_cols = vec!["X_3".into()];
        tr
    }

    fn opts() -> AnalysisOptions {
        AnalysisOptions {
            stats: Some(stats()),
            cardinalities: true,
            ..Default::default()
        }
    }

    #[test]
    fn propagates_through_select_project_sum() {
        let res = analyze(&program(), &opts()).unwrap();
        let x1 = res.get("X_1").unwrap();
        assert!(x1.is_unique && x1.is_sorted);
        assert_eq!(x1.max_card, Some(1000));
        assert_eq!(x1.max_bw, Some(10));
        assert_eq!(x1.access, AccessClass::Sequential);

        let b = res.get("t.b").unwrap();
        assert_eq!(b.access, AccessClass::RandomSorted);
        assert_eq!(b.seq_access_count, 0);
        assert_eq!(res.get("t.a").unwrap().seq_access_count, 1);

        let x2 = res.get("X_2").unwrap();
        assert_eq!(x2.max_card, Some(1000));
        assert_eq!(x2.max_bw, Some(17));
        assert!(!x2.is_unique);

        let x3 = res.get("X_3").unwrap();
        assert!(x3.is_result && x3.forced_uncompr);
        assert_eq!(x3.max_bw, Some(64));
        assert!(res.never_used.is_empty());
    }

    #[test]
    fn bounds_stay_unknown_without_cardinalities() {
        let res = analyze(
            &program(),
            &AnalysisOptions {
                stats: Some(stats()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(res.get("X_2").unwrap().max_bw, None);
        assert_eq!(res.get("t.a").unwrap().max_card, None);
    }

    #[test]
    fn collects_every_use_before_assign() {
        let mut tr = program();
        tr.prog.insert(
            0,
            Stmt::Op(Op::Project {
                out_data: Slot::new("X_0"),
                in_data: Slot::new("X_8"),
                in_pos: Slot::new("X_9"),
            }),
        );
        match analyze(&tr, &AnalysisOptions::default()) {
            Err(Error::UseBeforeAssign(cols)) => assert_eq!(cols, vec!["X_8", "X_9"]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn reports_never_used_intermediates() {
        let mut tr = program();
        tr.prog.push(Stmt::Op(Op::Select {
            out_pos: Slot::new("X_4"),
            cmp: CmpOp::Equal,
            in_data: Slot::new("t.a"),
            val: "1".into(),
        }));
        let res = analyze(&tr, &opts()).unwrap();
        assert_eq!(res.never_used, vec!["X_4".to_string()]);

        let again = analyze(&tr, &opts().reseeded(&res)).unwrap();
        assert_eq!(again.never_used, res.never_used);
    }

    #[test]
    fn reanalysis_reproduces_facts() {
        let tr = program();
        let first = analyze(&tr, &opts()).unwrap();
        let second = analyze(&tr, &opts().reseeded(&first)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn uniqueness_only_tolerates_generic_join() {
        let mut tr = TranslationResult::default();
        tr.add_base_column(&BaseColumn::new("t1", "a"));
        tr.add_base_column(&BaseColumn::new("t2", "b"));
        tr.prog = vec![Stmt::Op(Op::Join {
            out_pos_l: Slot::new("X_1"),
            out_pos_r: Slot::new("X_2"),
            in_data_l: Slot::new("t1.a"),
            in_data_r: Slot::new("t2.b"),
        })];
        tr.result_cols = vec!["X_1".into(), "X_2".into()];
        let opts = AnalysisOptions {
            unique_columns: ["t1.a".to_string()].into(),
            cardinalities: true,
            ..Default::default()
        };
        let res = infer_uniqueness(&tr, &opts).unwrap();
        assert!(res.is_unique("X_2"));
        assert!(!res.is_unique("X_1"));
        assert!(analyze(&tr, &opts).is_err());
    }
}
