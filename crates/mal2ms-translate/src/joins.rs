//! Post-pass directing generic joins.
//!
//! MorphStore has no M:N join. A join whose left or right key column is
//! known to be unique becomes an N:1 join with the unique side as build side.

use mal2ms_analysis::{infer_uniqueness, AnalysisOptions, AnalysisResult};
use mal2ms_core::error::{Error, Result};
use mal2ms_core::ops::{Op, Slot, Stmt};
use mal2ms_core::result::TranslationResult;

/// Directed form of one join, given which build side is unique.
fn direct(
    build_pos: Slot,
    probe_pos: Slot,
    build_data: Slot,
    probe_data: Slot,
    semi_join: bool,
    facts: &AnalysisResult,
) -> Op {
    if semi_join && facts.never_used.contains(&build_pos.col) {
        Op::LeftSemiNto1Join {
            out_pos_r: probe_pos,
            in_data_l: build_data,
            in_data_r: probe_data,
        }
    } else {
        Op::Nto1Join {
            out_pos_l: build_pos,
            out_pos_r: probe_pos,
            in_data_l: build_data,
            in_data_r: probe_data,
        }
    }
}

/// Replace every `Join` in `tr.prog` by an `Nto1Join` (or, with `semi_join`,
/// a `LeftSemiNto1Join` when the build side's positions are never read).
///
/// 1:1 joins keep the left input as build side.
pub fn rewrite_joins(tr: &mut TranslationResult, opts: &AnalysisOptions, semi_join: bool) -> Result<()> {
    let has_join = tr
        .prog
        .iter()
        .any(|s| matches!(s, Stmt::Op(Op::Join { .. })));
    if !has_join {
        return Ok(());
    }
    let facts = infer_uniqueness(tr, opts)?;

    for stmt in tr.prog.iter_mut() {
        let Stmt::Op(Op::Join {
            out_pos_l,
            out_pos_r,
            in_data_l,
            in_data_r,
        }) = stmt
        else {
            continue;
        };
        let (out_l, out_r, in_l, in_r) = (
            out_pos_l.clone(),
            out_pos_r.clone(),
            in_data_l.clone(),
            in_data_r.clone(),
        );
        let directed = if facts.is_unique(&in_l.col) {
            direct(out_l, out_r, in_l, in_r, semi_join, &facts)
        } else if facts.is_unique(&in_r.col) {
            direct(out_r, out_l, in_r, in_l, semi_join, &facts)
        } else {
            return Err(Error::AmbiguousJoinCardinality {
                left: in_l.col,
                right: in_r.col,
            });
        };
        #[cfg(feature = "tracing")]
        tracing::debug!(kind = directed.name(), "directed join");
        *stmt = Stmt::Op(directed);
    }
    Ok(())
}
