//! Per-operator transfer functions, one per inferred property.
//!
//! Every function matches all operator kinds explicitly (no wildcard arm), so
//! a new kind in the catalog does not compile until each pass states what it
//! does with it.

use std::collections::BTreeMap;

use mal2ms_core::error::{Error, Result};
use mal2ms_core::format::effective_bit_width;
use mal2ms_core::ops::{ArithOp, Op, Role, Slot};

use crate::props::ColumnProps;

pub type Facts = BTreeMap<String, ColumnProps>;

fn props_mut<'a>(facts: &'a mut Facts, slot: &Slot) -> &'a mut ColumnProps {
    facts.entry(slot.col.clone()).or_default()
}

fn unique(facts: &Facts, slot: &Slot) -> bool {
    facts.get(&slot.col).is_some_and(|p| p.is_unique)
}

fn sorted(facts: &Facts, slot: &Slot) -> bool {
    facts.get(&slot.col).is_some_and(|p| p.is_sorted)
}

fn card(facts: &Facts, slot: &Slot) -> Option<u64> {
    facts.get(&slot.col).and_then(|p| p.max_card)
}

fn bw(facts: &Facts, slot: &Slot) -> Option<u8> {
    facts.get(&slot.col).and_then(|p| p.max_bw)
}

fn require_unique(facts: &Facts, op: &Op, role: Role, slot: &Slot) -> Result<()> {
    if unique(facts, slot) {
        Ok(())
    } else {
        Err(Error::NonUniqueInput {
            op: op.name(),
            role: role.name(),
            col: slot.col.clone(),
        })
    }
}

fn require_sorted(facts: &Facts, op: &Op, role: Role, slot: &Slot) -> Result<()> {
    if sorted(facts, slot) {
        Ok(())
    } else {
        Err(Error::UnsortedInput {
            op: op.name(),
            role: role.name(),
            col: slot.col.clone(),
        })
    }
}

/// Bit width of a position list indexing into a column of `card` elements.
fn pos_bw(card: Option<u64>) -> Option<u8> {
    card.map(|c| effective_bit_width(c.saturating_sub(1)))
}

/// The tighter of two upper bounds, using whichever is known.
fn min_known<T: Ord>(a: Option<T>, b: Option<T>) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

pub fn uniqueness(facts: &mut Facts, op: &Op) -> Result<()> {
    fn set(facts: &mut Facts, slot: &Slot) {
        props_mut(facts, slot).is_unique = true;
    }
    match op {
        Op::Project {
            out_data,
            in_data,
            in_pos,
        } => {
            if unique(facts, in_data) && unique(facts, in_pos) {
                set(facts, out_data);
            }
        }
        // Position lists never contain duplicates.
        Op::Select { out_pos, .. } | Op::Between { out_pos, .. } => set(facts, out_pos),
        Op::Intersect {
            out_pos,
            in_pos_l,
            in_pos_r,
        }
        | Op::IntersectK {
            out_pos,
            in_pos_l,
            in_pos_r,
        }
        | Op::Merge {
            out_pos,
            in_pos_l,
            in_pos_r,
        } => {
            require_unique(facts, op, Role::InPosL, in_pos_l)?;
            require_unique(facts, op, Role::InPosR, in_pos_r)?;
            set(facts, out_pos);
        }
        // Equi-join: a unique key on one side makes the other side's positions unique.
        Op::Join {
            out_pos_l,
            out_pos_r,
            in_data_l,
            in_data_r,
        } => {
            if unique(facts, in_data_l) {
                set(facts, out_pos_r);
            }
            if unique(facts, in_data_r) {
                set(facts, out_pos_l);
            }
        }
        Op::Nto1Join {
            out_pos_l,
            out_pos_r,
            in_data_l,
            in_data_r,
        } => {
            require_unique(facts, op, Role::InDataL, in_data_l)?;
            set(facts, out_pos_r);
            if unique(facts, in_data_r) {
                set(facts, out_pos_l);
            }
        }
        Op::LeftSemiNto1Join {
            out_pos_r,
            in_data_l,
            ..
        } => {
            require_unique(facts, op, Role::InDataL, in_data_l)?;
            set(facts, out_pos_r);
        }
        Op::CalcBinary { .. } | Op::SumGrBased { .. } => {}
        // A single data element.
        Op::SumWholeCol { out_data, .. } => set(facts, out_data),
        Op::GroupUnary {
            out_gr,
            out_ext,
            in_data,
        } => {
            if unique(facts, in_data) {
                set(facts, out_gr);
            }
            set(facts, out_ext);
        }
        Op::GroupBinary {
            out_gr,
            out_ext,
            in_gr,
            in_data,
        } => {
            if unique(facts, in_data) && unique(facts, in_gr) {
                set(facts, out_gr);
            }
            set(facts, out_ext);
        }
        Op::Morph { out_data, in_data } => {
            if unique(facts, in_data) {
                set(facts, out_data);
            }
        }
    }
    Ok(())
}

pub fn sortedness(facts: &mut Facts, op: &Op) -> Result<()> {
    fn set(facts: &mut Facts, slot: &Slot) {
        props_mut(facts, slot).is_sorted = true;
    }
    match op {
        Op::Project {
            out_data,
            in_data,
            in_pos,
        } => {
            if sorted(facts, in_data) && sorted(facts, in_pos) {
                set(facts, out_data);
            }
        }
        Op::Select { out_pos, .. } | Op::Between { out_pos, .. } => set(facts, out_pos),
        Op::Intersect {
            out_pos,
            in_pos_l,
            in_pos_r,
        }
        | Op::IntersectK {
            out_pos,
            in_pos_l,
            in_pos_r,
        }
        | Op::Merge {
            out_pos,
            in_pos_l,
            in_pos_r,
        } => {
            require_sorted(facts, op, Role::InPosL, in_pos_l)?;
            require_sorted(facts, op, Role::InPosR, in_pos_r)?;
            set(facts, out_pos);
        }
        Op::Join { .. } => {}
        // The probe side is scanned in order.
        Op::Nto1Join { out_pos_r, .. } | Op::LeftSemiNto1Join { out_pos_r, .. } => {
            set(facts, out_pos_r)
        }
        Op::CalcBinary { .. } | Op::SumGrBased { .. } => {}
        Op::SumWholeCol { out_data, .. } => set(facts, out_data),
        // Extents list the first position of each group in ascending order.
        Op::GroupUnary { out_ext, .. } | Op::GroupBinary { out_ext, .. } => set(facts, out_ext),
        Op::Morph { out_data, in_data } => {
            if sorted(facts, in_data) {
                set(facts, out_data);
            }
        }
    }
    Ok(())
}

pub fn random_access(facts: &mut Facts, op: &Op) {
    match op {
        Op::Project { in_data, in_pos, .. } => {
            let pos_sorted = sorted(facts, in_pos);
            props_mut(facts, in_data).mark_random(pos_sorted);
        }
        // Searching the right input jumps around in it.
        Op::IntersectK { in_pos_r, .. } => props_mut(facts, in_pos_r).mark_random(false),
        Op::Select { .. }
        | Op::Between { .. }
        | Op::Intersect { .. }
        | Op::Merge { .. }
        | Op::Join { .. }
        | Op::Nto1Join { .. }
        | Op::LeftSemiNto1Join { .. }
        | Op::CalcBinary { .. }
        | Op::SumWholeCol { .. }
        | Op::SumGrBased { .. }
        | Op::GroupUnary { .. }
        | Op::GroupBinary { .. }
        | Op::Morph { .. } => {}
    }
}

/// Inputs each operator's access strategy reads front to back once.
pub fn sequential_inputs(op: &Op) -> Vec<&Slot> {
    match op {
        Op::Project { in_pos, .. } => vec![in_pos],
        Op::Select { in_data, .. }
        | Op::Between { in_data, .. }
        | Op::SumWholeCol { in_data, .. }
        | Op::GroupUnary { in_data, .. }
        | Op::Morph { in_data, .. } => vec![in_data],
        Op::Intersect { .. } | Op::Merge { .. } => vec![],
        Op::IntersectK { in_pos_l, .. } => vec![in_pos_l],
        // Build and probe phase each scan one side.
        Op::Join {
            in_data_l,
            in_data_r,
            ..
        }
        | Op::Nto1Join {
            in_data_l,
            in_data_r,
            ..
        }
        | Op::LeftSemiNto1Join {
            in_data_l,
            in_data_r,
            ..
        }
        | Op::CalcBinary {
            in_data_l,
            in_data_r,
            ..
        } => vec![in_data_l, in_data_r],
        Op::SumGrBased { in_gr, in_data, .. } | Op::GroupBinary { in_gr, in_data, .. } => {
            vec![in_gr, in_data]
        }
    }
}

pub fn sequential_access(facts: &mut Facts, op: &Op) {
    for slot in sequential_inputs(op) {
        props_mut(facts, slot).mark_sequential();
    }
}

pub fn cardinality(facts: &mut Facts, op: &Op) -> Result<()> {
    fn put(facts: &mut Facts, slot: &Slot, c: Option<u64>, b: Option<u8>) {
        let p = props_mut(facts, slot);
        p.bound_card(c);
        p.bound_bw(b);
    }
    match op {
        Op::Project {
            out_data,
            in_data,
            in_pos,
        } => {
            let (c, b) = (card(facts, in_pos), bw(facts, in_data));
            put(facts, out_data, c, b);
        }
        Op::Select { out_pos, in_data, .. } | Op::Between { out_pos, in_data, .. } => {
            let c = card(facts, in_data);
            put(facts, out_pos, c, pos_bw(c));
        }
        Op::Intersect {
            out_pos,
            in_pos_l,
            in_pos_r,
        }
        | Op::IntersectK {
            out_pos,
            in_pos_l,
            in_pos_r,
        } => {
            let c = min_known(card(facts, in_pos_l), card(facts, in_pos_r));
            let b = min_known(bw(facts, in_pos_l), bw(facts, in_pos_r));
            put(facts, out_pos, c, b);
        }
        Op::Merge {
            out_pos,
            in_pos_l,
            in_pos_r,
        } => {
            let c = card(facts, in_pos_l)
                .zip(card(facts, in_pos_r))
                .map(|(l, r)| l.saturating_add(r));
            let b = bw(facts, in_pos_l).zip(bw(facts, in_pos_r)).map(|(l, r)| l.max(r));
            put(facts, out_pos, c, b);
        }
        Op::Join { .. } => {
            return Err(Error::UnhandledOperatorKind {
                op: op.name(),
                pass: "cardinality",
            })
        }
        Op::Nto1Join {
            out_pos_l,
            out_pos_r,
            in_data_l,
            in_data_r,
        } => {
            // Each probe row matches at most one build row.
            let c = card(facts, in_data_r);
            let bw_l = pos_bw(card(facts, in_data_l));
            put(facts, out_pos_l, c, bw_l);
            put(facts, out_pos_r, c, pos_bw(c));
        }
        Op::LeftSemiNto1Join {
            out_pos_r,
            in_data_r,
            ..
        } => {
            let c = card(facts, in_data_r);
            put(facts, out_pos_r, c, pos_bw(c));
        }
        Op::CalcBinary {
            out_data,
            op: arith,
            in_data_l,
            in_data_r,
        } => {
            let c = min_known(card(facts, in_data_l), card(facts, in_data_r));
            let b = bw(facts, in_data_l)
                .zip(bw(facts, in_data_r))
                .map(|(l, r)| match arith {
                    ArithOp::Add => l.max(r) + 1,
                    ArithOp::Sub => l.max(r),
                    ArithOp::Mul => l + r,
                })
                .map(|b| b.min(64));
            put(facts, out_data, c, b);
        }
        Op::SumWholeCol { out_data, .. } => put(facts, out_data, Some(1), Some(64)),
        Op::SumGrBased {
            out_data,
            in_data,
            in_ext,
            ..
        } => {
            let c = card(facts, in_ext);
            // A sum of n values below 2^b stays below n * 2^b.
            let b = bw(facts, in_data)
                .zip(card(facts, in_data))
                .map(|(b, n)| (b + effective_bit_width(n)).min(64));
            put(facts, out_data, c, b);
        }
        Op::GroupUnary {
            out_gr,
            out_ext,
            in_data,
        }
        | Op::GroupBinary {
            out_gr,
            out_ext,
            in_data,
            ..
        } => {
            let c = card(facts, in_data);
            put(facts, out_gr, c, pos_bw(c));
            put(facts, out_ext, c, pos_bw(c));
        }
        Op::Morph { out_data, in_data } => {
            let (c, b) = (card(facts, in_data), bw(facts, in_data));
            put(facts, out_data, c, b);
        }
    }
    Ok(())
}

/// Slots whose columns have no compressed implementation at this operator.
pub fn uncompressed_slots(op: &Op) -> Vec<&Slot> {
    match op {
        Op::Intersect { .. } | Op::Merge { .. } | Op::CalcBinary { .. } | Op::GroupBinary { .. } => {
            op.slots().into_iter().map(|(_, s)| s).collect()
        }
        Op::SumGrBased {
            out_data,
            in_gr,
            in_data,
            ..
        } => vec![out_data, in_gr, in_data],
        Op::SumWholeCol { out_data, .. } => vec![out_data],
        Op::Project { .. }
        | Op::Select { .. }
        | Op::Between { .. }
        | Op::IntersectK { .. }
        | Op::Join { .. }
        | Op::Nto1Join { .. }
        | Op::LeftSemiNto1Join { .. }
        | Op::GroupUnary { .. }
        | Op::Morph { .. } => vec![],
    }
}

pub fn forced_uncompr(facts: &mut Facts, op: &Op) {
    for slot in uncompressed_slots(op) {
        props_mut(facts, slot).forced_uncompr = true;
    }
}
