//! Morph insertion: make every column available in the format its consumers need.
//!
//! Each logical column (its *origin*) can exist in several representations.
//! Base columns start out uncompressed; every other column starts in the format
//! its producer writes. A consumer needing a format not available yet gets a
//! morph from the first representation, named `{origin}__{tag}` with dots
//! replaced by underscores. Results are finally morphed to uncompressed.
//!
//! The pass reads `base_morphs + prog + result_morphs` and re-partitions all
//! morphs afterwards, so running it on its own output changes nothing.

use std::collections::{BTreeSet, HashMap};

use mal2ms_core::error::{Error, Result};
use mal2ms_core::format::Format;
use mal2ms_core::ops::{Op, Stmt};
use mal2ms_core::result::TranslationResult;

#[derive(Debug, Default)]
struct Availability {
    /// Origin column of every representation.
    origin: HashMap<String, String>,
    /// Representations of every origin, in creation order.
    reps: HashMap<String, Vec<(Format, String)>>,
}

impl Availability {
    fn origin_of(&self, var: &str) -> String {
        self.origin.get(var).cloned().unwrap_or_else(|| var.to_string())
    }

    fn register(&mut self, origin: &str, var: &str, fmt: Format) {
        self.origin.insert(var.to_string(), origin.to_string());
        let reps = self.reps.entry(origin.to_string()).or_default();
        if !reps.iter().any(|(f, _)| *f == fmt) {
            reps.push((fmt, var.to_string()));
        }
    }

    fn find(&self, origin: &str, fmt: &Format) -> Option<String> {
        self.reps
            .get(origin)?
            .iter()
            .find(|(f, _)| f == fmt)
            .map(|(_, v)| v.clone())
    }

    /// Morph producing `origin` in `fmt` from its first representation.
    fn morph_to(&mut self, origin: &str, fmt: Format) -> Result<(Op, String)> {
        let (src_fmt, src_var) = self
            .reps
            .get(origin)
            .and_then(|r| r.first())
            .cloned()
            .ok_or_else(|| Error::Invariant(format!("column '{origin}' is read but never available")))?;
        let var = morph_name(origin, &fmt);
        self.register(origin, &var, fmt);
        Ok((Op::morph(var.clone(), fmt, src_var, src_fmt), var))
    }
}

/// Name of `origin` morphed to `fmt`.
pub fn morph_name(origin: &str, fmt: &Format) -> String {
    format!("{}__{}", origin.replace('.', "_"), fmt.short_tag())
}

/// Insert all required morphs; returns how many were added.
///
/// Errors name nodes by their index in the input sequence.
pub fn insert_morphs(tr: &mut TranslationResult) -> Result<usize> {
    let mut avail = Availability::default();
    for col in tr.base_columns() {
        avail.register(&col, &col, Format::Uncompr);
    }

    let stmts: Vec<Stmt> = std::mem::take(&mut tr.base_morphs)
        .into_iter()
        .map(Stmt::Op)
        .chain(std::mem::take(&mut tr.prog))
        .chain(std::mem::take(&mut tr.result_morphs).into_iter().map(Stmt::Op))
        .collect();

    let mut out = Vec::with_capacity(stmts.len());
    let mut inserted = 0;
    let mut node = 0;
    for stmt in stmts {
        let mut op = match stmt {
            Stmt::Op(op) => op,
            passthrough => {
                out.push(passthrough);
                continue;
            }
        };
        let name = op.name();

        if let Op::Morph { out_data, in_data } = &op {
            let fmt = out_data.format.ok_or(Error::IncompleteFormatAssignment {
                node,
                op: name,
                role: "outData",
            })?;
            let origin = avail.origin_of(&in_data.col);
            avail.register(&origin, &out_data.col, fmt);
            out.push(Stmt::Op(op));
            node += 1;
            continue;
        }

        for (role, slot) in op.slots_mut() {
            if !role.is_input() || !role.needs_format() {
                continue;
            }
            let fmt = slot.format.ok_or(Error::IncompleteFormatAssignment {
                node,
                op: name,
                role: role.name(),
            })?;
            let origin = avail.origin_of(&slot.col);
            slot.col = match avail.find(&origin, &fmt) {
                Some(var) => var,
                None => {
                    let (morph, var) = avail.morph_to(&origin, fmt)?;
                    #[cfg(feature = "tracing")]
                    tracing::trace!(from = %origin, to = %var, consumer = name, "inserted morph");
                    out.push(Stmt::Op(morph));
                    inserted += 1;
                    var
                }
            };
        }
        for (role, slot) in op.outputs() {
            let fmt = slot.format.ok_or(Error::IncompleteFormatAssignment {
                node,
                op: name,
                role: role.name(),
            })?;
            avail.register(&slot.col, &slot.col, fmt);
        }
        out.push(Stmt::Op(op));
        node += 1;
    }

    // Decompress the output columns, if necessary.
    let mut result_cols = Vec::with_capacity(tr.result_cols.len());
    for col in &tr.result_cols {
        let origin = avail.origin_of(col);
        let var = match avail.find(&origin, &Format::Uncompr) {
            Some(var) => var,
            None => {
                let (morph, var) = avail.morph_to(&origin, Format::Uncompr)?;
                out.push(Stmt::Op(morph));
                inserted += 1;
                var
            }
        };
        result_cols.push(var);
    }
    tr.result_cols = result_cols;

    partition(tr, out);
    #[cfg(feature = "tracing")]
    tracing::debug!(
        inserted,
        base = tr.base_morphs.len(),
        result = tr.result_morphs.len(),
        "morph insertion done"
    );
    Ok(inserted)
}

/// Hoist morphs of base columns before and morphs to results after the program.
fn partition(tr: &mut TranslationResult, stmts: Vec<Stmt>) {
    let results: BTreeSet<String> = tr.result_cols.iter().cloned().collect();
    for stmt in stmts {
        match stmt {
            Stmt::Op(Op::Morph { out_data, in_data }) if tr.is_base_column(&in_data.col) => {
                tr.base_morphs.push(Op::Morph { out_data, in_data });
            }
            Stmt::Op(Op::Morph { out_data, in_data }) if results.contains(&out_data.col) => {
                tr.result_morphs.push(Op::Morph { out_data, in_data });
            }
            other => tr.prog.push(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mal2ms_core::format::BitWidth;
    use mal2ms_core::ops::{CmpOp, Slot};
    use mal2ms_core::result::BaseColumn;
    use mal2ms_core::style::ProcessingStyle;

    fn s(bw: u8) -> Format {
        Format::static_vbp(ProcessingStyle::Scalar, BitWidth::Fixed(bw))
    }

    fn d() -> Format {
        Format::dynamic_vbp(ProcessingStyle::Scalar)
    }

    fn select(out: &str, input: &str, fmt_in: Format, fmt_out: Format) -> Stmt {
        Stmt::Op(Op::Select {
            out_pos: Slot::with_format(out, fmt_out),
            cmp: CmpOp::Less,
            in_data: Slot::with_format(input, fmt_in),
            val: "5".into(),
        })
    }

    /// Two selects on `t.a` (static_vbp_9), intersected uncompressed, then
    /// projected onto `t.b`; the result `X_4` is written dynamic_vbp.
    fn program() -> TranslationResult {
        let mut tr = TranslationResult::default();
        tr.add_base_column(&BaseColumn::new("t", "a"));
        tr.add_base_column(&BaseColumn::new("t", "b"));
        tr.prog = vec![
            select("X_1", "t.a", s(9), s(10)),
            Stmt::Passthrough(String::new()),
            select("X_2", "t.a", s(9), Format::Uncompr),
            Stmt::Op(Op::Intersect {
                out_pos: Slot::with_format("X_3", Format::Uncompr),
                in_pos_l: Slot::with_format("X_1", Format::Uncompr),
                in_pos_r: Slot::with_format("X_2", Format::Uncompr),
            }),
            Stmt::Op(Op::Project {
                out_data: Slot::with_format("X_4", d()),
                in_data: Slot::with_format("t.b", Format::Uncompr),
                in_pos: Slot::with_format("X_3", Format::Uncompr),
            }),
        ];
        tr.result_cols = vec!["X_4".into()];
        tr
    }

    fn morph_cols(ops: &[Op]) -> Vec<(&str, &str)> {
        ops.iter()
            .map(|op| match op {
                Op::Morph { out_data, in_data } => (out_data.col.as_str(), in_data.col.as_str()),
                other => panic!("not a morph: {other:?}"),
            })
            .collect()
    }

    #[test]
    fn base_column_is_morphed_once_and_hoisted() {
        let mut tr = program();
        insert_morphs(&mut tr).unwrap();
        assert_eq!(morph_cols(&tr.base_morphs), vec![("t_a__s9", "t.a")]);
        let inputs: Vec<&str> = tr
            .prog
            .iter()
            .filter_map(Stmt::as_op)
            .filter(|op| op.name() == "Select")
            .map(|op| op.inputs().next().map_or("", |(_, s)| s.col.as_str()))
            .collect();
        assert_eq!(inputs, vec!["t_a__s9", "t_a__s9"]);
    }

    #[test]
    fn interior_morph_precedes_its_consumer() {
        let mut tr = program();
        insert_morphs(&mut tr).unwrap();
        let names: Vec<&str> = tr.prog.iter().filter_map(Stmt::as_op).map(Op::name).collect();
        assert_eq!(names, vec!["Select", "Select", "Morph", "Intersect", "Project"]);
        match tr.prog.iter().filter_map(Stmt::as_op).nth(2) {
            Some(Op::Morph { out_data, in_data }) => {
                assert_eq!(out_data.col, "X_1__u");
                assert_eq!(out_data.format, Some(Format::Uncompr));
                assert_eq!(in_data.col, "X_1");
                assert_eq!(in_data.format, Some(s(10)));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn results_are_delivered_uncompressed() {
        let mut tr = program();
        let n = insert_morphs(&mut tr).unwrap();
        assert_eq!(n, 3);
        assert_eq!(morph_cols(&tr.result_morphs), vec![("X_4__u", "X_4")]);
        assert_eq!(tr.result_cols, vec!["X_4__u"]);
    }

    #[test]
    fn second_run_inserts_nothing() {
        let mut tr = program();
        insert_morphs(&mut tr).unwrap();
        let once = tr.clone();
        assert_eq!(insert_morphs(&mut tr).unwrap(), 0);
        assert_eq!(tr, once);
    }

    #[test]
    fn group_extents_are_not_morphed() {
        let mut tr = TranslationResult::default();
        tr.add_base_column(&BaseColumn::new("t", "a"));
        tr.prog = vec![
            Stmt::Op(Op::GroupUnary {
                out_gr: Slot::with_format("X_1", Format::Uncompr),
                out_ext: Slot::with_format("X_2", d()),
                in_data: Slot::with_format("t.a", Format::Uncompr),
            }),
            Stmt::Op(Op::SumGrBased {
                out_data: Slot::with_format("X_3", Format::Uncompr),
                in_gr: Slot::with_format("X_1", Format::Uncompr),
                in_data: Slot::with_format("t.a", Format::Uncompr),
                in_ext: Slot::with_format("X_2", Format::Uncompr),
            }),
        ];
        tr.result_cols = vec!["X_3".into()];
        assert_eq!(insert_morphs(&mut tr).unwrap(), 0);
    }

    #[test]
    fn unset_input_format_is_reported() {
        let mut tr = program();
        if let Some(Stmt::Op(Op::Intersect { in_pos_r, .. })) = tr.prog.get_mut(3) {
            in_pos_r.format = None;
        }
        assert!(matches!(
            insert_morphs(&mut tr),
            Err(Error::IncompleteFormatAssignment { node: 2, op: "Intersect", role: "inPosR" })
        ));
    }
}
