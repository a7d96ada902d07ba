//! One C++ statement per plan node.
//!
//! Column formats are spelled as the engine's template types; the processing
//! style is referenced through the alias declared by the `processingstyle`
//! placeholder. Multi-line statements are returned with `\n` separators and
//! indented by the caller.

use mal2ms_core::error::{Error, Result};
use mal2ms_core::ops::{ArithOp, CmpOp, Op, Role, Slot};
use mal2ms_core::style::{OperatorFamily, ProcessingStyle};

/// Name of the processing-style alias in generated code.
pub const PS: &str = "ps";

/// Group-based sums only exist for this style in the engine.
const SCALAR_PS: &str = "scalar<v64<uint64_t>>";

const JOIN_HEADER: &str = "core/operators/general_vectorized/join_uncompr.h";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Renderer {
    style: ProcessingStyle,
    family: OperatorFamily,
}

impl Renderer {
    pub fn new(style: ProcessingStyle, family: OperatorFamily) -> Self {
        Self { style, family }
    }

    /// Engine function called for `op`.
    pub fn function_name(&self, op: &Op) -> &'static str {
        match op {
            Op::Project { .. } => "project",
            Op::Select { .. } => "select",
            Op::Between { .. } => "between",
            Op::Intersect { .. } => "intersect_sorted",
            Op::IntersectK { .. } => "intersect_search",
            Op::Merge { .. } => "merge_sorted",
            Op::Join { .. } | Op::Nto1Join { .. } => "join",
            Op::LeftSemiNto1Join { .. } => "semi_join",
            Op::CalcBinary { .. } => "calc_binary",
            Op::SumWholeCol { .. } | Op::SumGrBased { .. } => "agg_sum",
            Op::GroupUnary { .. } | Op::GroupBinary { .. } => match self.family {
                OperatorFamily::Handcoded => "group",
                OperatorFamily::VectorLib => "group_vec",
            },
            Op::Morph { .. } => "morph",
        }
    }

    /// Headers needed to call the operator, excluding those of its formats.
    pub fn headers(&self, op: &Op) -> Vec<String> {
        let dir = self.style.include_dir(self.family);
        let op_header = |name: &str| format!("core/operators/{dir}/{name}_uncompr.h");
        match op {
            Op::Project { .. } => vec![op_header("project")],
            Op::Select { .. } => vec![op_header("select")],
            Op::Between { .. } => vec![op_header("between")],
            Op::Intersect { .. } | Op::IntersectK { .. } => vec![op_header("intersect")],
            Op::Merge { .. } => vec![op_header("merge")],
            Op::Join { .. } | Op::Nto1Join { .. } => vec![JOIN_HEADER.to_string(), "tuple".to_string()],
            Op::LeftSemiNto1Join { .. } => vec![JOIN_HEADER.to_string()],
            Op::CalcBinary { .. } => vec![op_header("calc")],
            Op::SumWholeCol { .. } => vec![op_header("agg_sum")],
            Op::SumGrBased { .. } => vec!["core/operators/scalar/agg_sum_uncompr.h".to_string()],
            Op::GroupUnary { .. } | Op::GroupBinary { .. } => {
                vec![op_header("group"), "tuple".to_string()]
            }
            Op::Morph { .. } => vec!["core/morphing/format.h".to_string()],
        }
    }

    fn cmp(&self, cmp: CmpOp) -> String {
        match self.family {
            OperatorFamily::Handcoded => cmp.functor().to_string(),
            OperatorFamily::VectorLib => format!("vectorlib::{}", cmp.vector_name()),
        }
    }

    fn arith(&self, op: ArithOp) -> String {
        match self.family {
            OperatorFamily::Handcoded => op.functor().to_string(),
            OperatorFamily::VectorLib => format!("vectorlib::{}", op.vector_name()),
        }
    }

    /// The statement for `op`, which is node number `node` of its program.
    pub fn render(&self, op: &Op, node: usize) -> Result<String> {
        let name = op.name();
        let f = |role: Role, slot: &Slot| -> Result<String> {
            slot.format
                .map(|fmt| fmt.internal_name())
                .ok_or(Error::IncompleteFormatAssignment {
                    node,
                    op: name,
                    role: role.name(),
                })
        };
        let fun = self.function_name(op);

        let stmt = match op {
            Op::Project {
                out_data,
                in_data,
                in_pos,
            } => format!(
                "auto {} = {fun}<{PS}, {}, {}, {}>({}, {});",
                out_data.col,
                f(Role::OutData, out_data)?,
                f(Role::InData, in_data)?,
                f(Role::InPos, in_pos)?,
                in_data.col,
                in_pos.col
            ),
            Op::Select {
                out_pos,
                cmp,
                in_data,
                val,
            } => format!(
                "auto {} = morphstore::{fun}<{}, {PS}, {}, {}>({}, {val});",
                out_pos.col,
                self.cmp(*cmp),
                f(Role::OutPos, out_pos)?,
                f(Role::InData, in_data)?,
                in_data.col
            ),
            Op::Between {
                out_pos,
                in_data,
                lo,
                hi,
            } => format!(
                "auto {} = morphstore::{fun}<{}, {}, {PS}, {}, {}>({}, {lo}, {hi});",
                out_pos.col,
                self.cmp(CmpOp::GreaterEqual),
                self.cmp(CmpOp::LessEqual),
                f(Role::OutPos, out_pos)?,
                f(Role::InData, in_data)?,
                in_data.col
            ),
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
            } => format!(
                "auto {} = {fun}<{PS}, {}, {}, {}>({}, {});",
                out_pos.col,
                f(Role::OutPos, out_pos)?,
                f(Role::InPosL, in_pos_l)?,
                f(Role::InPosR, in_pos_r)?,
                in_pos_l.col,
                in_pos_r.col
            ),
            Op::Join { .. } => {
                return Err(Error::UnhandledOperatorKind {
                    op: name,
                    pass: "code generation",
                })
            }
            Op::Nto1Join {
                out_pos_l,
                out_pos_r,
                in_data_l,
                in_data_r,
            } => {
                let (lf, rf) = (f(Role::OutPosL, out_pos_l)?, f(Role::OutPosR, out_pos_r)?);
                [
                    format!("const column<{lf}> * {};", out_pos_l.col),
                    format!("const column<{rf}> * {};", out_pos_r.col),
                    format!("std::tie({}, {}) = {fun}<", out_pos_l.col, out_pos_r.col),
                    format!("    {PS},"),
                    format!("    {lf},"),
                    format!("    {rf},"),
                    format!("    {},", f(Role::InDataL, in_data_l)?),
                    format!("    {}", f(Role::InDataR, in_data_r)?),
                    "    >(".to_string(),
                    format!("    {},", in_data_l.col),
                    format!("    {},", in_data_r.col),
                    format!("    {}->get_count_values()", in_data_r.col),
                    ");".to_string(),
                ]
                .join("\n")
            }
            Op::LeftSemiNto1Join {
                out_pos_r,
                in_data_l,
                in_data_r,
            } => [
                format!("auto {} = {fun}<", out_pos_r.col),
                format!("    {PS},"),
                format!("    {},", f(Role::OutPosR, out_pos_r)?),
                format!("    {},", f(Role::InDataL, in_data_l)?),
                format!("    {}", f(Role::InDataR, in_data_r)?),
                "    >(".to_string(),
                format!("    {},", in_data_l.col),
                format!("    {}", in_data_r.col),
                ");".to_string(),
            ]
            .join("\n"),
            Op::CalcBinary {
                out_data,
                op: arith,
                in_data_l,
                in_data_r,
            } => format!(
                "auto {} = morphstore::{fun}<{}, {PS}, {}, {}, {}>({}, {});",
                out_data.col,
                self.arith(*arith),
                f(Role::OutData, out_data)?,
                f(Role::InDataL, in_data_l)?,
                f(Role::InDataR, in_data_r)?,
                in_data_l.col,
                in_data_r.col
            ),
            // The engine always writes the single sum uncompressed.
            Op::SumWholeCol { out_data, in_data } => format!(
                "auto {} = {fun}<{PS}, {}>({});",
                out_data.col,
                f(Role::InData, in_data)?,
                in_data.col
            ),
            // Only the length of the extents column is read.
            Op::SumGrBased {
                out_data,
                in_gr,
                in_data,
                in_ext,
            } => format!(
                "// Group-based summation is only available for the scalar processing style.\n\
                 auto {} = {fun}<{SCALAR_PS}, {}, {}, {}>({}, {}, {}->get_count_values());",
                out_data.col,
                f(Role::OutData, out_data)?,
                f(Role::InGr, in_gr)?,
                f(Role::InData, in_data)?,
                in_gr.col,
                in_data.col,
                in_ext.col
            ),
            Op::GroupUnary {
                out_gr,
                out_ext,
                in_data,
            } => {
                let (gf, ef) = (f(Role::OutGr, out_gr)?, f(Role::OutExt, out_ext)?);
                format!(
                    "const column<{gf}> * {gr};\n\
                     const column<{ef}> * {ext};\n\
                     std::tie({gr}, {ext}) = {fun}<{PS}, {gf}, {ef}, {}>({});",
                    f(Role::InData, in_data)?,
                    in_data.col,
                    gr = out_gr.col,
                    ext = out_ext.col,
                )
            }
            Op::GroupBinary {
                out_gr,
                out_ext,
                in_gr,
                in_data,
            } => {
                let (gf, ef) = (f(Role::OutGr, out_gr)?, f(Role::OutExt, out_ext)?);
                format!(
                    "const column<{gf}> * {gr};\n\
                     const column<{ef}> * {ext};\n\
                     std::tie({gr}, {ext}) = {fun}<{PS}, {gf}, {ef}, {}, {}>({}, {});",
                    f(Role::InGr, in_gr)?,
                    f(Role::InData, in_data)?,
                    in_gr.col,
                    in_data.col,
                    gr = out_gr.col,
                    ext = out_ext.col,
                )
            }
            Op::Morph { out_data, in_data } => format!(
                "auto {} = {fun}<{PS}, {}, {}>({});",
                out_data.col,
                f(Role::OutData, out_data)?,
                f(Role::InData, in_data)?,
                in_data.col
            ),
        };
        Ok(stmt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mal2ms_core::format::{BitWidth, Format};

    fn u(col: &str) -> Slot {
        Slot::with_format(col, Format::Uncompr)
    }

    fn scalar() -> Renderer {
        Renderer::new(ProcessingStyle::Scalar, OperatorFamily::Handcoded)
    }

    #[test]
    fn project_and_select() {
        let r = scalar();
        let project = Op::Project {
            out_data: u("X_5"),
            in_data: u("lineorder.lo_revenue"),
            in_pos: u("C_4"),
        };
        assert_eq!(
            r.render(&project, 0).unwrap(),
            "auto X_5 = project<ps, uncompr_f, uncompr_f, uncompr_f>(lineorder.lo_revenue, C_4);"
        );
        assert_eq!(r.headers(&project), vec!["core/operators/scalar/project_uncompr.h"]);

        let select = Op::Select {
            out_pos: u("C_4"),
            cmp: CmpOp::LessEqual,
            in_data: u("date.d_year"),
            val: "1993".into(),
        };
        assert_eq!(
            r.render(&select, 0).unwrap(),
            "auto C_4 = morphstore::select<std::less_equal, ps, uncompr_f, uncompr_f>(date.d_year, 1993);"
        );
        let vl = Renderer::new(ProcessingStyle::Avx2, OperatorFamily::VectorLib);
        assert!(vl.render(&select, 0).unwrap().contains("select<vectorlib::lessequal, ps,"));
        assert_eq!(vl.headers(&select), vec!["core/operators/general_vectorized/select_uncompr.h"]);
    }

    #[test]
    fn compressed_formats_are_spelled_out() {
        let fmt = Format::static_vbp(ProcessingStyle::Scalar, BitWidth::Fixed(7));
        let morph = Op::morph("t_a__s7", fmt, "t.a", Format::Uncompr);
        assert_eq!(
            scalar().render(&morph, 0).unwrap(),
            format!("auto t_a__s7 = morph<ps, {}, uncompr_f>(t.a);", fmt.internal_name())
        );
    }

    #[test]
    fn joins_span_several_lines() {
        let join = Op::Nto1Join {
            out_pos_l: u("X_10"),
            out_pos_r: u("X_11"),
            in_data_l: u("X_8"),
            in_data_r: u("date.d_datekey"),
        };
        let text = scalar().render(&join, 3).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 13);
        assert_eq!(lines[0], "const column<uncompr_f> * X_10;");
        assert_eq!(lines[2], "std::tie(X_10, X_11) = join<");
        assert_eq!(lines[11], "    date.d_datekey->get_count_values()");
        assert_eq!(lines[12], ");");

        let generic = Op::Join {
            out_pos_l: u("X_10"),
            out_pos_r: u("X_11"),
            in_data_l: u("X_8"),
            in_data_r: u("X_9"),
        };
        assert!(matches!(
            scalar().render(&generic, 0),
            Err(Error::UnhandledOperatorKind { op: "Join", .. })
        ));
    }

    #[test]
    fn group_names_follow_the_family() {
        let group = Op::GroupUnary {
            out_gr: u("X_1"),
            out_ext: u("X_2"),
            in_data: u("t.a"),
        };
        assert!(scalar().render(&group, 0).unwrap().contains("= group<ps,"));
        let vl = Renderer::new(ProcessingStyle::Sse, OperatorFamily::VectorLib);
        assert!(vl.render(&group, 0).unwrap().contains("= group_vec<ps,"));
        assert!(vl.headers(&group).contains(&"tuple".to_string()));
    }

    #[test]
    fn group_sum_reads_only_the_extent_count() {
        let sum = Op::SumGrBased {
            out_data: u("X_3"),
            in_gr: u("X_1"),
            in_data: u("t.b"),
            in_ext: Slot::new("X_2"),
        };
        let text = Renderer::new(ProcessingStyle::Avx512, OperatorFamily::Handcoded)
            .render(&sum, 0)
            .unwrap();
        assert!(text.ends_with(
            "auto X_3 = agg_sum<scalar<v64<uint64_t>>, uncompr_f, uncompr_f, uncompr_f>(X_1, t.b, X_2->get_count_values());"
        ));
    }

    #[test]
    fn missing_format_names_node_and_field() {
        let op = Op::Intersect {
            out_pos: u("X_3"),
            in_pos_l: u("X_1"),
            in_pos_r: Slot::new("X_2"),
        };
        assert!(matches!(
            scalar().render(&op, 4),
            Err(Error::IncompleteFormatAssignment { node: 4, op: "Intersect", role: "inPosR" })
        ));
    }
}
