//! Operator catalog: the closed set of plan-node kinds.
//!
//! Every node lists its column references as named `Slot`s. A slot pairs the
//! column-variable name with the format that column has at this node (unset
//! until format selection). `Op::slots` / `Op::slots_mut` are the only way
//! passes enumerate columns, so adding a kind is a compile-time obligation for
//! every exhaustive `match` in the analyzer, the selector and the emitter.

use serde::{Deserialize, Serialize};

use crate::format::Format;

/// Named column role of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    OutData,
    OutPos,
    OutPosL,
    OutPosR,
    OutGr,
    OutExt,
    InData,
    InDataL,
    InDataR,
    InPos,
    InPosL,
    InPosR,
    InGr,
    InExt,
}

impl Role {
    pub fn is_input(self) -> bool {
        matches!(
            self,
            Role::InData
                | Role::InDataL
                | Role::InDataR
                | Role::InPos
                | Role::InPosL
                | Role::InPosR
                | Role::InGr
                | Role::InExt
        )
    }

    pub fn is_output(self) -> bool {
        !self.is_input()
    }

    /// The extents input of a group-based sum only contributes its length.
    pub fn needs_format(self) -> bool {
        self != Role::InExt
    }

    pub fn name(self) -> &'static str {
        match self {
            Role::OutData => "outData",
            Role::OutPos => "outPos",
            Role::OutPosL => "outPosL",
            Role::OutPosR => "outPosR",
            Role::OutGr => "outGr",
            Role::OutExt => "outExt",
            Role::InData => "inData",
            Role::InDataL => "inDataL",
            Role::InDataR => "inDataR",
            Role::InPos => "inPos",
            Role::InPosL => "inPosL",
            Role::InPosR => "inPosR",
            Role::InGr => "inGr",
            Role::InExt => "inExt",
        }
    }
}

/// A column reference together with the column's format at this node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub col: String,
    pub format: Option<Format>,
}

impl Slot {
    pub fn new(col: impl Into<String>) -> Self {
        Self {
            col: col.into(),
            format: None,
        }
    }

    pub fn with_format(col: impl Into<String>, format: Format) -> Self {
        Self {
            col: col.into(),
            format: Some(format),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CmpOp {
    Less,
    LessEqual,
    Equal,
    GreaterEqual,
    Greater,
}

impl CmpOp {
    /// Function object passed to hand-coded operators.
    pub fn functor(self) -> &'static str {
        match self {
            CmpOp::Less => "std::less",
            CmpOp::LessEqual => "std::less_equal",
            CmpOp::Equal => "std::equal_to",
            CmpOp::GreaterEqual => "std::greater_equal",
            CmpOp::Greater => "std::greater",
        }
    }

    /// Primitive name used by vector-library operators.
    pub fn vector_name(self) -> &'static str {
        match self {
            CmpOp::Less => "less",
            CmpOp::LessEqual => "lessequal",
            CmpOp::Equal => "equal",
            CmpOp::GreaterEqual => "greaterequal",
            CmpOp::Greater => "greater",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
}

impl ArithOp {
    pub fn from_symbol(s: &str) -> Option<Self> {
        match s {
            "+" => Some(ArithOp::Add),
            "-" => Some(ArithOp::Sub),
            "*" => Some(ArithOp::Mul),
            _ => None,
        }
    }

    pub fn functor(self) -> &'static str {
        match self {
            ArithOp::Add => "std::plus",
            ArithOp::Sub => "std::minus",
            ArithOp::Mul => "std::multiplies",
        }
    }

    pub fn vector_name(self) -> &'static str {
        match self {
            ArithOp::Add => "add",
            ArithOp::Sub => "sub",
            ArithOp::Mul => "mul",
        }
    }
}

/// One plan node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    Project {
        out_data: Slot,
        in_data: Slot,
        in_pos: Slot,
    },
    Select {
        out_pos: Slot,
        cmp: CmpOp,
        in_data: Slot,
        val: String,
    },
    /// Inclusive range selection `lo <= x <= hi`.
    Between {
        out_pos: Slot,
        in_data: Slot,
        lo: String,
        hi: String,
    },
    Intersect {
        out_pos: Slot,
        in_pos_l: Slot,
        in_pos_r: Slot,
    },
    /// Intersection that probes its right input by search instead of merging.
    IntersectK {
        out_pos: Slot,
        in_pos_l: Slot,
        in_pos_r: Slot,
    },
    Merge {
        out_pos: Slot,
        in_pos_l: Slot,
        in_pos_r: Slot,
    },
    /// Two-sided join as it appears in MAL; rewritten before analysis.
    Join {
        out_pos_l: Slot,
        out_pos_r: Slot,
        in_data_l: Slot,
        in_data_r: Slot,
    },
    /// Join whose left (build) input is unique.
    Nto1Join {
        out_pos_l: Slot,
        out_pos_r: Slot,
        in_data_l: Slot,
        in_data_r: Slot,
    },
    LeftSemiNto1Join {
        out_pos_r: Slot,
        in_data_l: Slot,
        in_data_r: Slot,
    },
    CalcBinary {
        out_data: Slot,
        op: ArithOp,
        in_data_l: Slot,
        in_data_r: Slot,
    },
    SumWholeCol {
        out_data: Slot,
        in_data: Slot,
    },
    SumGrBased {
        out_data: Slot,
        in_gr: Slot,
        in_data: Slot,
        in_ext: Slot,
    },
    GroupUnary {
        out_gr: Slot,
        out_ext: Slot,
        in_data: Slot,
    },
    GroupBinary {
        out_gr: Slot,
        out_ext: Slot,
        in_gr: Slot,
        in_data: Slot,
    },
    Morph {
        out_data: Slot,
        in_data: Slot,
    },
}

macro_rules! slot_list {
    ($($role:ident => $slot:expr),* $(,)?) => {
        vec![$((Role::$role, $slot)),*]
    };
}

impl Op {
    pub fn name(&self) -> &'static str {
        match self {
            Op::Project { .. } => "Project",
            Op::Select { .. } => "Select",
            Op::Between { .. } => "Between",
            Op::Intersect { .. } => "Intersect",
            Op::IntersectK { .. } => "IntersectK",
            Op::Merge { .. } => "Merge",
            Op::Join { .. } => "Join",
            Op::Nto1Join { .. } => "Nto1Join",
            Op::LeftSemiNto1Join { .. } => "LeftSemiNto1Join",
            Op::CalcBinary { .. } => "CalcBinary",
            Op::SumWholeCol { .. } => "SumWholeCol",
            Op::SumGrBased { .. } => "SumGrBased",
            Op::GroupUnary { .. } => "GroupUnary",
            Op::GroupBinary { .. } => "GroupBinary",
            Op::Morph { .. } => "Morph",
        }
    }

    /// All column slots, outputs first, in declaration order.
    pub fn slots(&self) -> Vec<(Role, &Slot)> {
        match self {
            Op::Project {
                out_data,
                in_data,
                in_pos,
            } => slot_list![OutData => out_data, InData => in_data, InPos => in_pos],
            Op::Select { out_pos, in_data, .. } | Op::Between { out_pos, in_data, .. } => {
                slot_list![OutPos => out_pos, InData => in_data]
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
            }
            | Op::Merge {
                out_pos,
                in_pos_l,
                in_pos_r,
            } => slot_list![OutPos => out_pos, InPosL => in_pos_l, InPosR => in_pos_r],
            Op::Join {
                out_pos_l,
                out_pos_r,
                in_data_l,
                in_data_r,
            }
            | Op::Nto1Join {
                out_pos_l,
                out_pos_r,
                in_data_l,
                in_data_r,
            } => slot_list![
                OutPosL => out_pos_l,
                OutPosR => out_pos_r,
                InDataL => in_data_l,
                InDataR => in_data_r,
            ],
            Op::LeftSemiNto1Join {
                out_pos_r,
                in_data_l,
                in_data_r,
            } => slot_list![OutPosR => out_pos_r, InDataL => in_data_l, InDataR => in_data_r],
            Op::CalcBinary {
                out_data,
                in_data_l,
                in_data_r,
                ..
            } => slot_list![OutData => out_data, InDataL => in_data_l, InDataR => in_data_r],
            Op::SumWholeCol { out_data, in_data } | Op::Morph { out_data, in_data } => {
                slot_list![OutData => out_data, InData => in_data]
            }
            Op::SumGrBased {
                out_data,
                in_gr,
                in_data,
                in_ext,
            } => slot_list![
                OutData => out_data,
                InGr => in_gr,
                InData => in_data,
                InExt => in_ext,
            ],
            Op::GroupUnary {
                out_gr,
                out_ext,
                in_data,
            } => slot_list![OutGr => out_gr, OutExt => out_ext, InData => in_data],
            Op::GroupBinary {
                out_gr,
                out_ext,
                in_gr,
                in_data,
            } => slot_list![OutGr => out_gr, OutExt => out_ext, InGr => in_gr, InData => in_data],
        }
    }

    pub fn slots_mut(&mut self) -> Vec<(Role, &mut Slot)> {
        match self {
            Op::Project {
                out_data,
                in_data,
                in_pos,
            } => slot_list![OutData => out_data, InData => in_data, InPos => in_pos],
            Op::Select { out_pos, in_data, .. } | Op::Between { out_pos, in_data, .. } => {
                slot_list![OutPos => out_pos, InData => in_data]
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
            }
            | Op::Merge {
                out_pos,
                in_pos_l,
                in_pos_r,
            } => slot_list![OutPos => out_pos, InPosL => in_pos_l, InPosR => in_pos_r],
            Op::Join {
                out_pos_l,
                out_pos_r,
                in_data_l,
                in_data_r,
            }
            | Op::Nto1Join {
                out_pos_l,
                out_pos_r,
                in_data_l,
                in_data_r,
            } => slot_list![
                OutPosL => out_pos_l,
                OutPosR => out_pos_r,
                InDataL => in_data_l,
                InDataR => in_data_r,
            ],
            Op::LeftSemiNto1Join {
                out_pos_r,
                in_data_l,
                in_data_r,
            } => slot_list![OutPosR => out_pos_r, InDataL => in_data_l, InDataR => in_data_r],
            Op::CalcBinary {
                out_data,
                in_data_l,
                in_data_r,
                ..
            } => slot_list![OutData => out_data, InDataL => in_data_l, InDataR => in_data_r],
            Op::SumWholeCol { out_data, in_data } | Op::Morph { out_data, in_data } => {
                slot_list![OutData => out_data, InData => in_data]
            }
            Op::SumGrBased {
                out_data,
                in_gr,
                in_data,
                in_ext,
            } => slot_list![
                OutData => out_data,
                InGr => in_gr,
                InData => in_data,
                InExt => in_ext,
            ],
            Op::GroupUnary {
                out_gr,
                out_ext,
                in_data,
            } => slot_list![OutGr => out_gr, OutExt => out_ext, InData => in_data],
            Op::GroupBinary {
                out_gr,
                out_ext,
                in_gr,
                in_data,
            } => slot_list![OutGr => out_gr, OutExt => out_ext, InGr => in_gr, InData => in_data],
        }
    }

    pub fn inputs(&self) -> impl Iterator<Item = (Role, &Slot)> {
        self.slots().into_iter().filter(|(r, _)| r.is_input())
    }

    pub fn outputs(&self) -> impl Iterator<Item = (Role, &Slot)> {
        self.slots().into_iter().filter(|(r, _)| r.is_output())
    }

    /// Slot for `role`, if this kind has one.
    pub fn slot(&self, role: Role) -> Option<&Slot> {
        self.slots().into_iter().find(|(r, _)| *r == role).map(|(_, s)| s)
    }

    pub fn morph(out: impl Into<String>, out_format: Format, input: impl Into<String>, in_format: Format) -> Op {
        Op::Morph {
            out_data: Slot::with_format(out, out_format),
            in_data: Slot::with_format(input, in_format),
        }
    }
}

/// An element of a translated program: a node or literal text carried to the output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stmt {
    Op(Op),
    Passthrough(String),
}

impl Stmt {
    pub fn as_op(&self) -> Option<&Op> {
        match self {
            Stmt::Op(op) => Some(op),
            Stmt::Passthrough(_) => None,
        }
    }

    pub fn as_op_mut(&mut self) -> Option<&mut Op> {
        match self {
            Stmt::Op(op) => Some(op),
            Stmt::Passthrough(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group_sum() -> Op {
        Op::SumGrBased {
            out_data: Slot::new("X_9"),
            in_gr: Slot::new("X_7"),
            in_data: Slot::new("X_5"),
            in_ext: Slot::new("C_8"),
        }
    }

    #[test]
    fn slots_list_outputs_before_inputs() {
        let op = group_sum();
        let roles: Vec<Role> = op.slots().into_iter().map(|(r, _)| r).collect();
        assert_eq!(roles, vec![Role::OutData, Role::InGr, Role::InData, Role::InExt]);
        assert_eq!(op.outputs().count(), 1);
        assert_eq!(op.inputs().count(), 3);
    }

    #[test]
    fn extents_input_needs_no_format() {
        let op = group_sum();
        let needing: Vec<&str> = op
            .slots()
            .into_iter()
            .filter(|(r, _)| r.needs_format())
            .map(|(_, s)| s.col.as_str())
            .collect();
        assert_eq!(needing, vec!["X_9", "X_7", "X_5"]);
    }

    #[test]
    fn slots_mut_writes_through() {
        let mut op = Op::Select {
            out_pos: Slot::new("X_3"),
            cmp: CmpOp::Less,
            in_data: Slot::new("t.a"),
            val: "5".into(),
        };
        for (_, slot) in op.slots_mut() {
            slot.format = Some(Format::Uncompr);
        }
        assert!(op.slots().iter().all(|(_, s)| s.format == Some(Format::Uncompr)));
        assert_eq!(op.slot(Role::InData).map(|s| s.col.as_str()), Some("t.a"));
        assert!(op.slot(Role::InPos).is_none());
    }

    #[test]
    fn operator_names() {
        assert_eq!(CmpOp::GreaterEqual.functor(), "std::greater_equal");
        assert_eq!(CmpOp::LessEqual.vector_name(), "lessequal");
        assert_eq!(ArithOp::from_symbol("*"), Some(ArithOp::Mul));
        assert_eq!(ArithOp::from_symbol("/"), None);
    }
}
