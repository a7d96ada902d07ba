//! One translation rule per (family of) MAL operator(s).
//!
//! A rule matches the result and parameter strings against its patterns,
//! resolves the referenced variables and appends plan nodes.

use mal2ms_core::config::CandidateIntersect;
use mal2ms_core::error::Result;
use mal2ms_core::ops::{ArithOp, CmpOp, Op, Slot};
use mal2ms_core::result::BaseColumn;

use crate::grammar::{self, leading_captures, MAL_INT_TYPES};
use crate::translator::Translator;

fn group(caps: &regex::Captures<'_>, i: usize) -> String {
    caps.get(i).map_or_else(String::new, |m| m.as_str().to_string())
}

impl Translator<'_> {
    pub(crate) fn dispatch(&mut self, res: &str, module: &str, function: &str, par: &str) -> Result<()> {
        match (module, function) {
            ("aggr", "subsum") => self.aggr_subsum(res, par),
            ("aggr", "sum") => self.aggr_sum(res, par),
            ("algebra", "join") => self.algebra_join(res, par),
            ("algebra", "projection" | "projectionpath") => self.algebra_projectionpath(res, par),
            ("algebra", "select") => self.algebra_select(res, par),
            ("algebra", "sort") => self.algebra_sort(res),
            ("algebra", "thetaselect") => self.algebra_thetaselect(res, par),
            ("bat", "mergecand") => self.bat_mergecand(res, par),
            ("batcalc", _) => self.batcalc(res, function, par),
            ("calc", _) => self.calc(res, function, par),
            ("group", "group") => self.group_group(res, par),
            ("group", "subgroup" | "subgroupdone") => self.group_subgroup(res, par),
            ("sql", "bind") => self.sql_bind(res, par),
            ("sql", "tid") => self.sql_tid(res),
            // Bookkeeping without a counterpart in the translated program.
            ("bat", "append" | "new")
            | ("querylog", "define")
            | ("sql", "mvc")
            | ("language", "pass" | "dataflow") => Ok(()),
            _ => Err(self.unsupported(module, function)),
        }
    }

    fn aggr_subsum(&mut self, res: &str, par: &str) -> Result<()> {
        let r = self.match_res(&grammar::RES_1, res)?;
        let p = self.match_par(&grammar::PAR_AGGR_SUBSUM, par)?;
        self.push(Op::SumGrBased {
            out_data: Slot::new(group(&r, 1)),
            in_gr: Slot::new(self.resolve(&p[2])),
            in_data: Slot::new(self.resolve(&p[1])),
            in_ext: Slot::new(self.resolve(&p[3])),
        });
        Ok(())
    }

    fn aggr_sum(&mut self, res: &str, par: &str) -> Result<()> {
        let r = self.match_res(&grammar::RES_SCALAR, res)?;
        let p = self.match_par(&grammar::PAR_AGGR_SUM, par)?;
        self.push(Op::SumWholeCol {
            out_data: Slot::new(group(&r, 1)),
            in_data: Slot::new(self.resolve(&p[1])),
        });
        Ok(())
    }

    /// Emitted as a generic join; `joins::rewrite_joins` directs it later.
    fn algebra_join(&mut self, res: &str, par: &str) -> Result<()> {
        let r = self.match_res(&grammar::RES_2, res)?;
        let p = self.match_par(&grammar::PAR_ALGEBRA_JOIN, par)?;
        self.push(Op::Join {
            out_pos_l: Slot::new(group(&r, 1)),
            out_pos_r: Slot::new(group(&r, 2)),
            in_data_l: Slot::new(self.resolve(&p[1])),
            in_data_r: Slot::new(self.resolve(&p[2])),
        });
        Ok(())
    }

    /// `projection` applies one position list, `projectionpath` several. Both
    /// collapse to as many single-list projections as there are position
    /// lists left after dropping full oid lists and sort outputs.
    fn algebra_projectionpath(&mut self, res: &str, par: &str) -> Result<()> {
        let r = self.match_res(&grammar::RES_1, res)?;
        let p = self.match_par(&grammar::PAR_PROJECTIONPATH, par)?;
        let out = group(&r, 1);
        let in_data = self.resolve(&p[2]);
        let path = p.get(1).map_or("", |m| m.as_str());
        let in_pos: Vec<String> = leading_captures(&grammar::PAR_PROJECTIONPATH_INNER, path)
            .into_iter()
            .filter(|v| !self.full_oid_lists.contains(*v) && !self.is_sort_result(v))
            .map(|v| self.resolve(v))
            .collect();

        match in_pos.len() {
            0 => self.alias(&out, &in_data),
            1 => self.push(Op::Project {
                out_data: Slot::new(out),
                in_data: Slot::new(in_data),
                in_pos: Slot::new(in_pos[0].clone()),
            }),
            n => {
                // The last position list is applied first.
                for (idx, pos) in in_pos.iter().rev().enumerate() {
                    let out_data = if idx < n - 1 {
                        format!("{out}_{idx}")
                    } else {
                        out.clone()
                    };
                    let input = if idx > 0 {
                        format!("{out}_{}", idx - 1)
                    } else {
                        in_data.clone()
                    };
                    self.push(Op::Project {
                        out_data: Slot::new(out_data),
                        in_data: Slot::new(input),
                        in_pos: Slot::new(pos.clone()),
                    });
                }
            }
        }
        Ok(())
    }

    fn is_sort_result(&self, var: &str) -> bool {
        self.sort_results.iter().any(|s| s == var)
    }

    /// Candidate lists restrict a selection unless they hold all oids anyway.
    fn useful_candidates(&self, cand: Option<&str>) -> Option<String> {
        cand.filter(|c| !self.full_oid_lists.contains(*c))
            .map(|c| self.resolve(c))
    }

    fn push_candidate_intersect(&mut self, out: String, interm: String, cand: String) {
        let (out_pos, in_pos_l, in_pos_r) = (Slot::new(out), Slot::new(interm), Slot::new(cand));
        self.push(match self.cfg.candidate_intersect {
            CandidateIntersect::Merge => Op::Intersect {
                out_pos,
                in_pos_l,
                in_pos_r,
            },
            CandidateIntersect::Search => Op::IntersectK {
                out_pos,
                in_pos_l,
                in_pos_r,
            },
        });
    }

    /// Range selection `lo <= x <= hi`, with an optional candidate list.
    fn algebra_select(&mut self, res: &str, par: &str) -> Result<()> {
        let r = self.match_res(&grammar::RES_1, res)?;
        let p = self.match_par(&grammar::PAR_ALGEBRA_SELECT, par)?;
        let out = group(&r, 1);
        let in_data = self.resolve(&p[1]);
        let cand = self.useful_candidates(p.get(2).map(|m| m.as_str()));
        let (lo, hi) = (group(&p, 3), group(&p, 4));
        let interm = format!("{out}_0");
        let range_out = if cand.is_some() { interm.clone() } else { out.clone() };

        self.add_header("functional");
        if self.cfg.use_between {
            self.push(Op::Between {
                out_pos: Slot::new(range_out),
                in_data: Slot::new(in_data),
                lo,
                hi,
            });
        } else {
            let out_lo = format!("{out}_lo");
            let out_hi = format!("{out}_hi");
            self.push(Op::Select {
                out_pos: Slot::new(out_lo.clone()),
                cmp: CmpOp::GreaterEqual,
                in_data: Slot::new(in_data.clone()),
                val: lo,
            });
            self.push(Op::Select {
                out_pos: Slot::new(out_hi.clone()),
                cmp: CmpOp::LessEqual,
                in_data: Slot::new(in_data),
                val: hi,
            });
            self.push(Op::Intersect {
                out_pos: Slot::new(range_out),
                in_pos_l: Slot::new(out_lo),
                in_pos_r: Slot::new(out_hi),
            });
        }
        if let Some(cand) = cand {
            self.push_candidate_intersect(out, interm, cand);
        }
        Ok(())
    }

    /// Sorts have no engine counterpart. Their outputs are remembered so that
    /// projections through them are dropped.
    fn algebra_sort(&mut self, res: &str) -> Result<()> {
        let r = self.match_res(&grammar::RES_3, res)?;
        for i in 1..=3 {
            self.sort_results.push(group(&r, i));
        }
        Ok(())
    }

    fn cmp_op(&self, token: &str) -> CmpOp {
        match token {
            "<" => CmpOp::Less,
            "<=" => CmpOp::LessEqual,
            "==" => CmpOp::Equal,
            ">=" => CmpOp::GreaterEqual,
            _ if self.cfg.greater_as_equal => {
                #[cfg(feature = "tracing")]
                tracing::warn!(line = self.line_no(), "mapping '>' to equality (legacy behavior)");
                CmpOp::Equal
            }
            _ => CmpOp::Greater,
        }
    }

    fn algebra_thetaselect(&mut self, res: &str, par: &str) -> Result<()> {
        let r = self.match_res(&grammar::RES_1, res)?;
        let p = self.match_par(&grammar::PAR_THETASELECT, par)?;
        let out = group(&r, 1);
        let cand = self.useful_candidates(p.get(2).map(|m| m.as_str()));
        let interm = format!("{out}_0");

        self.add_header("functional");
        self.push(Op::Select {
            out_pos: Slot::new(if cand.is_some() { interm.clone() } else { out.clone() }),
            cmp: self.cmp_op(&p[4]),
            in_data: Slot::new(self.resolve(&p[1])),
            val: group(&p, 3),
        });
        if let Some(cand) = cand {
            self.push_candidate_intersect(out, interm, cand);
        }
        Ok(())
    }

    fn bat_mergecand(&mut self, res: &str, par: &str) -> Result<()> {
        let r = self.match_res(&grammar::RES_1, res)?;
        let p = self.match_par(&grammar::PAR_MERGECAND, par)?;
        self.push(Op::Merge {
            out_pos: Slot::new(group(&r, 1)),
            in_pos_l: Slot::new(self.resolve(&p[1])),
            in_pos_r: Slot::new(self.resolve(&p[2])),
        });
        Ok(())
    }

    /// Casts become aliases; `+`, `-` and `*` become element-wise calculations.
    fn batcalc(&mut self, res: &str, function: &str, par: &str) -> Result<()> {
        let r = self.match_res(&grammar::RES_1, res)?;
        let out = group(&r, 1);
        if MAL_INT_TYPES.contains(&function) {
            let p = self.match_par(&grammar::PAR_BATCALC_UNARY, par)?;
            self.alias(&out, &p[1]);
            return Ok(());
        }
        let op = ArithOp::from_symbol(function).ok_or_else(|| self.unsupported("batcalc", function))?;
        let p = self.match_par(&grammar::PAR_BATCALC_BINARY, par)?;
        self.add_header("functional");
        self.push(Op::CalcBinary {
            out_data: Slot::new(out),
            op,
            in_data_l: Slot::new(self.resolve(&p[1])),
            in_data_r: Slot::new(self.resolve(&p[2])),
        });
        Ok(())
    }

    /// Scalar casts, e.g. widening an aggregate before it is output.
    fn calc(&mut self, res: &str, function: &str, par: &str) -> Result<()> {
        if !MAL_INT_TYPES.contains(&function) {
            return Err(self.unsupported("calc", function));
        }
        let r = self.match_res(&grammar::RES_SCALAR, res)?;
        let p = self.match_par(&grammar::PAR_CALC_UNARY, par)?;
        self.alias(&group(&r, 1), &p[1]);
        Ok(())
    }

    fn group_group(&mut self, res: &str, par: &str) -> Result<()> {
        let r = self.match_res(&grammar::RES_3, res)?;
        let p = self.match_par(&grammar::PAR_GROUP_GROUP, par)?;
        self.push(Op::GroupUnary {
            out_gr: Slot::new(group(&r, 1)),
            out_ext: Slot::new(group(&r, 2)),
            in_data: Slot::new(self.resolve(&p[1])),
        });
        Ok(())
    }

    fn group_subgroup(&mut self, res: &str, par: &str) -> Result<()> {
        let r = self.match_res(&grammar::RES_3, res)?;
        let p = self.match_par(&grammar::PAR_GROUP_SUBGROUP, par)?;
        self.push(Op::GroupBinary {
            out_gr: Slot::new(group(&r, 1)),
            out_ext: Slot::new(group(&r, 2)),
            in_gr: Slot::new(self.resolve(&p[2])),
            in_data: Slot::new(self.resolve(&p[1])),
        });
        Ok(())
    }

    /// Only records that the output variable denotes a base column.
    fn sql_bind(&mut self, res: &str, par: &str) -> Result<()> {
        let r = self.match_res(&grammar::RES_1, res)?;
        let p = self.match_par(&grammar::PAR_SQL_BIND, par)?;
        self.bind(&group(&r, 1), BaseColumn::new(&p[1], &p[2]));
        Ok(())
    }

    /// The output holds every oid of a table; it is dropped wherever it is
    /// used as a position or candidate list.
    fn sql_tid(&mut self, res: &str) -> Result<()> {
        let r = self.match_res(&grammar::RES_1, res)?;
        self.full_oid_lists.insert(group(&r, 1));
        Ok(())
    }
}
