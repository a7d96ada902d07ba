//! The line automaton and the translation state it drives.

use std::collections::{HashMap, HashSet};

use mal2ms_core::config::TranslatorConfig;
use mal2ms_core::error::{Error, Result};
use mal2ms_core::ops::{Op, Stmt};
use mal2ms_core::result::{BaseColumn, Limitation, TranslationResult};
use regex::{Captures, Regex};

use crate::grammar::{self, leading_captures};
use crate::state::ParseState;

pub(crate) struct Translator<'c> {
    pub(crate) cfg: &'c TranslatorConfig,
    state: ParseState,
    line_no: usize,
    line: String,
    /// MAL variables standing for another variable (casts, empty projection paths).
    aliases: HashMap<String, String>,
    /// MAL variables bound to a base column.
    provenance: HashMap<String, BaseColumn>,
    /// Variables holding all oids `0..|table|` of a table.
    pub(crate) full_oid_lists: HashSet<String>,
    /// Outputs of the (untranslatable) sort operators.
    pub(crate) sort_results: Vec<String>,
    pub(crate) tr: TranslationResult,
}

impl<'c> Translator<'c> {
    pub(crate) fn new(cfg: &'c TranslatorConfig) -> Self {
        Self {
            cfg,
            state: ParseState::SkipPrologueComments,
            line_no: 0,
            line: String::new(),
            aliases: HashMap::new(),
            provenance: HashMap::new(),
            full_oid_lists: HashSet::new(),
            sort_results: Vec::new(),
            tr: TranslationResult::default(),
        }
    }

    #[cfg(feature = "tracing")]
    pub(crate) fn line_no(&self) -> usize {
        self.line_no
    }

    /// Name the given MAL variable has in the translated program.
    pub(crate) fn resolve(&self, var: &str) -> String {
        if let Some(bc) = self.provenance.get(var) {
            bc.to_string()
        } else if let Some(target) = self.aliases.get(var) {
            target.clone()
        } else {
            var.to_string()
        }
    }

    /// Let `var` stand for `target`, resolved now so chains never form.
    pub(crate) fn alias(&mut self, var: &str, target: &str) {
        let resolved = self.resolve(target);
        self.aliases.insert(var.to_string(), resolved);
    }

    pub(crate) fn bind(&mut self, var: &str, col: BaseColumn) {
        self.tr.add_base_column(&col);
        self.provenance.insert(var.to_string(), col);
    }

    pub(crate) fn push(&mut self, op: Op) {
        self.tr.prog.push(Stmt::Op(op));
    }

    pub(crate) fn add_header(&mut self, header: &str) {
        self.tr.headers.insert(header.to_string());
    }

    fn full_match<'t>(&self, re: &Regex, text: &'t str, role: &'static str) -> Result<Captures<'t>> {
        re.captures(text).ok_or_else(|| Error::MalPatternMismatch {
            role,
            text: text.to_string(),
            line_no: self.line_no,
            line: self.line.clone(),
        })
    }

    pub(crate) fn match_res<'t>(&self, re: &Regex, text: &'t str) -> Result<Captures<'t>> {
        self.full_match(re, text, "result")
    }

    pub(crate) fn match_par<'t>(&self, re: &Regex, text: &'t str) -> Result<Captures<'t>> {
        self.full_match(re, text, "parameter")
    }

    pub(crate) fn unsupported(&self, module: &str, function: &str) -> Error {
        Error::UnsupportedOperator {
            module: module.to_string(),
            function: function.to_string(),
            line_no: self.line_no,
        }
    }

    fn structure_error(&self) -> Error {
        Error::MalStructure {
            state: self.state.name().to_string(),
            line_no: self.line_no,
            line: self.line.clone(),
        }
    }

    /// Feed the whole MAL program through the automaton.
    pub(crate) fn run(mut self, text: &str) -> Result<TranslationResult> {
        for (idx, raw) in text.lines().enumerate() {
            self.line_no = idx + 1;
            self.line = raw.trim().to_string();
            self.step()?;
        }
        if !self.state.is_terminal() {
            self.line_no += 1;
            self.line = "<end of input>".to_string();
            return Err(self.structure_error());
        }
        if !self.sort_results.is_empty() {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                vars = ?self.sort_results,
                "sorts are not translated, the result is output in unsorted order"
            );
            self.tr.limitations.push(Limitation::SortErased {
                vars: std::mem::take(&mut self.sort_results),
            });
        }
        Ok(self.tr)
    }

    fn step(&mut self) -> Result<()> {
        if self.state == ParseState::SkipPrologueComments {
            if self.line.starts_with(grammar::PROLOGUE_COMMENT) {
                return Ok(());
            }
            self.state = ParseState::SkipQueryFunctionHeader;
        }

        if self.state == ParseState::SkipQueryFunctionHeader {
            if self.line.starts_with(grammar::FUNCTION_HEADER) {
                self.state = ParseState::ProcessAssignments;
                return Ok(());
            }
            return Err(self.structure_error());
        }

        if self.state == ParseState::ProcessAssignments {
            let line = self.line.clone();
            if let Some(caps) = grammar::ASSIGNMENT.captures(&line) {
                return self.assignment(&caps[1], &caps[2], &caps[3], &caps[4]);
            }
            self.state = ParseState::ProcessResultDeclaration;
        }

        if self.state == ParseState::ProcessResultDeclaration {
            let line = self.line.clone();
            let caps = grammar::RESULT_SET
                .captures(&line)
                .ok_or_else(|| self.structure_error())?;
            let list = caps.get(1).map_or("", |m| m.as_str());
            for var in leading_captures(&grammar::RESULT_SET_INNER, list) {
                let col = self.resolve(var);
                self.tr.result_cols.push(col);
            }
            self.state = ParseState::SkipQueryFunctionFooter;
            return Ok(());
        }

        if self.state == ParseState::SkipQueryFunctionFooter {
            if self.line.starts_with(grammar::FUNCTION_FOOTER) {
                self.state = ParseState::SkipEpilogueComments;
                return Ok(());
            }
            return Err(self.structure_error());
        }

        // SkipEpilogueComments
        if self.line.is_empty() || self.line.starts_with(grammar::EPILOGUE_COMMENT) {
            Ok(())
        } else {
            Err(self.structure_error())
        }
    }

    fn assignment(&mut self, res: &str, module: &str, function: &str, par: &str) -> Result<()> {
        let before = self.tr.prog.len();
        self.dispatch(res, module, function, par)?;
        let produced = self.tr.prog.len() - before;

        #[cfg(feature = "tracing")]
        tracing::trace!(line = self.line_no, module, function, nodes = produced, "translated");

        if produced > 0 {
            if self.cfg.echo_mal {
                let echo = format!("// {}", self.line);
                self.tr.prog.insert(before, Stmt::Passthrough(echo));
            }
            // Separates the statements of consecutive MAL assignments.
            self.tr.prog.push(Stmt::Passthrough(String::new()));
        }
        Ok(())
    }
}
