#![forbid(unsafe_code)]
//! mal2ms-emit: C++ source generation for a translated program.
//!
//! - `template`: placeholder lines of a program template and their substitution
//! - `render`: the engine call for every plan-node kind, and its headers
//!
//! `Emitter` produces the text of every placeholder from a finished
//! `TranslationResult`; every format slot must be set by then.

pub mod render;
pub mod template;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use mal2ms_analysis::{AccessClass, AnalysisResult};
use mal2ms_core::config::TranslatorConfig;
use mal2ms_core::error::Result;
use mal2ms_core::format::Format;
use mal2ms_core::hash::Hash256;
use mal2ms_core::ops::{Op, Stmt};
use mal2ms_core::result::TranslationResult;
use mal2ms_core::style::{OperatorFamily, ProcessingStyle};

pub use render::{Renderer, PS};
pub use template::{substitute, Placeholder, DEFAULT_TEMPLATE};

const MONITORING_HEADER: &str = "core/utils/monitoring.h";
const QUERY_INTERVAL: &str = "query";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitOptions {
    pub style: ProcessingStyle,
    pub family: OperatorFamily,
    /// Time the whole query and every node with monitoring intervals.
    pub monitoring: bool,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            style: ProcessingStyle::Scalar,
            family: OperatorFamily::Handcoded,
            monitoring: false,
        }
    }
}

impl EmitOptions {
    pub fn from_config(cfg: &TranslatorConfig) -> Self {
        Self {
            style: cfg.style,
            family: cfg.family,
            ..Default::default()
        }
    }
}

/// A program element in emission order.
enum Item<'a> {
    Node(&'a Op),
    Text(&'a str),
}

pub struct Emitter<'a> {
    tr: &'a TranslationResult,
    opts: EmitOptions,
    renderer: Renderer,
    facts: Option<&'a AnalysisResult>,
    fingerprint: Option<Hash256>,
}

impl<'a> Emitter<'a> {
    pub fn new(tr: &'a TranslationResult, opts: EmitOptions) -> Self {
        let renderer = Renderer::new(opts.style, opts.family);
        Self {
            tr,
            opts,
            renderer,
            facts: None,
            fingerprint: None,
        }
    }

    /// Column facts reported by the `analysis` placeholder.
    pub fn with_facts(mut self, facts: &'a AnalysisResult) -> Self {
        self.facts = Some(facts);
        self
    }

    pub fn with_fingerprint(mut self, fingerprint: Hash256) -> Self {
        self.fingerprint = Some(fingerprint);
        self
    }

    /// Fill every placeholder of `template`.
    pub fn emit(&self, template: &str) -> Result<String> {
        let text = substitute(template, |ph| self.section(ph))?;
        #[cfg(feature = "tracing")]
        tracing::debug!(
            lines = text.lines().count(),
            nodes = self.tr.op_count(),
            "generated C++ program"
        );
        Ok(text)
    }

    pub fn section(&self, ph: Placeholder) -> Result<Vec<String>> {
        Ok(match ph {
            Placeholder::Docu => self.docu(),
            Placeholder::Headers => self.headers(),
            Placeholder::ProcessingStyle => vec![format!("using {PS} = {};", self.opts.style.cpp_name())],
            Placeholder::Schema => self.schema(),
            Placeholder::DataLoad => self.data_load(),
            Placeholder::Prog => self.prog()?,
            Placeholder::Result => self.result(),
            Placeholder::Analysis => self.analysis(),
        })
    }

    fn items(&self) -> Vec<Item<'a>> {
        let tr = self.tr;
        let mut items: Vec<Item<'a>> = tr.base_morphs.iter().map(Item::Node).collect();
        if !items.is_empty() {
            items.push(Item::Text(""));
        }
        items.extend(tr.prog.iter().map(|stmt| match stmt {
            Stmt::Op(op) => Item::Node(op),
            Stmt::Passthrough(text) => Item::Text(text.as_str()),
        }));
        if !tr.result_morphs.is_empty() {
            items.push(Item::Text(""));
            items.extend(tr.result_morphs.iter().map(Item::Node));
        }
        items
    }

    fn docu(&self) -> Vec<String> {
        let family = match self.opts.family {
            OperatorFamily::Handcoded => "hand-coded",
            OperatorFamily::VectorLib => "vector-library",
        };
        let mut out = vec![
            "/**".to_string(),
            " * @file".to_string(),
            format!(
                " * @brief Generated by mal2ms {} from a MonetDB MAL program.",
                mal2ms_core::VERSION
            ),
            " *".to_string(),
            format!(
                " * Processing style {}, {family} operators.",
                self.opts.style.cpp_name()
            ),
        ];
        if let Some(fp) = &self.fingerprint {
            out.push(format!(" * Program fingerprint {fp}."));
        }
        for lim in &self.tr.limitations {
            out.push(format!(" * Limitation: {lim}."));
        }
        out.push(" */".to_string());
        out
    }

    fn headers(&self) -> Vec<String> {
        let mut headers: BTreeSet<String> = self.tr.headers.clone();
        headers.extend(Format::Uncompr.headers().into_iter().map(String::from));
        for op in self.tr.ops() {
            headers.extend(self.renderer.headers(op));
            for (_, slot) in op.slots() {
                if let Some(fmt) = slot.format {
                    headers.extend(fmt.headers().into_iter().map(String::from));
                }
            }
        }
        if self.opts.monitoring {
            headers.insert(MONITORING_HEADER.to_string());
        }
        headers.iter().map(|h| format!("#include <{h}>")).collect()
    }

    /// One struct per table with the columns the program reads.
    fn schema(&self) -> Vec<String> {
        let mut out = Vec::new();
        for (table, cols) in &self.tr.cols_by_table {
            out.push(format!("struct {table}_t {{"));
            for col in cols {
                out.push(format!("    const column<uncompr_f> * {col};"));
            }
            out.push(format!("}} {table};"));
            out.push(String::new());
        }
        out
    }

    fn data_load(&self) -> Vec<String> {
        let cols = self.tr.base_columns();
        let width = cols.iter().map(String::len).max().unwrap_or(0);
        cols.iter()
            .map(|col| {
                format!("{col:<width$} = binary_io<uncompr_f>::load(dataPath + \"/{col}.uncompr_f.bin\");")
            })
            .collect()
    }

    /// Base morphs, the program and result morphs, one statement per node.
    pub fn prog(&self) -> Result<Vec<String>> {
        let monitoring = self.opts.monitoring;
        let mut out = Vec::new();
        if monitoring {
            out.push(format!("MONITOR_START_INTERVAL(\"{QUERY_INTERVAL}\")"));
            out.push(String::new());
        }
        let mut node = 0;
        for item in self.items() {
            match item {
                Item::Text(text) => out.push(text.to_string()),
                Item::Node(op) => {
                    let stmt = self.renderer.render(op, node)?;
                    if monitoring {
                        let key = format!("{}_{node}", self.renderer.function_name(op));
                        out.push(format!("MONITOR_START_INTERVAL(\"{key}\")"));
                        out.push(stmt);
                        out.push(format!("MONITOR_END_INTERVAL(\"{key}\")"));
                    } else {
                        out.push(stmt);
                    }
                    node += 1;
                }
            }
        }
        if monitoring {
            out.push(String::new());
            out.push(format!("MONITOR_END_INTERVAL(\"{QUERY_INTERVAL}\")"));
        }
        Ok(out)
    }

    fn result(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.opts.monitoring {
            out.push("MONITOR_PRINT_ALL(monitorShellLog, true)".to_string());
        }
        if !self.tr.result_cols.is_empty() {
            out.push(format!("print_columns_csv({{{}}});", self.tr.result_cols.join(", ")));
        }
        out
    }

    fn analysis(&self) -> Vec<String> {
        let Some(facts) = self.facts else {
            return vec!["// No analysis facts were recorded for this program.".to_string()];
        };
        let mut out = vec!["//         Intermediates never used".to_string()];
        if facts.never_used.is_empty() {
            out.push("// [good]: Found none.".to_string());
        } else {
            out.push("// [WARN]: Found the following:".to_string());
            out.extend(facts.never_used.iter().map(|v| format!("//         - {v}")));
        }
        out.push("//".to_string());
        out.push("//         Column facts (unique, sorted, access, sequential reads, max bit width)".to_string());
        let width = facts.props.keys().map(String::len).max().unwrap_or(0);
        for (col, p) in &facts.props {
            let access = match p.access {
                AccessClass::NoneYet => "none",
                AccessClass::Sequential => "sequential",
                AccessClass::RandomSorted => "random sorted",
                AccessClass::RandomUnsorted => "random unsorted",
            };
            out.push(format!(
                "//         {col:<width$}  {}  {}  {access:<15}  {:>2}  {}",
                if p.is_unique { "U" } else { "-" },
                if p.is_sorted { "S" } else { "-" },
                p.seq_access_count,
                p.max_bw.map_or_else(|| "?".to_string(), |bw| bw.to_string()),
            ));
        }
        out
    }
}

/// Generate the program from the embedded template.
pub fn emit(tr: &TranslationResult, opts: &EmitOptions) -> Result<String> {
    Emitter::new(tr, opts.clone()).emit(DEFAULT_TEMPLATE)
}
