#![forbid(unsafe_code)]
//! mal2ms-translate: MAL program text to an abstract MorphStore program.
//!
//! A MAL program produced by `EXPLAIN` in MonetDB is read line by line by a
//! forward-only automaton (`state::ParseState`). Each assignment is matched
//! against the grammar for its `(module, function)` pair and translated by one
//! rule into zero or more plan nodes. After parsing, generic joins are directed
//! using the uniqueness facts of a preliminary analysis.
//!
//! Known limitation: sorts cannot be translated; the result then comes out in
//! unsorted order and a `Limitation::SortErased` is recorded.

pub mod grammar;
pub mod joins;
mod rules;
pub mod state;
mod translator;

use mal2ms_analysis::{verify, AnalysisOptions};
use mal2ms_core::config::TranslatorConfig;
use mal2ms_core::error::{Error, Result};
use mal2ms_core::result::TranslationResult;
use mal2ms_core::stats::BaseStats;

pub use joins::rewrite_joins;
pub use state::ParseState;

/// Run the automaton only. Generic joins stay in the program.
pub fn parse(text: &str, cfg: &TranslatorConfig) -> Result<TranslationResult> {
    translator::Translator::new(cfg).run(text)
}

/// Translate a MAL program: parse, then direct all joins.
///
/// `stats` contributes declared-unique base columns to the join rewrite in
/// addition to `cfg.unique_columns`.
pub fn translate(text: &str, cfg: &TranslatorConfig, stats: Option<&BaseStats>) -> Result<TranslationResult> {
    let mut tr = parse(text, cfg)?;
    let opts = AnalysisOptions {
        unique_columns: cfg.unique_columns.clone(),
        stats: stats.cloned(),
        ..Default::default()
    };
    rewrite_joins(&mut tr, &opts, cfg.semi_join)?;

    let dups = verify::duplicate_outputs(&tr);
    if !dups.is_empty() {
        return Err(Error::Invariant(format!(
            "columns assigned more than once: {}",
            dups.join(", ")
        )));
    }
    #[cfg(feature = "tracing")]
    tracing::debug!(
        nodes = tr.op_count(),
        results = tr.result_cols.len(),
        tables = tr.cols_by_table.len(),
        "translated MAL program"
    );
    Ok(tr)
}
