//! The translation pipeline.
//!
//! Stages, each consuming the result of the previous one:
//! 1. translate the MAL text (parse, direct joins)
//! 2. analyze column properties
//! 3. choose and apply formats, check completeness
//! 4. insert morphs, check completeness again
//! 5. re-analyze the final program and generate the C++ source
//!
//! Any failure aborts the run; nothing is written before the last stage.

use std::collections::BTreeMap;

use mal2ms_analysis::{analyze, AnalysisOptions, AnalysisResult};
use mal2ms_compr::{insert_morphs, select_formats, validate_formats, Assignment, SelectionInputs};
use mal2ms_core::config::TranslatorConfig;
use mal2ms_core::error::Error;
use mal2ms_core::hash::hash_serde;
use mal2ms_core::result::TranslationResult;
use mal2ms_core::stats::BaseStats;
use mal2ms_emit::{EmitOptions, Emitter, DEFAULT_TEMPLATE};

use crate::error::Result;
use crate::report::{now_ms, RunReport};

/// Everything read from the provider files named by the config.
#[derive(Debug, Clone, Default)]
pub struct Inputs {
    pub stats: Option<BaseStats>,
    pub selection: SelectionInputs,
}

impl Inputs {
    /// Read every provider file `cfg` names.
    pub fn load(cfg: &TranslatorConfig) -> Result<Self> {
        let mut inputs = Inputs::default();
        if let Some(dir) = &cfg.stat_dir {
            inputs.stats = Some(mal2ms_io::read_stats_dir(dir)?);
        }
        if let Some(path) = &cfg.col_infos_file {
            inputs.selection.col_infos = mal2ms_io::read_col_infos(path)?;
        }
        if let Some(dir) = &cfg.compr.profile_dir {
            inputs.selection.profile = Some(mal2ms_io::read_profiles(dir)?);
        }
        if let Some(path) = &cfg.compr.sizes_file {
            inputs.selection.sizes = Some(mal2ms_io::read_sizes(path)?);
        }
        if let Some(path) = &cfg.compr.manual_file {
            inputs.selection.manual = mal2ms_io::read_manual_formats(path)?;
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(
            tables = inputs.stats.as_ref().map_or(0, |s| s.tables.len()),
            col_infos = inputs.selection.col_infos.len(),
            profiled = inputs.selection.profile.as_ref().map_or(0, |p| p.len()),
            "loaded inputs"
        );
        Ok(inputs)
    }
}

/// A fully compiled program before code generation.
#[derive(Debug, Clone)]
pub struct Compiled {
    pub tr: TranslationResult,
    /// Facts of the final program, morphs included.
    pub facts: AnalysisResult,
    pub assignment: Assignment,
    pub morphs_inserted: usize,
}

/// Generated source plus its report.
#[derive(Debug, Clone)]
pub struct Output {
    pub code: String,
    pub report: RunReport,
}

pub struct Pipeline {
    cfg: TranslatorConfig,
    inputs: Inputs,
    emit: EmitOptions,
    template: Option<String>,
}

impl Pipeline {
    /// Validate `cfg` and read its provider files.
    pub fn new(cfg: TranslatorConfig) -> Result<Self> {
        cfg.validate()?;
        if cfg.cardinality_analysis && cfg.stat_dir.is_none() {
            return Err(Error::Config(
                "the cardinality analysis needs a directory with base statistics".into(),
            )
            .into());
        }
        let inputs = Inputs::load(&cfg)?;
        Ok(Self::with_inputs(cfg, inputs))
    }

    /// Use already loaded inputs; `cfg` is not validated.
    pub fn with_inputs(cfg: TranslatorConfig, inputs: Inputs) -> Self {
        let emit = EmitOptions::from_config(&cfg);
        Self {
            cfg,
            inputs,
            emit,
            template: None,
        }
    }

    pub fn monitoring(mut self, on: bool) -> Self {
        self.emit.monitoring = on;
        self
    }

    /// Generate into `template` instead of the embedded one.
    pub fn template(mut self, template: String) -> Self {
        self.template = Some(template);
        self
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.cfg
    }

    fn analysis_options(&self) -> AnalysisOptions {
        AnalysisOptions {
            unique_columns: self.cfg.unique_columns.clone(),
            stats: self.inputs.stats.clone(),
            cardinalities: self.cfg.cardinality_analysis,
            ..Default::default()
        }
    }

    /// Stage 1.
    pub fn translate(&self, mal: &str) -> Result<TranslationResult> {
        Ok(mal2ms_translate::translate(mal, &self.cfg, self.inputs.stats.as_ref())?)
    }

    /// Stages 1 and 2.
    pub fn analyze(&self, mal: &str) -> Result<(TranslationResult, AnalysisResult)> {
        let tr = self.translate(mal)?;
        let facts = analyze(&tr, &self.analysis_options())?;
        #[cfg(feature = "tracing")]
        for col in &facts.never_used {
            tracing::warn!(col = %col, "column is assigned but never used");
        }
        Ok((tr, facts))
    }

    /// Stages 1 to 4, plus the facts of the final program.
    pub fn compile(&self, mal: &str) -> Result<Compiled> {
        let (mut tr, facts) = self.analyze(mal)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(strategy = %self.cfg.compr.strategy, "selecting formats");
        let assignment = select_formats(&mut tr, &facts, &self.cfg, &self.inputs.selection)?;
        validate_formats(&tr)?;

        let morphs_inserted = insert_morphs(&mut tr)?;
        validate_formats(&tr)?;

        let opts = self.analysis_options().reseeded(&facts);
        let facts = analyze(&tr, &opts)?;
        Ok(Compiled {
            tr,
            facts,
            assignment,
            morphs_inserted,
        })
    }

    /// All stages: the generated C++ source and the run report.
    pub fn run(&self, mal: &str) -> Result<Output> {
        let started_ms = now_ms();
        let compiled = self.compile(mal)?;
        let fingerprint = hash_serde(&compiled.tr)?;

        let template = self.template.as_deref().unwrap_or(DEFAULT_TEMPLATE);
        let code = Emitter::new(&compiled.tr, self.emit.clone())
            .with_facts(&compiled.facts)
            .with_fingerprint(fingerprint)
            .emit(template)?;

        let tr = &compiled.tr;
        let mut report = RunReport::new(fingerprint, &self.cfg, started_ms);
        report.nodes = tr.op_count();
        report.morphs_inserted = compiled.morphs_inserted;
        report.base_morphs = tr.base_morphs.len();
        report.result_morphs = tr.result_morphs.len();
        report.result_cols = tr.result_cols.clone();
        report.formats = compiled
            .assignment
            .iter()
            .map(|(col, fmt)| (col.to_string(), fmt.simple_name()))
            .collect::<BTreeMap<_, _>>();
        report.never_used = compiled.facts.never_used.clone();
        report.limitations = tr.limitations.iter().map(ToString::to_string).collect();
        let report = report.finish(now_ms());

        #[cfg(feature = "tracing")]
        tracing::debug!(
            fingerprint = %fingerprint.short(),
            nodes = report.nodes,
            morphs = report.morphs_inserted,
            "translation finished"
        );
        Ok(Output { code, report })
    }
}
