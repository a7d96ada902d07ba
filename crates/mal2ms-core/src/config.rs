//! Translator configuration that downstream crates can serialize/deserialize.
//!
//! Layers, later wins: `Default`, a YAML file, `MAL2MS_*` environment
//! variables, then command-line overrides applied by the caller.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::format::DEFAULT_CASC_BLOCK_SIZE;
use crate::style::{OperatorFamily, ProcessingStyle};

/// Primary keys of the Star Schema Benchmark's dimension tables.
pub const SSB_PRIMARY_KEYS: [&str; 4] = [
    "customer.c_custkey",
    "date.d_datekey",
    "part.p_partkey",
    "supplier.s_suppkey",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    #[default]
    Uncompr,
    RuleBased,
    CostBased,
    RealBest,
    RealWorst,
    Manual,
}

impl Strategy {
    pub const ALL: [Strategy; 6] = [
        Strategy::Uncompr,
        Strategy::RuleBased,
        Strategy::CostBased,
        Strategy::RealBest,
        Strategy::RealWorst,
        Strategy::Manual,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Strategy::Uncompr => "uncompr",
            Strategy::RuleBased => "rulebased",
            Strategy::CostBased => "costbased",
            Strategy::RealBest => "realbest",
            Strategy::RealWorst => "realworst",
            Strategy::Manual => "manual",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Strategy::ALL
            .into_iter()
            .find(|st| st.name() == s.trim())
            .ok_or_else(|| Error::Config(format!("unknown compression strategy '{s}'")))
    }
}

/// Optimization objective of the cost-based strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Objective {
    #[default]
    Mem,
    Perf,
}

impl FromStr for Objective {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "mem" => Ok(Objective::Mem),
            "perf" => Ok(Objective::Perf),
            other => Err(Error::Config(format!("unknown objective '{other}'"))),
        }
    }
}

/// Operator used to restrict a selection to a candidate list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CandidateIntersect {
    /// Merge-style `Intersect` reading both inputs sequentially.
    #[default]
    Merge,
    /// `IntersectK`, probing the candidate list by search.
    Search,
}

impl FromStr for CandidateIntersect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "merge" => Ok(CandidateIntersect::Merge),
            "search" => Ok(CandidateIntersect::Search),
            other => Err(Error::Config(format!("unknown candidate intersect '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    pub style: ProcessingStyle,
    pub family: OperatorFamily,

    /// Translate range selections to one `Between` instead of two selects and an intersect.
    pub use_between: bool,
    pub candidate_intersect: CandidateIntersect,

    /// Rewrite joins whose build-side positions are never read to left-semi joins.
    pub semi_join: bool,

    /// Map the MAL comparison `>` to equality as older translators did.
    pub greater_as_equal: bool,

    /// Echo every MAL assignment as a comment in front of its translation.
    pub echo_mal: bool,

    /// Base columns known to be unique, as `table.column`. Defaults to the
    /// Star Schema Benchmark's dimension keys.
    pub unique_columns: BTreeSet<String>,

    /// Infer maximum cardinality and bit width (needs base statistics).
    pub cardinality_analysis: bool,

    /// Directory with per-table statistics files.
    pub stat_dir: Option<PathBuf>,

    /// Bit-width histograms of all columns from a prior uncompressed run.
    pub col_infos_file: Option<PathBuf>,

    pub compr: ComprConfig,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            style: ProcessingStyle::Scalar,
            family: OperatorFamily::Handcoded,
            use_between: false,
            candidate_intersect: CandidateIntersect::Merge,
            semi_join: false,
            greater_as_equal: false,
            echo_mal: false,
            unique_columns: SSB_PRIMARY_KEYS.iter().map(|c| c.to_string()).collect(),
            cardinality_analysis: false,
            stat_dir: None,
            col_infos_file: None,
            compr: ComprConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComprConfig {
    pub strategy: Strategy,
    pub objective: Objective,

    /// Rule-based target formats (simple names).
    pub rnd_format: Option<String>,
    pub seq_unsorted_format: Option<String>,
    pub seq_sorted_format: Option<String>,

    /// Block size of all cascades in the program.
    pub casc_block_size: u32,

    /// Keep every base column uncompressed irrespective of the strategy.
    pub uncompr_base: bool,
    /// Keep every intermediate column uncompressed irrespective of the strategy.
    pub uncompr_interm: bool,

    pub profile_dir: Option<PathBuf>,
    pub sizes_file: Option<PathBuf>,
    pub manual_file: Option<PathBuf>,
}

impl Default for ComprConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Uncompr,
            objective: Objective::Mem,
            rnd_format: None,
            seq_unsorted_format: None,
            seq_sorted_format: None,
            casc_block_size: DEFAULT_CASC_BLOCK_SIZE,
            uncompr_base: false,
            uncompr_interm: false,
            profile_dir: None,
            sizes_file: None,
            manual_file: None,
        }
    }
}

impl ComprConfig {
    fn has_access_formats(&self) -> bool {
        self.rnd_format.is_some()
            || self.seq_unsorted_format.is_some()
            || self.seq_sorted_format.is_some()
    }

    /// Reject combinations of arguments the chosen strategy cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.casc_block_size == 0 {
            return Err(Error::Config("the cascade block size must be positive".into()));
        }
        if self.has_access_formats() && self.strategy != Strategy::RuleBased {
            return Err(Error::Config(format!(
                "per-access formats are only allowed for the '{}' strategy, not '{}'",
                Strategy::RuleBased,
                self.strategy
            )));
        }
        match self.strategy {
            Strategy::Uncompr if self.profile_dir.is_some() => Err(Error::Config(
                "a profile directory is meaningless for the 'uncompr' strategy".into(),
            )),
            Strategy::CostBased if self.profile_dir.is_none() => Err(Error::Config(
                "the directory containing the profiles for the cost-based compression strategy must be specified".into(),
            )),
            Strategy::RealBest | Strategy::RealWorst if self.sizes_file.is_none() => Err(Error::Config(
                "the file containing the measured physical sizes of each column in each format must be specified".into(),
            )),
            Strategy::Manual if self.manual_file.is_none() => Err(Error::Config(
                "the manual compression strategy needs a format configuration file".into(),
            )),
            _ => Ok(()),
        }
    }
}

/// Parse the boolean spellings accepted on the command line and in the environment.
pub fn parse_bool(s: &str) -> Result<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Ok(true),
        "false" | "f" | "no" | "n" | "0" => Ok(false),
        other => Err(Error::Config(format!("invalid bool '{other}'"))),
    }
}

impl TranslatorConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::IoLike(format!("{}: {e}", path.display())))?;
        Self::from_yaml_str(&text)
    }

    /// Create a config from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.apply_env();
        cfg
    }

    /// Overlay `MAL2MS_*` environment variables onto this config.
    ///
    /// Environment variables:
    /// - `MAL2MS_STYLE`, `MAL2MS_FAMILY`: processing style, operator family
    /// - `MAL2MS_USE_BETWEEN`, `MAL2MS_SEMI_JOIN`, `MAL2MS_GREATER_AS_EQUAL`: booleans
    /// - `MAL2MS_UNIQUE_COLUMNS`: comma-separated `table.column` list
    /// - `MAL2MS_STRATEGY`, `MAL2MS_OBJECTIVE`, `MAL2MS_CASC_BLOCK_SIZE`
    /// - `MAL2MS_STAT_DIR`, `MAL2MS_COL_INFOS_FILE`, `MAL2MS_PROFILE_DIR`,
    ///   `MAL2MS_SIZES_FILE`, `MAL2MS_MANUAL_FILE`: paths
    ///
    /// Unparsable values are ignored.
    pub fn apply_env(&mut self) {
        fn var(name: &str) -> Option<String> {
            std::env::var(name).ok()
        }

        if let Some(v) = var("MAL2MS_STYLE").and_then(|s| s.parse().ok()) {
            self.style = v;
        }
        if let Some(v) = var("MAL2MS_FAMILY").and_then(|s| s.parse().ok()) {
            self.family = v;
        }
        if let Some(v) = var("MAL2MS_USE_BETWEEN").and_then(|s| parse_bool(&s).ok()) {
            self.use_between = v;
        }
        if let Some(v) = var("MAL2MS_SEMI_JOIN").and_then(|s| parse_bool(&s).ok()) {
            self.semi_join = v;
        }
        if let Some(v) = var("MAL2MS_GREATER_AS_EQUAL").and_then(|s| parse_bool(&s).ok()) {
            self.greater_as_equal = v;
        }
        if let Some(s) = var("MAL2MS_UNIQUE_COLUMNS") {
            self.unique_columns.extend(
                s.split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string),
            );
        }
        if let Some(v) = var("MAL2MS_STRATEGY").and_then(|s| s.parse().ok()) {
            self.compr.strategy = v;
        }
        if let Some(v) = var("MAL2MS_OBJECTIVE").and_then(|s| s.parse().ok()) {
            self.compr.objective = v;
        }
        if let Some(v) = var("MAL2MS_CASC_BLOCK_SIZE").and_then(|s| s.parse::<u32>().ok()) {
            self.compr.casc_block_size = v;
        }
        if let Some(s) = var("MAL2MS_STAT_DIR") {
            self.stat_dir = Some(PathBuf::from(s));
        }
        if let Some(s) = var("MAL2MS_COL_INFOS_FILE") {
            self.col_infos_file = Some(PathBuf::from(s));
        }
        if let Some(s) = var("MAL2MS_PROFILE_DIR") {
            self.compr.profile_dir = Some(PathBuf::from(s));
        }
        if let Some(s) = var("MAL2MS_SIZES_FILE") {
            self.compr.sizes_file = Some(PathBuf::from(s));
        }
        if let Some(s) = var("MAL2MS_MANUAL_FILE") {
            self.compr.manual_file = Some(PathBuf::from(s));
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.compr.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_uncompressed_and_valid() {
        let cfg = TranslatorConfig::default();
        assert_eq!(cfg.compr.strategy, Strategy::Uncompr);
        assert_eq!(cfg.compr.casc_block_size, 1024);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn uncompr_rejects_access_formats() {
        let mut cfg = ComprConfig {
            rnd_format: Some("static_vbp".into()),
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(Error::Config(_))));
        cfg.strategy = Strategy::RuleBased;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn strategies_require_their_inputs() {
        for (strategy, ok) in [
            (Strategy::CostBased, false),
            (Strategy::RealBest, false),
            (Strategy::RealWorst, false),
            (Strategy::Manual, false),
            (Strategy::RuleBased, true),
        ] {
            let cfg = ComprConfig {
                strategy,
                ..Default::default()
            };
            assert_eq!(cfg.validate().is_ok(), ok, "{strategy}");
        }
        let cfg = ComprConfig {
            strategy: Strategy::CostBased,
            profile_dir: Some("profiles".into()),
            ..Default::default()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn yaml_overrides_defaults() {
        let yaml = r#"
style: avx512
use_between: true
unique_columns: ["date.d_datekey"]
compr:
  strategy: rulebased
  rnd_format: static_vbp_even
  casc_block_size: 2048
"#;
        let cfg = TranslatorConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(cfg.style, ProcessingStyle::Avx512);
        assert!(cfg.use_between);
        assert!(cfg.unique_columns.contains("date.d_datekey"));
        assert_eq!(cfg.compr.strategy, Strategy::RuleBased);
        assert_eq!(cfg.compr.rnd_format.as_deref(), Some("static_vbp_even"));
        assert_eq!(cfg.compr.casc_block_size, 2048);
        assert_eq!(cfg.compr.objective, Objective::Mem);
    }

    #[test]
    fn ssb_keys_are_unique_by_default() {
        let cfg = TranslatorConfig::default();
        for key in SSB_PRIMARY_KEYS {
            assert!(cfg.unique_columns.contains(key), "{key}");
        }

        let cfg = TranslatorConfig::from_yaml_str("unique_columns: []\n").unwrap();
        assert!(cfg.unique_columns.is_empty());
    }

    #[test]
    fn bool_spellings() {
        assert!(parse_bool("Yes").unwrap());
        assert!(!parse_bool("0").unwrap());
        assert!(parse_bool("maybe").is_err());
    }

    #[test]
    fn strategy_names_parse() {
        for s in Strategy::ALL {
            assert_eq!(s.name().parse::<Strategy>().unwrap(), s);
        }
        assert!("greedy".parse::<Strategy>().is_err());
    }
}
