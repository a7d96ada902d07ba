//! Configuration layering, collaborator files and generated code.

mod common;

use std::fs;

use common::select_project_sum;
use mal2ms_core::config::{CandidateIntersect, Strategy, TranslatorConfig};
use mal2ms_core::error::Error;
use mal2ms_core::style::{OperatorFamily, ProcessingStyle};
use mal2ms_exec::{ExecError, Pipeline};

#[test]
fn test_yaml_config_then_environment() {
    let yaml = r#"
style: avx2
family: vector_lib
use_between: true
candidate_intersect: search
unique_columns: [date.d_datekey, part.p_partkey]
compr:
  strategy: rulebased
  rnd_format: static_vbp
  seq_sorted_format: delta+dynamic_vbp
  casc_block_size: 2048
"#;
    let mut cfg = TranslatorConfig::from_yaml_str(yaml).unwrap();
    assert_eq!(cfg.style, ProcessingStyle::Avx2);
    assert_eq!(cfg.family, OperatorFamily::VectorLib);
    assert!(cfg.use_between);
    assert_eq!(cfg.candidate_intersect, CandidateIntersect::Search);
    assert_eq!(cfg.unique_columns.len(), 2);
    assert_eq!(cfg.compr.strategy, Strategy::RuleBased);
    assert_eq!(cfg.compr.casc_block_size, 2048);
    assert!(!cfg.semi_join);
    assert!(cfg.validate().is_ok());

    std::env::set_var("MAL2MS_SEMI_JOIN", "yes");
    std::env::set_var("MAL2MS_UNIQUE_COLUMNS", "supplier.s_suppkey, ");
    cfg.apply_env();
    std::env::remove_var("MAL2MS_SEMI_JOIN");
    std::env::remove_var("MAL2MS_UNIQUE_COLUMNS");

    assert!(cfg.semi_join);
    assert_eq!(cfg.unique_columns.len(), 3);
    assert!(cfg.unique_columns.contains("supplier.s_suppkey"));
}

#[test]
fn test_inconsistent_configs_are_rejected() {
    let cfg = TranslatorConfig::from_yaml_str("compr:\n  rnd_format: static_vbp\n").unwrap();
    assert!(matches!(cfg.validate(), Err(Error::Config(_))));

    let cfg = TranslatorConfig::from_yaml_str("compr:\n  strategy: realbest\n").unwrap();
    assert!(matches!(
        Pipeline::new(cfg),
        Err(ExecError::Translate(Error::Config(_)))
    ));

    assert!(TranslatorConfig::from_yaml_str("style: mmx\n").is_err());
}

fn sizes_file(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("sizes.tsv");
    let rows = [
        ("t.a", "uncompr", 8000),
        ("t.a", "dynamic_vbp", 1200),
        ("t.a", "static_vbp_8", 1000),
        ("t.b", "uncompr", 8000),
        ("t.b", "delta+dynamic_vbp", 900),
        ("C_10", "uncompr", 80),
        ("C_10", "dynamic_vbp", 20),
    ];
    let mut text = String::from("[MEA]\ncolName\tformat\tsizeUsedByte\n");
    for (col, fmt, bytes) in rows {
        text.push_str(&format!("{col}\t{fmt}\t{bytes}\n"));
    }
    text.push_str("[RES]\nsome trailing output\n");
    fs::write(&path, text).unwrap();
    path
}

#[test]
fn test_measured_strategies_pick_extremes() {
    let dir = tempfile::tempdir().unwrap();
    let path = sizes_file(dir.path());

    let mut cfg = TranslatorConfig::default();
    cfg.compr.strategy = Strategy::RealBest;
    cfg.compr.sizes_file = Some(path);
    let best = Pipeline::new(cfg.clone()).unwrap().compile(&select_project_sum()).unwrap();
    let name = |c: &mal2ms_exec::Compiled, col: &str| c.assignment.get(col).unwrap().simple_name();
    assert_eq!(name(&best, "t.a"), "static_vbp_8");
    assert_eq!(name(&best, "t.b"), "delta+dynamic_vbp");
    assert_eq!(name(&best, "C_10"), "dynamic_vbp");
    // Result and aggregate outputs stay uncompressed without measurements.
    assert_eq!(name(&best, "X_11"), "uncompr");
    assert_eq!(name(&best, "X_12"), "uncompr");

    cfg.compr.strategy = Strategy::RealWorst;
    let worst = Pipeline::new(cfg).unwrap().compile(&select_project_sum()).unwrap();
    assert_eq!(name(&worst, "t.a"), "uncompr");
    assert_eq!(name(&worst, "C_10"), "uncompr");
    assert_eq!(worst.morphs_inserted, 0);
}

const TEMPLATE: &str = "// ##### mal2ms headers #####\n\
                        int main() {\n    \
                        // ##### mal2ms processingstyle #####\n    \
                        // ##### mal2ms prog #####\n    \
                        // ##### mal2ms result #####\n\
                        }\n";

#[test]
fn test_generated_program_from_custom_template() {
    let out = Pipeline::new(TranslatorConfig::default())
        .unwrap()
        .monitoring(true)
        .template(TEMPLATE.to_string())
        .run(&select_project_sum())
        .unwrap();
    let code = &out.code;

    assert!(code.contains("#include <core/operators/scalar/select_uncompr.h>"));
    assert!(code.contains("#include <core/utils/monitoring.h>"));
    assert!(code.contains("    using ps = scalar<v64<uint64_t>>;"));
    assert!(code.contains("    MONITOR_START_INTERVAL(\"query\")"));
    assert!(code.contains("    MONITOR_START_INTERVAL(\"select_0\")"));
    assert!(code.contains("    MONITOR_END_INTERVAL(\"project_1\")"));
    assert!(code.contains("    print_columns_csv({X_11});"));
    assert!(!code.contains("##### mal2ms"));

    // Headers are listed once, sorted.
    let includes: Vec<&str> = code.lines().filter(|l| l.starts_with("#include")).collect();
    let mut sorted = includes.clone();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(includes, sorted);

    assert_eq!(out.report.never_used, vec!["X_12"]);
    assert!(out.report.finished_ms >= out.report.started_ms);
}

#[test]
fn test_unknown_placeholder_fails() {
    let err = Pipeline::new(TranslatorConfig::default())
        .unwrap()
        .template("// ##### mal2ms footer #####\n".to_string())
        .run(&select_project_sum())
        .unwrap_err();
    assert!(err.to_string().contains("footer"));
}

#[test]
fn test_report_written_as_json() {
    let dir = tempfile::tempdir().unwrap();
    let out = Pipeline::new(TranslatorConfig::default())
        .unwrap()
        .run(&select_project_sum())
        .unwrap();
    let path = dir.path().join("report.json");
    fs::write(&path, out.report.to_json().unwrap()).unwrap();

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["nodes"], 3);
    assert_eq!(json["strategy"], "uncompr");
    assert_eq!(json["formats"]["t.a"], "uncompr");
    assert_eq!(json["result_cols"][0], "X_11");
}
