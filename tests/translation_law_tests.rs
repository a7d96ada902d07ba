//! Structural laws of the MAL translation.

mod common;

use common::{names, select_project_sum, single_table};
use mal2ms_analysis::verify::{assert_single_assignment, duplicate_outputs};
use mal2ms_core::config::TranslatorConfig;
use mal2ms_core::ops::Op;
use mal2ms_core::result::TranslationResult;
use mal2ms_translate::translate;

fn run(mal: &str) -> TranslationResult {
    translate(mal, &TranslatorConfig::default(), None).unwrap()
}

fn intersect_out(op: &Op) -> &str {
    match op {
        Op::Intersect { out_pos, .. } => &out_pos.col,
        other => panic!("expected an intersect, got {other:?}"),
    }
}

#[test]
fn test_range_select_without_candidates() {
    let tr = run(&single_table(
        &["X_20:bat[:oid] := algebra.select(X_8:bat[:int], 1:int, 3:int, true:bit, true:bit, false:bit);"],
        &["X_20"],
    ));
    assert_eq!(names(&tr), vec!["Select", "Select", "Intersect"]);
    let ops: Vec<&Op> = tr.ops().collect();
    assert_eq!(intersect_out(ops[2]), "X_20");
}

#[test]
fn test_range_select_with_full_oid_list_is_unrestricted() {
    let tr = run(&single_table(
        &["X_20:bat[:oid] := algebra.select(X_8:bat[:int], C_5:bat[:oid], 1:int, 3:int, true:bit, true:bit, false:bit);"],
        &["X_20"],
    ));
    assert_eq!(names(&tr), vec!["Select", "Select", "Intersect"]);
}

#[test]
fn test_range_select_with_candidates() {
    let tr = run(&single_table(
        &[
            "C_11:bat[:oid] := algebra.thetaselect(X_9:bat[:int], C_5:bat[:oid], 7:int, \"<\":str);",
            "X_20:bat[:oid] := algebra.select(X_8:bat[:int], C_11:bat[:oid], 1:int, 3:int, true:bit, true:bit, false:bit);",
        ],
        &["X_20"],
    ));
    assert_eq!(
        names(&tr),
        vec!["Select", "Select", "Select", "Intersect", "Intersect"]
    );
    let ops: Vec<&Op> = tr.ops().collect();
    assert_eq!(intersect_out(ops[3]), "X_20_0");
    match ops[4] {
        Op::Intersect {
            out_pos,
            in_pos_l,
            in_pos_r,
        } => {
            assert_eq!(out_pos.col, "X_20");
            assert_eq!(in_pos_l.col, "X_20_0");
            assert_eq!(in_pos_r.col, "C_11");
        }
        other => panic!("expected an intersect, got {other:?}"),
    }
}

/// Three chained selections providing position lists C_10, C_11, C_12.
const SELECTIONS: [&str; 3] = [
    "C_10:bat[:oid] := algebra.thetaselect(X_8:bat[:int], C_5:bat[:oid], 50:int, \"<\":str);",
    "C_11:bat[:oid] := algebra.thetaselect(X_8:bat[:int], C_5:bat[:oid], 40:int, \"<\":str);",
    "C_12:bat[:oid] := algebra.thetaselect(X_8:bat[:int], C_5:bat[:oid], 30:int, \"<\":str);",
];

fn projections(tr: &TranslationResult) -> Vec<(String, String, String)> {
    tr.ops()
        .filter_map(|op| match op {
            Op::Project {
                out_data,
                in_data,
                in_pos,
            } => Some((out_data.col.clone(), in_data.col.clone(), in_pos.col.clone())),
            _ => None,
        })
        .collect()
}

#[test]
fn test_projection_path_of_length_zero_is_an_alias() {
    let mut body = SELECTIONS.to_vec();
    body.push("X_20:bat[:int] := algebra.projection(C_5:bat[:oid], X_9:bat[:int]);");
    let tr = run(&single_table(&body, &["X_20"]));
    assert!(projections(&tr).is_empty());
    assert_eq!(tr.result_cols, vec!["t.b"]);
}

#[test]
fn test_projection_path_of_length_one() {
    let mut body = SELECTIONS.to_vec();
    body.push("X_20:bat[:int] := algebra.projection(C_10:bat[:oid], X_9:bat[:int]);");
    let tr = run(&single_table(&body, &["X_20"]));
    assert_eq!(
        projections(&tr),
        vec![("X_20".into(), "t.b".into(), "C_10".into())]
    );
}

#[test]
fn test_projection_path_of_length_three() {
    let mut body = SELECTIONS.to_vec();
    body.push(
        "X_20:bat[:int] := algebra.projectionpath(C_12:bat[:oid], C_11:bat[:oid], C_10:bat[:oid], X_9:bat[:int]);",
    );
    let tr = run(&single_table(&body, &["X_20"]));
    let projects = projections(&tr);
    assert_eq!(projects.len(), 3);
    // The position list closest to the data column is applied first.
    assert_eq!(projects[0], ("X_20_0".into(), "t.b".into(), "C_10".into()));
    assert_eq!(projects[1], ("X_20_1".into(), "X_20_0".into(), "C_11".into()));
    assert_eq!(projects[2], ("X_20".into(), "X_20_1".into(), "C_12".into()));
}

#[test]
fn test_full_oid_lists_drop_out_of_paths() {
    let mut body = SELECTIONS.to_vec();
    body.push(
        "X_20:bat[:int] := algebra.projectionpath(C_10:bat[:oid], C_5:bat[:oid], X_9:bat[:int]);",
    );
    let tr = run(&single_table(&body, &["X_20"]));
    assert_eq!(
        projections(&tr),
        vec![("X_20".into(), "t.b".into(), "C_10".into())]
    );
}

#[test]
fn test_single_static_assignment() {
    let programs = [
        select_project_sum(),
        single_table(
            &[
                "C_11:bat[:oid] := algebra.thetaselect(X_9:bat[:int], C_5:bat[:oid], 7:int, \"<\":str);",
                "X_20:bat[:oid] := algebra.select(X_8:bat[:int], C_11:bat[:oid], 1:int, 3:int, true:bit, true:bit, false:bit);",
                "X_21:bat[:int] := algebra.projectionpath(X_20:bat[:oid], C_11:bat[:oid], X_9:bat[:int]);",
            ],
            &["X_21"],
        ),
    ];
    for mal in &programs {
        let tr = run(mal);
        assert!(duplicate_outputs(&tr).is_empty());
        assert_single_assignment(&tr);
    }
}

#[test]
fn test_between_replaces_decomposition() {
    let cfg = TranslatorConfig {
        use_between: true,
        ..Default::default()
    };
    let mal = single_table(
        &[
            "C_11:bat[:oid] := algebra.thetaselect(X_9:bat[:int], C_5:bat[:oid], 7:int, \"<\":str);",
            "X_20:bat[:oid] := algebra.select(X_8:bat[:int], C_11:bat[:oid], 1:int, 3:int, true:bit, true:bit, false:bit);",
        ],
        &["X_20"],
    );
    let tr = translate(&mal, &cfg, None).unwrap();
    assert_eq!(names(&tr), vec!["Select", "Between", "Intersect"]);
}
