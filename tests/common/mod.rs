//! Shared MAL fixtures for the integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::Path;

use mal2ms_core::ops::Op;
use mal2ms_core::result::TranslationResult;

/// A MAL program in the shape MonetDB's `EXPLAIN` prints.
///
/// `binds` lists `(variable, table, column, type)`; `C_5` is the oid list
/// of the first bound table.
pub fn mal_program(binds: &[(&str, &str, &str, &str)], body: &[&str], results: &[&str]) -> String {
    let mut out = String::from(
        "% .explain # table_name\n% mal # name\n% clob # type\n% 0 # length\nfunction user.s4_1():void;\n",
    );
    out.push_str("    X_4:int := sql.mvc();\n");
    if let Some((_, table, _, _)) = binds.first() {
        out.push_str(&format!(
            "    C_5:bat[:oid] := sql.tid(X_4:int, \"sys\":str, \"{table}\":str);\n"
        ));
    }
    for (var, table, col, ty) in binds {
        out.push_str(&format!(
            "    {var}:bat[:{ty}] := sql.bind(X_4:int, \"sys\":str, \"{table}\":str, \"{col}\":str, 0:int);\n"
        ));
    }
    for line in body {
        out.push_str("    ");
        out.push_str(line);
        out.push('\n');
    }
    let exposed: String = results.iter().map(|r| format!(", {r}:bat[:int]")).collect();
    out.push_str(&format!(
        "    sql.resultSet(X_31:bat[:str], X_32:bat[:str], X_33:bat[:str], X_34:bat[:int], X_35:bat[:int]{exposed});\n"
    ));
    out.push_str("end user.s4_1;\n# optimizer.mitosis()\n");
    out
}

/// Table `t` with int columns `a` (X_8) and `b` (X_9).
pub fn single_table(body: &[&str], results: &[&str]) -> String {
    mal_program(
        &[("X_8", "t", "a", "int"), ("X_9", "t", "b", "int")],
        body,
        results,
    )
}

/// Select on `t.a`, projection of `t.b`, sum of the projection.
pub fn select_project_sum() -> String {
    single_table(
        &[
            "C_10:bat[:oid] := algebra.thetaselect(X_8:bat[:int], C_5:bat[:oid], 5:int, \"<\":str);",
            "X_11:bat[:int] := algebra.projection(C_10:bat[:oid], X_9:bat[:int]);",
            "X_12:lng := aggr.sum(X_11:bat[:int]);",
        ],
        &["X_11"],
    )
}

/// Names of all nodes in data-flow order.
pub fn names(tr: &TranslationResult) -> Vec<&'static str> {
    tr.ops().map(Op::name).collect()
}

/// Write `t.json` with `row_count` rows and the given `(column, max)` pairs.
pub fn write_stats(dir: &Path, table: &str, row_count: u64, cols: &[(&str, u64, bool, bool)]) {
    let columns: Vec<String> = cols
        .iter()
        .map(|(c, max, unique, sorted)| {
            format!("\"{c}\": {{\"max\": {max}, \"unique\": {unique}, \"sorted\": {sorted}}}")
        })
        .collect();
    let json = format!(
        "{{\"row_count\": {row_count}, \"columns\": {{{}}}}}",
        columns.join(", ")
    );
    fs::write(dir.join(format!("{table}.json")), json).unwrap();
}
