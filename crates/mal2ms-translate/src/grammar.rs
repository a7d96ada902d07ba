//! Regular expressions for the MAL dialect of MonetDB 11.31.
//!
//! All statement-level patterns are anchored at both ends, i.e. they must
//! match the whole result or parameter string.

use once_cell::sync::Lazy;
use regex::Regex;

/// MAL's integer types. A `batcalc`/`calc` function of one of these names is a cast.
pub const MAL_INT_TYPES: [&str; 6] = ["bit", "byte", "sht", "int", "lng", "hge"];

/// Marker of the comment lines before the query function.
pub const PROLOGUE_COMMENT: char = '%';
/// Marker of the comment lines after the query function.
pub const EPILOGUE_COMMENT: char = '#';
pub const FUNCTION_HEADER: &str = "function user.";
pub const FUNCTION_FOOTER: &str = "end user.";

fn anchored(pattern: &str) -> Regex {
    // The patterns are fixed at compile time, so a failure here is a bug
    // caught by the tests of this module.
    match Regex::new(&format!("^(?:{pattern})$")) {
        Ok(re) => re,
        Err(e) => panic!("invalid MAL grammar pattern {pattern:?}: {e}"),
    }
}

fn prefix(pattern: &str) -> Regex {
    match Regex::new(&format!("^(?:{pattern})")) {
        Ok(re) => re,
        Err(e) => panic!("invalid MAL grammar pattern {pattern:?}: {e}"),
    }
}

const RES1: &str = r"([XC]_\d+):bat\[:(?:.+?)\]";

// --- statement structure ---

pub static ASSIGNMENT: Lazy<Regex> = Lazy::new(|| anchored(r"(.+?) := (.+?)\.(.+?)\((.*?)\);"));

pub static RESULT_SET: Lazy<Regex> = Lazy::new(|| {
    anchored(
        r"sql.resultSet\(.+?:.+?, .+?:.+?, .+?:.+?, .+?:.+?, .+?:.+?(?:, \d+:int)?((?:, X_\d+:.+?)+)\);",
    )
});

/// One exposed column at the start of the remaining result-set list.
pub static RESULT_SET_INNER: Lazy<Regex> = Lazy::new(|| {
    prefix(&format!(
        r", (X_\d+):(?:{}|bat\[.+?\])",
        MAL_INT_TYPES.join("|")
    ))
});

// --- results ---

pub static RES_SCALAR: Lazy<Regex> = Lazy::new(|| anchored(r"(X_\d+):(?:.+?)"));
pub static RES_1: Lazy<Regex> = Lazy::new(|| anchored(RES1));
pub static RES_2: Lazy<Regex> = Lazy::new(|| anchored(&format!(r"\({RES1}, {RES1}\)")));
pub static RES_3: Lazy<Regex> = Lazy::new(|| anchored(&format!(r"\({RES1}, {RES1}, {RES1}\)")));

// --- parameters ---

pub static PAR_AGGR_SUBSUM: Lazy<Regex> = Lazy::new(|| {
    anchored(r"(X_\d+):bat\[:(?:.+?)\], (X_\d+):bat\[:oid\], (C_\d+):bat\[:oid\], true:bit, true:bit")
});

pub static PAR_AGGR_SUM: Lazy<Regex> = Lazy::new(|| anchored(r"(X_\d+):bat\[:(?:.+?)\]"));

pub static PAR_ALGEBRA_JOIN: Lazy<Regex> = Lazy::new(|| {
    anchored(r"(X_\d+):bat\[:(?:.+?)\], (X_\d+):bat\[:(?:.+?)\], nil:BAT, nil:BAT, false:bit, nil:lng")
});

pub static PAR_PROJECTIONPATH: Lazy<Regex> =
    Lazy::new(|| anchored(r"((?:[XC]_\d+:bat\[:oid\], )+)(X_\d+):bat\[:(?:.+?)\]"));

/// One position list at the start of the remaining projection path.
pub static PAR_PROJECTIONPATH_INNER: Lazy<Regex> = Lazy::new(|| prefix(r"([XC]_\d+):bat\[:oid\], "));

pub static PAR_ALGEBRA_SELECT: Lazy<Regex> = Lazy::new(|| {
    anchored(
        r"([XC]_\d+):bat\[:(?:.+?)\], (?:(C_\d+):bat\[:oid\], )?(\d+):(?:.+?), (\d+):(?:.+?), true:bit, true:bit, false:bit",
    )
});

pub static PAR_THETASELECT: Lazy<Regex> = Lazy::new(|| {
    anchored(r#"(X_\d+):bat\[:(?:.+?)\], (?:(C_\d+):bat\[:oid\], )?(\d+):(?:.+?), "(<|<=|==|>=|>)":str"#)
});

pub static PAR_MERGECAND: Lazy<Regex> = Lazy::new(|| anchored(r"(C_\d+):bat\[:oid\], (C_\d+):bat\[:oid\]"));

pub static PAR_BATCALC_UNARY: Lazy<Regex> = Lazy::new(|| anchored(r"(X_\d+):bat\[:(?:.+?)\]"));

pub static PAR_BATCALC_BINARY: Lazy<Regex> =
    Lazy::new(|| anchored(r"(X_\d+):bat\[:(?:.+?)\], (X_\d+):bat\[:(?:.+?)\]"));

pub static PAR_CALC_UNARY: Lazy<Regex> = Lazy::new(|| anchored(r"(X_\d+):(?:.+?)"));

pub static PAR_GROUP_GROUP: Lazy<Regex> = Lazy::new(|| anchored(r"(X_\d+):bat\[:(?:.+?)\]"));

// The first type is left unterminated in the reference dialect's pattern;
// the lazy group absorbs the closing bracket.
pub static PAR_GROUP_SUBGROUP: Lazy<Regex> =
    Lazy::new(|| anchored(r"(X_\d+):bat\[:(?:.+?), (X_\d+):bat\[:(?:.+?)\]"));

pub static PAR_SQL_BIND: Lazy<Regex> =
    Lazy::new(|| anchored(r#"X_\d+:int, ".+?":str, "(.+?)":str, "(.+?)":str, 0:int"#));

/// Repeatedly match `inner` at the start of `text`, returning capture group 1
/// of each match. Stops at the first position where `inner` does not match.
pub fn leading_captures<'t>(inner: &Regex, mut text: &'t str) -> Vec<&'t str> {
    let mut out = Vec::new();
    while let Some(caps) = inner.captures(text) {
        let (Some(whole), Some(g1)) = (caps.get(0), caps.get(1)) else {
            break;
        };
        if whole.end() == 0 {
            break;
        }
        out.push(g1.as_str());
        text = &text[whole.end()..];
    }
    out
}
