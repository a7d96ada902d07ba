//! Placeholder substitution in C++ program templates.
//!
//! A placeholder is a line of the form `// ##### mal2ms <name> #####` at any
//! indentation. It is replaced by the generated lines for `<name>`, each
//! prefixed with the placeholder's indentation. All other lines are copied.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;

use mal2ms_core::error::{Error, Result};

/// Template used when the caller brings none.
pub const DEFAULT_TEMPLATE: &str = include_str!("../templates/query.cpp");

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    match Regex::new(r"^(\s*)// ##### mal2ms (.+?) #####\s*$") {
        Ok(re) => re,
        Err(e) => panic!("invalid placeholder pattern: {e}"),
    }
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    Docu,
    Headers,
    ProcessingStyle,
    Schema,
    DataLoad,
    Prog,
    Result,
    Analysis,
}

impl Placeholder {
    pub const ALL: [Placeholder; 8] = [
        Placeholder::Docu,
        Placeholder::Headers,
        Placeholder::ProcessingStyle,
        Placeholder::Schema,
        Placeholder::DataLoad,
        Placeholder::Prog,
        Placeholder::Result,
        Placeholder::Analysis,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Placeholder::Docu => "docu",
            Placeholder::Headers => "headers",
            Placeholder::ProcessingStyle => "processingstyle",
            Placeholder::Schema => "schema",
            Placeholder::DataLoad => "dataload",
            Placeholder::Prog => "prog",
            Placeholder::Result => "result",
            Placeholder::Analysis => "analysis",
        }
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Placeholder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Placeholder::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| Error::Config(format!("unknown placeholder in C++ template file: {s}")))
    }
}

/// The placeholder on `line` and its indentation, if any.
pub fn placeholder(line: &str) -> Option<Result<(&str, Placeholder)>> {
    let caps = PLACEHOLDER.captures(line)?;
    let indent = caps.get(1).map_or("", |m| m.as_str());
    let name = caps.get(2).map_or("", |m| m.as_str());
    Some(name.parse().map(|ph| (indent, ph)))
}

/// Copy `template`, replacing each placeholder line by the lines `fill` yields.
///
/// Blank generated lines are emitted without indentation.
pub fn substitute<F>(template: &str, mut fill: F) -> Result<String>
where
    F: FnMut(Placeholder) -> Result<Vec<String>>,
{
    let mut out = String::with_capacity(template.len() * 2);
    for line in template.lines() {
        let line = line.trim_end();
        match placeholder(line) {
            None => {
                out.push_str(line);
                out.push('\n');
            }
            Some(found) => {
                let (indent, ph) = found?;
                for generated in fill(ph)? {
                    for part in generated.split('\n') {
                        if !part.is_empty() {
                            out.push_str(indent);
                            out.push_str(part);
                        }
                        out.push('\n');
                    }
                }
            }
        }
    }
    Ok(out)
}
