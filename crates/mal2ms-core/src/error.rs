use thiserror::Error;

/// Canonical result for the translator crates.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A line that the parser automaton cannot accept in its current state.
    #[error("MAL structure error in state {state} at line {line_no}: '{line}'")]
    MalStructure {
        state: String,
        line_no: usize,
        line: String,
    },

    #[error("Could not parse the {role} string '{text}' in line {line_no}:\n{line}")]
    MalPatternMismatch {
        role: &'static str,
        text: String,
        line_no: usize,
        line: String,
    },

    #[error("unknown MAL function {module}.{function} in line {line_no}")]
    UnsupportedOperator {
        module: String,
        function: String,
        line_no: usize,
    },

    #[error("M:N join of '{left}' and '{right}' is not supported: neither input is known to be unique")]
    AmbiguousJoinCardinality { left: String, right: String },

    #[error("columns used before they are assigned: {}", .0.join(", "))]
    UseBeforeAssign(Vec<String>),

    #[error("input column '{col}' ({role}) of operator '{op}' must be unique")]
    NonUniqueInput {
        op: &'static str,
        role: &'static str,
        col: String,
    },

    #[error("input column '{col}' ({role}) of operator '{op}' must be sorted")]
    UnsortedInput {
        op: &'static str,
        role: &'static str,
        col: String,
    },

    #[error("operator '{op}' has no rule in the {pass} pass")]
    UnhandledOperatorKind { op: &'static str, pass: &'static str },

    #[error("the format of field '{role}' of operator number {node} ('{op}') has not been set")]
    IncompleteFormatAssignment {
        node: usize,
        op: &'static str,
        role: &'static str,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("unknown format: '{0}'")]
    UnknownFormat(String),

    #[error("maximum bit width of column '{0}' is unknown, cannot resolve a symbolic bit width")]
    MissingBitWidth(String),

    #[error("Hashing error: {0}")]
    Hash(String),

    // Core does not read data files; higher layers map their I/O errors here.
    #[error("I/O-like error (mapped into core): {0}")]
    IoLike(String),

    #[error("Internal invariant failed: {0}")]
    Invariant(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Hash(e.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::Config(e.to_string())
    }
}
