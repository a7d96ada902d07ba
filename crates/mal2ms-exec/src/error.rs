use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExecError>;

#[derive(Debug, Error)]
pub enum ExecError {
    /// Any failure of translation, analysis, format selection or generation.
    #[error(transparent)]
    Translate(#[from] mal2ms_core::error::Error),

    /// A provider file could not be read.
    #[error("reading inputs: {0}")]
    Input(#[from] mal2ms_io::Error),

    #[error("writing report: {0}")]
    Report(#[from] serde_json::Error),
}
