use std::path::{Path, PathBuf};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{}: {msg}", path.display())]
    Parse { path: PathBuf, msg: String },
}

impl Error {
    pub(crate) fn parse(path: &Path, msg: impl Into<String>) -> Self {
        Error::Parse {
            path: path.to_path_buf(),
            msg: msg.into(),
        }
    }
}

impl From<Error> for mal2ms_core::error::Error {
    fn from(e: Error) -> Self {
        mal2ms_core::error::Error::IoLike(e.to_string())
    }
}
