#![forbid(unsafe_code)]
//! mal2ms-exec: runs the whole translator on one MAL program.
//!
//! `Pipeline` owns the config and everything read from the provider files,
//! and drives translation, analysis, format selection, morph insertion and
//! code generation. Every run yields a `RunReport` fingerprinted with the
//! hash of the final translation result.

pub mod error;
pub mod pipeline;
pub mod report;

pub use error::{ExecError, Result};
pub use pipeline::{Compiled, Inputs, Output, Pipeline};
pub use report::RunReport;
