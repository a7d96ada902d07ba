#![forbid(unsafe_code)]
//! mal2ms-core: shared vocabulary of the MAL-to-MorphStore translator.
//!
//! - `ops`: the closed operator catalog (plan nodes with typed column slots)
//! - `format` / `style`: physical column formats and processing styles
//! - `result`: the `TranslationResult` handed from stage to stage
//! - `config`: translator/compression configuration (defaults, YAML, env)
//! - `stats`: value types for the external statistics/profile providers
//!
//! No MAL parsing and no file I/O beyond config loading lives here.

pub mod config;
pub mod error;
pub mod format;
pub mod hash;
pub mod ops;
pub mod prelude;
pub mod result;
pub mod stats;
pub mod style;

/// Crate version, recorded in run reports and generated file headers.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
