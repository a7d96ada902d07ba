#![forbid(unsafe_code)]
//! mal2ms-io: readers for everything the translator consumes besides its config.
//!
//! - MAL programs (file or stdin)
//! - base statistics (`<table>.json` per table)
//! - column infos, measured sizes and manual formats (tab-separated, optionally
//!   inside a `[MEA]`/`[RES]` section)
//! - calibration profiles (`*.csv` in a directory)

pub mod error;
pub mod profile;
pub mod source;
pub mod stats;
pub mod tsv;

pub use error::{Error, Result};
pub use profile::read_profiles;
pub use source::{read_mal, FROM_STDIN};
pub use stats::read_stats_dir;
pub use tsv::{read_col_infos, read_manual_formats, read_sizes};
