#![forbid(unsafe_code)]
//! mal2ms-analysis: forward data-flow analysis over a translated program.
//!
//! One pass over `base_morphs + prog + result_morphs` infers, per column:
//! uniqueness, sortedness, access class (sequential / random sorted /
//! random unsorted), number of sequential reads, maximum cardinality and
//! maximum bit width, and whether the column must stay uncompressed.
//! Use-before-assign and never-used columns are detected along the way.

pub mod analyze;
pub mod props;
pub mod transfer;
pub mod verify;

pub use analyze::{analyze, infer_uniqueness, AnalysisOptions};
pub use props::{AccessClass, AnalysisResult, ColumnProps};
