#![forbid(unsafe_code)]
//! mal2ms-compr: physical formats for a translated program.
//!
//! - `select`: one format per column under the configured strategy
//! - `cost`: the calibration-driven cost model of the cost-based strategy
//! - `validate`: every format slot is filled with a concrete format
//! - `morph`: morphs wherever a consumer needs another representation
//!
//! Selection writes formats into the node slots; morph insertion then
//! rewrites the node sequence and re-partitions the morphs.

pub mod cost;
pub mod morph;
pub mod select;
pub mod validate;

pub use morph::{insert_morphs, morph_name};
pub use select::{apply_formats, choose_formats, select_formats, Assignment, SelectionInputs};
pub use validate::validate_formats;
