//! Convenient re-exports for downstream crates.

pub use crate::config::{CandidateIntersect, ComprConfig, Objective, Strategy, TranslatorConfig};
pub use crate::error::{Error, Result};
pub use crate::format::{BitWidth, BitWidthRule, Format, NsFormat, Transform};
pub use crate::ops::{ArithOp, CmpOp, Op, Role, Slot, Stmt};
pub use crate::result::{BaseColumn, Limitation, TranslationResult};
pub use crate::stats::{BaseStats, ColumnInfo, SizeMeasurements};
pub use crate::style::{OperatorFamily, ProcessingStyle};
