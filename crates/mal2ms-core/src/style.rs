//! Processing styles: which vector extension the generated operators run on.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Vector extension (and register width) used by every operator of a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStyle {
    Scalar,
    Sse,
    Avx2,
    Avx512,
    Neon,
}

/// Which family of operator implementations the program is compiled against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OperatorFamily {
    /// Hand-written per-extension operators (`core/operators/{scalar,vectorized}`).
    #[default]
    Handcoded,
    /// Operators written against the vector library (`general_vectorized`).
    VectorLib,
}

impl ProcessingStyle {
    pub const ALL: [ProcessingStyle; 5] = [
        ProcessingStyle::Scalar,
        ProcessingStyle::Sse,
        ProcessingStyle::Avx2,
        ProcessingStyle::Avx512,
        ProcessingStyle::Neon,
    ];

    /// Template argument naming this style in generated code.
    pub fn cpp_name(self) -> &'static str {
        match self {
            ProcessingStyle::Scalar => "scalar<v64<uint64_t>>",
            ProcessingStyle::Sse => "sse<v128<uint64_t>>",
            ProcessingStyle::Avx2 => "avx2<v256<uint64_t>>",
            ProcessingStyle::Avx512 => "avx512<v512<uint64_t>>",
            ProcessingStyle::Neon => "neon<v128<uint64_t>>",
        }
    }

    pub fn vector_size_bit(self) -> u32 {
        match self {
            ProcessingStyle::Scalar => 64,
            ProcessingStyle::Sse | ProcessingStyle::Neon => 128,
            ProcessingStyle::Avx2 => 256,
            ProcessingStyle::Avx512 => 512,
        }
    }

    pub fn vector_size_byte(self) -> u32 {
        self.vector_size_bit() / 8
    }

    /// Number of 64-bit elements per vector register.
    pub fn vector_element_count(self) -> u32 {
        self.vector_size_bit() / 64
    }

    /// Subdirectory of the engine's operator includes for this style.
    pub fn include_dir(self, family: OperatorFamily) -> &'static str {
        match (family, self) {
            (OperatorFamily::VectorLib, _) => "general_vectorized",
            (OperatorFamily::Handcoded, ProcessingStyle::Scalar) => "scalar",
            (OperatorFamily::Handcoded, _) => "vectorized",
        }
    }
}

impl fmt::Display for ProcessingStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cpp_name())
    }
}

impl FromStr for ProcessingStyle {
    type Err = Error;

    /// Accepts the short lowercase name or the full template argument.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        ProcessingStyle::ALL
            .into_iter()
            .find(|ps| s == ps.cpp_name() || s.eq_ignore_ascii_case(ps.short_name()))
            .ok_or_else(|| Error::Config(format!("unknown processing style '{s}'")))
    }
}

impl ProcessingStyle {
    pub fn short_name(self) -> &'static str {
        match self {
            ProcessingStyle::Scalar => "scalar",
            ProcessingStyle::Sse => "sse",
            ProcessingStyle::Avx2 => "avx2",
            ProcessingStyle::Avx512 => "avx512",
            ProcessingStyle::Neon => "neon",
        }
    }
}

impl FromStr for OperatorFamily {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" | "handcoded" => Ok(OperatorFamily::Handcoded),
            "2" | "vector_lib" | "vectorlib" => Ok(OperatorFamily::VectorLib),
            other => Err(Error::Config(format!("unknown operator family '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widths_follow_register_size() {
        assert_eq!(ProcessingStyle::Scalar.vector_element_count(), 1);
        assert_eq!(ProcessingStyle::Sse.vector_size_byte(), 16);
        assert_eq!(ProcessingStyle::Avx512.vector_element_count(), 8);
    }

    #[test]
    fn parses_short_and_full_names() {
        assert_eq!("avx2".parse::<ProcessingStyle>().unwrap(), ProcessingStyle::Avx2);
        assert_eq!(
            "sse<v128<uint64_t>>".parse::<ProcessingStyle>().unwrap(),
            ProcessingStyle::Sse
        );
        assert!("mmx".parse::<ProcessingStyle>().is_err());
    }

    #[test]
    fn include_dirs() {
        assert_eq!(ProcessingStyle::Scalar.include_dir(OperatorFamily::Handcoded), "scalar");
        assert_eq!(ProcessingStyle::Neon.include_dir(OperatorFamily::Handcoded), "vectorized");
        assert_eq!(
            ProcessingStyle::Scalar.include_dir(OperatorFamily::VectorLib),
            "general_vectorized"
        );
    }
}
