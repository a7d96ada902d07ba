//! Physical column formats.
//!
//! A `Format` is an immutable value compared structurally. Three names exist
//! for every format:
//! - the *simple name* used on the command line and in config files
//!   (`static_vbp_12`, `delta+dynamic_vbp`, ...),
//! - the *internal name*, the engine's template type (`static_vbp_f<vbp_l<12, 4> >`),
//! - the *short tag* appended to column names by morph insertion (`s12`).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::style::ProcessingStyle;

/// Default block size of cascades (in data elements).
pub const DEFAULT_CASC_BLOCK_SIZE: u32 = 1024;

/// How a still-symbolic bit width is fixed once the column's maximum bit width is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BitWidthRule {
    Exact,
    Even,
    Byte,
    PowerOfTwo,
}

impl BitWidthRule {
    pub fn apply(self, max_bw: u8) -> u8 {
        let bw = max_bw.clamp(1, 64);
        let out = match self {
            BitWidthRule::Exact => bw,
            BitWidthRule::Even => bw + bw % 2,
            BitWidthRule::Byte => bw.div_ceil(8) * 8,
            BitWidthRule::PowerOfTwo => bw.next_power_of_two(),
        };
        out.min(64)
    }

    fn suffix(self) -> &'static str {
        match self {
            BitWidthRule::Exact => "",
            BitWidthRule::Even => "_even",
            BitWidthRule::Byte => "_byte",
            BitWidthRule::PowerOfTwo => "_pot",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BitWidth {
    Fixed(u8),
    Symbolic(BitWidthRule),
}

/// Null-suppression formats, usable stand-alone or as the physical level of a cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NsFormat {
    StaticVbp {
        bw: BitWidth,
        step: u32,
    },
    DynamicVbp {
        block_size_log: u32,
        page_size_blocks: u32,
        step: u32,
    },
    KWiseNs {
        block_size_log: u32,
    },
}

/// Logical level of a cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    Delta,
    For,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Format {
    Uncompr,
    Ns(NsFormat),
    Cascade {
        transform: Transform,
        block_size: u32,
        /// Delta step or frame-of-reference page size, both one vector's element count.
        step: u32,
        inner: NsFormat,
    },
}

impl NsFormat {
    pub fn static_vbp(ps: ProcessingStyle, bw: BitWidth) -> Self {
        NsFormat::StaticVbp {
            bw,
            step: ps.vector_element_count(),
        }
    }

    pub fn dynamic_vbp(ps: ProcessingStyle) -> Self {
        NsFormat::DynamicVbp {
            block_size_log: ps.vector_size_bit(),
            page_size_blocks: ps.vector_size_byte(),
            step: ps.vector_element_count(),
        }
    }

    /// Only defined for the 128-bit SSE style.
    pub fn k_wise_ns(ps: ProcessingStyle) -> Result<Self> {
        if ps != ProcessingStyle::Sse {
            return Err(Error::Config(format!(
                "the format 'k_wise_ns_f' is only available for the processing style '{}'",
                ProcessingStyle::Sse
            )));
        }
        Ok(NsFormat::KWiseNs {
            block_size_log: ps.vector_element_count(),
        })
    }

    fn simple_name(&self) -> String {
        match self {
            NsFormat::StaticVbp { bw: BitWidth::Fixed(bw), .. } => format!("static_vbp_{bw}"),
            NsFormat::StaticVbp { bw: BitWidth::Symbolic(rule), .. } => {
                format!("static_vbp{}", rule.suffix())
            }
            NsFormat::DynamicVbp { .. } => "dynamic_vbp".to_string(),
            NsFormat::KWiseNs { .. } => "k_wise_ns".to_string(),
        }
    }

    fn internal_name(&self) -> String {
        match self {
            NsFormat::StaticVbp { bw, step } => match bw {
                BitWidth::Fixed(bw) => format!("static_vbp_f<vbp_l<{bw}, {step}> >"),
                BitWidth::Symbolic(_) => format!("static_vbp_f<vbp_l<bw, {step}> >"),
            },
            NsFormat::DynamicVbp {
                block_size_log,
                page_size_blocks,
                step,
            } => format!("dynamic_vbp_f<{block_size_log}, {page_size_blocks}, {step}>"),
            NsFormat::KWiseNs { block_size_log } => format!("k_wise_ns_f<{block_size_log}>"),
        }
    }

    fn short_tag(&self) -> String {
        match self {
            NsFormat::StaticVbp { bw: BitWidth::Fixed(bw), .. } => format!("s{bw}"),
            NsFormat::StaticVbp { bw: BitWidth::Symbolic(_), .. } => "sbw".to_string(),
            NsFormat::DynamicVbp { .. } => "d".to_string(),
            NsFormat::KWiseNs { .. } => "k".to_string(),
        }
    }

    fn headers(&self) -> &'static [&'static str] {
        match self {
            NsFormat::StaticVbp { .. } => &["core/morphing/static_vbp.h", "core/morphing/vbp.h"],
            NsFormat::DynamicVbp { .. } => &["core/morphing/dynamic_vbp.h"],
            NsFormat::KWiseNs { .. } => &["core/morphing/k_wise_ns.h"],
        }
    }
}

impl Format {
    pub fn static_vbp(ps: ProcessingStyle, bw: BitWidth) -> Self {
        Format::Ns(NsFormat::static_vbp(ps, bw))
    }

    pub fn dynamic_vbp(ps: ProcessingStyle) -> Self {
        Format::Ns(NsFormat::dynamic_vbp(ps))
    }

    pub fn cascade(ps: ProcessingStyle, transform: Transform, block_size: u32, inner: NsFormat) -> Self {
        Format::Cascade {
            transform,
            block_size,
            step: ps.vector_element_count(),
            inner,
        }
    }

    pub fn is_uncompr(&self) -> bool {
        matches!(self, Format::Uncompr)
    }

    /// Formats that allow reading a single element at an arbitrary position.
    pub fn supports_random_access(&self) -> bool {
        matches!(self, Format::Uncompr | Format::Ns(NsFormat::StaticVbp { .. }))
    }

    pub fn bit_width(&self) -> Option<BitWidth> {
        match self {
            Format::Ns(NsFormat::StaticVbp { bw, .. }) => Some(*bw),
            Format::Cascade {
                inner: NsFormat::StaticVbp { bw, .. },
                ..
            } => Some(*bw),
            _ => None,
        }
    }

    pub fn has_symbolic_bw(&self) -> bool {
        matches!(self.bit_width(), Some(BitWidth::Symbolic(_)))
    }

    /// Replace a symbolic bit width by a concrete one derived from `max_bw`.
    ///
    /// Formats without a bit-width parameter are returned unchanged. A fixed
    /// width narrower than `max_bw` would lose data and is rejected.
    pub fn resolve_bw(&self, max_bw: u8) -> Result<Format> {
        let fix = |bw: BitWidth, step: u32| -> Result<NsFormat> {
            let fixed = match bw {
                BitWidth::Symbolic(rule) => rule.apply(max_bw),
                BitWidth::Fixed(b) if b < max_bw => {
                    return Err(Error::Config(format!(
                        "bit width {b} is too small for values of {max_bw} bits"
                    )))
                }
                BitWidth::Fixed(b) => b,
            };
            Ok(NsFormat::StaticVbp {
                bw: BitWidth::Fixed(fixed),
                step,
            })
        };
        Ok(match *self {
            Format::Ns(NsFormat::StaticVbp { bw, step }) => Format::Ns(fix(bw, step)?),
            Format::Cascade {
                transform,
                block_size,
                step,
                inner: NsFormat::StaticVbp { bw, step: inner_step },
            } => Format::Cascade {
                transform,
                block_size,
                step,
                inner: fix(bw, inner_step)?,
            },
            other => other,
        })
    }

    pub fn simple_name(&self) -> String {
        match self {
            Format::Uncompr => "uncompr".to_string(),
            Format::Ns(ns) => ns.simple_name(),
            Format::Cascade { transform, inner, .. } => {
                format!("{}+{}", transform.simple_name(), inner.simple_name())
            }
        }
    }

    /// The engine's template type for this format.
    pub fn internal_name(&self) -> String {
        match self {
            Format::Uncompr => "uncompr_f".to_string(),
            Format::Ns(ns) => ns.internal_name(),
            Format::Cascade {
                transform,
                block_size,
                step,
                inner,
            } => format!(
                "{}<{}, {}, {} >",
                transform.internal_name(),
                block_size,
                step,
                inner.internal_name()
            ),
        }
    }

    pub fn short_tag(&self) -> String {
        match self {
            Format::Uncompr => "u".to_string(),
            Format::Ns(ns) => ns.short_tag(),
            Format::Cascade { transform, inner, .. } => {
                let t = match transform {
                    Transform::Delta => "d",
                    Transform::For => "f",
                };
                format!("{t}{}", inner.short_tag())
            }
        }
    }

    pub fn headers(&self) -> Vec<&'static str> {
        match self {
            Format::Uncompr => vec!["core/morphing/format.h", "core/morphing/uncompr.h"],
            Format::Ns(ns) => ns.headers().to_vec(),
            Format::Cascade { transform, inner, .. } => {
                let mut out = vec![transform.header()];
                out.extend_from_slice(inner.headers());
                out
            }
        }
    }

    /// Every format available for `ps`; static_vbp appears with a symbolic exact width.
    pub fn catalog(ps: ProcessingStyle, casc_block_size: u32) -> Vec<Format> {
        let mut dynamic = vec![NsFormat::dynamic_vbp(ps)];
        if let Ok(k) = NsFormat::k_wise_ns(ps) {
            dynamic.push(k);
        }
        let mut res = vec![
            Format::Uncompr,
            Format::static_vbp(ps, BitWidth::Symbolic(BitWidthRule::Exact)),
        ];
        res.extend(dynamic.iter().map(|ns| Format::Ns(*ns)));
        for ns in dynamic {
            res.push(Format::cascade(ps, Transform::Delta, casc_block_size, ns));
            res.push(Format::cascade(ps, Transform::For, casc_block_size, ns));
        }
        res
    }

    /// Look up a format by its simple name for the given processing style.
    ///
    /// Besides the catalog names, `static_vbp` accepts a bit-width suffix:
    /// `_even`, `_byte`, `_pot` (symbolic) or a literal width such as `_12`.
    pub fn by_name(name: &str, ps: ProcessingStyle, casc_block_size: u32) -> Result<Format> {
        let name = name.trim();
        if let Some(fmt) = Format::catalog(ps, casc_block_size)
            .into_iter()
            .find(|f| f.simple_name() == name)
        {
            return Ok(fmt);
        }
        if let Some(suffix) = name.strip_prefix("static_vbp_") {
            let bw = match suffix {
                "even" => BitWidth::Symbolic(BitWidthRule::Even),
                "byte" => BitWidth::Symbolic(BitWidthRule::Byte),
                "pot" => BitWidth::Symbolic(BitWidthRule::PowerOfTwo),
                lit => match lit.parse::<u8>() {
                    Ok(b) if (1..=64).contains(&b) => BitWidth::Fixed(b),
                    _ => return Err(Error::UnknownFormat(name.to_string())),
                },
            };
            return Ok(Format::static_vbp(ps, bw));
        }
        Err(Error::UnknownFormat(name.to_string()))
    }

    /// Simple names of all formats, as offered on the command line.
    pub fn all_simple_names() -> Vec<String> {
        // SSE is the only style offering every format.
        Format::catalog(ProcessingStyle::Sse, DEFAULT_CASC_BLOCK_SIZE)
            .iter()
            .map(Format::simple_name)
            .collect()
    }
}

impl Transform {
    fn simple_name(self) -> &'static str {
        match self {
            Transform::Delta => "delta",
            Transform::For => "for",
        }
    }

    fn internal_name(self) -> &'static str {
        match self {
            Transform::Delta => "delta_f",
            Transform::For => "for_f",
        }
    }

    fn header(self) -> &'static str {
        match self {
            Transform::Delta => "core/morphing/delta.h",
            Transform::For => "core/morphing/for.h",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.internal_name())
    }
}

/// Candidate static_vbp widths for a column of `max_bw` bits: the exact width,
/// the next even width, the next byte multiple and the next power of two.
/// 64 bits is never a candidate since it equals uncompressed storage.
pub fn bw_choices(max_bw: u8) -> Vec<u8> {
    let mut out: Vec<u8> = [
        BitWidthRule::Exact,
        BitWidthRule::Even,
        BitWidthRule::Byte,
        BitWidthRule::PowerOfTwo,
    ]
    .into_iter()
    .map(|r| r.apply(max_bw))
    .filter(|bw| *bw < 64)
    .collect();
    out.sort_unstable();
    out.dedup();
    out
}

/// Number of bits required to represent `value`; zero still needs one bit.
pub fn effective_bit_width(value: u64) -> u8 {
    (64 - value.leading_zeros()).max(1) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_of_static_vbp() {
        let f = Format::static_vbp(ProcessingStyle::Avx2, BitWidth::Fixed(12));
        assert_eq!(f.simple_name(), "static_vbp_12");
        assert_eq!(f.internal_name(), "static_vbp_f<vbp_l<12, 4> >");
        assert_eq!(f.short_tag(), "s12");
        assert!(f.supports_random_access());
    }

    #[test]
    fn cascade_internal_name() {
        let ps = ProcessingStyle::Sse;
        let f = Format::by_name("delta+dynamic_vbp", ps, 2048).unwrap();
        assert_eq!(
            f.internal_name(),
            "delta_f<2048, 2, dynamic_vbp_f<128, 16, 2> >"
        );
        assert_eq!(f.short_tag(), "dd");
        assert!(!f.supports_random_access());
        assert_eq!(f.headers()[0], "core/morphing/delta.h");
    }

    #[test]
    fn k_wise_only_for_sse() {
        assert!(Format::by_name("k_wise_ns", ProcessingStyle::Sse, 1024).is_ok());
        assert!(Format::by_name("k_wise_ns", ProcessingStyle::Avx2, 1024).is_err());
        assert!(Format::all_simple_names().contains(&"for+k_wise_ns".to_string()));
    }

    #[test]
    fn symbolic_widths_resolve() {
        let ps = ProcessingStyle::Scalar;
        let cases = [
            ("static_vbp", 13, 13),
            ("static_vbp_even", 13, 14),
            ("static_vbp_byte", 13, 16),
            ("static_vbp_byte", 16, 16),
            ("static_vbp_pot", 13, 16),
            ("static_vbp_pot", 33, 64),
        ];
        for (name, max_bw, want) in cases {
            let f = Format::by_name(name, ps, 1024).unwrap();
            assert!(f.has_symbolic_bw());
            let r = f.resolve_bw(max_bw).unwrap();
            assert_eq!(r.bit_width(), Some(BitWidth::Fixed(want)), "{name} @ {max_bw}");
        }
    }

    #[test]
    fn literal_width_too_small_is_rejected() {
        let f = Format::by_name("static_vbp_8", ProcessingStyle::Scalar, 1024).unwrap();
        assert!(f.resolve_bw(9).is_err());
        assert_eq!(f.resolve_bw(8).unwrap(), f);
    }

    #[test]
    fn simple_names_round_trip_through_lookup() {
        let ps = ProcessingStyle::Sse;
        for f in Format::catalog(ps, 1024) {
            assert_eq!(Format::by_name(&f.simple_name(), ps, 1024).unwrap(), f);
        }
        assert!(Format::by_name("rle", ps, 1024).is_err());
    }

    #[test]
    fn bw_choice_candidates() {
        assert_eq!(bw_choices(5), vec![5, 6, 8]);
        assert_eq!(bw_choices(17), vec![17, 18, 24, 32]);
        assert!(bw_choices(64).is_empty());
        assert_eq!(effective_bit_width(0), 1);
        assert_eq!(effective_bit_width(255), 8);
        assert_eq!(effective_bit_width(256), 9);
    }
}
