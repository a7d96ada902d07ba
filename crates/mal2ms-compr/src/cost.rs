//! Calibration-driven cost model of the cost-based strategy.
//!
//! A column is described by its bit-width histogram. The memory objective
//! sums the profiled bits per value over the histogram. The performance
//! objective charges one compression for every non-base column and one
//! decompression per sequential read.

use mal2ms_core::config::Objective;
use mal2ms_core::format::{bw_choices, BitWidth, Format, NsFormat};
use mal2ms_core::stats::{CalibrationProfile, ColumnInfo};
use mal2ms_core::style::ProcessingStyle;

/// Figures of one format at one data bit width.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Figures {
    bits_per_value: f64,
    compr_ns: f64,
    decompr_ns: f64,
}

impl Figures {
    // Copying uncompressed data is not a (de)compression.
    const UNCOMPR_FALLBACK: Figures = Figures {
        bits_per_value: 64.0,
        compr_ns: 0.0,
        decompr_ns: 0.0,
    };
}

/// How often a column is written and read in the chosen format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccessCounts {
    pub compressions: u32,
    pub decompressions: u32,
}

pub struct CostModel<'a> {
    profile: &'a CalibrationProfile,
    objective: Objective,
}

impl<'a> CostModel<'a> {
    pub fn new(profile: &'a CalibrationProfile, objective: Objective) -> Self {
        Self { profile, objective }
    }

    /// Profile key of `fmt` for values of `data_bw` bits.
    ///
    /// static_vbp stores every value at its packing width, so it is looked up
    /// at that width irrespective of the data.
    fn key(fmt: &Format, data_bw: u8) -> (String, u8) {
        match fmt {
            Format::Ns(NsFormat::StaticVbp {
                bw: BitWidth::Fixed(n),
                ..
            }) => ("static_vbp".to_string(), *n),
            other => (other.simple_name(), data_bw),
        }
    }

    fn figures(&self, fmt: &Format, data_bw: u8) -> Option<Figures> {
        let (name, bw) = Self::key(fmt, data_bw);
        match self.profile.get(&name, bw) {
            Some(e) => Some(Figures {
                bits_per_value: e.bits_per_value,
                compr_ns: e.compr_ns_per_value,
                decompr_ns: e.decompr_ns_per_value,
            }),
            None if fmt.is_uncompr() => Some(Figures::UNCOMPR_FALLBACK),
            None => None,
        }
    }

    /// Cost of storing `info`'s values in `fmt`; `None` if some bit width of
    /// the histogram has not been profiled for `fmt`.
    pub fn cost(&self, fmt: &Format, info: &ColumnInfo, counts: AccessCounts) -> Option<f64> {
        let mut bits = 0.0;
        let mut compr = 0.0;
        let mut decompr = 0.0;
        for (bw, n) in info.histogram() {
            let f = self.figures(fmt, bw)?;
            let n = n as f64;
            bits += n * f.bits_per_value;
            compr += n * f.compr_ns;
            decompr += n * f.decompr_ns;
        }
        Some(match self.objective {
            Objective::Mem => bits,
            Objective::Perf => {
                f64::from(counts.compressions) * compr + f64::from(counts.decompressions) * decompr
            }
        })
    }

    /// Cheapest of `candidates`, the first one on ties.
    pub fn cheapest(
        &self,
        candidates: &[Format],
        info: &ColumnInfo,
        counts: AccessCounts,
    ) -> Option<(Format, f64)> {
        let mut best: Option<(Format, f64)> = None;
        for fmt in candidates {
            let Some(c) = self.cost(fmt, info, counts) else {
                continue;
            };
            if best.as_ref().map_or(true, |(_, b)| c < *b) {
                best = Some((*fmt, c));
            }
        }
        best
    }
}

/// Candidate formats for a column of `max_bw` bits: the catalog with
/// static_vbp expanded to its concrete width choices.
pub fn candidates(ps: ProcessingStyle, casc_block_size: u32, max_bw: u8, random_access: bool) -> Vec<Format> {
    let mut out = Vec::new();
    for fmt in Format::catalog(ps, casc_block_size) {
        if fmt.has_symbolic_bw() {
            out.extend(
                bw_choices(max_bw)
                    .into_iter()
                    .map(|bw| Format::static_vbp(ps, BitWidth::Fixed(bw))),
            );
        } else {
            out.push(fmt);
        }
    }
    if random_access {
        out.retain(Format::supports_random_access);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use mal2ms_core::stats::ProfileEntry;

    fn entry(format: &str, bw: u8, bits: f64, c: f64, d: f64) -> ProfileEntry {
        ProfileEntry {
            format: format.into(),
            bw,
            bits_per_value: bits,
            compr_ns_per_value: c,
            decompr_ns_per_value: d,
        }
    }

    fn profile() -> CalibrationProfile {
        let mut entries = vec![
            entry("static_vbp", 5, 5.0, 1.0, 1.0),
            entry("static_vbp", 6, 6.0, 0.9, 0.9),
            entry("static_vbp", 8, 8.0, 0.5, 0.5),
        ];
        for bw in 1..=64 {
            entries.push(entry("uncompr", bw, 64.0, 0.2, 0.2));
            entries.push(entry("dynamic_vbp", bw, f64::from(bw) + 1.0, 2.0, 2.0));
        }
        CalibrationProfile::new(entries)
    }

    #[test]
    fn candidate_expansion() {
        let c = candidates(ProcessingStyle::Scalar, 1024, 5, false);
        let names: Vec<String> = c.iter().map(Format::simple_name).collect();
        assert_eq!(
            names,
            vec![
                "uncompr",
                "static_vbp_5",
                "static_vbp_6",
                "static_vbp_8",
                "dynamic_vbp",
                "delta+dynamic_vbp",
                "for+dynamic_vbp"
            ]
        );
        let rnd = candidates(ProcessingStyle::Scalar, 1024, 5, true);
        assert!(rnd.iter().all(Format::supports_random_access));
        assert_eq!(rnd.len(), 4);
    }

    #[test]
    fn memory_objective_prefers_narrowest_packing() {
        let p = profile();
        let model = CostModel::new(&p, Objective::Mem);
        let info = ColumnInfo::uniform("t.a", 100, 5);
        let c = candidates(ProcessingStyle::Scalar, 1024, 5, false);
        let (fmt, cost) = model.cheapest(&c, &info, AccessCounts::default()).unwrap();
        assert_eq!(fmt.simple_name(), "static_vbp_5");
        assert_eq!(cost, 500.0);
    }

    #[test]
    fn performance_objective_weighs_access_counts() {
        let p = profile();
        let model = CostModel::new(&p, Objective::Perf);
        let info = ColumnInfo::uniform("X_3", 100, 5);
        let c = candidates(ProcessingStyle::Scalar, 1024, 5, false);
        let counts = AccessCounts {
            compressions: 1,
            decompressions: 3,
        };
        let (fmt, cost) = model.cheapest(&c, &info, counts).unwrap();
        assert_eq!(fmt, Format::Uncompr);
        assert!((cost - 80.0).abs() < 1e-9);

        // Without compressions or sequential reads every format is free; uncompr wins the tie.
        let (fmt, cost) = model.cheapest(&c, &info, AccessCounts::default()).unwrap();
        assert_eq!(fmt, Format::Uncompr);
        assert_eq!(cost, 0.0);
    }

    #[test]
    fn unprofiled_formats_are_skipped() {
        let p = CalibrationProfile::default();
        let model = CostModel::new(&p, Objective::Mem);
        let info = ColumnInfo::uniform("t.a", 10, 3);
        let c = candidates(ProcessingStyle::Scalar, 1024, 3, false);
        let (fmt, cost) = model.cheapest(&c, &info, AccessCounts::default()).unwrap();
        assert_eq!(fmt, Format::Uncompr);
        assert_eq!(cost, 640.0);
    }
}
