//! Calibration profiles: every `*.csv` file of a directory.

use std::path::{Path, PathBuf};

use mal2ms_core::stats::{CalibrationProfile, ProfileEntry};

use crate::error::{Error, Result};

/// Files with the given extension directly inside `dir`, sorted by name.
pub(crate) fn files_with_extension(dir: &Path, ext: &str) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|e| e == ext) {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}

/// Rows `format,bw,bits_per_value,compr_ns_per_value,decompr_ns_per_value`.
pub fn read_profile_file(path: &Path) -> Result<Vec<ProfileEntry>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)?;
    let mut out = Vec::new();
    for row in rdr.deserialize::<ProfileEntry>() {
        out.push(row?);
    }
    Ok(out)
}

pub fn read_profiles(dir: &Path) -> Result<CalibrationProfile> {
    let files = files_with_extension(dir, "csv")?;
    if files.is_empty() {
        return Err(Error::parse(dir, "no profile (*.csv) files found"));
    }
    let mut entries = Vec::new();
    for path in &files {
        entries.extend(read_profile_file(path)?);
    }
    #[cfg(feature = "tracing")]
    tracing::debug!(files = files.len(), entries = entries.len(), "loaded calibration profiles");
    Ok(CalibrationProfile::new(entries))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profiles_merge_all_csv_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("static_vbp.csv"),
            "format,bw,bits_per_value,compr_ns_per_value,decompr_ns_per_value\n\
             static_vbp,5,5.0,1.5,0.5\nstatic_vbp,6,6.0,1.4,0.5\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("uncompr.csv"),
            "format,bw,bits_per_value,compr_ns_per_value,decompr_ns_per_value\n\
             uncompr,5,64,0.3,0.3\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let p = read_profiles(dir.path()).unwrap();
        assert_eq!(p.len(), 3);
        assert_eq!(p.get("static_vbp", 6).map(|e| e.compr_ns_per_value), Some(1.4));
        assert_eq!(p.get("uncompr", 5).map(|e| e.bits_per_value), Some(64.0));
    }

    #[test]
    fn empty_profile_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(read_profiles(dir.path()), Err(Error::Parse { .. })));
    }
}
