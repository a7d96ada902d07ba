//! Base-column statistics: one `<table>.json` per table.

use std::path::Path;

use mal2ms_core::stats::{BaseStats, TableStats};

use crate::error::{Error, Result};
use crate::profile::files_with_extension;

pub fn read_table_stats(path: &Path) -> Result<TableStats> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

pub fn read_stats_dir(dir: &Path) -> Result<BaseStats> {
    let mut stats = BaseStats::default();
    for path in files_with_extension(dir, "json")? {
        let table = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| Error::parse(&path, "file name is not a table name"))?
            .to_string();
        let ts = read_table_stats(&path)?;
        stats.tables.insert(table, ts);
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_every_table() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("date.json"),
            r#"{"row_count": 2556, "columns": {"d_datekey": {"max": 19981230, "unique": true, "sorted": true}}}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("lineorder.json"),
            r#"{"row_count": 6001171, "columns": {"lo_quantity": {"max": 50}}}"#,
        )
        .unwrap();
        let stats = read_stats_dir(dir.path()).unwrap();
        assert_eq!(stats.row_count("lineorder"), Some(6001171));
        let (_, d) = stats.column("date.d_datekey").unwrap();
        assert!(d.unique && d.sorted);
        let (_, q) = stats.column("lineorder.lo_quantity").unwrap();
        assert_eq!(q.max, 50);
        assert!(!q.unique);
    }

    #[test]
    fn malformed_json_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("t.json"), "{ not json").unwrap();
        assert!(matches!(read_stats_dir(dir.path()), Err(Error::Json(_))));
    }
}
