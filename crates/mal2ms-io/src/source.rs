use std::io::Read;
use std::path::Path;

use crate::error::Result;

/// Marker for reading the MAL program from stdin.
pub const FROM_STDIN: &str = "-";

/// Read a MAL program from `path`, or from stdin for `-`.
pub fn read_mal(path: &str) -> Result<String> {
    if path == FROM_STDIN {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        return Ok(text);
    }
    Ok(std::fs::read_to_string(Path::new(path))?)
}
