//! Stable hashing of translation results, used to fingerprint generated programs.

use blake3::Hasher;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    pub fn to_hex(&self) -> String {
        // blake3 hex(32b) is 64 hex chars
        let mut s = String::with_capacity(64);
        for b in &self.0 {
            use std::fmt::Write as _;
            let _ = write!(&mut s, "{:02x}", b);
        }
        s
    }

    /// First 12 hex chars, enough to tell programs apart in a comment.
    pub fn short(&self) -> String {
        self.to_hex()[..12].to_string()
    }
}

impl std::fmt::Display for Hash256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

pub fn hash_bytes(bytes: &[u8]) -> Hash256 {
    let mut h = Hasher::new();
    h.update(bytes);
    Hash256(h.finalize().into())
}

pub fn hash_str(s: &str) -> Hash256 {
    hash_bytes(s.as_bytes())
}

/// Hash any serde-serializable value deterministically (via JSON).
pub fn hash_serde<T: Serialize>(v: &T) -> Result<Hash256, crate::error::Error> {
    let bytes = serde_json::to_vec(v).map_err(|e| crate::error::Error::Hash(e.to_string()))?;
    Ok(hash_bytes(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::TranslationResult;

    #[test]
    fn equal_results_hash_equal() {
        let a = TranslationResult::default();
        let mut b = TranslationResult::default();
        assert_eq!(hash_serde(&a).unwrap(), hash_serde(&b).unwrap());
        b.result_cols.push("X_1".into());
        assert_ne!(hash_serde(&a).unwrap(), hash_serde(&b).unwrap());
    }

    #[test]
    fn hex_rendering() {
        let h = hash_str("mal");
        assert_eq!(h.to_hex().len(), 64);
        assert_eq!(h.short().len(), 12);
        assert!(h.to_hex().starts_with(&h.short()));
    }
}
