//! SHA-256 helpers for node identities and profile content hashes.

use sha2::{Digest, Sha256};

/// Compute SHA-256 and return lowercase hex string.
pub fn sha256_hex(data: impl AsRef<[u8]>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.as_ref());
    hex::encode(hasher.finalize())
}

/// Short prefix form useful for logging (first 12 hex chars).
pub fn short_hash(hash: &str) -> &str {
    hash.get(0..12).unwrap_or(hash)
}
