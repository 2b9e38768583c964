//! Checksum utilities for artifact provenance

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 digest of an in-memory buffer
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
