//! Name hashing
//!
//! Header names carry a 64-bit hash of the full name field so entries can be
//! compared without touching the name bytes. The hash is the first 8 bytes of
//! a SHA-256 digest read little-endian; collisions are possible and callers
//! must still compare names.

use sha2::{Digest, Sha256};

/// Deterministic 64-bit hash of `bytes`
pub fn name_hash(bytes: &[u8]) -> u64 {
    let digest = Sha256::digest(bytes);
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_deterministic() {
        assert_eq!(name_hash(b"test.txt"), name_hash(b"test.txt"));
    }

    #[test]
    fn test_hash_covers_trailing_bytes() {
        let mut a = [0u8; 24];
        let mut b = [0u8; 24];
        a[..4].copy_from_slice(b"file");
        b[..4].copy_from_slice(b"file");
        b[23] = 0x7F;
        assert_ne!(name_hash(&a), name_hash(&b));
    }
}
