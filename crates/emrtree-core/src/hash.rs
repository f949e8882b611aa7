//! Content-hash type and caller-side hashing helpers.
//!
//! The ledger treats hashes as opaque 32-byte link values: it never hashes
//! record content itself, only validates that a supplied hash is non-zero.
//! [`RecordHasher`] exists for the caller layer, which must derive a unique
//! content hash for every record it submits.

use serde::Serializer;

/// Size of a content hash in bytes.
pub const HASH_SIZE: usize = 32;

/// Type alias for a 32-byte hash.
pub type Hash = [u8; HASH_SIZE];

/// The zero sentinel: `prev_hash` of every branch root, and the one value
/// rejected as a `content_hash`.
pub const ZERO_HASH: Hash = [0u8; HASH_SIZE];

/// Returns true if the hash is the all-zero sentinel.
#[must_use]
pub fn is_zero(hash: &Hash) -> bool {
    hash.iter().all(|b| *b == 0)
}

/// Blake3 hasher for the caller layer.
///
/// Record hashes must differ for semantically different records even when
/// their metadata text is identical, so the caller mixes a nonce (typically
/// the submission timestamp) into the digest.
pub struct RecordHasher;

impl RecordHasher {
    /// Derives a content hash from record metadata and a caller-chosen
    /// nonce.
    ///
    /// The hash is computed over: `nonce || metadata`.
    #[must_use]
    pub fn hash_record(metadata: &str, nonce: u64) -> Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&nonce.to_le_bytes());
        hasher.update(metadata.as_bytes());
        *hasher.finalize().as_bytes()
    }

    /// Hashes raw content without a nonce.
    #[must_use]
    pub fn hash_content(content: &[u8]) -> Hash {
        *blake3::hash(content).as_bytes()
    }
}

/// Serde helper: serializes a hash as a lowercase hex string.
///
/// # Errors
///
/// Propagates serializer errors.
pub fn serialize_hex<S>(hash: &Hash, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&hex::encode(hash))
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_zero_sentinel() {
        assert!(is_zero(&ZERO_HASH));

        let mut hash = ZERO_HASH;
        hash[31] = 1;
        assert!(!is_zero(&hash));
    }

    #[test]
    fn test_hash_record_deterministic() {
        let hash = RecordHasher::hash_record("Visit 1", 42);
        assert_eq!(hash.len(), HASH_SIZE);

        // Same inputs should produce same hash
        let hash2 = RecordHasher::hash_record("Visit 1", 42);
        assert_eq!(hash, hash2);
    }

    #[test]
    fn test_hash_record_nonce_distinguishes() {
        // Identical metadata, different nonces: different hashes
        let hash1 = RecordHasher::hash_record("Visit 1", 1);
        let hash2 = RecordHasher::hash_record("Visit 1", 2);
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_hash_record_never_zero() {
        let hash = RecordHasher::hash_record("", 0);
        assert!(!is_zero(&hash));
    }

    #[test]
    fn test_hash_content() {
        let hash = RecordHasher::hash_content(b"hello world");
        assert_eq!(hash, RecordHasher::hash_content(b"hello world"));
        assert_ne!(hash, RecordHasher::hash_content(b"different"));
    }
}
