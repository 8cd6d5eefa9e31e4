//! Content fingerprints for cache invalidation.

use graft_ir::Fingerprint;

/// Fingerprint a document's text using XXH3-64.
///
/// Two texts with the same fingerprint are assumed identical.
pub fn content_fingerprint(text: &str) -> Fingerprint {
    fingerprint_bytes(text.as_bytes())
}

/// Fingerprint raw bytes using XXH3-64.
pub fn fingerprint_bytes(data: &[u8]) -> Fingerprint {
    Fingerprint::new(xxhash_rust::xxh3::xxh3_64(data))
}
