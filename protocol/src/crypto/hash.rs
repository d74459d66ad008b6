//! # Hashing Utilities
//!
//! Two hash functions, each with a fixed job:
//!
//! - **SHA-256**: commitments. Anything a counterparty has to recompute
//!   off-ledger from its own secrets goes through SHA-256.
//!
//! - **BLAKE3**: ledger-internal identities (labels, derived contract
//!   addresses), using its native domain separation.

use sha2::{Digest, Sha256};

/// Hash multiple byte slices in order with SHA-256, without building an
/// intermediate buffer.
///
/// The parts are fed to the hasher back to back, so the result equals the
/// hash of their concatenation. Callers that need the boundaries between
/// parts to matter must encode them (e.g. with a length prefix) themselves.
///
/// # Example
///
/// ```
/// use remit_protocol::crypto::sha256_multi;
///
/// let hash = sha256_multi(&[b"re", b"mit"]);
/// assert_eq!(hash, sha256_multi(&[b"remit"]));
/// ```
pub fn sha256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    let mut output = [0u8; 32];
    output.copy_from_slice(&hasher.finalize());
    output
}

/// Compute a domain-separated hash using BLAKE3's `derive_key` mode.
///
/// `domain_separated_hash("a", data)` and `domain_separated_hash("b", data)`
/// never collide, because the context string selects a different internal IV.
pub fn domain_separated_hash(context: &str, data: &[u8]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(context);
    hasher.update(data);
    *hasher.finalize().as_bytes()
}
