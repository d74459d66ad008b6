//! # Cryptographic Primitives
//!
//! Thin wrappers around audited hash implementations. Nothing here is
//! clever on purpose.

pub mod hash;

pub use hash::{domain_separated_hash, sha256_multi};
