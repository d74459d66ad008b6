//! # Hash Library
//!
//! Derives the commitment a payer stores in an escrow. The recipient later
//! proves the right to release funds by presenting the two secrets that
//! reproduce it.
//!
//! ## Preimage layout
//!
//! ```text
//! SHA-256( payer(32) || recipient(32) || len(s1) u64be || s1 || len(s2) u64be || s2 )
//! ```
//!
//! Argument order is part of the secret. Swapping the identities, swapping
//! the secrets, or moving bytes from one secret into the other all produce
//! a different commitment; the length prefixes cover the last case.

use remit_protocol::config::HASH_OUTPUT_LENGTH;
use remit_protocol::crypto::sha256_multi;
use remit_protocol::Address;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// An opaque 32-byte commitment to `(payer, recipient, secret1, secret2)`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Commitment([u8; HASH_OUTPUT_LENGTH]);

impl Commitment {
    /// Wraps raw digest bytes, e.g. a commitment computed off-ledger.
    pub const fn from_bytes(bytes: [u8; HASH_OUTPUT_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; HASH_OUTPUT_LENGTH] {
        &self.0
    }

    /// Lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl fmt::Debug for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Commitment(0x{}..)", hex::encode(&self.0[..4]))
    }
}

impl Serialize for Commitment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Commitment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let trimmed = s.strip_prefix("0x").unwrap_or(&s);
        let bytes = hex::decode(trimmed).map_err(serde::de::Error::custom)?;
        let array: [u8; HASH_OUTPUT_LENGTH] = bytes.as_slice().try_into().map_err(|_| {
            serde::de::Error::invalid_length(bytes.len(), &"32 bytes of hex")
        })?;
        Ok(Self(array))
    }
}

/// Computes the commitment for an escrow from `payer` to `recipient`
/// unlocked by `secret1` and `secret2`.
///
/// # Example
///
/// ```
/// use remit_contracts::hash_lib::commitment;
/// use remit_protocol::Address;
///
/// let payer = Address::from_label("payer");
/// let recipient = Address::from_label("recipient");
/// let c = commitment(&payer, &recipient, b"abc", b"xyz");
/// assert_ne!(c, commitment(&payer, &recipient, b"xyz", b"abc"));
/// ```
pub fn commitment(
    payer: &Address,
    recipient: &Address,
    secret1: &[u8],
    secret2: &[u8],
) -> Commitment {
    let len1 = (secret1.len() as u64).to_be_bytes();
    let len2 = (secret2.len() as u64).to_be_bytes();
    Commitment(sha256_multi(&[
        payer.as_bytes(),
        recipient.as_bytes(),
        &len1,
        secret1,
        &len2,
        secret2,
    ]))
}
