//! # Identities
//!
//! Every participant on the ledger (people and contracts alike) is a
//! 32-byte [`Address`]. The all-zero address is the null identity and is
//! never a valid party to an escrow.
//!
//! Contract addresses are derived, not chosen: `derive_contract(creator,
//! nonce)` hashes the creator and its deployment counter, so two deployments
//! can never land on the same identity.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::config::{CONTRACT_ADDRESS_DOMAIN, HASH_OUTPUT_LENGTH, LABEL_ADDRESS_DOMAIN};
use crate::crypto::hash::domain_separated_hash;

/// Errors from parsing a textual address.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    /// The input was not valid hex.
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// The decoded input had the wrong length.
    #[error("invalid address length: expected {expected} bytes, got {got}")]
    InvalidLength {
        /// Required length.
        expected: usize,
        /// Length actually decoded.
        got: usize,
    },
}

/// A 32-byte ledger identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; HASH_OUTPUT_LENGTH]);

impl Address {
    /// The null identity.
    pub const ZERO: Address = Address([0u8; HASH_OUTPUT_LENGTH]);

    /// Wraps raw bytes.
    pub const fn from_bytes(bytes: [u8; HASH_OUTPUT_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Derives a stable identity from a human label ("alice", "treasury").
    ///
    /// Intended for fixtures and tooling. Labels are hashed, so the result
    /// is never [`Address::ZERO`] in practice.
    pub fn from_label(label: &str) -> Self {
        Self(domain_separated_hash(LABEL_ADDRESS_DOMAIN, label.as_bytes()))
    }

    /// Derives the identity of the `nonce`-th contract deployed by `creator`.
    pub fn derive_contract(creator: &Address, nonce: u64) -> Self {
        let mut preimage = Vec::with_capacity(HASH_OUTPUT_LENGTH + 8);
        preimage.extend_from_slice(&creator.0);
        preimage.extend_from_slice(&nonce.to_be_bytes());
        Self(domain_separated_hash(CONTRACT_ADDRESS_DOMAIN, &preimage))
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; HASH_OUTPUT_LENGTH] {
        &self.0
    }

    /// `true` for the null identity.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; HASH_OUTPUT_LENGTH]
    }

    /// Lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses a hex string, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, AddressError> {
        let trimmed = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(trimmed).map_err(|e| AddressError::InvalidHex(e.to_string()))?;
        let array: [u8; HASH_OUTPUT_LENGTH] =
            bytes
                .as_slice()
                .try_into()
                .map_err(|_| AddressError::InvalidLength {
                    expected: HASH_OUTPUT_LENGTH,
                    got: bytes.len(),
                })?;
        Ok(Self(array))
    }

    /// First four bytes in hex, for log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address(0x{}..)", self.short())
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
