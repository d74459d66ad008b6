//! # Configuration & Constants
//!
//! Every magic number used by the escrow contracts lives here, together
//! with the one piece of runtime configuration a deployment chooses: the
//! factory's fee and maximum escrow horizon.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Fee charged by a factory per escrow creation when nothing else is
/// configured, in the ledger's smallest unit.
pub const DEFAULT_CREATION_FEE: u64 = 10;

/// Default maximum number of blocks an escrow may stay open.
/// 40_320 blocks is one week at 15-second blocks.
pub const DEFAULT_BLOCK_LIMIT: u64 = 40_320;

/// Hard ceiling for any configured block limit (roughly one year at
/// 15-second blocks). Keeps `height + delta` far away from `u64::MAX`.
pub const MAX_BLOCK_LIMIT: u64 = 2_102_400;

/// Output length of every hash in the system.
pub const HASH_OUTPUT_LENGTH: usize = 32;

/// BLAKE3 derive-key context for contract identities.
pub const CONTRACT_ADDRESS_DOMAIN: &str = "remit 2026 contract address v1";

/// BLAKE3 derive-key context for label-derived identities.
pub const LABEL_ADDRESS_DOMAIN: &str = "remit 2026 label address v1";

// ---------------------------------------------------------------------------
// Factory configuration
// ---------------------------------------------------------------------------

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The block limit is zero or above [`MAX_BLOCK_LIMIT`].
    #[error("block limit {block_limit} out of range (1..={max})")]
    BlockLimitOutOfRange {
        /// The rejected value.
        block_limit: u64,
        /// The allowed maximum.
        max: u64,
    },

    /// The configuration document could not be parsed.
    #[error("malformed configuration: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Deployment parameters of a remittance factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactoryConfig {
    /// Fee deducted from every creation.
    pub fee_amount: u64,
    /// Maximum `expiration_delta` accepted for a new escrow.
    pub block_limit: u64,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            fee_amount: DEFAULT_CREATION_FEE,
            block_limit: DEFAULT_BLOCK_LIMIT,
        }
    }
}

impl FactoryConfig {
    /// Builds a configuration and validates it.
    pub fn new(fee_amount: u64, block_limit: u64) -> Result<Self, ConfigError> {
        let config = Self {
            fee_amount,
            block_limit,
        };
        config.validate()?;
        Ok(config)
    }

    /// Parses a JSON document such as `{"fee_amount": 10, "block_limit": 100}`.
    /// Missing fields fall back to their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let partial: PartialFactoryConfig = serde_json::from_str(json)?;
        let defaults = Self::default();
        let config = Self {
            fee_amount: partial.fee_amount.unwrap_or(defaults.fee_amount),
            block_limit: partial.block_limit.unwrap_or(defaults.block_limit),
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks the block limit bounds. Any fee, including zero, is valid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.block_limit == 0 || self.block_limit > MAX_BLOCK_LIMIT {
            return Err(ConfigError::BlockLimitOutOfRange {
                block_limit: self.block_limit,
                max: MAX_BLOCK_LIMIT,
            });
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct PartialFactoryConfig {
    fee_amount: Option<u64>,
    block_limit: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = FactoryConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.fee_amount, DEFAULT_CREATION_FEE);
        assert_eq!(config.block_limit, DEFAULT_BLOCK_LIMIT);
    }

    #[test]
    fn zero_block_limit_rejected() {
        assert!(matches!(
            FactoryConfig::new(10, 0),
            Err(ConfigError::BlockLimitOutOfRange { block_limit: 0, .. })
        ));
    }

    #[test]
    fn block_limit_above_ceiling_rejected() {
        assert!(FactoryConfig::new(10, MAX_BLOCK_LIMIT).is_ok());
        assert!(FactoryConfig::new(10, MAX_BLOCK_LIMIT + 1).is_err());
    }

    #[test]
    fn json_fills_missing_fields_with_defaults() {
        let config = FactoryConfig::from_json_str(r#"{"fee_amount": 25}"#).unwrap();
        assert_eq!(config.fee_amount, 25);
        assert_eq!(config.block_limit, DEFAULT_BLOCK_LIMIT);
    }

    #[test]
    fn malformed_json_rejected() {
        assert!(matches!(
            FactoryConfig::from_json_str("{ not json"),
            Err(ConfigError::Malformed(_))
        ));
    }

    #[test]
    fn json_block_limit_is_validated() {
        assert!(FactoryConfig::from_json_str(r#"{"block_limit": 0}"#).is_err());
    }

    #[test]
    fn domains_are_distinct() {
        assert_ne!(CONTRACT_ADDRESS_DOMAIN, LABEL_ADDRESS_DOMAIN);
    }
}
