// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Remit Protocol: Ledger Primitives
//!
//! The ground the escrow contracts stand on. Nothing in here knows what an
//! escrow is; it only knows identities, hashes, balances and block heights.
//!
//! - **address**: 32-byte identities, label-derived and contract-derived.
//! - **crypto**: SHA-256 for commitments, BLAKE3 for internal identities.
//! - **ledger**: balances, block height, deployment nonces.
//! - **config**: constants and the factory's deployment parameters.
//! - **logging**: `tracing` subscriber setup.
//!
//! All value arithmetic is checked. Wrapping arithmetic and money do not mix.

pub mod address;
pub mod config;
pub mod crypto;
pub mod ledger;
pub mod logging;

pub use address::Address;
pub use config::FactoryConfig;
pub use ledger::{Ledger, LedgerError};
