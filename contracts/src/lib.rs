//! # Remit Contracts
//!
//! Conditional payments between two parties:
//!
//! - **Remittance**: a dual-secret escrow. The recipient unlocks it with
//!   two secrets before it expires; after that the payer takes it back.
//! - **Remittance Factory**: creates escrows for a fee and keeps limited
//!   administrative rights (pause, resume, handover) over the ones it made.
//! - **Hash Library**: the commitment both sides compute.
//! - **Chain**: executes calls against a ledger, one at a time, all or
//!   nothing.
//!
//! ## Design Principles
//!
//! 1. All monetary operations are checked. No wrapping arithmetic.
//! 2. State transitions are explicit enum variants, not boolean flags.
//! 3. Settlement zeroes the balance and enters its terminal state before
//!    any value leaves the escrow.
//! 4. Every public type is serializable (serde) for storage and transport.

pub mod chain;
pub mod context;
pub mod env;
pub mod error;
pub mod events;
pub mod hash_lib;
pub mod remittance;
pub mod remittance_factory;

pub use chain::Chain;
pub use context::CallContext;
pub use error::RemittanceError;
pub use events::{EventLog, LogEntry, RemittanceEvent};
pub use hash_lib::Commitment;
pub use remittance::{Remittance, RemittanceParams, RemittanceState};
pub use remittance_factory::RemittanceFactory;
