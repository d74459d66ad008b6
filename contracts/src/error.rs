//! Error types shared by the escrow and the factory.
//!
//! Every failure is fatal to the call that raised it and nothing else:
//! the call's effects are rolled back and the error is returned as-is.

use remit_protocol::{Address, LedgerError};
use thiserror::Error;

use crate::remittance::RemittanceState;

/// Errors from escrow and factory operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemittanceError {
    /// Malformed input: null or duplicate parties, zero value or delta,
    /// a delta past the block limit, value sent to a non-payable call.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The caller does not hold the role the operation requires.
    #[error("unauthorized: {caller} may not {action}")]
    Unauthorized {
        /// Identity that made the call.
        caller: Address,
        /// The operation that was refused.
        action: &'static str,
    },

    /// Withdrawal attempted at or after the expiration height.
    #[error("escrow expired at height {expiration_height} (current height {height})")]
    Expired {
        /// Height at which the escrow expired.
        expiration_height: u64,
        /// Height at the time of the call.
        height: u64,
    },

    /// Reclamation attempted before the expiration height.
    #[error("escrow not yet expired: expires at height {expiration_height} (current height {height})")]
    NotYetExpired {
        /// Height at which the escrow expires.
        expiration_height: u64,
        /// Height at the time of the call.
        height: u64,
    },

    /// The presented secrets do not reproduce the stored commitment.
    #[error("secrets do not match the stored commitment")]
    HashMismatch,

    /// The escrow was already withdrawn or invalidated.
    #[error("escrow already settled ({state})")]
    AlreadySettled {
        /// The terminal state the escrow is in.
        state: RemittanceState,
    },

    /// The escrow is paused; the recipient cannot withdraw until it resumes.
    #[error("escrow is paused")]
    Paused,

    /// The escrow is not in the state the operation requires.
    #[error("invalid state: escrow is {current}, expected {expected}")]
    InvalidState {
        /// The escrow's current state.
        current: RemittanceState,
        /// The state the operation requires.
        expected: RemittanceState,
    },

    /// Creation value does not exceed the factory fee.
    #[error("insufficient value: sent {value}, must exceed fee of {fee}")]
    InsufficientValue {
        /// Value attached to the call.
        value: u64,
        /// The factory's fee.
        fee: u64,
    },

    /// The identity is not an escrow this factory created (or not an escrow at all).
    #[error("unknown escrow: {0}")]
    UnknownEscrow(Address),

    /// The underlying value transfer failed.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}
