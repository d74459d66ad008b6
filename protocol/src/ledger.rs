//! # Ledger
//!
//! The value layer the escrow contracts run on: a block height counter,
//! per-address balances, and per-creator deployment nonces.
//!
//! ## Transfers
//!
//! A transfer `from -> to` of `amount`:
//!
//! 1. Verify `from.balance >= amount`.
//! 2. Verify `to.balance + amount` does not overflow.
//! 3. `from.balance -= amount`
//! 4. `to.balance += amount`
//!
//! Steps 1 and 2 run before anything is written, so a failed transfer
//! leaves the ledger untouched.
//!
//! ## Undo journal
//!
//! Every write records the value it replaced. A caller takes a position
//! with [`Ledger::journal_len`], and [`Ledger::rollback`] undoes everything
//! written after it, touching only the entries that changed.
//! [`Ledger::commit`] discards the journal once a call has succeeded.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::trace;

use crate::address::Address;

/// Errors from balance operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// The debited account does not hold enough value.
    #[error("insufficient funds: {address} holds {balance}, needs {required}")]
    InsufficientFunds {
        /// The account being debited.
        address: Address,
        /// Its current balance.
        balance: u64,
        /// The amount the operation needed.
        required: u64,
    },

    /// A credit, height advance or nonce bump would overflow `u64`.
    #[error("arithmetic overflow in ledger operation")]
    Overflow,
}

/// The value a single write replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Undo {
    Height(u64),
    Balance(Address, Option<u64>),
    Nonce(Address, Option<u64>),
}

/// Balances, nonces and the block height.
///
/// `BTreeMap` keeps serialization and iteration deterministic, which makes
/// ledger snapshots comparable byte for byte. The undo journal is not part
/// of the ledger's state: it is neither serialized nor compared.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ledger {
    height: u64,
    balances: BTreeMap<Address, u64>,
    nonces: BTreeMap<Address, u64>,
    #[serde(skip)]
    journal: Vec<Undo>,
}

impl PartialEq for Ledger {
    fn eq(&self, other: &Self) -> bool {
        self.height == other.height
            && self.balances == other.balances
            && self.nonces == other.nonces
    }
}

impl Eq for Ledger {}

impl Ledger {
    /// An empty ledger at height 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty ledger starting at `height`.
    pub fn at_height(height: u64) -> Self {
        Self {
            height,
            ..Self::default()
        }
    }

    /// Current block height.
    pub fn height(&self) -> u64 {
        self.height
    }

    /// Moves the height forward by `blocks`.
    pub fn advance(&mut self, blocks: u64) -> Result<u64, LedgerError> {
        let height = self
            .height
            .checked_add(blocks)
            .ok_or(LedgerError::Overflow)?;
        self.journal.push(Undo::Height(self.height));
        self.height = height;
        Ok(height)
    }

    /// Balance of `address`, zero for unknown accounts.
    pub fn balance_of(&self, address: &Address) -> u64 {
        self.balances.get(address).copied().unwrap_or(0)
    }

    /// Sum of all balances, or `None` if it does not fit in a `u64`.
    /// Only mints change it.
    pub fn total_supply(&self) -> Option<u64> {
        self.balances
            .values()
            .try_fold(0u64, |acc, balance| acc.checked_add(*balance))
    }

    /// Creates `amount` out of thin air for `address` (genesis funding).
    pub fn mint(&mut self, address: Address, amount: u64) -> Result<(), LedgerError> {
        let balance = self
            .balance_of(&address)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        self.set_balance(address, balance);
        trace!(to = %address.short(), amount, "minted");
        Ok(())
    }

    /// Moves `amount` from `from` to `to`. Zero-value transfers succeed
    /// without touching anything.
    pub fn transfer(&mut self, from: &Address, to: &Address, amount: u64) -> Result<(), LedgerError> {
        if amount == 0 || from == to {
            return if self.balance_of(from) >= amount {
                Ok(())
            } else {
                Err(LedgerError::InsufficientFunds {
                    address: *from,
                    balance: self.balance_of(from),
                    required: amount,
                })
            };
        }

        let from_balance = self.balance_of(from);
        if from_balance < amount {
            return Err(LedgerError::InsufficientFunds {
                address: *from,
                balance: from_balance,
                required: amount,
            });
        }
        let to_balance = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;

        self.set_balance(*from, from_balance - amount);
        self.set_balance(*to, to_balance);

        trace!(
            from = %from.short(),
            to = %to.short(),
            amount,
            "transfer applied"
        );
        Ok(())
    }

    /// The address the next contract deployed by `creator` will receive.
    /// Does not consume the nonce.
    pub fn next_contract_address(&self, creator: &Address) -> Address {
        let nonce = self.nonces.get(creator).copied().unwrap_or(0);
        Address::derive_contract(creator, nonce)
    }

    /// Consumes `creator`'s deployment nonce.
    pub fn bump_nonce(&mut self, creator: &Address) -> Result<u64, LedgerError> {
        let nonce = self
            .nonces
            .get(creator)
            .copied()
            .unwrap_or(0)
            .checked_add(1)
            .ok_or(LedgerError::Overflow)?;
        let previous = self.nonces.insert(*creator, nonce);
        self.journal.push(Undo::Nonce(*creator, previous));
        Ok(nonce)
    }

    fn set_balance(&mut self, address: Address, balance: u64) {
        let previous = self.balances.insert(address, balance);
        self.journal.push(Undo::Balance(address, previous));
    }

    // -- Journal -------------------------------------------------------------

    /// Current position in the undo journal.
    pub fn journal_len(&self) -> usize {
        self.journal.len()
    }

    /// Undoes every write made since the journal was at `position`.
    pub fn rollback(&mut self, position: usize) {
        while self.journal.len() > position {
            let Some(undo) = self.journal.pop() else {
                break;
            };
            match undo {
                Undo::Height(height) => self.height = height,
                Undo::Balance(address, Some(balance)) => {
                    self.balances.insert(address, balance);
                }
                Undo::Balance(address, None) => {
                    self.balances.remove(&address);
                }
                Undo::Nonce(address, Some(nonce)) => {
                    self.nonces.insert(address, nonce);
                }
                Undo::Nonce(address, None) => {
                    self.nonces.remove(&address);
                }
            }
        }
    }

    /// Discards the undo journal. Writes made so far become permanent.
    pub fn commit(&mut self) {
        self.journal.clear();
    }
}
