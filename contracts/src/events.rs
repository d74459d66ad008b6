//! # Events
//!
//! Notifications emitted by the contracts. Tooling never reads contract
//! fields to learn what happened; it reads the log. In particular, the
//! identity of a freshly created escrow is recovered from the factory's
//! `FactoryEscrowCreated` entry.

use remit_protocol::Address;
use serde::{Deserialize, Serialize};

/// Every notification the contracts can emit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RemittanceEvent {
    /// An escrow was constructed and funded.
    EscrowCreated {
        escrow_id: Address,
        payer: Address,
        recipient: Address,
    },
    /// A factory registered a new escrow.
    FactoryEscrowCreated { escrow_id: Address },
    /// The recipient released the funds.
    Withdrawn { recipient: Address, amount: u64 },
    /// The payer reclaimed the funds after expiry.
    Invalidated { payer: Address, amount: u64 },
    /// The administrator paused the escrow.
    Paused { escrow_id: Address },
    /// The administrator resumed the escrow.
    Resumed { escrow_id: Address },
    /// Escrow administration moved to a new identity.
    AdministratorChanged {
        escrow_id: Address,
        previous: Address,
        new: Address,
    },
    /// A factory was deployed.
    FactoryDeployed {
        factory_id: Address,
        admin: Address,
        fee_amount: u64,
        block_limit: u64,
    },
    /// Accumulated creation fees were paid out.
    FeesWithdrawn { admin: Address, amount: u64 },
    /// Factory ownership moved to a new identity.
    FactoryAdminChanged { previous: Address, new: Address },
}

/// One emitted event with its origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Contract that emitted the event.
    pub emitter: Address,
    /// Block height at emission.
    pub height: u64,
    /// The event itself.
    pub event: RemittanceEvent,
}

/// Append-only event log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    entries: Vec<LogEntry>,
}

impl EventLog {
    /// An empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    pub fn emit(&mut self, emitter: Address, height: u64, event: RemittanceEvent) {
        self.entries.push(LogEntry {
            emitter,
            height,
            event,
        });
    }

    /// All entries in emission order.
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if nothing was emitted yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The most recent entry.
    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.last()
    }

    /// Drops every entry past `len`. Used to roll back a failed call.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.entries.truncate(len);
    }

    /// Entries emitted by `emitter`.
    pub fn by_emitter<'a>(&'a self, emitter: &'a Address) -> impl Iterator<Item = &'a LogEntry> + 'a {
        self.entries.iter().filter(move |e| &e.emitter == emitter)
    }

    /// Identities of the escrows `factory` created, oldest first.
    pub fn created_escrows(&self, factory: &Address) -> Vec<Address> {
        self.by_emitter(factory)
            .filter_map(|entry| match entry.event {
                RemittanceEvent::FactoryEscrowCreated { escrow_id } => Some(escrow_id),
                _ => None,
            })
            .collect()
    }
}
