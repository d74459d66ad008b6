//! Execution environment handed to every contract call: the ledger the
//! call moves value on, and the log it emits events into.

use remit_protocol::{Address, Ledger};

use crate::events::{EventLog, RemittanceEvent};

/// Ledger plus event log.
#[derive(Debug, Clone, Default)]
pub struct Env {
    /// Balances and block height.
    pub ledger: Ledger,
    /// Everything emitted so far.
    pub log: EventLog,
}

/// Positions in the ledger journal and the event log, for rolling back a
/// failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    journal_len: usize,
    log_len: usize,
}

impl Env {
    /// Fresh environment at height 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Environment over an existing ledger.
    pub fn with_ledger(mut ledger: Ledger) -> Self {
        ledger.commit();
        Self {
            ledger,
            log: EventLog::new(),
        }
    }

    /// Current block height.
    pub fn height(&self) -> u64 {
        self.ledger.height()
    }

    /// Emits `event` from `emitter` at the current height.
    pub fn emit(&mut self, emitter: Address, event: RemittanceEvent) {
        let height = self.ledger.height();
        self.log.emit(emitter, height, event);
    }

    /// Marks the current state.
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            journal_len: self.ledger.journal_len(),
            log_len: self.log.len(),
        }
    }

    /// Undoes every ledger write and event since `checkpoint`.
    pub fn revert(&mut self, checkpoint: Checkpoint) {
        self.ledger.rollback(checkpoint.journal_len);
        self.log.truncate(checkpoint.log_len);
    }

    /// Makes everything so far permanent. Checkpoints taken before this
    /// can no longer be reverted to.
    pub fn commit(&mut self) {
        self.ledger.commit();
    }

    /// Runs `f`, reverting the ledger and log if it fails.
    pub fn atomically<T, E>(&mut self, f: impl FnOnce(&mut Env) -> Result<T, E>) -> Result<T, E> {
        let checkpoint = self.checkpoint();
        let result = f(self);
        if result.is_err() {
            self.revert(checkpoint);
        }
        result
    }
}
