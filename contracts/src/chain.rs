//! # Chain
//!
//! The transactional front door. A `Chain` owns the environment (ledger +
//! event log) and every deployed contract, keyed by identity, and executes
//! calls one at a time.
//!
//! Each call is all or nothing. Before it runs, the chain marks the ledger
//! journal and the event log and saves the one factory and/or escrow the
//! call can modify. If the call fails, those are put back exactly as they
//! were and the error is returned to the caller. New records enter the
//! chain only as the last step of a successful call. There is no retry;
//! the caller resubmits if it wants to.
//!
//! Direct escrow calls (`withdraw`, `invalidate`, `pause`, ...) go straight
//! to the escrow. Administrative calls routed through a factory
//! (`pause_escrow`, ...) pass the factory's registry and admin checks
//! first.

use remit_protocol::{Address, FactoryConfig, Ledger};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::context::CallContext;
use crate::env::Env;
use crate::error::RemittanceError;
use crate::events::{EventLog, LogEntry};
use crate::hash_lib::{self, Commitment};
use crate::remittance::{Remittance, RemittanceParams};
use crate::remittance_factory::RemittanceFactory;

/// Serialized execution over a ledger and a set of deployed contracts.
#[derive(Debug, Clone, Default)]
pub struct Chain {
    env: Env,
    factories: BTreeMap<Address, RemittanceFactory>,
    remittances: BTreeMap<Address, Remittance>,
}

impl Chain {
    /// An empty chain at height 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// A chain over an existing ledger (pre-funded accounts, non-zero height).
    pub fn with_ledger(ledger: Ledger) -> Self {
        Self {
            env: Env::with_ledger(ledger),
            ..Self::default()
        }
    }

    /// Runs `op` as one indivisible unit. `factory` and `escrow` name the
    /// existing records `op` may modify.
    fn transact<T>(
        &mut self,
        op: &'static str,
        factory: Option<&Address>,
        escrow: Option<&Address>,
        f: impl FnOnce(&mut Self) -> Result<T, RemittanceError>,
    ) -> Result<T, RemittanceError> {
        let checkpoint = self.env.checkpoint();
        let factory_before = factory.and_then(|id| {
            self.factories
                .get(id)
                .map(|record| (*id, record.checkpoint()))
        });
        let escrow_before = escrow.and_then(|id| self.remittances.get(id).cloned());

        let result = f(self);
        match &result {
            Ok(_) => self.env.commit(),
            Err(e) => {
                self.env.revert(checkpoint);
                if let Some((id, saved)) = factory_before {
                    if let Some(record) = self.factories.get_mut(&id) {
                        record.restore(saved);
                    }
                }
                if let Some(saved) = escrow_before {
                    self.remittances.insert(saved.address(), saved);
                }
                debug!(op, error = %e, height = self.env.height(), "call reverted");
            }
        }
        result
    }

    // -- Ledger --------------------------------------------------------------

    /// Credits `amount` to `address` out of thin air.
    pub fn fund(&mut self, address: Address, amount: u64) -> Result<(), RemittanceError> {
        self.transact("fund", None, None, |chain| {
            chain.env.ledger.mint(address, amount)?;
            Ok(())
        })
    }

    /// Produces `blocks` empty blocks. Returns the new height.
    pub fn advance_blocks(&mut self, blocks: u64) -> Result<u64, RemittanceError> {
        self.transact("advance_blocks", None, None, |chain| {
            Ok(chain.env.ledger.advance(blocks)?)
        })
    }

    pub fn height(&self) -> u64 {
        self.env.height()
    }

    pub fn balance_of(&self, address: &Address) -> u64 {
        self.env.ledger.balance_of(address)
    }

    pub fn ledger(&self) -> &Ledger {
        &self.env.ledger
    }

    /// The full event log.
    pub fn events(&self) -> &EventLog {
        &self.env.log
    }

    /// The most recent event.
    pub fn last_event(&self) -> Option<&LogEntry> {
        self.env.log.last()
    }

    // -- Lookups -------------------------------------------------------------

    pub fn factory(&self, id: &Address) -> Option<&RemittanceFactory> {
        self.factories.get(id)
    }

    pub fn remittance(&self, id: &Address) -> Option<&Remittance> {
        self.remittances.get(id)
    }

    fn factory_ref<'a>(
        factories: &'a BTreeMap<Address, RemittanceFactory>,
        id: &Address,
    ) -> Result<&'a RemittanceFactory, RemittanceError> {
        factories
            .get(id)
            .ok_or_else(|| RemittanceError::InvalidArgument(format!("no factory at {id}")))
    }

    fn remittance_mut<'a>(
        remittances: &'a mut BTreeMap<Address, Remittance>,
        id: &Address,
    ) -> Result<&'a mut Remittance, RemittanceError> {
        remittances
            .get_mut(id)
            .ok_or(RemittanceError::UnknownEscrow(*id))
    }

    // -- Deployment ----------------------------------------------------------

    /// Deploys a factory owned by `ctx.caller`. Returns its identity.
    pub fn deploy_factory(
        &mut self,
        ctx: &CallContext,
        config: FactoryConfig,
    ) -> Result<Address, RemittanceError> {
        self.transact("deploy_factory", None, None, |chain| {
            let factory = RemittanceFactory::deploy(&mut chain.env, ctx, config)?;
            let id = factory.address();
            chain.factories.insert(id, factory);
            Ok(id)
        })
    }

    /// Deploys an escrow directly, without a factory. The caller must be the
    /// payer; it becomes the administrator and no factory will ever accept
    /// the escrow.
    pub fn deploy_remittance(
        &mut self,
        ctx: &CallContext,
        params: RemittanceParams,
    ) -> Result<Address, RemittanceError> {
        self.transact("deploy_remittance", None, None, |chain| {
            let remittance = Remittance::deploy(&mut chain.env, ctx, params)?;
            let id = remittance.address();
            chain.remittances.insert(id, remittance);
            Ok(id)
        })
    }

    /// Creates an escrow through `factory_id`. Returns the escrow identity.
    pub fn create_remittance(
        &mut self,
        factory_id: &Address,
        ctx: &CallContext,
        recipient: Address,
        commitment: Commitment,
        expiration_delta: u64,
    ) -> Result<Address, RemittanceError> {
        self.transact("create_remittance", Some(factory_id), None, |chain| {
            let factory = chain
                .factories
                .get_mut(factory_id)
                .ok_or_else(|| RemittanceError::InvalidArgument(format!("no factory at {factory_id}")))?;
            let remittance =
                factory.create(&mut chain.env, ctx, recipient, commitment, expiration_delta)?;
            let id = remittance.address();
            chain.remittances.insert(id, remittance);
            Ok(id)
        })
    }

    // -- Escrow calls --------------------------------------------------------

    /// Recipient withdraws from `escrow_id`. Returns the amount paid.
    pub fn withdraw(
        &mut self,
        escrow_id: &Address,
        ctx: &CallContext,
        secret1: &[u8],
        secret2: &[u8],
    ) -> Result<u64, RemittanceError> {
        self.transact("withdraw", None, Some(escrow_id), |chain| {
            let escrow = Self::remittance_mut(&mut chain.remittances, escrow_id)?;
            escrow.withdraw(&mut chain.env, ctx, secret1, secret2)
        })
    }

    /// Payer reclaims `escrow_id` after expiry. Returns the amount paid back.
    pub fn invalidate(&mut self, escrow_id: &Address, ctx: &CallContext) -> Result<u64, RemittanceError> {
        self.transact("invalidate", None, Some(escrow_id), |chain| {
            let escrow = Self::remittance_mut(&mut chain.remittances, escrow_id)?;
            escrow.invalidate(&mut chain.env, ctx)
        })
    }

    /// Direct pause by the escrow's administrator.
    pub fn pause(&mut self, escrow_id: &Address, ctx: &CallContext) -> Result<(), RemittanceError> {
        self.transact("pause", None, Some(escrow_id), |chain| {
            let escrow = Self::remittance_mut(&mut chain.remittances, escrow_id)?;
            escrow.pause(&mut chain.env, ctx)
        })
    }

    /// Direct resume by the escrow's administrator.
    pub fn resume(&mut self, escrow_id: &Address, ctx: &CallContext) -> Result<(), RemittanceError> {
        self.transact("resume", None, Some(escrow_id), |chain| {
            let escrow = Self::remittance_mut(&mut chain.remittances, escrow_id)?;
            escrow.resume(&mut chain.env, ctx)
        })
    }

    /// Direct administrator handover by the escrow's administrator.
    pub fn change_administrator(
        &mut self,
        escrow_id: &Address,
        ctx: &CallContext,
        new_administrator: Address,
    ) -> Result<(), RemittanceError> {
        self.transact("change_administrator", None, Some(escrow_id), |chain| {
            let escrow = Self::remittance_mut(&mut chain.remittances, escrow_id)?;
            escrow.change_administrator(&mut chain.env, ctx, new_administrator)
        })
    }

    // -- Factory calls -------------------------------------------------------

    /// Factory-mediated pause.
    pub fn pause_escrow(
        &mut self,
        factory_id: &Address,
        ctx: &CallContext,
        escrow_id: &Address,
    ) -> Result<(), RemittanceError> {
        self.transact("pause_escrow", None, Some(escrow_id), |chain| {
            let factory = Self::factory_ref(&chain.factories, factory_id)?;
            Self::ensure_registered(factory, escrow_id)?;
            let escrow = Self::remittance_mut(&mut chain.remittances, escrow_id)?;
            factory.pause_escrow(&mut chain.env, ctx, escrow)
        })
    }

    /// Factory-mediated resume.
    pub fn resume_escrow(
        &mut self,
        factory_id: &Address,
        ctx: &CallContext,
        escrow_id: &Address,
    ) -> Result<(), RemittanceError> {
        self.transact("resume_escrow", None, Some(escrow_id), |chain| {
            let factory = Self::factory_ref(&chain.factories, factory_id)?;
            Self::ensure_registered(factory, escrow_id)?;
            let escrow = Self::remittance_mut(&mut chain.remittances, escrow_id)?;
            factory.resume_escrow(&mut chain.env, ctx, escrow)
        })
    }

    /// Factory-mediated administrator handover.
    pub fn change_escrow_administrator(
        &mut self,
        factory_id: &Address,
        ctx: &CallContext,
        escrow_id: &Address,
        new_administrator: Address,
    ) -> Result<(), RemittanceError> {
        self.transact("change_escrow_administrator", None, Some(escrow_id), |chain| {
            let factory = Self::factory_ref(&chain.factories, factory_id)?;
            Self::ensure_registered(factory, escrow_id)?;
            let escrow = Self::remittance_mut(&mut chain.remittances, escrow_id)?;
            factory.change_escrow_administrator(&mut chain.env, ctx, escrow, new_administrator)
        })
    }

    /// Identities that were never deployed are unknown to every factory,
    /// whether or not an escrow record exists for them.
    fn ensure_registered(factory: &RemittanceFactory, escrow_id: &Address) -> Result<(), RemittanceError> {
        if !factory.is_registered(escrow_id) {
            warn!(
                factory = %factory.address().short(),
                escrow = %escrow_id.short(),
                "administrative call on unregistered escrow"
            );
            return Err(RemittanceError::UnknownEscrow(*escrow_id));
        }
        Ok(())
    }

    /// Pays the factory's accumulated fees to its admin.
    pub fn withdraw_fees(&mut self, factory_id: &Address, ctx: &CallContext) -> Result<u64, RemittanceError> {
        self.transact("withdraw_fees", Some(factory_id), None, |chain| {
            let factory = chain
                .factories
                .get_mut(factory_id)
                .ok_or_else(|| RemittanceError::InvalidArgument(format!("no factory at {factory_id}")))?;
            factory.withdraw_fees(&mut chain.env, ctx)
        })
    }

    /// Transfers factory ownership.
    pub fn change_factory_admin(
        &mut self,
        factory_id: &Address,
        ctx: &CallContext,
        new_admin: Address,
    ) -> Result<(), RemittanceError> {
        self.transact("change_factory_admin", Some(factory_id), None, |chain| {
            let factory = chain
                .factories
                .get_mut(factory_id)
                .ok_or_else(|| RemittanceError::InvalidArgument(format!("no factory at {factory_id}")))?;
            factory.change_admin(&mut chain.env, ctx, new_admin)
        })
    }

    /// Fees collected by `factory_id` since its last withdrawal.
    pub fn accumulated_fees(&self, factory_id: &Address) -> Result<u64, RemittanceError> {
        Ok(Self::factory_ref(&self.factories, factory_id)?.accumulated_fees())
    }

    /// Commitment for `(payer, recipient, secret1, secret2)`.
    pub fn get_hash(
        &self,
        payer: &Address,
        recipient: &Address,
        secret1: &[u8],
        secret2: &[u8],
    ) -> Commitment {
        hash_lib::commitment(payer, recipient, secret1, secret2)
    }
}
