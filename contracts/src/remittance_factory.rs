//! # Remittance Factory Contract
//!
//! Creates escrows, keeps a cut of every creation, and retains limited
//! administrative rights over the escrows it created.
//!
//! ## Security Model
//!
//! - **Registry gating**: every administrative call names an escrow. The
//!   factory refuses with `UnknownEscrow` unless that identity is in its
//!   registry, i.e. unless this factory created it. Only then is the caller
//!   checked against the factory admin.
//! - **Forwarding**: an accepted call is forwarded to the escrow with the
//!   factory itself as caller. The escrow applies its own administrator
//!   check, so an escrow whose administration was handed elsewhere rejects
//!   the factory like anyone else.
//! - **Fees**: the fee stays in the factory's ledger account and is tracked
//!   in `accumulated_fees`. Only a successful creation adds to it; only
//!   `withdraw_fees` drains it.

use remit_protocol::{Address, FactoryConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::info;

use crate::context::CallContext;
use crate::env::Env;
use crate::error::RemittanceError;
use crate::events::RemittanceEvent;
use crate::hash_lib::{self, Commitment};
use crate::remittance::{Remittance, RemittanceParams};

/// The factory: fee ledger plus the registry of escrows it created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemittanceFactory {
    address: Address,
    admin: Address,
    config: FactoryConfig,
    accumulated_fees: u64,
    registry: BTreeSet<Address>,
}

/// The factory fields a call can change, saved so a failed call can put
/// them back. The registry is left out: it only grows as the last step of
/// a successful [`RemittanceFactory::create`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FactoryCheckpoint {
    admin: Address,
    accumulated_fees: u64,
}

impl RemittanceFactory {
    /// Deploys a factory owned by `ctx.caller`.
    ///
    /// Emits [`RemittanceEvent::FactoryDeployed`].
    ///
    /// # Errors
    ///
    /// Returns [`RemittanceError::InvalidArgument`] if value is attached
    /// (deployment is not payable) or `config` fails validation.
    pub fn deploy(
        env: &mut Env,
        ctx: &CallContext,
        config: FactoryConfig,
    ) -> Result<Self, RemittanceError> {
        ctx.ensure_non_payable("factory deployment")?;
        if ctx.caller.is_zero() {
            return Err(RemittanceError::InvalidArgument(
                "factory admin is the null identity".into(),
            ));
        }
        config
            .validate()
            .map_err(|e| RemittanceError::InvalidArgument(e.to_string()))?;

        let address = env.ledger.next_contract_address(&ctx.caller);
        env.ledger.bump_nonce(&ctx.caller)?;

        env.emit(
            address,
            RemittanceEvent::FactoryDeployed {
                factory_id: address,
                admin: ctx.caller,
                fee_amount: config.fee_amount,
                block_limit: config.block_limit,
            },
        );
        info!(
            factory = %address.short(),
            admin = %ctx.caller.short(),
            fee_amount = config.fee_amount,
            block_limit = config.block_limit,
            "factory deployed"
        );

        Ok(Self {
            address,
            admin: ctx.caller,
            config,
            accumulated_fees: 0,
            registry: BTreeSet::new(),
        })
    }

    // -- Queries -------------------------------------------------------------

    /// Identity of this factory.
    pub fn address(&self) -> Address {
        self.address
    }

    /// The factory owner.
    pub fn admin(&self) -> Address {
        self.admin
    }

    pub fn fee_amount(&self) -> u64 {
        self.config.fee_amount
    }

    pub fn block_limit(&self) -> u64 {
        self.config.block_limit
    }

    pub fn config(&self) -> &FactoryConfig {
        &self.config
    }

    /// Fees collected since the last withdrawal.
    pub fn accumulated_fees(&self) -> u64 {
        self.accumulated_fees
    }

    /// `true` if this factory created `escrow_id`.
    pub fn is_registered(&self, escrow_id: &Address) -> bool {
        self.registry.contains(escrow_id)
    }

    /// Escrows created by this factory, in identity order.
    pub fn escrows(&self) -> impl Iterator<Item = &Address> {
        self.registry.iter()
    }

    /// Number of escrows created.
    pub fn escrow_count(&self) -> usize {
        self.registry.len()
    }

    /// Computes an escrow commitment, for callers that want the factory to
    /// do the hashing.
    pub fn get_hash(
        &self,
        payer: &Address,
        recipient: &Address,
        secret1: &[u8],
        secret2: &[u8],
    ) -> Commitment {
        hash_lib::commitment(payer, recipient, secret1, secret2)
    }

    // -- Creation ------------------------------------------------------------

    /// Creates an escrow paid for by `ctx.caller` with `ctx.value`.
    ///
    /// The fee is retained; the rest is locked in the new escrow with the
    /// caller as payer and this factory as administrator.
    ///
    /// Emits [`RemittanceEvent::EscrowCreated`] (from the escrow) and
    /// [`RemittanceEvent::FactoryEscrowCreated`] (from the factory).
    ///
    /// # Errors
    ///
    /// - [`RemittanceError::InsufficientValue`] if `ctx.value <= fee_amount`.
    /// - [`RemittanceError::InvalidArgument`] from escrow construction.
    /// - [`RemittanceError::Ledger`] if the caller cannot cover `ctx.value`.
    ///
    /// On any error nothing changes: no value moves, no fee is recorded,
    /// nothing is registered.
    pub fn create(
        &mut self,
        env: &mut Env,
        ctx: &CallContext,
        recipient: Address,
        commitment: Commitment,
        expiration_delta: u64,
    ) -> Result<Remittance, RemittanceError> {
        let fee = self.config.fee_amount;
        if ctx.value <= fee {
            return Err(RemittanceError::InsufficientValue {
                value: ctx.value,
                fee,
            });
        }
        let escrow_value = ctx.value - fee;
        let params = RemittanceParams {
            payer: ctx.caller,
            recipient,
            commitment,
            expiration_delta,
        };
        params.validate(escrow_value, self.config.block_limit, env.height())?;
        let new_fees = self
            .accumulated_fees
            .checked_add(fee)
            .ok_or(remit_protocol::LedgerError::Overflow)?;

        let factory = self.address;
        let block_limit = self.config.block_limit;
        let remittance = env.atomically(|env| -> Result<Remittance, RemittanceError> {
            env.ledger.transfer(&ctx.caller, &factory, ctx.value)?;
            let remittance = Remittance::instantiate(
                env,
                &CallContext::with_value(factory, escrow_value),
                params,
                block_limit,
            )?;
            env.emit(
                factory,
                RemittanceEvent::FactoryEscrowCreated {
                    escrow_id: remittance.address(),
                },
            );
            Ok(remittance)
        })?;

        self.accumulated_fees = new_fees;
        self.registry.insert(remittance.address());

        info!(
            factory = %self.address.short(),
            escrow = %remittance.address().short(),
            payer = %ctx.caller.short(),
            escrow_value,
            fee,
            accumulated_fees = self.accumulated_fees,
            "factory created escrow"
        );
        Ok(remittance)
    }

    // -- Escrow administration -----------------------------------------------

    /// Pauses an escrow this factory created. Factory admin only.
    pub fn pause_escrow(
        &self,
        env: &mut Env,
        ctx: &CallContext,
        escrow: &mut Remittance,
    ) -> Result<(), RemittanceError> {
        self.authorize_escrow_call(ctx, escrow, "pause escrow")?;
        escrow.pause(env, &CallContext::new(self.address))
    }

    /// Resumes an escrow this factory created. Factory admin only.
    pub fn resume_escrow(
        &self,
        env: &mut Env,
        ctx: &CallContext,
        escrow: &mut Remittance,
    ) -> Result<(), RemittanceError> {
        self.authorize_escrow_call(ctx, escrow, "resume escrow")?;
        escrow.resume(env, &CallContext::new(self.address))
    }

    /// Hands administration of an escrow this factory created to
    /// `new_administrator`. Factory admin only. After this the factory can
    /// no longer pause or resume that escrow.
    pub fn change_escrow_administrator(
        &self,
        env: &mut Env,
        ctx: &CallContext,
        escrow: &mut Remittance,
        new_administrator: Address,
    ) -> Result<(), RemittanceError> {
        self.authorize_escrow_call(ctx, escrow, "change escrow administrator")?;
        escrow.change_administrator(env, &CallContext::new(self.address), new_administrator)
    }

    /// Registry first, then admin, then value.
    fn authorize_escrow_call(
        &self,
        ctx: &CallContext,
        escrow: &Remittance,
        action: &'static str,
    ) -> Result<(), RemittanceError> {
        if !self.registry.contains(&escrow.address()) {
            return Err(RemittanceError::UnknownEscrow(escrow.address()));
        }
        self.ensure_admin(ctx, action)?;
        ctx.ensure_non_payable(action)
    }

    // -- Factory administration ----------------------------------------------

    /// Pays all accumulated fees to the admin and resets the counter.
    /// Returns the amount paid.
    ///
    /// Emits [`RemittanceEvent::FeesWithdrawn`].
    pub fn withdraw_fees(&mut self, env: &mut Env, ctx: &CallContext) -> Result<u64, RemittanceError> {
        self.ensure_admin(ctx, "withdraw fees")?;
        ctx.ensure_non_payable("withdraw fees")?;

        let amount = self.accumulated_fees;
        self.accumulated_fees = 0;
        if let Err(e) = env.ledger.transfer(&self.address, &self.admin, amount) {
            self.accumulated_fees = amount;
            return Err(e.into());
        }

        env.emit(
            self.address,
            RemittanceEvent::FeesWithdrawn {
                admin: self.admin,
                amount,
            },
        );
        info!(factory = %self.address.short(), amount, "fees withdrawn");
        Ok(amount)
    }

    /// Transfers factory ownership. Admin only; the new admin must be non-null.
    ///
    /// Emits [`RemittanceEvent::FactoryAdminChanged`].
    pub fn change_admin(
        &mut self,
        env: &mut Env,
        ctx: &CallContext,
        new_admin: Address,
    ) -> Result<(), RemittanceError> {
        self.ensure_admin(ctx, "change factory admin")?;
        ctx.ensure_non_payable("change factory admin")?;
        if new_admin.is_zero() {
            return Err(RemittanceError::InvalidArgument(
                "new factory admin is the null identity".into(),
            ));
        }

        let previous = self.admin;
        self.admin = new_admin;
        env.emit(
            self.address,
            RemittanceEvent::FactoryAdminChanged {
                previous,
                new: new_admin,
            },
        );
        info!(
            factory = %self.address.short(),
            previous = %previous.short(),
            new = %new_admin.short(),
            "factory admin changed"
        );
        Ok(())
    }

    pub(crate) fn checkpoint(&self) -> FactoryCheckpoint {
        FactoryCheckpoint {
            admin: self.admin,
            accumulated_fees: self.accumulated_fees,
        }
    }

    pub(crate) fn restore(&mut self, checkpoint: FactoryCheckpoint) {
        self.admin = checkpoint.admin;
        self.accumulated_fees = checkpoint.accumulated_fees;
    }

    fn ensure_admin(&self, ctx: &CallContext, action: &'static str) -> Result<(), RemittanceError> {
        if ctx.caller != self.admin {
            return Err(RemittanceError::Unauthorized {
                caller: ctx.caller,
                action,
            });
        }
        Ok(())
    }
}
