//! # Remittance Escrow Contract
//!
//! A payer locks value for a named recipient. The recipient releases it by
//! presenting two secrets that reproduce the stored commitment, before the
//! expiration height. After the expiration height the payer may reclaim it
//! instead. Exactly one of the two ever happens.
//!
//! ## Lifecycle
//!
//! ```text
//!            pause            withdraw
//!   Active ─────────► Paused
//!     │  ◄─────────    │
//!     │    resume      │ invalidate
//!     ├── withdraw ──► Withdrawn      (terminal)
//!     └── invalidate ─► Invalidated   (terminal)
//! ```
//!
//! Pausing freezes the recipient path only. The payer can still reclaim a
//! paused escrow once it has expired, so an administrator can never trap
//! funds by pausing and walking away.
//!
//! ## Roles
//!
//! - **payer**: funds the escrow, reclaims it after expiry.
//! - **recipient**: withdraws with the secrets before expiry.
//! - **administrator**: pauses, resumes, hands administration on.
//!   Initially the deploying factory, or the payer itself for a direct
//!   deployment. Never able to move value.
//!
//! ## Settlement ordering
//!
//! `withdraw` and `invalidate` zero the balance and enter the terminal
//! state before the outbound transfer runs. If the transfer fails, both
//! are restored and the call fails as a whole.

use remit_protocol::config::DEFAULT_BLOCK_LIMIT;
use remit_protocol::Address;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::context::CallContext;
use crate::env::Env;
use crate::error::RemittanceError;
use crate::events::RemittanceEvent;
use crate::hash_lib::{self, Commitment};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Lifecycle state of an escrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemittanceState {
    /// Funded, open for withdrawal (before expiry) or reclamation (after).
    Active,
    /// Withdrawal frozen by the administrator. Reclamation still allowed.
    Paused,
    /// The recipient released the funds.
    Withdrawn,
    /// The payer reclaimed the funds.
    Invalidated,
}

impl RemittanceState {
    /// `true` for `Withdrawn` and `Invalidated`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RemittanceState::Withdrawn | RemittanceState::Invalidated)
    }
}

impl std::fmt::Display for RemittanceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemittanceState::Active => write!(f, "Active"),
            RemittanceState::Paused => write!(f, "Paused"),
            RemittanceState::Withdrawn => write!(f, "Withdrawn"),
            RemittanceState::Invalidated => write!(f, "Invalidated"),
        }
    }
}

/// Construction parameters of an escrow. The locked value and the
/// administrator come from the deploying call's context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemittanceParams {
    /// Identity that funds the escrow and may reclaim it after expiry.
    pub payer: Address,
    /// Identity that may withdraw with the secrets.
    pub recipient: Address,
    /// `hash_lib::commitment(payer, recipient, secret1, secret2)`.
    pub commitment: Commitment,
    /// Blocks from now until expiry.
    pub expiration_delta: u64,
}

impl RemittanceParams {
    /// Checks everything construction checks, without touching any state.
    /// Returns the expiration height an escrow deployed at `height` would get.
    ///
    /// # Errors
    ///
    /// Returns [`RemittanceError::InvalidArgument`] if either party is null,
    /// the parties are equal, `value` or `expiration_delta` is zero, the
    /// delta exceeds `block_limit`, or the expiration height would overflow.
    pub fn validate(&self, value: u64, block_limit: u64, height: u64) -> Result<u64, RemittanceError> {
        if self.payer.is_zero() {
            return Err(RemittanceError::InvalidArgument(
                "payer is the null identity".into(),
            ));
        }
        if self.recipient.is_zero() {
            return Err(RemittanceError::InvalidArgument(
                "recipient is the null identity".into(),
            ));
        }
        if self.payer == self.recipient {
            return Err(RemittanceError::InvalidArgument(
                "payer and recipient must differ".into(),
            ));
        }
        if value == 0 {
            return Err(RemittanceError::InvalidArgument(
                "escrow value must be positive".into(),
            ));
        }
        if self.expiration_delta == 0 {
            return Err(RemittanceError::InvalidArgument(
                "expiration delta must be positive".into(),
            ));
        }
        if self.expiration_delta > block_limit {
            return Err(RemittanceError::InvalidArgument(format!(
                "expiration delta {} exceeds block limit {}",
                self.expiration_delta, block_limit
            )));
        }
        height.checked_add(self.expiration_delta).ok_or_else(|| {
            RemittanceError::InvalidArgument("expiration height overflows".into())
        })
    }
}

/// A single dual-secret escrow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remittance {
    address: Address,
    payer: Address,
    recipient: Address,
    commitment: Commitment,
    created_at_height: u64,
    expiration_height: u64,
    balance: u64,
    state: RemittanceState,
    administrator: Address,
}

impl Remittance {
    /// Deploys an escrow directly, without a factory. The caller must be
    /// the payer: it funds the escrow with `ctx.value` and becomes its
    /// administrator. The horizon is [`DEFAULT_BLOCK_LIMIT`].
    ///
    /// Emits [`RemittanceEvent::EscrowCreated`].
    ///
    /// # Errors
    ///
    /// Returns [`RemittanceError::InvalidArgument`] if `params.payer` is not
    /// the caller or for bad parameters (see [`RemittanceParams::validate`]),
    /// and [`RemittanceError::Ledger`] if the caller cannot fund the escrow.
    /// Nothing changes on failure.
    pub fn deploy(
        env: &mut Env,
        ctx: &CallContext,
        params: RemittanceParams,
    ) -> Result<Self, RemittanceError> {
        if params.payer != ctx.caller {
            return Err(RemittanceError::InvalidArgument(format!(
                "payer {} is not the deploying caller {}",
                params.payer, ctx.caller
            )));
        }
        Self::instantiate(env, ctx, params, DEFAULT_BLOCK_LIMIT)
    }

    /// Creates an escrow funded with `ctx.value` taken from `ctx.caller`,
    /// which becomes the administrator. `params.payer` is trusted as given,
    /// so only the factory (which sets it to its own caller) and direct
    /// deployment reach this.
    pub(crate) fn instantiate(
        env: &mut Env,
        ctx: &CallContext,
        params: RemittanceParams,
        block_limit: u64,
    ) -> Result<Self, RemittanceError> {
        let expiration_height = params.validate(ctx.value, block_limit, env.height())?;

        env.atomically(|env| -> Result<Self, RemittanceError> {
            let address = env.ledger.next_contract_address(&ctx.caller);
            env.ledger.transfer(&ctx.caller, &address, ctx.value)?;
            env.ledger.bump_nonce(&ctx.caller)?;

            let remittance = Self {
                address,
                payer: params.payer,
                recipient: params.recipient,
                commitment: params.commitment,
                created_at_height: env.height(),
                expiration_height,
                balance: ctx.value,
                state: RemittanceState::Active,
                administrator: ctx.caller,
            };

            env.emit(
                address,
                RemittanceEvent::EscrowCreated {
                    escrow_id: address,
                    payer: params.payer,
                    recipient: params.recipient,
                },
            );

            info!(
                escrow = %address.short(),
                payer = %params.payer.short(),
                recipient = %params.recipient.short(),
                value = ctx.value,
                expiration_height,
                "escrow created"
            );

            Ok(remittance)
        })
    }

    // -- Queries -------------------------------------------------------------

    /// Identity of this escrow.
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn payer(&self) -> Address {
        self.payer
    }

    pub fn recipient(&self) -> Address {
        self.recipient
    }

    pub fn commitment(&self) -> Commitment {
        self.commitment
    }

    pub fn administrator(&self) -> Address {
        self.administrator
    }

    pub fn state(&self) -> RemittanceState {
        self.state
    }

    /// Locked value. Zero once settled.
    pub fn balance(&self) -> u64 {
        self.balance
    }

    /// Height at which the escrow was deployed.
    pub fn created_at_height(&self) -> u64 {
        self.created_at_height
    }

    /// First height at which withdrawal is refused and reclamation allowed.
    pub fn expiration_height(&self) -> u64 {
        self.expiration_height
    }

    /// `true` once `height` reaches the expiration height.
    pub fn is_expired(&self, height: u64) -> bool {
        height >= self.expiration_height
    }

    /// Blocks left for the recipient at `height`; zero once expired.
    pub fn blocks_remaining(&self, height: u64) -> u64 {
        self.expiration_height.saturating_sub(height)
    }

    /// `true` once withdrawn or invalidated.
    pub fn is_settled(&self) -> bool {
        self.state.is_terminal()
    }

    // -- Settlement ----------------------------------------------------------

    /// Recipient releases the locked value by presenting both secrets.
    ///
    /// Checks, in order: no attached value, caller is the recipient, escrow
    /// not settled, escrow not paused, height below expiration, secrets
    /// match the commitment. Returns the amount paid out.
    ///
    /// Emits [`RemittanceEvent::Withdrawn`].
    ///
    /// # Errors
    ///
    /// [`RemittanceError::Unauthorized`], [`RemittanceError::AlreadySettled`],
    /// [`RemittanceError::Paused`], [`RemittanceError::Expired`] or
    /// [`RemittanceError::HashMismatch`], matching the failed check.
    pub fn withdraw(
        &mut self,
        env: &mut Env,
        ctx: &CallContext,
        secret1: &[u8],
        secret2: &[u8],
    ) -> Result<u64, RemittanceError> {
        ctx.ensure_non_payable("withdraw")?;
        if ctx.caller != self.recipient {
            return Err(RemittanceError::Unauthorized {
                caller: ctx.caller,
                action: "withdraw",
            });
        }
        self.ensure_not_settled()?;
        if self.state == RemittanceState::Paused {
            return Err(RemittanceError::Paused);
        }
        let height = env.height();
        if self.is_expired(height) {
            return Err(RemittanceError::Expired {
                expiration_height: self.expiration_height,
                height,
            });
        }
        let presented = hash_lib::commitment(&self.payer, &self.recipient, secret1, secret2);
        if presented != self.commitment {
            debug!(escrow = %self.address.short(), "withdraw rejected: hash mismatch");
            return Err(RemittanceError::HashMismatch);
        }

        let recipient = self.recipient;
        let amount = self.settle(env, RemittanceState::Withdrawn, recipient)?;
        env.emit(self.address, RemittanceEvent::Withdrawn { recipient, amount });

        info!(
            escrow = %self.address.short(),
            recipient = %recipient.short(),
            amount,
            height,
            "escrow withdrawn"
        );
        Ok(amount)
    }

    /// Payer reclaims the locked value after expiry. Allowed while paused.
    /// Returns the amount paid back.
    ///
    /// Emits [`RemittanceEvent::Invalidated`].
    ///
    /// # Errors
    ///
    /// [`RemittanceError::Unauthorized`] if the caller is not the payer,
    /// [`RemittanceError::AlreadySettled`] if settled,
    /// [`RemittanceError::NotYetExpired`] before the expiration height.
    pub fn invalidate(&mut self, env: &mut Env, ctx: &CallContext) -> Result<u64, RemittanceError> {
        ctx.ensure_non_payable("invalidate")?;
        if ctx.caller != self.payer {
            return Err(RemittanceError::Unauthorized {
                caller: ctx.caller,
                action: "invalidate",
            });
        }
        self.ensure_not_settled()?;
        let height = env.height();
        if !self.is_expired(height) {
            return Err(RemittanceError::NotYetExpired {
                expiration_height: self.expiration_height,
                height,
            });
        }

        let payer = self.payer;
        let amount = self.settle(env, RemittanceState::Invalidated, payer)?;
        env.emit(self.address, RemittanceEvent::Invalidated { payer, amount });

        info!(
            escrow = %self.address.short(),
            payer = %payer.short(),
            amount,
            height,
            "escrow invalidated"
        );
        Ok(amount)
    }

    /// Zeroes the balance and enters `terminal`, then pays `to`.
    /// Restores both if the transfer fails.
    fn settle(
        &mut self,
        env: &mut Env,
        terminal: RemittanceState,
        to: Address,
    ) -> Result<u64, RemittanceError> {
        let amount = self.balance;
        let previous = self.state;
        self.balance = 0;
        self.state = terminal;

        if let Err(e) = env.ledger.transfer(&self.address, &to, amount) {
            self.balance = amount;
            self.state = previous;
            return Err(e.into());
        }
        Ok(amount)
    }

    fn ensure_not_settled(&self) -> Result<(), RemittanceError> {
        if self.state.is_terminal() {
            return Err(RemittanceError::AlreadySettled { state: self.state });
        }
        Ok(())
    }

    // -- Administration ------------------------------------------------------

    /// Freezes withdrawal. Administrator only; escrow must be `Active`.
    ///
    /// Emits [`RemittanceEvent::Paused`].
    pub fn pause(&mut self, env: &mut Env, ctx: &CallContext) -> Result<(), RemittanceError> {
        self.transition(ctx, "pause", RemittanceState::Active, RemittanceState::Paused)?;
        env.emit(self.address, RemittanceEvent::Paused { escrow_id: self.address });
        info!(escrow = %self.address.short(), "escrow paused");
        Ok(())
    }

    /// Lifts a pause. Administrator only; escrow must be `Paused`.
    ///
    /// Emits [`RemittanceEvent::Resumed`].
    pub fn resume(&mut self, env: &mut Env, ctx: &CallContext) -> Result<(), RemittanceError> {
        self.transition(ctx, "resume", RemittanceState::Paused, RemittanceState::Active)?;
        env.emit(self.address, RemittanceEvent::Resumed { escrow_id: self.address });
        info!(escrow = %self.address.short(), "escrow resumed");
        Ok(())
    }

    fn transition(
        &mut self,
        ctx: &CallContext,
        action: &'static str,
        from: RemittanceState,
        to: RemittanceState,
    ) -> Result<(), RemittanceError> {
        ctx.ensure_non_payable(action)?;
        self.ensure_administrator(ctx, action)?;
        self.ensure_not_settled()?;
        if self.state != from {
            return Err(RemittanceError::InvalidState {
                current: self.state,
                expected: from,
            });
        }
        self.state = to;
        Ok(())
    }

    /// Hands administration to `new_administrator`. Current administrator
    /// only. Allowed in any state; it never moves value.
    ///
    /// Emits [`RemittanceEvent::AdministratorChanged`].
    pub fn change_administrator(
        &mut self,
        env: &mut Env,
        ctx: &CallContext,
        new_administrator: Address,
    ) -> Result<(), RemittanceError> {
        ctx.ensure_non_payable("change administrator")?;
        self.ensure_administrator(ctx, "change administrator")?;
        if new_administrator.is_zero() {
            return Err(RemittanceError::InvalidArgument(
                "new administrator is the null identity".into(),
            ));
        }

        let previous = self.administrator;
        self.administrator = new_administrator;
        env.emit(
            self.address,
            RemittanceEvent::AdministratorChanged {
                escrow_id: self.address,
                previous,
                new: new_administrator,
            },
        );
        info!(
            escrow = %self.address.short(),
            previous = %previous.short(),
            new = %new_administrator.short(),
            "escrow administrator changed"
        );
        Ok(())
    }

    fn ensure_administrator(
        &self,
        ctx: &CallContext,
        action: &'static str,
    ) -> Result<(), RemittanceError> {
        if ctx.caller != self.administrator {
            return Err(RemittanceError::Unauthorized {
                caller: ctx.caller,
                action,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALUE: u64 = 990;
    const DELTA: u64 = 10;
    const LIMIT: u64 = 100;

    struct Fixture {
        env: Env,
        payer: Address,
        recipient: Address,
        admin: Address,
        escrow: Remittance,
    }

    fn setup() -> Fixture {
        let payer = Address::from_label("payer");
        let recipient = Address::from_label("recipient");
        let admin = Address::from_label("admin");
        let mut env = Env::new();
        env.ledger.mint(admin, 10_000).unwrap();

        let params = RemittanceParams {
            payer,
            recipient,
            commitment: hash_lib::commitment(&payer, &recipient, b"abc", b"xyz"),
            expiration_delta: DELTA,
        };
        let escrow =
            Remittance::instantiate(&mut env, &CallContext::with_value(admin, VALUE), params, LIMIT)
                .unwrap();

        Fixture {
            env,
            payer,
            recipient,
            admin,
            escrow,
        }
    }

    fn params(payer: Address, recipient: Address, delta: u64) -> RemittanceParams {
        RemittanceParams {
            payer,
            recipient,
            commitment: hash_lib::commitment(&payer, &recipient, b"a", b"b"),
            expiration_delta: delta,
        }
    }

    #[test]
    fn deploy_locks_value_and_starts_active() {
        let f = setup();
        assert_eq!(f.escrow.state(), RemittanceState::Active);
        assert_eq!(f.escrow.balance(), VALUE);
        assert_eq!(f.escrow.expiration_height(), DELTA);
        assert_eq!(f.escrow.administrator(), f.admin);
        assert_eq!(f.env.ledger.balance_of(&f.escrow.address()), VALUE);
        assert_eq!(f.env.ledger.balance_of(&f.admin), 10_000 - VALUE);
        assert!(matches!(
            f.env.log.last().unwrap().event,
            RemittanceEvent::EscrowCreated { .. }
        ));
    }

    #[test]
    fn deploy_rejects_bad_arguments() {
        let p = Address::from_label("p");
        let r = Address::from_label("r");
        let d = Address::from_label("deployer");
        let mut env = Env::new();
        env.ledger.mint(d, 1_000).unwrap();
        let ctx = CallContext::with_value(d, 100);

        let cases = [
            params(Address::ZERO, r, 5),
            params(p, Address::ZERO, 5),
            params(p, p, 5),
            params(p, r, 0),
            params(p, r, LIMIT + 1),
        ];
        for case in cases {
            let result = Remittance::instantiate(&mut env, &ctx, case, LIMIT);
            assert!(
                matches!(result, Err(RemittanceError::InvalidArgument(_))),
                "{case:?} should be rejected"
            );
        }

        let zero_value =
            Remittance::instantiate(&mut env, &CallContext::new(d), params(p, r, 5), LIMIT);
        assert!(matches!(zero_value, Err(RemittanceError::InvalidArgument(_))));

        assert_eq!(env.ledger.balance_of(&d), 1_000);
        assert!(env.log.is_empty());
    }

    #[test]
    fn deploy_at_block_limit_is_allowed() {
        let p = Address::from_label("p");
        let r = Address::from_label("r");
        let mut env = Env::new();
        env.ledger.mint(p, 10).unwrap();
        let escrow =
            Remittance::instantiate(&mut env, &CallContext::with_value(p, 10), params(p, r, LIMIT), LIMIT)
                .unwrap();
        assert_eq!(escrow.expiration_height(), LIMIT);
    }

    #[test]
    fn deploy_without_funds_changes_nothing() {
        let p = Address::from_label("p");
        let r = Address::from_label("r");
        let mut env = Env::new();
        let result =
            Remittance::deploy(&mut env, &CallContext::with_value(p, 10), params(p, r, 5));
        assert!(matches!(result, Err(RemittanceError::Ledger(_))));
        assert_eq!(env.ledger.next_contract_address(&p), Address::derive_contract(&p, 0));
    }

    #[test]
    fn direct_deploy_requires_caller_to_be_payer() {
        let p = Address::from_label("p");
        let r = Address::from_label("r");
        let x = Address::from_label("x");
        let mut env = Env::new();
        env.ledger.mint(x, 100).unwrap();

        let result =
            Remittance::deploy(&mut env, &CallContext::with_value(x, 100), params(p, r, 5));
        assert!(matches!(result, Err(RemittanceError::InvalidArgument(_))));
        assert_eq!(env.ledger.balance_of(&x), 100);
        assert!(env.log.is_empty());
    }

    #[test]
    fn direct_deploy_is_bounded_by_default_block_limit() {
        let p = Address::from_label("p");
        let r = Address::from_label("r");
        let mut env = Env::new();
        env.ledger.mint(p, 100).unwrap();
        let ctx = CallContext::with_value(p, 10);

        let beyond = Remittance::deploy(&mut env, &ctx, params(p, r, DEFAULT_BLOCK_LIMIT + 1));
        assert!(matches!(beyond, Err(RemittanceError::InvalidArgument(_))));
        let huge = Remittance::deploy(&mut env, &ctx, params(p, r, u64::MAX - 1));
        assert!(matches!(huge, Err(RemittanceError::InvalidArgument(_))));

        let at_limit =
            Remittance::deploy(&mut env, &ctx, params(p, r, DEFAULT_BLOCK_LIMIT)).unwrap();
        assert_eq!(at_limit.expiration_height(), DEFAULT_BLOCK_LIMIT);
        assert_eq!(at_limit.administrator(), p);
    }

    #[test]
    fn withdraw_pays_recipient_once() {
        let mut f = setup();
        let ctx = CallContext::new(f.recipient);
        let paid = f.escrow.withdraw(&mut f.env, &ctx, b"abc", b"xyz").unwrap();

        assert_eq!(paid, VALUE);
        assert_eq!(f.escrow.state(), RemittanceState::Withdrawn);
        assert_eq!(f.escrow.balance(), 0);
        assert_eq!(f.env.ledger.balance_of(&f.recipient), VALUE);

        let again = f.escrow.withdraw(&mut f.env, &ctx, b"abc", b"xyz");
        assert_eq!(
            again,
            Err(RemittanceError::AlreadySettled {
                state: RemittanceState::Withdrawn
            })
        );
    }

    #[test]
    fn withdraw_requires_recipient() {
        let mut f = setup();
        let result = f
            .escrow
            .withdraw(&mut f.env, &CallContext::new(f.payer), b"abc", b"xyz");
        assert!(matches!(result, Err(RemittanceError::Unauthorized { .. })));
        assert_eq!(f.escrow.balance(), VALUE);
    }

    #[test]
    fn withdraw_with_wrong_or_swapped_secrets_fails() {
        let mut f = setup();
        let ctx = CallContext::new(f.recipient);
        assert_eq!(
            f.escrow.withdraw(&mut f.env, &ctx, b"abc", b"xyz!"),
            Err(RemittanceError::HashMismatch)
        );
        assert_eq!(
            f.escrow.withdraw(&mut f.env, &ctx, b"xyz", b"abc"),
            Err(RemittanceError::HashMismatch)
        );
        assert_eq!(f.escrow.state(), RemittanceState::Active);
    }

    #[test]
    fn withdraw_at_expiration_height_fails() {
        let mut f = setup();
        f.env.ledger.advance(DELTA - 1).unwrap();
        assert!(!f.escrow.is_expired(f.env.height()));
        assert_eq!(f.escrow.blocks_remaining(f.env.height()), 1);

        f.env.ledger.advance(1).unwrap();
        let result = f
            .escrow
            .withdraw(&mut f.env, &CallContext::new(f.recipient), b"abc", b"xyz");
        assert_eq!(
            result,
            Err(RemittanceError::Expired {
                expiration_height: DELTA,
                height: DELTA
            })
        );
    }

    #[test]
    fn withdraw_rejects_attached_value() {
        let mut f = setup();
        let result = f.escrow.withdraw(
            &mut f.env,
            &CallContext::with_value(f.recipient, 1),
            b"abc",
            b"xyz",
        );
        assert!(matches!(result, Err(RemittanceError::InvalidArgument(_))));
    }

    #[test]
    fn invalidate_before_expiry_fails() {
        let mut f = setup();
        f.env.ledger.advance(DELTA - 1).unwrap();
        let result = f.escrow.invalidate(&mut f.env, &CallContext::new(f.payer));
        assert!(matches!(result, Err(RemittanceError::NotYetExpired { .. })));
    }

    #[test]
    fn invalidate_requires_payer() {
        let mut f = setup();
        f.env.ledger.advance(DELTA).unwrap();
        for caller in [f.recipient, f.admin] {
            let result = f.escrow.invalidate(&mut f.env, &CallContext::new(caller));
            assert!(matches!(result, Err(RemittanceError::Unauthorized { .. })));
        }
    }

    #[test]
    fn invalidate_after_expiry_refunds_payer_once() {
        let mut f = setup();
        f.env.ledger.advance(DELTA).unwrap();
        let ctx = CallContext::new(f.payer);
        assert_eq!(f.escrow.invalidate(&mut f.env, &ctx).unwrap(), VALUE);
        assert_eq!(f.escrow.state(), RemittanceState::Invalidated);
        assert_eq!(f.env.ledger.balance_of(&f.payer), VALUE);

        assert_eq!(
            f.escrow.invalidate(&mut f.env, &ctx),
            Err(RemittanceError::AlreadySettled {
                state: RemittanceState::Invalidated
            })
        );
        // A settled escrow reports AlreadySettled before anything else.
        assert_eq!(
            f.escrow
                .withdraw(&mut f.env, &CallContext::new(f.recipient), b"abc", b"xyz"),
            Err(RemittanceError::AlreadySettled {
                state: RemittanceState::Invalidated
            })
        );
    }

    #[test]
    fn pause_blocks_withdraw_but_not_invalidate() {
        let mut f = setup();
        f.escrow.pause(&mut f.env, &CallContext::new(f.admin)).unwrap();
        assert_eq!(
            f.escrow
                .withdraw(&mut f.env, &CallContext::new(f.recipient), b"abc", b"xyz"),
            Err(RemittanceError::Paused)
        );

        f.env.ledger.advance(DELTA).unwrap();
        let refunded = f
            .escrow
            .invalidate(&mut f.env, &CallContext::new(f.payer))
            .unwrap();
        assert_eq!(refunded, VALUE);
        assert_eq!(f.escrow.state(), RemittanceState::Invalidated);
    }

    #[test]
    fn pause_resume_preserves_terms() {
        let mut f = setup();
        let before = f.escrow.clone();
        let admin = CallContext::new(f.admin);

        f.escrow.pause(&mut f.env, &admin).unwrap();
        assert_eq!(f.escrow.state(), RemittanceState::Paused);
        f.escrow.resume(&mut f.env, &admin).unwrap();

        assert_eq!(f.escrow, before);
    }

    #[test]
    fn pause_and_resume_check_state() {
        let mut f = setup();
        let admin = CallContext::new(f.admin);
        assert_eq!(
            f.escrow.resume(&mut f.env, &admin),
            Err(RemittanceError::InvalidState {
                current: RemittanceState::Active,
                expected: RemittanceState::Paused
            })
        );
        f.escrow.pause(&mut f.env, &admin).unwrap();
        assert!(matches!(
            f.escrow.pause(&mut f.env, &admin),
            Err(RemittanceError::InvalidState { .. })
        ));
    }

    #[test]
    fn pause_after_settlement_fails() {
        let mut f = setup();
        f.escrow
            .withdraw(&mut f.env, &CallContext::new(f.recipient), b"abc", b"xyz")
            .unwrap();
        assert!(matches!(
            f.escrow.pause(&mut f.env, &CallContext::new(f.admin)),
            Err(RemittanceError::AlreadySettled { .. })
        ));
    }

    #[test]
    fn only_administrator_pauses() {
        let mut f = setup();
        for caller in [f.payer, f.recipient] {
            assert!(matches!(
                f.escrow.pause(&mut f.env, &CallContext::new(caller)),
                Err(RemittanceError::Unauthorized { .. })
            ));
        }
    }

    #[test]
    fn administrator_handover() {
        let mut f = setup();
        let new_admin = Address::from_label("new-admin");
        f.escrow
            .change_administrator(&mut f.env, &CallContext::new(f.admin), new_admin)
            .unwrap();
        assert_eq!(f.escrow.administrator(), new_admin);

        // The old administrator lost its rights.
        assert!(f.escrow.pause(&mut f.env, &CallContext::new(f.admin)).is_err());
        f.escrow.pause(&mut f.env, &CallContext::new(new_admin)).unwrap();

        assert!(matches!(
            f.escrow
                .change_administrator(&mut f.env, &CallContext::new(new_admin), Address::ZERO),
            Err(RemittanceError::InvalidArgument(_))
        ));
    }

    #[test]
    fn failed_transfer_restores_escrow() {
        let mut f = setup();
        // Drain the escrow's ledger account behind its back.
        let sink = Address::from_label("sink");
        f.env
            .ledger
            .transfer(&f.escrow.address(), &sink, VALUE)
            .unwrap();

        let result = f
            .escrow
            .withdraw(&mut f.env, &CallContext::new(f.recipient), b"abc", b"xyz");
        assert!(matches!(result, Err(RemittanceError::Ledger(_))));
        assert_eq!(f.escrow.state(), RemittanceState::Active);
        assert_eq!(f.escrow.balance(), VALUE);
    }
}
