//! # Redeem Flow
//!
//! Holders push shares to the registry account with `share_transfer` and then
//! call [`Contract::redeem`]. The redeemed amount is whatever the caller
//! pushed, never a caller argument. The vault is locked while the farm
//! releases the stake; shares are burned in [`Contract::on_redeem_unstaked`],
//! which forwards the pooled asset the farm actually released. The lock is
//! held until the payout transfer resolves. A payout whose transfer fails is
//! parked under the holder and can be retried with
//! [`Contract::claim_payout`].

use near_sdk::json_types::U128;
use near_sdk::{assert_one_yocto, env, near, AccountId, Promise, PromiseError, PromiseOrValue};

use crate::adapters;
use crate::constants::{GAS_FOR_ON_PAYOUT_TRANSFERRED, GAS_FOR_ON_REDEEM_UNSTAKED};
use crate::engine::events::{OperationFailed, VaultRedeem};
use crate::engine::{Operation, RedeemQuote};
use crate::errors::{OrPanic, VaultError};
use crate::{Contract, ContractExt};

#[near]
impl Contract {
    /// Redeems every share the caller pushed into custody.
    ///
    /// # Arguments
    ///
    /// * `pool_id` - Vault to redeem from
    /// * `receiver_id` - Receiver of the pooled asset, defaults to the caller
    ///
    /// # Panics
    ///
    /// Panics unless exactly one yoctoNEAR is attached, or if the vault is
    /// locked or the caller has nothing to redeem.
    #[payable]
    pub fn redeem(&mut self, pool_id: u64, receiver_id: Option<AccountId>) -> Promise {
        assert_one_yocto();
        let holder_id = env::predecessor_account_id();
        let receiver_id = receiver_id.unwrap_or_else(|| holder_id.clone());
        self.internal_redeem(pool_id, holder_id, receiver_id)
            .or_panic()
    }

    #[private]
    pub fn on_redeem_unstaked(
        &mut self,
        pool_id: u64,
        holder_id: AccountId,
        receiver_id: AccountId,
        shares: U128,
        amount: U128,
        #[callback_result] released: Result<U128, PromiseError>,
    ) -> PromiseOrValue<U128> {
        let quote = RedeemQuote {
            shares: shares.0,
            amount: amount.0,
        };
        let released = released.map(|released| released.0.min(amount.0)).ok();
        self.internal_settle_redeem(pool_id, holder_id, receiver_id, quote, released)
    }

    /// Retries a parked payout of the caller, to the caller.
    ///
    /// # Panics
    ///
    /// Panics unless exactly one yoctoNEAR is attached, or if the vault is
    /// locked or nothing is parked for the caller.
    #[payable]
    pub fn claim_payout(&mut self, pool_id: u64) -> Promise {
        assert_one_yocto();
        let account_id = env::predecessor_account_id();
        self.internal_claim_payout(pool_id, account_id).or_panic()
    }

    /// Releases the vault lock and returns the amount delivered. A failed
    /// transfer is parked for `owner_id`.
    #[private]
    pub fn on_payout_transferred(
        &mut self,
        pool_id: u64,
        owner_id: AccountId,
        amount: U128,
        #[callback_result] transferred: Result<(), PromiseError>,
    ) -> U128 {
        self.internal_resolve_payout(pool_id, &owner_id, amount.0, transferred.is_ok())
    }
}

impl Contract {
    pub(crate) fn internal_redeem(
        &mut self,
        pool_id: u64,
        holder_id: AccountId,
        receiver_id: AccountId,
    ) -> Result<Promise, VaultError> {
        let custody = env::current_account_id();
        let farm_id = self.config.farm_id.clone();
        let vault = self.vault_mut(pool_id)?;

        let quote = vault.quote_redeem(&holder_id, &custody)?;
        vault.begin(Operation::Redeem)?;

        env::log_str(&format!(
            "redeem_started pool={pool_id} holder={holder_id} shares={} amount={}",
            quote.shares, quote.amount
        ));

        Ok(adapters::unstake(farm_id, pool_id, quote.amount).then(
            Self::ext(custody)
                .with_static_gas(GAS_FOR_ON_REDEEM_UNSTAKED)
                .on_redeem_unstaked(
                    pool_id,
                    holder_id,
                    receiver_id,
                    U128(quote.shares),
                    U128(quote.amount),
                ),
        ))
    }

    /// `released` is `None` when the unstake failed.
    pub(crate) fn internal_settle_redeem(
        &mut self,
        pool_id: u64,
        holder_id: AccountId,
        receiver_id: AccountId,
        quote: RedeemQuote,
        released: Option<u128>,
    ) -> PromiseOrValue<U128> {
        let custody = env::current_account_id();
        let vault = match self.vault_mut(pool_id) {
            Ok(vault) => vault,
            Err(err) => {
                env::log_str(&format!("redeem_unsettled pool={pool_id} reason={err}"));
                return PromiseOrValue::Value(U128(0));
            }
        };

        let Some(released) = released else {
            vault.finish();
            OperationFailed {
                pool_id,
                operation: Operation::Redeem,
                reason: "unstake_failed",
            }
            .emit();
            env::log_str(&format!("redeem_failed pool={pool_id} holder={holder_id}"));
            return PromiseOrValue::Value(U128(0));
        };

        // The farm debited the full quoted amount; any shortfall is its
        // withdrawal fee.
        if let Err(err) = vault.apply_redeem(&holder_id, &custody, quote) {
            vault.finish();
            vault.idle_liquidity = vault.idle_liquidity.saturating_add(released);
            env::log_str(&format!(
                "redeem_unsettled pool={pool_id} holder={holder_id} released={released} reason={err}"
            ));
            return PromiseOrValue::Value(U128(0));
        }

        VaultRedeem {
            pool_id,
            receiver_id: &receiver_id,
            shares: U128(quote.shares),
            amount: U128(released),
        }
        .emit();

        if released == 0 {
            vault.finish();
            return PromiseOrValue::Value(U128(0));
        }
        PromiseOrValue::Promise(Self::payout(
            vault.pooled_asset.clone(),
            pool_id,
            holder_id,
            receiver_id,
            released,
        ))
    }

    pub(crate) fn internal_claim_payout(
        &mut self,
        pool_id: u64,
        account_id: AccountId,
    ) -> Result<Promise, VaultError> {
        let vault = self.vault_mut(pool_id)?;
        if vault.unclaimed_of(&account_id) == 0 {
            return Err(VaultError::NothingToClaim);
        }
        vault.begin(Operation::Redeem)?;
        let amount = vault.take_unclaimed(&account_id)?;

        env::log_str(&format!("payout_claimed pool={pool_id} account={account_id} amount={amount}"));
        Ok(Self::payout(
            vault.pooled_asset.clone(),
            pool_id,
            account_id.clone(),
            account_id,
            amount,
        ))
    }

    pub(crate) fn internal_resolve_payout(
        &mut self,
        pool_id: u64,
        owner_id: &AccountId,
        amount: u128,
        delivered: bool,
    ) -> U128 {
        let vault = match self.vault_mut(pool_id) {
            Ok(vault) => vault,
            Err(err) => {
                env::log_str(&format!("payout_unresolved pool={pool_id} reason={err}"));
                return U128(0);
            }
        };
        vault.finish();
        if delivered {
            return U128(amount);
        }

        match vault.credit_unclaimed(owner_id, amount) {
            Ok(()) => env::log_str(&format!(
                "payout_parked pool={pool_id} owner={owner_id} amount={amount}"
            )),
            Err(err) => env::log_str(&format!(
                "payout_lost pool={pool_id} owner={owner_id} amount={amount} reason={err}"
            )),
        }
        U128(0)
    }

    /// Transfers `amount` of the pooled asset to `receiver_id`. A failed
    /// transfer is parked for `owner_id`, whose registration covers it.
    pub(crate) fn payout(
        pooled_asset: AccountId,
        pool_id: u64,
        owner_id: AccountId,
        receiver_id: AccountId,
        amount: u128,
    ) -> Promise {
        adapters::transfer(pooled_asset, receiver_id, amount).then(
            Self::ext(env::current_account_id())
                .with_static_gas(GAS_FOR_ON_PAYOUT_TRANSFERRED)
                .on_payout_transferred(pool_id, owner_id, U128(amount)),
        )
    }
}
