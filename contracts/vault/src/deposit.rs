//! # Deposit Flow
//!
//! The pooled asset is pushed with `ft_transfer_call(registry, D, msg)`.
//! `D` comes from the asset contract, never from a caller argument. The
//! receiver must already be registered for the vault's shares. The deposit
//! is quoted up front so any error aborts the receipt and the asset
//! contract refunds the sender. The vault is then locked, `D` is staked, and
//! shares are minted in [`Contract::on_deposit_staked`] for the amount the
//! farm actually accepted. Whatever the farm refused is returned as unused
//! and refunded by the asset contract.
//!
//! When the accepted part cannot be minted (below the first-deposit
//! minimum, or below the caller's `min_shares` scaled to the accepted
//! amount) the vault keeps its lock and unstakes that part again for the
//! receiver. Stake the farm will not release is parked as stranded and can
//! be retried with [`Contract::reclaim_stake`].

use near_contract_standards::fungible_token::receiver::FungibleTokenReceiver;
use near_sdk::json_types::U128;
use near_sdk::serde::Deserialize;
use near_sdk::{assert_one_yocto, env, near, AccountId, Promise, PromiseError, PromiseOrValue};

use crate::adapters;
use crate::constants::{GAS_FOR_ON_DEPOSIT_STAKED, GAS_FOR_ON_STAKE_RELEASED};
use crate::engine::events::{OperationFailed, VaultDeposit};
use crate::engine::mul_div::mul_div;
use crate::engine::Operation;
use crate::errors::{OrPanic, VaultError};
use crate::{Contract, ContractExt};

/// `ft_on_transfer` message of a deposit.
#[derive(Deserialize, Debug)]
#[serde(crate = "near_sdk::serde")]
pub struct DepositMessage {
    pub pool_id: u64,
    /// Defaults to the sender.
    pub receiver_id: Option<AccountId>,
    /// Rejects the deposit if fewer shares would be minted.
    pub min_shares: Option<U128>,
}

#[near]
impl FungibleTokenReceiver for Contract {
    fn ft_on_transfer(
        &mut self,
        sender_id: AccountId,
        amount: U128,
        msg: String,
    ) -> PromiseOrValue<U128> {
        let message: DepositMessage = serde_json::from_str(&msg)
            .unwrap_or_else(|_| env::panic_str(&VaultError::InvalidMessage.to_string()));

        let promise = self
            .internal_deposit(env::predecessor_account_id(), sender_id, amount.0, message)
            .or_panic();
        PromiseOrValue::Promise(promise)
    }
}

#[near]
impl Contract {
    /// Mints shares for the stake the farm accepted and returns the amount
    /// to refund to the sender.
    #[private]
    pub fn on_deposit_staked(
        &mut self,
        pool_id: u64,
        sender_id: AccountId,
        receiver_id: AccountId,
        amount: U128,
        min_shares: U128,
        #[callback_result] used: Result<U128, PromiseError>,
    ) -> U128 {
        let used = used.map(|used| used.0.min(amount.0)).unwrap_or(0);
        self.internal_settle_deposit(pool_id, &sender_id, &receiver_id, amount.0, min_shares.0, used)
    }

    /// Forwards stake released for a deposit that minted no shares.
    #[private]
    pub fn on_stake_released(
        &mut self,
        pool_id: u64,
        owner_id: AccountId,
        amount: U128,
        #[callback_result] released: Result<U128, PromiseError>,
    ) -> PromiseOrValue<U128> {
        let released = released.map(|released| released.0.min(amount.0)).ok();
        self.internal_settle_release(pool_id, owner_id, amount.0, released)
    }

    /// Retries the release of the caller's stranded stake.
    ///
    /// # Panics
    ///
    /// Panics unless exactly one yoctoNEAR is attached, or if the vault is
    /// locked or the caller has nothing stranded.
    #[payable]
    pub fn reclaim_stake(&mut self, pool_id: u64) -> Promise {
        assert_one_yocto();
        let owner_id = env::predecessor_account_id();
        self.internal_reclaim_stake(pool_id, owner_id).or_panic()
    }
}

impl Contract {
    pub(crate) fn internal_deposit(
        &mut self,
        asset_id: AccountId,
        sender_id: AccountId,
        amount: u128,
        message: DepositMessage,
    ) -> Result<Promise, VaultError> {
        let pool_id = message.pool_id;
        let receiver_id = message.receiver_id.unwrap_or_else(|| sender_id.clone());
        let min_shares = message.min_shares.map_or(0, |min_shares| min_shares.0);
        let farm_id = self.config.farm_id.clone();
        let vault = self.vault_mut(pool_id)?;

        if asset_id != vault.pooled_asset {
            return Err(VaultError::UnexpectedAsset {
                expected: vault.pooled_asset.clone(),
                actual: asset_id,
            });
        }
        if !vault.shares().is_registered(&receiver_id) {
            return Err(VaultError::NotRegistered(receiver_id));
        }

        let quote = vault.quote_deposit(amount)?;
        if quote.shares < min_shares {
            return Err(VaultError::SlippageNotMet {
                minimum: min_shares,
                actual: quote.shares,
            });
        }
        vault.begin(Operation::Deposit)?;

        env::log_str(&format!(
            "deposit_started pool={pool_id} sender={sender_id} amount={amount} quoted_shares={}",
            quote.shares
        ));

        Ok(
            adapters::stake(farm_id, vault.pooled_asset.clone(), pool_id, amount).then(
                Self::ext(env::current_account_id())
                    .with_static_gas(GAS_FOR_ON_DEPOSIT_STAKED)
                    .on_deposit_staked(
                        pool_id,
                        sender_id,
                        receiver_id,
                        U128(amount),
                        U128(min_shares),
                    ),
            ),
        )
    }

    pub(crate) fn internal_settle_deposit(
        &mut self,
        pool_id: u64,
        sender_id: &AccountId,
        receiver_id: &AccountId,
        amount: u128,
        min_shares: u128,
        used: u128,
    ) -> U128 {
        let farm_id = self.config.farm_id.clone();
        let vault = match self.vault_mut(pool_id) {
            Ok(vault) => vault,
            Err(err) => {
                env::log_str(&format!("deposit_refunded pool={pool_id} amount={amount} reason={err}"));
                return U128(amount);
            }
        };

        if used == 0 {
            vault.finish();
            OperationFailed {
                pool_id,
                operation: Operation::Deposit,
                reason: "stake_failed",
            }
            .emit();
            env::log_str(&format!("deposit_refunded pool={pool_id} amount={amount}"));
            return U128(amount);
        }

        let min_accepted = mul_div(min_shares, used, amount).unwrap_or(min_shares);
        match vault.apply_deposit(receiver_id, used, min_accepted) {
            Ok(quote) => {
                vault.finish();
                VaultDeposit {
                    pool_id,
                    sender_id,
                    receiver_id,
                    amount: U128(used),
                    shares: U128(quote.shares),
                }
                .emit();
            }
            Err(err) => {
                OperationFailed {
                    pool_id,
                    operation: Operation::Deposit,
                    reason: "mint_failed",
                }
                .emit();
                env::log_str(&format!(
                    "deposit_unminted pool={pool_id} sender={sender_id} amount={used} reason={err}"
                ));

                // The farm kept `used` minus its fee; hand that back to the
                // receiver. The lock is held until the release settles.
                let net = vault.net_of_fee(used).unwrap_or(0);
                if net == 0 {
                    vault.finish();
                } else {
                    Self::release_stake(farm_id, pool_id, receiver_id.clone(), net);
                }
            }
        }

        U128(amount - used)
    }

    pub(crate) fn internal_reclaim_stake(
        &mut self,
        pool_id: u64,
        owner_id: AccountId,
    ) -> Result<Promise, VaultError> {
        let farm_id = self.config.farm_id.clone();
        let vault = self.vault_mut(pool_id)?;

        if vault.stranded_of(&owner_id) == 0 {
            return Err(VaultError::NothingToReclaim);
        }
        vault.begin(Operation::Deposit)?;
        let amount = vault.take_stranded(&owner_id)?;

        env::log_str(&format!("stake_reclaim_started pool={pool_id} owner={owner_id} amount={amount}"));
        Ok(Self::release_stake(farm_id, pool_id, owner_id, amount))
    }

    /// `released` is `None` when the unstake failed.
    pub(crate) fn internal_settle_release(
        &mut self,
        pool_id: u64,
        owner_id: AccountId,
        amount: u128,
        released: Option<u128>,
    ) -> PromiseOrValue<U128> {
        let vault = match self.vault_mut(pool_id) {
            Ok(vault) => vault,
            Err(err) => {
                env::log_str(&format!("stake_unreleased pool={pool_id} reason={err}"));
                return PromiseOrValue::Value(U128(0));
            }
        };

        let Some(released) = released else {
            vault.finish();
            if let Err(err) = vault.credit_stranded(&owner_id, amount) {
                env::log_str(&format!(
                    "stake_lost pool={pool_id} owner={owner_id} amount={amount} reason={err}"
                ));
            }
            OperationFailed {
                pool_id,
                operation: Operation::Deposit,
                reason: "unstake_failed",
            }
            .emit();
            env::log_str(&format!("stake_stranded pool={pool_id} owner={owner_id} amount={amount}"));
            return PromiseOrValue::Value(U128(0));
        };

        if released == 0 {
            vault.finish();
            return PromiseOrValue::Value(U128(0));
        }
        PromiseOrValue::Promise(Self::payout(
            vault.pooled_asset.clone(),
            pool_id,
            owner_id.clone(),
            owner_id,
            released,
        ))
    }

    fn release_stake(farm_id: AccountId, pool_id: u64, owner_id: AccountId, amount: u128) -> Promise {
        adapters::unstake(farm_id, pool_id, amount).then(
            Self::ext(env::current_account_id())
                .with_static_gas(GAS_FOR_ON_STAKE_RELEASED)
                .on_stake_released(pool_id, owner_id, U128(amount)),
        )
    }
}
