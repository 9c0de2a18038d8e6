//! # Share Token Methods
//!
//! Balance, transfer, allowance and NEP-145 storage methods of each vault's
//! share token. Every method takes the `pool_id` of the vault whose shares
//! it touches. Sending shares to the registry account marks them redeemable
//! by the sender (see [`Contract::redeem`]).
//!
//! An account must hold a storage registration with the vault before it
//! can receive shares. Allowances are paid per call: `share_approve` charges
//! the storage it adds and refunds the rest of the attached deposit.

use near_contract_standards::storage_management::{StorageBalance, StorageBalanceBounds};
use near_sdk::json_types::U128;
use near_sdk::{assert_one_yocto, env, near, AccountId, NearToken, Promise, StorageUsage};

use crate::errors::{OrPanic, VaultError};
use crate::{Contract, ContractExt};

#[near]
impl Contract {
    pub fn share_balance_of(&self, pool_id: u64, account_id: AccountId) -> U128 {
        U128(self.vault(pool_id).or_panic().shares().balance_of(&account_id))
    }

    pub fn share_total_supply(&self, pool_id: u64) -> U128 {
        U128(self.vault(pool_id).or_panic().total_shares())
    }

    pub fn share_allowance(&self, pool_id: u64, owner_id: AccountId, spender_id: AccountId) -> U128 {
        U128(
            self.vault(pool_id)
                .or_panic()
                .shares()
                .allowance(&owner_id, &spender_id),
        )
    }

    /// Shares `account_id` has pushed into custody and may redeem.
    pub fn get_redeemable_shares(&self, pool_id: u64, account_id: AccountId) -> U128 {
        U128(self.vault(pool_id).or_panic().redeemable_of(&account_id))
    }

    #[payable]
    pub fn share_transfer(&mut self, pool_id: u64, receiver_id: AccountId, amount: U128) {
        assert_one_yocto();
        let sender_id = env::predecessor_account_id();
        let custody = env::current_account_id();
        self.vault_mut(pool_id)
            .and_then(|vault| vault.transfer_shares(&sender_id, &receiver_id, amount.0, &custody))
            .or_panic();
    }

    /// Sets the allowance of `spender_id` over the caller's shares.
    ///
    /// # Panics
    ///
    /// Panics if nothing is attached, the caller is not registered, or the
    /// attached deposit does not cover the storage the allowance adds.
    #[payable]
    pub fn share_approve(&mut self, pool_id: u64, spender_id: AccountId, amount: U128) {
        if env::attached_deposit().is_zero() {
            env::panic_str(&VaultError::DepositRequired.to_string());
        }
        let owner_id = env::predecessor_account_id();
        let initial_storage = env::storage_usage();

        self.vault_mut(pool_id)
            .and_then(|vault| vault.approve_shares(&owner_id, &spender_id, amount.0))
            .or_panic();
        refund_storage_deposit(initial_storage).or_panic();
    }

    #[payable]
    pub fn share_transfer_from(
        &mut self,
        pool_id: u64,
        owner_id: AccountId,
        receiver_id: AccountId,
        amount: U128,
    ) {
        assert_one_yocto();
        let spender_id = env::predecessor_account_id();
        let custody = env::current_account_id();
        self.vault_mut(pool_id)
            .and_then(|vault| {
                vault.transfer_shares_from(&spender_id, &owner_id, &receiver_id, amount.0, &custody)
            })
            .or_panic();
    }

    // ========================================================================
    // Storage registration (NEP-145)
    // ========================================================================

    /// Registers `account_id` (default: the caller) for the vault's shares.
    /// Anything above the minimum balance is refunded.
    #[payable]
    pub fn share_storage_deposit(
        &mut self,
        pool_id: u64,
        account_id: Option<AccountId>,
        registration_only: Option<bool>,
    ) -> StorageBalance {
        self.vault_mut(pool_id)
            .or_panic()
            .shares
            .storage_deposit(account_id, registration_only)
    }

    pub fn share_storage_balance_of(
        &self,
        pool_id: u64,
        account_id: AccountId,
    ) -> Option<StorageBalance> {
        self.vault(pool_id)
            .or_panic()
            .shares()
            .storage_balance_of(account_id)
    }

    pub fn share_storage_balance_bounds(&self, pool_id: u64) -> StorageBalanceBounds {
        self.vault(pool_id).or_panic().shares().storage_balance_bounds()
    }

    /// Unregisters the caller and returns its storage deposit. With `force`
    /// the remaining shares are burned.
    ///
    /// # Panics
    ///
    /// Panics unless exactly one yoctoNEAR is attached, while the vault is
    /// locked, or while the caller still has shares awaiting redemption,
    /// a parked payout or stranded stake.
    #[payable]
    pub fn share_storage_unregister(&mut self, pool_id: u64, force: Option<bool>) -> bool {
        assert_one_yocto();
        let account_id = env::predecessor_account_id();
        self.vault_mut(pool_id)
            .and_then(|vault| vault.unregister_holder(&account_id, force))
            .or_panic()
    }
}

/// Charges the storage added since `initial_storage` to the attached
/// deposit and refunds the rest to the caller.
fn refund_storage_deposit(initial_storage: StorageUsage) -> Result<(), VaultError> {
    let attached = env::attached_deposit().as_yoctonear();
    let added = env::storage_usage().saturating_sub(initial_storage);
    let required = env::storage_byte_cost()
        .as_yoctonear()
        .checked_mul(u128::from(added))
        .ok_or(VaultError::MathOverflow)?;
    if attached < required {
        return Err(VaultError::InsufficientStorageDeposit { required, attached });
    }

    let refund = attached - required;
    if refund > 1 {
        Promise::new(env::predecessor_account_id()).transfer(NearToken::from_yoctonear(refund));
    }
    Ok(())
}
