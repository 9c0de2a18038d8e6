//! # Share Ledger
//!
//! Per-vault share token. Balances and total supply live in a NEP-141
//! [`FungibleToken`] under the vault's own storage prefix, so a holder must
//! register with a NEP-145 storage deposit before it can receive shares.
//! Allowances sit beside the token; creating one is paid by the caller (see
//! `share_approve`).
//!
//! `mint` and `burn` are reserved to the vault engine. Every mutating method
//! validates before it writes, so a failed call leaves the ledger untouched
//! and never reaches one of `FungibleToken`'s internal panics.

use near_contract_standards::fungible_token::FungibleToken;
use near_contract_standards::storage_management::{
    StorageBalance, StorageBalanceBounds, StorageManagement,
};
use near_sdk::collections::LookupMap;
use near_sdk::{near, AccountId, IntoStorageKey, StorageUsage};

use crate::errors::VaultError;

#[near(serializers = [borsh])]
pub struct ShareLedger {
    token: FungibleToken,
    allowances: LookupMap<(AccountId, AccountId), u128>,
}

impl ShareLedger {
    pub fn new<T, A>(token_prefix: T, allowances_prefix: A) -> Self
    where
        T: IntoStorageKey,
        A: IntoStorageKey,
    {
        Self {
            token: FungibleToken::new(token_prefix),
            allowances: LookupMap::new(allowances_prefix),
        }
    }

    pub fn total_supply(&self) -> u128 {
        self.token.total_supply
    }

    pub fn is_registered(&self, account_id: &AccountId) -> bool {
        self.token.accounts.contains_key(account_id)
    }

    pub fn balance_of(&self, account_id: &AccountId) -> u128 {
        self.token.accounts.get(account_id).unwrap_or(0)
    }

    pub fn allowance(&self, owner_id: &AccountId, spender_id: &AccountId) -> u128 {
        self.allowances
            .get(&(owner_id.clone(), spender_id.clone()))
            .unwrap_or(0)
    }

    // ========================================================================
    // Storage registration
    // ========================================================================

    /// Registers an account the registry itself pays for.
    pub(crate) fn register(&mut self, account_id: &AccountId) {
        if !self.is_registered(account_id) {
            self.token.internal_register_account(account_id);
        }
    }

    /// Grows the storage every registration must cover by `bytes`.
    pub(crate) fn reserve_account_storage(&mut self, bytes: StorageUsage) {
        self.token.account_storage_usage += bytes;
    }

    pub fn storage_balance_bounds(&self) -> StorageBalanceBounds {
        self.token.storage_balance_bounds()
    }

    pub fn storage_balance_of(&self, account_id: AccountId) -> Option<StorageBalance> {
        self.token.storage_balance_of(account_id)
    }

    /// NEP-145 deposit paid by the attached deposit; the excess is refunded.
    pub(crate) fn storage_deposit(
        &mut self,
        account_id: Option<AccountId>,
        registration_only: Option<bool>,
    ) -> StorageBalance {
        self.token.storage_deposit(account_id, registration_only)
    }

    /// NEP-145 unregister of the predecessor. A forced unregister burns the
    /// remaining balance.
    pub(crate) fn storage_unregister(&mut self, force: Option<bool>) -> bool {
        self.token.storage_unregister(force)
    }

    // ========================================================================
    // Balance changes
    // ========================================================================

    pub(crate) fn mint(&mut self, account_id: &AccountId, amount: u128) -> Result<(), VaultError> {
        let balance = self.registered_balance(account_id)?;
        balance.checked_add(amount).ok_or(VaultError::MathOverflow)?;
        self.token
            .total_supply
            .checked_add(amount)
            .ok_or(VaultError::MathOverflow)?;

        self.token.internal_deposit(account_id, amount);
        Ok(())
    }

    pub(crate) fn burn(&mut self, account_id: &AccountId, amount: u128) -> Result<(), VaultError> {
        let balance = self.balance_of(account_id);
        if balance < amount {
            return Err(VaultError::InsufficientShares {
                available: balance,
                requested: amount,
            });
        }

        self.token.internal_withdraw(account_id, amount);
        Ok(())
    }

    /// Moves shares and emits `ft_transfer`.
    pub fn transfer(
        &mut self,
        sender_id: &AccountId,
        receiver_id: &AccountId,
        amount: u128,
        memo: Option<String>,
    ) -> Result<(), VaultError> {
        if amount == 0 {
            return Err(VaultError::ZeroAmount);
        }
        if sender_id == receiver_id {
            return Err(VaultError::SelfTransfer);
        }

        let sender_balance = self.balance_of(sender_id);
        if sender_balance < amount {
            return Err(VaultError::InsufficientShares {
                available: sender_balance,
                requested: amount,
            });
        }
        self.registered_balance(receiver_id)?
            .checked_add(amount)
            .ok_or(VaultError::MathOverflow)?;

        self.token
            .internal_transfer(sender_id, receiver_id, amount, memo);
        Ok(())
    }

    /// Sets the allowance of `spender_id` over `owner_id`'s shares,
    /// replacing any previous value.
    pub fn approve(
        &mut self,
        owner_id: &AccountId,
        spender_id: &AccountId,
        amount: u128,
    ) -> Result<(), VaultError> {
        if !self.is_registered(owner_id) {
            return Err(VaultError::NotRegistered(owner_id.clone()));
        }

        let key = (owner_id.clone(), spender_id.clone());
        if amount == 0 {
            self.allowances.remove(&key);
        } else {
            self.allowances.insert(&key, &amount);
        }
        Ok(())
    }

    pub fn transfer_from(
        &mut self,
        spender_id: &AccountId,
        owner_id: &AccountId,
        receiver_id: &AccountId,
        amount: u128,
        memo: Option<String>,
    ) -> Result<(), VaultError> {
        let allowance = self.allowance(owner_id, spender_id);
        if allowance < amount {
            return Err(VaultError::InsufficientAllowance {
                available: allowance,
                requested: amount,
            });
        }

        self.transfer(owner_id, receiver_id, amount, memo)?;
        self.approve(owner_id, spender_id, allowance - amount)
    }

    fn registered_balance(&self, account_id: &AccountId) -> Result<u128, VaultError> {
        self.token
            .accounts
            .get(account_id)
            .ok_or_else(|| VaultError::NotRegistered(account_id.clone()))
    }
}
