//! # Vault Views
//!
//! Read-only accessors of a single vault. All panic for an unregistered
//! `pool_id`.

use near_sdk::json_types::U128;
use near_sdk::{near, AccountId};

use crate::constants::MINIMUM_LIQUIDITY;
use crate::errors::OrPanic;
use crate::{Contract, ContractExt};

#[near]
impl Contract {
    pub fn get_last_known_staked_balance(&self, pool_id: u64) -> U128 {
        U128(self.vault(pool_id).or_panic().last_known_staked_balance)
    }

    pub fn get_total_shares(&self, pool_id: u64) -> U128 {
        U128(self.vault(pool_id).or_panic().total_shares())
    }

    pub fn get_minimum_liquidity(&self) -> U128 {
        U128(MINIMUM_LIQUIDITY)
    }

    pub fn get_deposit_fee_bps(&self, pool_id: u64) -> u16 {
        self.vault(pool_id).or_panic().deposit_fee_bps
    }

    /// Value per share scaled by 1e18.
    pub fn get_exchange_rate(&self, pool_id: u64) -> U128 {
        U128(self.vault(pool_id).or_panic().exchange_rate().or_panic())
    }

    /// Shares a deposit of `amount` would mint now, assuming the farm
    /// accepts all of it.
    pub fn preview_deposit(&self, pool_id: u64, amount: U128) -> U128 {
        U128(self.vault(pool_id).or_panic().quote_deposit(amount.0).or_panic().shares)
    }

    /// Pooled asset `shares` would redeem for now, before any farm
    /// withdrawal fee.
    pub fn preview_redeem(&self, pool_id: u64, shares: U128) -> U128 {
        U128(self.vault(pool_id).or_panic().convert_to_assets(shares.0).or_panic())
    }

    pub fn get_unclaimed_payout(&self, pool_id: u64, account_id: AccountId) -> U128 {
        U128(self.vault(pool_id).or_panic().unclaimed_of(&account_id))
    }

    /// Stake held by the farm for `account_id` with no shares behind it,
    /// recoverable with `reclaim_stake`.
    pub fn get_stranded_stake(&self, pool_id: u64, account_id: AccountId) -> U128 {
        U128(self.vault(pool_id).or_panic().stranded_of(&account_id))
    }
}
