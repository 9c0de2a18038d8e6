//! # Farm and Router Adapters
//!
//! Cross-contract interfaces of the external farming pool and the
//! swap-and-liquidity router, plus the promise builders the vault flows use.
//!
//! ## Staking
//!
//! - stake: pooled asset `ft_transfer_call(farm, amount, {"pool_id": N})`.
//!   The amount the farm used is reported back by the asset's
//!   `ft_resolve_transfer`.
//! - unstake / harvest: plain calls returning the amount sent back.
//!
//! ## Swapping
//!
//! Reward is first deposited at the router with `ft_transfer_call(router, R,
//! "deposit")`, then `swap_and_add_liquidity` turns the deposit into pooled
//! asset credited to the caller.

use near_contract_standards::fungible_token::core::ext_ft_core;
use near_sdk::json_types::{U128, U64};
use near_sdk::serde_json::json;
use near_sdk::{ext_contract, near, AccountId, NearToken, Promise};

use crate::constants::{GAS_FOR_FARM_CALL, GAS_FOR_FT_TRANSFER, GAS_FOR_FT_TRANSFER_CALL, GAS_FOR_SWAP};

/// Farm pool configuration a vault is bound to.
#[near(serializers = [json, borsh])]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FarmPoolInfo {
    pub pooled_asset: AccountId,
    pub token_a: AccountId,
    pub token_b: AccountId,
    pub deposit_fee_bps: u16,
}

/// Slippage and deadline bounds forwarded to the router.
#[near(serializers = [json, borsh])]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwapLimits {
    pub min_out_a: U128,
    pub min_out_b: U128,
    /// Block timestamp (ns) after which the router must reject the swap.
    pub deadline: U64,
}

#[allow(dead_code)]
#[ext_contract(ext_farm)]
trait FarmContract {
    fn pool_info(&self, pool_id: u64) -> Option<FarmPoolInfo>;
    /// Returns the pooled asset actually released.
    fn unstake(&mut self, pool_id: u64, amount: U128) -> U128;
    /// Returns the reward transferred to the caller.
    fn harvest(&mut self, pool_id: u64) -> U128;
}

#[allow(dead_code)]
#[ext_contract(ext_router)]
trait RouterContract {
    /// Returns the pooled asset produced and credited to the caller.
    fn swap_and_add_liquidity(
        &mut self,
        token_in: AccountId,
        amount_in: U128,
        token_a: AccountId,
        token_b: AccountId,
        min_out_a: U128,
        min_out_b: U128,
        deadline: U64,
    ) -> U128;
}

pub fn pool_info(farm_id: AccountId, pool_id: u64) -> Promise {
    ext_farm::ext(farm_id)
        .with_static_gas(GAS_FOR_FARM_CALL)
        .pool_info(pool_id)
}

pub fn stake(farm_id: AccountId, pooled_asset: AccountId, pool_id: u64, amount: u128) -> Promise {
    ext_ft_core::ext(pooled_asset)
        .with_attached_deposit(NearToken::from_yoctonear(1))
        .with_static_gas(GAS_FOR_FT_TRANSFER_CALL)
        .ft_transfer_call(
            farm_id,
            U128(amount),
            Some("Vault stake".to_string()),
            json!({ "pool_id": pool_id }).to_string(),
        )
}

pub fn unstake(farm_id: AccountId, pool_id: u64, amount: u128) -> Promise {
    ext_farm::ext(farm_id)
        .with_attached_deposit(NearToken::from_yoctonear(1))
        .with_static_gas(GAS_FOR_FARM_CALL)
        .unstake(pool_id, U128(amount))
}

pub fn harvest(farm_id: AccountId, pool_id: u64) -> Promise {
    ext_farm::ext(farm_id)
        .with_attached_deposit(NearToken::from_yoctonear(1))
        .with_static_gas(GAS_FOR_FARM_CALL)
        .harvest(pool_id)
}

pub fn deposit_reward(router_id: AccountId, reward_asset: AccountId, amount: u128) -> Promise {
    ext_ft_core::ext(reward_asset)
        .with_attached_deposit(NearToken::from_yoctonear(1))
        .with_static_gas(GAS_FOR_FT_TRANSFER_CALL)
        .ft_transfer_call(
            router_id,
            U128(amount),
            Some("Vault reinvest".to_string()),
            "deposit".to_string(),
        )
}

pub fn swap_and_add_liquidity(
    router_id: AccountId,
    reward_asset: AccountId,
    amount: u128,
    token_a: AccountId,
    token_b: AccountId,
    limits: SwapLimits,
) -> Promise {
    ext_router::ext(router_id)
        .with_attached_deposit(NearToken::from_yoctonear(1))
        .with_static_gas(GAS_FOR_SWAP)
        .swap_and_add_liquidity(
            reward_asset,
            U128(amount),
            token_a,
            token_b,
            limits.min_out_a,
            limits.min_out_b,
            limits.deadline,
        )
}

pub fn transfer(token_id: AccountId, receiver_id: AccountId, amount: u128) -> Promise {
    ext_ft_core::ext(token_id)
        .with_attached_deposit(NearToken::from_yoctonear(1))
        .with_static_gas(GAS_FOR_FT_TRANSFER)
        .ft_transfer(receiver_id, U128(amount), Some("Vault redeem".to_string()))
}
