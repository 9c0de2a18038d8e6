//! # Reinvest Flow
//!
//! Permissionless compounding, at most once per configured interval per
//! vault. One reinvest holds the vault lock across the whole chain:
//!
//! 1. `harvest` the farm reward into `idle_reward`
//! 2. deposit `idle_reward` at the router (`reward_in_router`)
//! 3. `swap_and_add_liquidity` under the swap limits (`idle_liquidity`)
//! 4. stake `idle_liquidity` and credit it, net of the deposit fee
//!
//! A failed step releases the lock and leaves its input in the custody
//! counter it was in, so the next reinvest picks it up from there. Shares
//! are never minted, so value per share only grows.
//!
//! Each swap leg is bounded by the larger of the caller's minimum and the
//! owner-set floor of the vault. A reinvest with no positive bound on a leg
//! is rejected.

use near_sdk::json_types::{U128, U64};
use near_sdk::{env, near, Promise, PromiseError, PromiseOrValue};

use crate::adapters::{self, SwapLimits};
use crate::constants::{
    GAS_FOR_ON_LIQUIDITY_ADDED, GAS_FOR_ON_REINVEST_HARVESTED, GAS_FOR_ON_REINVEST_STAKED,
    GAS_FOR_ON_REWARD_DEPOSITED,
};
use crate::engine::events::{OperationFailed, VaultReinvest};
use crate::engine::Operation;
use crate::errors::{OrPanic, VaultError};
use crate::{Contract, ContractExt};

#[near]
impl Contract {
    /// Harvests, converts and restakes the vault's reward.
    ///
    /// # Arguments
    ///
    /// * `pool_id` - Vault to compound
    /// * `min_out_a`, `min_out_b` - Minimum swap output per leg, raised to
    ///   the vault's swap floor
    /// * `deadline` - Block timestamp (ns) the swap must execute by,
    ///   default now plus the configured reinvest window
    ///
    /// # Panics
    ///
    /// Panics if the deadline already passed, a leg has no positive minimum,
    /// the vault is locked, or the previous reinvest started less than the
    /// configured interval ago.
    pub fn reinvest(
        &mut self,
        pool_id: u64,
        min_out_a: Option<U128>,
        min_out_b: Option<U128>,
        deadline: Option<U64>,
    ) -> Promise {
        let now = env::block_timestamp();
        let deadline = deadline
            .map(|deadline| deadline.0)
            .unwrap_or_else(|| now.saturating_add(self.config.reinvest_window_ns.0));
        self.internal_reinvest(
            pool_id,
            min_out_a.map(|min_out| min_out.0),
            min_out_b.map(|min_out| min_out.0),
            deadline,
        )
        .or_panic()
    }

    #[private]
    pub fn on_reinvest_harvested(
        &mut self,
        pool_id: u64,
        limits: SwapLimits,
        #[callback_result] harvested: Result<U128, PromiseError>,
    ) -> PromiseOrValue<U128> {
        let Ok(harvested) = harvested else {
            return self.abort_reinvest(pool_id, "harvest_failed");
        };
        let credited = self.vault_mut(pool_id).and_then(|vault| {
            vault.idle_reward = vault
                .idle_reward
                .checked_add(harvested.0)
                .ok_or(VaultError::MathOverflow)?;
            Ok(())
        });
        if credited.is_err() {
            return self.abort_reinvest(pool_id, "reward_overflow");
        }

        self.internal_advance_reinvest(pool_id, limits)
    }

    #[private]
    pub fn on_reinvest_reward_deposited(
        &mut self,
        pool_id: u64,
        limits: SwapLimits,
        amount: U128,
        #[callback_result] used: Result<U128, PromiseError>,
    ) -> PromiseOrValue<U128> {
        let used = used.map(|used| used.0.min(amount.0)).unwrap_or(0);
        let in_router = self.vault_mut(pool_id).map(|vault| {
            vault.idle_reward -= used.min(vault.idle_reward);
            vault.reward_in_router = vault.reward_in_router.saturating_add(used);
            vault.reward_in_router
        });

        match in_router {
            Ok(0) | Err(_) => self.abort_reinvest(pool_id, "router_deposit_failed"),
            Ok(_) => self.internal_swap_reward(pool_id, limits),
        }
    }

    #[private]
    pub fn on_reinvest_liquidity_added(
        &mut self,
        pool_id: u64,
        #[callback_result] liquidity: Result<U128, PromiseError>,
    ) -> PromiseOrValue<U128> {
        let Ok(liquidity) = liquidity else {
            return self.abort_reinvest(pool_id, "swap_failed");
        };
        let idle = self.vault_mut(pool_id).map(|vault| {
            vault.reward_in_router = 0;
            vault.idle_liquidity = vault.idle_liquidity.saturating_add(liquidity.0);
            vault.idle_liquidity
        });

        match idle {
            Ok(0) | Err(_) => self.abort_reinvest(pool_id, "no_liquidity"),
            Ok(_) => self.internal_stake_liquidity(pool_id),
        }
    }

    /// Returns the increase of the staked balance.
    #[private]
    pub fn on_reinvest_staked(
        &mut self,
        pool_id: u64,
        amount: U128,
        #[callback_result] used: Result<U128, PromiseError>,
    ) -> U128 {
        let used = used.map(|used| used.0.min(amount.0)).unwrap_or(0);
        self.internal_settle_reinvest(pool_id, used)
    }
}

impl Contract {
    pub(crate) fn internal_reinvest(
        &mut self,
        pool_id: u64,
        min_out_a: Option<u128>,
        min_out_b: Option<u128>,
        deadline: u64,
    ) -> Result<Promise, VaultError> {
        let now = env::block_timestamp();
        if deadline <= now {
            return Err(VaultError::DeadlineExpired { deadline, now });
        }

        let farm_id = self.config.farm_id.clone();
        let min_interval = self.config.min_reinvest_interval_ns.0;
        let vault = self.vault_mut(pool_id)?;
        let limits = vault.swap_limits(min_out_a, min_out_b, deadline)?;
        vault.begin_reinvest(now, min_interval)?;

        env::log_str(&format!(
            "reinvest_started pool={pool_id} caller={} deadline={}",
            env::predecessor_account_id(),
            limits.deadline.0
        ));

        Ok(adapters::harvest(farm_id, pool_id).then(
            Self::ext(env::current_account_id())
                .with_static_gas(GAS_FOR_ON_REINVEST_HARVESTED)
                .on_reinvest_harvested(pool_id, limits),
        ))
    }

    /// Resumes from the earliest stage that still holds funds.
    fn internal_advance_reinvest(&mut self, pool_id: u64, limits: SwapLimits) -> PromiseOrValue<U128> {
        let router_id = self.config.router_id.clone();
        let Ok(vault) = self.vault_mut(pool_id) else {
            return PromiseOrValue::Value(U128(0));
        };

        if vault.idle_reward > 0 {
            let amount = vault.idle_reward;
            return PromiseOrValue::Promise(
                adapters::deposit_reward(router_id, vault.reward_asset.clone(), amount).then(
                    Self::ext(env::current_account_id())
                        .with_static_gas(GAS_FOR_ON_REWARD_DEPOSITED)
                        .on_reinvest_reward_deposited(pool_id, limits, U128(amount)),
                ),
            );
        }
        if vault.reward_in_router > 0 {
            return self.internal_swap_reward(pool_id, limits);
        }
        if vault.idle_liquidity > 0 {
            return self.internal_stake_liquidity(pool_id);
        }

        vault.finish();
        env::log_str(&format!("reinvest_skipped pool={pool_id} reason=no_reward"));
        PromiseOrValue::Value(U128(0))
    }

    fn internal_swap_reward(&mut self, pool_id: u64, limits: SwapLimits) -> PromiseOrValue<U128> {
        let router_id = self.config.router_id.clone();
        let Ok(vault) = self.vault(pool_id) else {
            return PromiseOrValue::Value(U128(0));
        };

        PromiseOrValue::Promise(
            adapters::swap_and_add_liquidity(
                router_id,
                vault.reward_asset.clone(),
                vault.reward_in_router,
                vault.token_a.clone(),
                vault.token_b.clone(),
                limits,
            )
            .then(
                Self::ext(env::current_account_id())
                    .with_static_gas(GAS_FOR_ON_LIQUIDITY_ADDED)
                    .on_reinvest_liquidity_added(pool_id),
            ),
        )
    }

    fn internal_stake_liquidity(&mut self, pool_id: u64) -> PromiseOrValue<U128> {
        let farm_id = self.config.farm_id.clone();
        let Ok(vault) = self.vault(pool_id) else {
            return PromiseOrValue::Value(U128(0));
        };
        let amount = vault.idle_liquidity;

        PromiseOrValue::Promise(
            adapters::stake(farm_id, vault.pooled_asset.clone(), pool_id, amount).then(
                Self::ext(env::current_account_id())
                    .with_static_gas(GAS_FOR_ON_REINVEST_STAKED)
                    .on_reinvest_staked(pool_id, U128(amount)),
            ),
        )
    }

    pub(crate) fn internal_settle_reinvest(&mut self, pool_id: u64, used: u128) -> U128 {
        let Ok(vault) = self.vault_mut(pool_id) else {
            return U128(0);
        };
        vault.finish();

        if used == 0 {
            OperationFailed {
                pool_id,
                operation: Operation::Reinvest,
                reason: "stake_failed",
            }
            .emit();
            env::log_str(&format!("reinvest_aborted pool={pool_id} reason=stake_failed"));
            return U128(0);
        }

        vault.idle_liquidity -= used.min(vault.idle_liquidity);
        let credited = match vault.apply_reinvest(used) {
            Ok(credited) => credited,
            Err(err) => {
                env::log_str(&format!("reinvest_uncredited pool={pool_id} liquidity={used} reason={err}"));
                return U128(0);
            }
        };

        VaultReinvest {
            pool_id,
            liquidity: U128(used),
            credited: U128(credited),
            staked_balance: U128(vault.last_known_staked_balance),
        }
        .emit();
        U128(credited)
    }

    fn abort_reinvest(&mut self, pool_id: u64, reason: &str) -> PromiseOrValue<U128> {
        if let Ok(vault) = self.vault_mut(pool_id) {
            vault.finish();
        }
        OperationFailed {
            pool_id,
            operation: Operation::Reinvest,
            reason,
        }
        .emit();
        env::log_str(&format!("reinvest_aborted pool={pool_id} reason={reason}"));
        PromiseOrValue::Value(U128(0))
    }
}
