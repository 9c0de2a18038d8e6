//! # Test Helpers Module
//!
//! Drives the registry contract through complete deposit, redeem and
//! reinvest flows inside the NEAR unit-testing VM. Cross-contract calls are
//! not executed; each flow calls the contract's callback directly with the
//! result the farm, router or token would have produced.
//!
//! ## Key Types
//!
//! - [`VaultHarness`]: A registry plus the accounts and adapter results of a scenario

#![allow(dead_code)]

use compounding_vault::adapters::{FarmPoolInfo, SwapLimits};
use compounding_vault::engine::{Operation, Vault};
use compounding_vault::{Contract, RegistryConfig};
use near_sdk::json_types::{U128, U64};
use near_sdk::test_utils::VMContextBuilder;
use near_sdk::{testing_env, AccountId, NearToken};

// ============================================================================
// Constants
// ============================================================================

/// Account the registry is deployed on; also the share custody account.
pub const REGISTRY: &str = "vault.test";
pub const OWNER: &str = "owner.test";
pub const FARM: &str = "farm.test";
pub const ROUTER: &str = "router.test";
pub const REWARD: &str = "reward.test";
pub const POOLED_ASSET: &str = "lp.test";

/// Block timestamp a scenario starts at (ns).
pub const NOW: u64 = 1_700_000_000_000_000_000;

/// Ten minutes.
pub const REINVEST_WINDOW_NS: u64 = 600_000_000_000;

/// One hour.
pub const MIN_REINVEST_INTERVAL_NS: u64 = 3_600_000_000_000;

/// Holder of the minimum-liquidity shares.
pub const LOCKED_SHARES: &str = "0000000000000000000000000000000000000000000000000000000000000000";

// ============================================================================
// Helper Functions
// ============================================================================

pub fn account(id: &str) -> AccountId {
    id.parse().unwrap()
}

/// Sets the caller and attached deposit of the next contract call.
pub fn set_caller(predecessor: &str, deposit_yocto: u128) {
    set_caller_at(predecessor, deposit_yocto, NOW);
}

pub fn set_caller_at(predecessor: &str, deposit_yocto: u128, block_timestamp: u64) {
    let mut builder = VMContextBuilder::new();
    builder
        .current_account_id(account(REGISTRY))
        .predecessor_account_id(account(predecessor))
        .attached_deposit(NearToken::from_yoctonear(deposit_yocto))
        .block_timestamp(block_timestamp);
    testing_env!(builder.build());
}

pub fn pool_info(deposit_fee_bps: u16) -> FarmPoolInfo {
    FarmPoolInfo {
        pooled_asset: account(POOLED_ASSET),
        token_a: account("token-a.test"),
        token_b: account("token-b.test"),
        deposit_fee_bps,
    }
}

pub fn default_limits() -> SwapLimits {
    limits_at(NOW)
}

pub fn limits_at(now: u64) -> SwapLimits {
    SwapLimits {
        min_out_a: U128(1),
        min_out_b: U128(1),
        deadline: U64(now + REINVEST_WINDOW_NS),
    }
}

// ============================================================================
// Harness
// ============================================================================

/// A deployed registry with scenario shortcuts.
///
/// Every call runs at `now`; [`VaultHarness::reinvest`] moves it forward by
/// the reinvest interval.
///
/// # Example
///
/// ```ignore
/// let mut harness = VaultHarness::new().with_vault(0, 300);
/// let shares = harness.deposit(0, "alice.test", 100_000);
/// harness.reinvest(0, 50, 5_000);
/// let received = harness.redeem_all(0, "alice.test");
/// ```
pub struct VaultHarness {
    pub contract: Contract,
    pub now: u64,
}

impl VaultHarness {
    pub fn new() -> Self {
        set_caller(OWNER, 0);
        let contract = Contract::init(
            account(OWNER),
            RegistryConfig {
                farm_id: account(FARM),
                router_id: account(ROUTER),
                reward_token_id: account(REWARD),
                reinvest_window_ns: U64(REINVEST_WINDOW_NS),
                min_reinvest_interval_ns: U64(MIN_REINVEST_INTERVAL_NS),
            },
        );
        Self { contract, now: NOW }
    }

    /// Sets the caller of the next call at the harness clock.
    pub fn caller(&self, predecessor: &str, deposit_yocto: u128) {
        set_caller_at(predecessor, deposit_yocto, self.now);
    }

    /// Registers a vault the way the owner would, answering `pool_info`
    /// with the given deposit fee.
    pub fn with_vault(mut self, pool_id: u64, deposit_fee_bps: u16) -> Self {
        assert!(self.create_vault(pool_id, deposit_fee_bps));
        self
    }

    /// Creates the vault and sets a swap floor of 1 on each leg.
    pub fn create_vault(&mut self, pool_id: u64, deposit_fee_bps: u16) -> bool {
        self.caller(OWNER, 0);
        let _ = self.contract.create_vault(pool_id);
        let created = self
            .contract
            .on_farm_pool_info(pool_id, Ok(Some(pool_info(deposit_fee_bps))));
        if created {
            self.contract.set_swap_limits(pool_id, U128(1), U128(1));
        }
        created
    }

    /// Registers `who` for the vault's shares with the minimum storage
    /// deposit. No-op when already registered.
    pub fn register(&mut self, pool_id: u64, who: &str) {
        if self.is_registered(pool_id, who) {
            return;
        }
        let bounds = self.contract.share_storage_balance_bounds(pool_id);
        self.caller(who, bounds.min.as_yoctonear());
        self.contract.share_storage_deposit(pool_id, None, Some(true));
    }

    pub fn is_registered(&self, pool_id: u64, who: &str) -> bool {
        self.contract
            .share_storage_balance_of(pool_id, account(who))
            .is_some()
    }

    pub fn vault(&self, pool_id: u64) -> &Vault {
        self.contract.vaults.get(&pool_id).unwrap()
    }

    /// Deposits `amount` with the farm accepting all of it. Returns the
    /// shares minted to `who`.
    pub fn deposit(&mut self, pool_id: u64, who: &str, amount: u128) -> u128 {
        let before = self.shares_of(pool_id, who);
        self.start_deposit(pool_id, who, amount);
        let refund = self.contract.on_deposit_staked(
            pool_id,
            account(who),
            account(who),
            U128(amount),
            U128(0),
            Ok(U128(amount)),
        );
        assert_eq!(refund, U128(0));
        self.shares_of(pool_id, who) - before
    }

    /// Registers `who` and pushes the pooled asset in; the stake is left
    /// in flight.
    pub fn start_deposit(&mut self, pool_id: u64, who: &str, amount: u128) {
        use near_contract_standards::fungible_token::receiver::FungibleTokenReceiver;

        self.register(pool_id, who);
        self.caller(POOLED_ASSET, 0);
        let _ = self.contract.ft_on_transfer(
            account(who),
            U128(amount),
            format!(r#"{{"pool_id":{pool_id}}}"#),
        );
    }

    /// Pushes `shares` into custody.
    pub fn push_shares(&mut self, pool_id: u64, who: &str, shares: u128) {
        self.caller(who, 1);
        self.contract
            .share_transfer(pool_id, account(REGISTRY), U128(shares));
    }

    /// Pushes `shares` and redeems them with the farm releasing the full
    /// quote and the payout transfer succeeding. Returns the pooled asset
    /// paid out.
    pub fn redeem(&mut self, pool_id: u64, who: &str, shares: u128) -> u128 {
        self.push_shares(pool_id, who, shares);
        let amount = self
            .contract
            .preview_redeem(pool_id, U128(shares));

        self.caller(who, 1);
        let _ = self.contract.redeem(pool_id, None);
        let _ = self.contract.on_redeem_unstaked(
            pool_id,
            account(who),
            account(who),
            U128(shares),
            amount,
            Ok(amount),
        );
        if amount.0 > 0 {
            let paid = self
                .contract
                .on_payout_transferred(pool_id, account(who), amount, Ok(()));
            assert_eq!(paid, amount);
        }
        amount.0
    }

    pub fn redeem_all(&mut self, pool_id: u64, who: &str) -> u128 {
        let shares = self.shares_of(pool_id, who);
        self.redeem(pool_id, who, shares)
    }

    /// Moves the clock past the reinvest interval, then runs a full
    /// reinvest: `reward` harvested, `liquidity` produced by the router and
    /// fully accepted by the farm. Returns the credited stake.
    pub fn reinvest(&mut self, pool_id: u64, reward: u128, liquidity: u128) -> u128 {
        self.now += MIN_REINVEST_INTERVAL_NS;
        self.caller("keeper.test", 0);
        let limits = limits_at(self.now);
        let _ = self.contract.reinvest(pool_id, None, None, None);
        let _ = self
            .contract
            .on_reinvest_harvested(pool_id, limits, Ok(U128(reward)));
        if reward == 0 {
            return 0;
        }
        let _ = self.contract.on_reinvest_reward_deposited(
            pool_id,
            limits,
            U128(reward),
            Ok(U128(reward)),
        );
        let _ = self
            .contract
            .on_reinvest_liquidity_added(pool_id, Ok(U128(liquidity)));
        self.contract
            .on_reinvest_staked(pool_id, U128(liquidity), Ok(U128(liquidity)))
            .0
    }

    pub fn shares_of(&self, pool_id: u64, who: &str) -> u128 {
        self.contract.share_balance_of(pool_id, account(who)).0
    }

    pub fn total_shares(&self, pool_id: u64) -> u128 {
        self.contract.get_total_shares(pool_id).0
    }

    pub fn staked(&self, pool_id: u64) -> u128 {
        self.contract.get_last_known_staked_balance(pool_id).0
    }

    pub fn operation(&self, pool_id: u64) -> Option<Operation> {
        self.vault(pool_id).operation()
    }

    /// Sum of the balances of `holders`, which must cover every holder.
    pub fn balance_sum(&self, pool_id: u64, holders: &[&str]) -> u128 {
        holders.iter().map(|who| self.shares_of(pool_id, who)).sum()
    }
}
