//! # Vault Engine
//!
//! Accounting state of one vault and the pure transitions applied to it by
//! the deposit, redeem and reinvest flows. Nothing here performs I/O: the
//! contract layer quotes an operation, locks the vault, talks to the farm or
//! router, and applies the quoted transition once the adapter reports
//! success.
//!
//! ## Share pricing
//!
//! - First deposit: `shares = net - MINIMUM_LIQUIDITY`, with the minimum
//!   locked forever on [`LOCKED_SHARES_ACCOUNT`].
//! - Later deposits: `shares = net * total_shares / staked`, floor.
//! - Redemptions: `amount = shares * staked / total_shares`, floor.
//!
//! Both roundings favour the vault.
//!
//! ## Holder storage
//!
//! A share registration pays for the holder's balance and for one entry in
//! each per-holder map (redeemable shares, unclaimed payouts, stranded
//! stake). The extra bytes are measured once when the vault is created.

use near_contract_standards::fungible_token::events::{FtBurn, FtMint};
use near_sdk::collections::LookupMap;
use near_sdk::json_types::{U128, U64};
use near_sdk::serde::Serialize;
use near_sdk::{env, near, AccountId, StorageUsage};
use schemars::JsonSchema;

use super::ledger::ShareLedger;
use super::mul_div::mul_div;
use crate::adapters::{FarmPoolInfo, SwapLimits};
use crate::constants::{
    BPS_DENOMINATOR, EXCHANGE_RATE_SCALE, LOCKED_SHARES_ACCOUNT, MAX_ACCOUNT_ID_LEN,
    MINIMUM_LIQUIDITY,
};
use crate::errors::VaultError;
use crate::StorageKey;

/// State-changing operation holding a vault's lock.
#[near(serializers = [json, borsh])]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Deposit,
    Redeem,
    Reinvest,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DepositQuote {
    /// Pooled asset handed to the farm.
    pub gross: u128,
    /// Part of `gross` that becomes productive stake.
    pub net: u128,
    /// Shares minted to the receiver.
    pub shares: u128,
    /// Shares locked on the burn account (first deposit only).
    pub locked: u128,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RedeemQuote {
    pub shares: u128,
    pub amount: u128,
}

#[near(serializers = [borsh])]
pub struct Vault {
    pub pool_id: u64,
    pub pooled_asset: AccountId,
    pub reward_asset: AccountId,
    pub token_a: AccountId,
    pub token_b: AccountId,
    pub deposit_fee_bps: u16,
    pub(crate) shares: ShareLedger,
    /// Shares each holder pushed into the registry's custody and has not
    /// redeemed yet.
    redeemable: LookupMap<AccountId, u128>,
    pub last_known_staked_balance: u128,
    operation: Option<Operation>,
    /// Harvested reward held by the registry, not yet deposited at the router.
    pub idle_reward: u128,
    /// Reward credited to the registry at the router, not yet swapped.
    pub reward_in_router: u128,
    /// Pooled asset produced by the router, not yet staked.
    pub idle_liquidity: u128,
    /// Redemption payouts whose transfer failed, by holder.
    unclaimed_payouts: LookupMap<AccountId, u128>,
    /// Net stake of deposits that minted no shares, by receiver, awaiting
    /// release from the farm.
    stranded_stake: LookupMap<AccountId, u128>,
    /// Owner-set minimum swap output per leg. Zero means unset.
    pub min_swap_out_a: u128,
    pub min_swap_out_b: u128,
    /// Block timestamp (ns) the last reinvest started at.
    pub last_reinvest_at: Option<u64>,
    pub created_at: u64,
}

impl Vault {
    /// Creates an empty vault. `custody` (the registry account) and the
    /// locked-shares account are registered for shares at the registry's
    /// expense.
    pub fn new(
        pool_id: u64,
        info: FarmPoolInfo,
        reward_asset: AccountId,
        custody: &AccountId,
        created_at: u64,
    ) -> Result<Self, VaultError> {
        if u128::from(info.deposit_fee_bps) > BPS_DENOMINATOR {
            return Err(VaultError::InvalidFeeBps(info.deposit_fee_bps));
        }

        let mut vault = Self {
            pool_id,
            pooled_asset: info.pooled_asset,
            reward_asset,
            token_a: info.token_a,
            token_b: info.token_b,
            deposit_fee_bps: info.deposit_fee_bps,
            shares: ShareLedger::new(
                StorageKey::ShareToken { pool_id },
                StorageKey::ShareAllowances { pool_id },
            ),
            redeemable: LookupMap::new(StorageKey::RedeemableShares { pool_id }),
            last_known_staked_balance: 0,
            operation: None,
            idle_reward: 0,
            reward_in_router: 0,
            idle_liquidity: 0,
            unclaimed_payouts: LookupMap::new(StorageKey::UnclaimedPayouts { pool_id }),
            stranded_stake: LookupMap::new(StorageKey::StrandedStake { pool_id }),
            min_swap_out_a: 0,
            min_swap_out_b: 0,
            last_reinvest_at: None,
            created_at,
        };

        let holder_bytes = vault.measure_holder_storage_usage();
        vault.shares.reserve_account_storage(holder_bytes);
        vault.shares.register(custody);
        vault.shares.register(&locked_shares_account());
        Ok(vault)
    }

    fn measure_holder_storage_usage(&mut self) -> StorageUsage {
        let initial_storage_usage = env::storage_usage();
        let tmp_account_id = longest_account_id();
        self.redeemable.insert(&tmp_account_id, &u128::MAX);
        self.unclaimed_payouts.insert(&tmp_account_id, &u128::MAX);
        self.stranded_stake.insert(&tmp_account_id, &u128::MAX);
        let usage = env::storage_usage() - initial_storage_usage;
        self.redeemable.remove(&tmp_account_id);
        self.unclaimed_payouts.remove(&tmp_account_id);
        self.stranded_stake.remove(&tmp_account_id);
        usage
    }

    pub fn shares(&self) -> &ShareLedger {
        &self.shares
    }

    pub fn total_shares(&self) -> u128 {
        self.shares.total_supply()
    }

    pub fn redeemable_of(&self, holder: &AccountId) -> u128 {
        self.redeemable.get(holder).unwrap_or(0)
    }

    pub fn net_of_fee(&self, amount: u128) -> Result<u128, VaultError> {
        let kept = BPS_DENOMINATOR - u128::from(self.deposit_fee_bps);
        mul_div(amount, kept, BPS_DENOMINATOR)
    }

    // ========================================================================
    // Deposit
    // ========================================================================

    pub fn quote_deposit(&self, gross: u128) -> Result<DepositQuote, VaultError> {
        if gross == 0 {
            return Err(VaultError::ZeroAmount);
        }
        let net = self.net_of_fee(gross)?;
        let total_shares = self.total_shares();

        if total_shares == 0 {
            if net <= MINIMUM_LIQUIDITY {
                return Err(VaultError::InsufficientInitialDeposit {
                    net,
                    minimum: MINIMUM_LIQUIDITY,
                });
            }
            return Ok(DepositQuote {
                gross,
                net,
                shares: net - MINIMUM_LIQUIDITY,
                locked: MINIMUM_LIQUIDITY,
            });
        }

        if self.last_known_staked_balance == 0 {
            return Err(VaultError::DegenerateState);
        }
        let shares = mul_div(net, total_shares, self.last_known_staked_balance)?;
        if shares == 0 {
            return Err(VaultError::ZeroShares);
        }

        Ok(DepositQuote {
            gross,
            net,
            shares,
            locked: 0,
        })
    }

    /// Mints shares for `gross` pooled asset the farm has accepted and
    /// credits the net amount to the staked balance. Nothing changes unless
    /// the receiver gets at least `min_shares`.
    pub fn apply_deposit(
        &mut self,
        receiver_id: &AccountId,
        gross: u128,
        min_shares: u128,
    ) -> Result<DepositQuote, VaultError> {
        let quote = self.quote_deposit(gross)?;
        if quote.shares < min_shares {
            return Err(VaultError::SlippageNotMet {
                minimum: min_shares,
                actual: quote.shares,
            });
        }
        if !self.shares.is_registered(receiver_id) {
            return Err(VaultError::NotRegistered(receiver_id.clone()));
        }
        let staked = self
            .last_known_staked_balance
            .checked_add(quote.net)
            .ok_or(VaultError::MathOverflow)?;
        self.total_shares()
            .checked_add(quote.locked)
            .and_then(|total| total.checked_add(quote.shares))
            .ok_or(VaultError::MathOverflow)?;

        let locked_account = locked_shares_account();
        if quote.locked > 0 {
            self.shares.mint(&locked_account, quote.locked)?;
        }
        self.shares.mint(receiver_id, quote.shares)?;
        self.last_known_staked_balance = staked;

        let memo = format!("pool {} deposit", self.pool_id);
        let receiver_mint = FtMint {
            owner_id: receiver_id,
            amount: U128(quote.shares),
            memo: Some(&memo),
        };
        if quote.locked > 0 {
            FtMint::emit_many(&[
                FtMint {
                    owner_id: &locked_account,
                    amount: U128(quote.locked),
                    memo: Some(&memo),
                },
                receiver_mint,
            ]);
        } else {
            receiver_mint.emit();
        }

        Ok(quote)
    }

    fn credit_stake(&mut self, amount: u128) -> Result<(), VaultError> {
        self.last_known_staked_balance = self
            .last_known_staked_balance
            .checked_add(amount)
            .ok_or(VaultError::MathOverflow)?;
        Ok(())
    }

    // ========================================================================
    // Stranded stake
    // ========================================================================

    pub fn stranded_of(&self, account_id: &AccountId) -> u128 {
        self.stranded_stake.get(account_id).unwrap_or(0)
    }

    /// Parks stake the farm holds for `account_id` without any shares
    /// behind it. It is never part of the staked balance.
    pub fn credit_stranded(&mut self, account_id: &AccountId, amount: u128) -> Result<(), VaultError> {
        let stranded = self
            .stranded_of(account_id)
            .checked_add(amount)
            .ok_or(VaultError::MathOverflow)?;
        self.stranded_stake.insert(account_id, &stranded);
        Ok(())
    }

    pub fn take_stranded(&mut self, account_id: &AccountId) -> Result<u128, VaultError> {
        match self.stranded_stake.remove(account_id) {
            Some(amount) if amount > 0 => Ok(amount),
            _ => Err(VaultError::NothingToReclaim),
        }
    }

    // ========================================================================
    // Redeem
    // ========================================================================

    pub fn quote_redeem(
        &self,
        holder: &AccountId,
        custody: &AccountId,
    ) -> Result<RedeemQuote, VaultError> {
        let total_shares = self.total_shares();
        if total_shares == 0 {
            return Err(VaultError::NoSharesOutstanding);
        }

        let shares = self.redeemable_of(holder);
        if shares == 0 {
            return Err(VaultError::NothingToRedeem);
        }
        let held = self.shares.balance_of(custody);
        if held < shares {
            return Err(VaultError::InsufficientShares {
                available: held,
                requested: shares,
            });
        }

        let amount = mul_div(shares, self.last_known_staked_balance, total_shares)?;
        if amount == 0 {
            return Err(VaultError::ZeroRedemption);
        }
        if amount > self.last_known_staked_balance {
            return Err(VaultError::InsufficientStake {
                staked: self.last_known_staked_balance,
                requested: amount,
            });
        }

        Ok(RedeemQuote { shares, amount })
    }

    /// Burns the quoted shares from custody once the farm released the stake.
    pub fn apply_redeem(
        &mut self,
        holder: &AccountId,
        custody: &AccountId,
        quote: RedeemQuote,
    ) -> Result<(), VaultError> {
        let redeemable = self.redeemable_of(holder);
        if redeemable < quote.shares {
            return Err(VaultError::InsufficientShares {
                available: redeemable,
                requested: quote.shares,
            });
        }
        let staked = self
            .last_known_staked_balance
            .checked_sub(quote.amount)
            .ok_or(VaultError::InsufficientStake {
                staked: self.last_known_staked_balance,
                requested: quote.amount,
            })?;

        self.shares.burn(custody, quote.shares)?;
        self.set_redeemable(holder, redeemable - quote.shares);
        self.last_known_staked_balance = staked;

        let memo = format!("pool {} redeem by {holder}", self.pool_id);
        FtBurn {
            owner_id: custody,
            amount: U128(quote.shares),
            memo: Some(&memo),
        }
        .emit();
        Ok(())
    }

    // ========================================================================
    // Reinvest
    // ========================================================================

    /// Takes the lock for a reinvest starting at `now`, at most once per
    /// `min_interval` nanoseconds.
    pub fn begin_reinvest(&mut self, now: u64, min_interval: u64) -> Result<(), VaultError> {
        if let Some(current) = self.operation {
            return Err(VaultError::OperationInProgress(current));
        }
        if let Some(last) = self.last_reinvest_at {
            let next_at = last.saturating_add(min_interval);
            if now < next_at {
                return Err(VaultError::ReinvestTooSoon { next_at, now });
            }
        }

        self.begin(Operation::Reinvest)?;
        self.last_reinvest_at = Some(now);
        Ok(())
    }

    /// Swap bounds of a reinvest: each leg takes the larger of the caller's
    /// limit and the vault's floor, and must end up positive.
    pub fn swap_limits(
        &self,
        min_out_a: Option<u128>,
        min_out_b: Option<u128>,
        deadline: u64,
    ) -> Result<SwapLimits, VaultError> {
        let min_out_a = min_out_a.unwrap_or(0).max(self.min_swap_out_a);
        let min_out_b = min_out_b.unwrap_or(0).max(self.min_swap_out_b);
        if min_out_a == 0 || min_out_b == 0 {
            return Err(VaultError::SwapLimitsRequired);
        }

        Ok(SwapLimits {
            min_out_a: U128(min_out_a),
            min_out_b: U128(min_out_b),
            deadline: U64(deadline),
        })
    }

    pub fn set_swap_floor(&mut self, min_out_a: u128, min_out_b: u128) -> Result<(), VaultError> {
        if min_out_a == 0 || min_out_b == 0 {
            return Err(VaultError::InvalidConfig("swap floor must be positive"));
        }
        self.min_swap_out_a = min_out_a;
        self.min_swap_out_b = min_out_b;
        Ok(())
    }

    /// Credits liquidity restaked by a reinvest. Returns the net amount added
    /// to the staked balance.
    pub fn apply_reinvest(&mut self, liquidity: u128) -> Result<u128, VaultError> {
        let credited = self.net_of_fee(liquidity)?;
        self.credit_stake(credited)?;
        Ok(credited)
    }

    // ========================================================================
    // Pricing
    // ========================================================================

    pub fn convert_to_assets(&self, shares: u128) -> Result<u128, VaultError> {
        let total_shares = self.total_shares();
        if total_shares == 0 {
            return Ok(0);
        }
        mul_div(shares, self.last_known_staked_balance, total_shares)
    }

    /// Value per share scaled by 1e18.
    pub fn exchange_rate(&self) -> Result<u128, VaultError> {
        let total_shares = self.total_shares();
        if total_shares == 0 {
            return Ok(EXCHANGE_RATE_SCALE);
        }
        mul_div(
            self.last_known_staked_balance,
            EXCHANGE_RATE_SCALE,
            total_shares,
        )
    }

    // ========================================================================
    // Lock
    // ========================================================================

    pub fn operation(&self) -> Option<Operation> {
        self.operation
    }

    pub fn begin(&mut self, operation: Operation) -> Result<(), VaultError> {
        if let Some(current) = self.operation {
            return Err(VaultError::OperationInProgress(current));
        }
        self.operation = Some(operation);
        Ok(())
    }

    pub fn finish(&mut self) -> Option<Operation> {
        self.operation.take()
    }

    // ========================================================================
    // Share movements
    // ========================================================================

    /// Moves shares between holders. Shares sent to `custody` become
    /// redeemable by the sender.
    pub fn transfer_shares(
        &mut self,
        sender_id: &AccountId,
        receiver_id: &AccountId,
        amount: u128,
        custody: &AccountId,
    ) -> Result<(), VaultError> {
        let redeemable = self.redeemable_after_push(sender_id, receiver_id, amount, custody)?;
        self.shares.transfer(sender_id, receiver_id, amount, None)?;
        if let Some(redeemable) = redeemable {
            self.set_redeemable(sender_id, redeemable);
        }
        Ok(())
    }

    pub fn approve_shares(
        &mut self,
        owner_id: &AccountId,
        spender_id: &AccountId,
        amount: u128,
    ) -> Result<(), VaultError> {
        self.shares.approve(owner_id, spender_id, amount)
    }

    pub fn transfer_shares_from(
        &mut self,
        spender_id: &AccountId,
        owner_id: &AccountId,
        receiver_id: &AccountId,
        amount: u128,
        custody: &AccountId,
    ) -> Result<(), VaultError> {
        let redeemable = self.redeemable_after_push(owner_id, receiver_id, amount, custody)?;
        self.shares
            .transfer_from(spender_id, owner_id, receiver_id, amount, None)?;
        if let Some(redeemable) = redeemable {
            self.set_redeemable(owner_id, redeemable);
        }
        Ok(())
    }

    fn redeemable_after_push(
        &self,
        owner_id: &AccountId,
        receiver_id: &AccountId,
        amount: u128,
        custody: &AccountId,
    ) -> Result<Option<u128>, VaultError> {
        if receiver_id != custody {
            return Ok(None);
        }
        self.redeemable_of(owner_id)
            .checked_add(amount)
            .map(Some)
            .ok_or(VaultError::MathOverflow)
    }

    fn set_redeemable(&mut self, holder: &AccountId, shares: u128) {
        if shares == 0 {
            self.redeemable.remove(holder);
        } else {
            self.redeemable.insert(holder, &shares);
        }
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Whether `account_id` still has an entry its registration pays for.
    pub fn has_holder_entries(&self, account_id: &AccountId) -> bool {
        self.redeemable_of(account_id) > 0
            || self.unclaimed_of(account_id) > 0
            || self.stranded_of(account_id) > 0
    }

    /// Unregisters the predecessor's shares. A forced unregister burns the
    /// remaining balance.
    pub(crate) fn unregister_holder(
        &mut self,
        account_id: &AccountId,
        force: Option<bool>,
    ) -> Result<bool, VaultError> {
        if let Some(current) = self.operation {
            return Err(VaultError::OperationInProgress(current));
        }
        if self.has_holder_entries(account_id) {
            return Err(VaultError::PendingEntries(account_id.clone()));
        }

        let balance = self.shares.balance_of(account_id);
        let unregistered = self.shares.storage_unregister(force);
        if unregistered && balance > 0 {
            let memo = format!("pool {} unregister", self.pool_id);
            FtBurn {
                owner_id: account_id,
                amount: U128(balance),
                memo: Some(&memo),
            }
            .emit();
        }
        Ok(unregistered)
    }

    // ========================================================================
    // Unclaimed payouts
    // ========================================================================

    pub fn unclaimed_of(&self, account_id: &AccountId) -> u128 {
        self.unclaimed_payouts.get(account_id).unwrap_or(0)
    }

    pub fn credit_unclaimed(&mut self, account_id: &AccountId, amount: u128) -> Result<(), VaultError> {
        let unclaimed = self
            .unclaimed_of(account_id)
            .checked_add(amount)
            .ok_or(VaultError::MathOverflow)?;
        self.unclaimed_payouts.insert(account_id, &unclaimed);
        Ok(())
    }

    pub fn take_unclaimed(&mut self, account_id: &AccountId) -> Result<u128, VaultError> {
        match self.unclaimed_payouts.remove(account_id) {
            Some(amount) if amount > 0 => Ok(amount),
            _ => Err(VaultError::NothingToClaim),
        }
    }

    pub fn view(&self) -> VaultView {
        VaultView {
            pool_id: self.pool_id,
            pooled_asset: self.pooled_asset.to_string(),
            reward_asset: self.reward_asset.to_string(),
            token_a: self.token_a.to_string(),
            token_b: self.token_b.to_string(),
            deposit_fee_bps: self.deposit_fee_bps,
            total_shares: self.total_shares().to_string(),
            last_known_staked_balance: self.last_known_staked_balance.to_string(),
            exchange_rate: self
                .exchange_rate()
                .map(|rate| rate.to_string())
                .unwrap_or_default(),
            operation: self.operation.map(|op| format!("{op:?}")),
            idle_reward: self.idle_reward.to_string(),
            reward_in_router: self.reward_in_router.to_string(),
            idle_liquidity: self.idle_liquidity.to_string(),
            min_swap_out_a: self.min_swap_out_a.to_string(),
            min_swap_out_b: self.min_swap_out_b.to_string(),
            last_reinvest_at: self.last_reinvest_at.map(|at| at.to_string()),
            created_at: self.created_at.to_string(),
        }
    }
}

#[derive(Serialize, JsonSchema, Clone, Debug)]
#[serde(crate = "near_sdk::serde")]
pub struct VaultView {
    pub pool_id: u64,
    pub pooled_asset: String,
    pub reward_asset: String,
    pub token_a: String,
    pub token_b: String,
    pub deposit_fee_bps: u16,
    pub total_shares: String,
    pub last_known_staked_balance: String,
    pub exchange_rate: String,
    pub operation: Option<String>,
    pub idle_reward: String,
    pub reward_in_router: String,
    pub idle_liquidity: String,
    pub min_swap_out_a: String,
    pub min_swap_out_b: String,
    pub last_reinvest_at: Option<String>,
    pub created_at: String,
}

/// Holder of the minimum-liquidity shares.
pub fn locked_shares_account() -> AccountId {
    LOCKED_SHARES_ACCOUNT
        .parse()
        .unwrap_or_else(|_| env::panic_str("Invalid locked shares account"))
}

fn longest_account_id() -> AccountId {
    "a".repeat(MAX_ACCOUNT_ID_LEN)
        .parse()
        .unwrap_or_else(|_| env::panic_str("Invalid storage measurement account"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::builders::VaultBuilder;
    use crate::test_utils::helpers::{account, REGISTRY};
    use near_sdk::test_utils::get_logs;

    fn custody() -> AccountId {
        account(REGISTRY)
    }

    /// Empty vault with `alice.test` and `bob.test` registered.
    fn empty_vault(fee: u16) -> Vault {
        VaultBuilder::new(fee)
            .registered("alice.test")
            .registered("bob.test")
            .build()
    }

    #[test]
    fn first_deposit_locks_minimum_liquidity() {
        let mut vault = empty_vault(0);
        let quote = vault
            .apply_deposit(&account("alice.test"), 100_000, 0)
            .unwrap();

        assert_eq!(quote.shares, 99_000);
        assert_eq!(quote.locked, MINIMUM_LIQUIDITY);
        assert_eq!(vault.shares().balance_of(&account("alice.test")), 99_000);
        assert_eq!(vault.shares().balance_of(&locked_shares_account()), 1_000);
        assert_eq!(vault.total_shares(), 100_000);
        assert_eq!(vault.last_known_staked_balance, 100_000);

        let logs = get_logs();
        let mint = logs
            .iter()
            .find(|log| log.contains(r#""event":"ft_mint""#))
            .unwrap();
        assert!(mint.contains(r#""standard":"nep141""#));
        assert!(mint.contains(LOCKED_SHARES_ACCOUNT));
        assert!(mint.contains(r#""memo":"pool 0 deposit""#));
    }

    #[test]
    fn second_deposit_is_priced_at_current_value_per_share() {
        let mut vault = empty_vault(0);
        vault.apply_deposit(&account("alice.test"), 100_000, 0).unwrap();
        let quote = vault.apply_deposit(&account("bob.test"), 50_000, 0).unwrap();

        assert_eq!(quote.shares, 50_000);
        assert_eq!(quote.locked, 0);
        assert_eq!(vault.total_shares(), 150_000);
        assert_eq!(vault.last_known_staked_balance, 150_000);
    }

    #[test]
    fn deposit_fee_is_deducted_before_pricing() {
        let mut vault = empty_vault(300);
        let quote = vault
            .apply_deposit(&account("alice.test"), 100_000, 0)
            .unwrap();

        assert_eq!(quote.net, 97_000);
        assert_eq!(quote.shares, 97_000 - MINIMUM_LIQUIDITY);
        assert_eq!(vault.last_known_staked_balance, 97_000);
    }

    #[test]
    fn deposit_to_unregistered_receiver_changes_nothing() {
        let mut vault = empty_vault(0);
        assert_eq!(
            vault.apply_deposit(&account("carol.test"), 100_000, 0),
            Err(VaultError::NotRegistered(account("carol.test")))
        );
        assert_eq!(vault.total_shares(), 0);
        assert_eq!(vault.last_known_staked_balance, 0);
    }

    #[test]
    fn deposit_below_min_shares_changes_nothing() {
        let mut vault = empty_vault(0);
        assert_eq!(
            vault.apply_deposit(&account("alice.test"), 100_000, 99_001),
            Err(VaultError::SlippageNotMet {
                minimum: 99_001,
                actual: 99_000
            })
        );
        assert_eq!(vault.total_shares(), 0);
    }

    #[test]
    fn first_deposit_at_or_below_minimum_is_rejected() {
        let vault = empty_vault(0);
        assert_eq!(
            vault.quote_deposit(MINIMUM_LIQUIDITY),
            Err(VaultError::InsufficientInitialDeposit {
                net: MINIMUM_LIQUIDITY,
                minimum: MINIMUM_LIQUIDITY
            })
        );
        assert_eq!(vault.quote_deposit(0), Err(VaultError::ZeroAmount));
    }

    #[test]
    fn shares_without_stake_is_degenerate() {
        let vault = VaultBuilder::new(0)
            .holder("alice.test", 5_000)
            .staked(0)
            .build();
        assert_eq!(vault.quote_deposit(10_000), Err(VaultError::DegenerateState));
    }

    #[test]
    fn deposit_rounding_to_zero_shares_is_rejected() {
        let vault = VaultBuilder::new(0)
            .holder("alice.test", 1_000)
            .staked(1_000_000)
            .build();
        assert_eq!(vault.quote_deposit(999), Err(VaultError::ZeroShares));
        assert_eq!(vault.quote_deposit(1_000).unwrap().shares, 1);
    }

    #[test]
    fn redeem_pays_pro_rata_and_burns_custody_shares() {
        let mut vault = empty_vault(0);
        vault.apply_deposit(&account("alice.test"), 100_000, 0).unwrap();
        vault.apply_reinvest(10_000).unwrap();
        vault
            .transfer_shares(&account("alice.test"), &custody(), 49_500, &custody())
            .unwrap();

        let quote = vault.quote_redeem(&account("alice.test"), &custody()).unwrap();
        assert_eq!(quote.shares, 49_500);
        assert_eq!(quote.amount, 54_450);

        vault
            .apply_redeem(&account("alice.test"), &custody(), quote)
            .unwrap();
        assert_eq!(vault.total_shares(), 50_500);
        assert_eq!(vault.last_known_staked_balance, 110_000 - 54_450);
        assert_eq!(vault.shares().balance_of(&custody()), 0);
        assert_eq!(vault.redeemable_of(&account("alice.test")), 0);
        assert!(get_logs()
            .iter()
            .any(|log| log.contains(r#""event":"ft_burn""#)));
    }

    #[test]
    fn redeem_only_uses_shares_pushed_by_the_caller() {
        let mut vault = empty_vault(0);
        vault.apply_deposit(&account("alice.test"), 100_000, 0).unwrap();
        vault
            .transfer_shares(&account("alice.test"), &custody(), 1_000, &custody())
            .unwrap();

        assert_eq!(
            vault.quote_redeem(&account("mallory.test"), &custody()),
            Err(VaultError::NothingToRedeem)
        );
        assert_eq!(
            vault
                .quote_redeem(&account("alice.test"), &custody())
                .unwrap()
                .shares,
            1_000
        );
    }

    #[test]
    fn redeem_on_empty_vault_is_rejected() {
        let vault = empty_vault(0);
        assert_eq!(
            vault.quote_redeem(&account("alice.test"), &custody()),
            Err(VaultError::NoSharesOutstanding)
        );
    }

    #[test]
    fn redeem_of_dust_is_rejected() {
        let mut vault = VaultBuilder::new(0)
            .holder("alice.test", 1_000_000)
            .staked(1_000)
            .build();
        vault
            .transfer_shares(&account("alice.test"), &custody(), 999, &custody())
            .unwrap();
        assert_eq!(
            vault.quote_redeem(&account("alice.test"), &custody()),
            Err(VaultError::ZeroRedemption)
        );
    }

    #[test]
    fn reinvest_raises_value_per_share_only() {
        let mut vault = VaultBuilder::new(0)
            .holder("alice.test", 100_000)
            .staked(100_000)
            .build();
        let before = vault.exchange_rate().unwrap();

        assert_eq!(vault.apply_reinvest(5_000).unwrap(), 5_000);
        assert_eq!(vault.last_known_staked_balance, 105_000);
        assert_eq!(vault.total_shares(), 100_000);
        assert!(vault.exchange_rate().unwrap() > before);
    }

    #[test]
    fn reinvest_credits_liquidity_net_of_fee() {
        let mut vault = VaultBuilder::new(300)
            .holder("alice.test", 100_000)
            .staked(100_000)
            .build();
        assert_eq!(vault.apply_reinvest(10_000).unwrap(), 9_700);
        assert_eq!(vault.last_known_staked_balance, 109_700);
    }

    #[test]
    fn reinvest_is_rate_limited_per_vault() {
        let mut vault = empty_vault(0);
        vault.begin_reinvest(1_000, 500).unwrap();
        vault.finish();

        assert_eq!(
            vault.begin_reinvest(1_499, 500),
            Err(VaultError::ReinvestTooSoon {
                next_at: 1_500,
                now: 1_499
            })
        );
        assert_eq!(vault.operation(), None);
        assert_eq!(vault.last_reinvest_at, Some(1_000));

        vault.begin_reinvest(1_500, 500).unwrap();
        assert_eq!(vault.operation(), Some(Operation::Reinvest));
        assert_eq!(vault.last_reinvest_at, Some(1_500));
    }

    #[test]
    fn swap_limits_require_a_positive_bound_per_leg() {
        let mut vault = empty_vault(0);
        assert_eq!(
            vault.swap_limits(None, None, 10),
            Err(VaultError::SwapLimitsRequired)
        );
        assert_eq!(
            vault.swap_limits(Some(5), None, 10),
            Err(VaultError::SwapLimitsRequired)
        );

        vault.set_swap_floor(100, 200).unwrap();
        let limits = vault.swap_limits(Some(150), Some(1), 10).unwrap();
        assert_eq!(limits.min_out_a, U128(150));
        assert_eq!(limits.min_out_b, U128(200));
        assert_eq!(limits.deadline, U64(10));

        assert_eq!(
            vault.set_swap_floor(0, 1),
            Err(VaultError::InvalidConfig("swap floor must be positive"))
        );
    }

    #[test]
    fn round_trip_never_returns_more_than_net_deposit() {
        for fee in [0u16, 30, 300, 2_500] {
            let mut vault = VaultBuilder::new(fee)
                .registered("seed.test")
                .registered("alice.test")
                .build();
            vault.apply_deposit(&account("seed.test"), 1_000_003, 0).unwrap();

            let quote = vault
                .apply_deposit(&account("alice.test"), 777_777, 0)
                .unwrap();
            vault
                .transfer_shares(&account("alice.test"), &custody(), quote.shares, &custody())
                .unwrap();
            let redeem = vault.quote_redeem(&account("alice.test"), &custody()).unwrap();

            assert!(redeem.amount <= quote.net, "fee {fee}");
        }
    }

    #[test]
    fn exchange_rate_defaults_to_one_on_empty_vault() {
        let vault = empty_vault(0);
        assert_eq!(vault.exchange_rate().unwrap(), EXCHANGE_RATE_SCALE);
        assert_eq!(vault.convert_to_assets(1_000).unwrap(), 0);
    }

    #[test]
    fn lock_rejects_a_second_operation() {
        let mut vault = empty_vault(0);
        vault.begin(Operation::Deposit).unwrap();

        assert_eq!(
            vault.begin(Operation::Reinvest),
            Err(VaultError::OperationInProgress(Operation::Deposit))
        );
        assert_eq!(vault.finish(), Some(Operation::Deposit));
        assert!(vault.begin(Operation::Redeem).is_ok());
    }

    #[test]
    fn fee_above_denominator_is_rejected() {
        let info = FarmPoolInfo {
            pooled_asset: account("lp.test"),
            token_a: account("a.test"),
            token_b: account("b.test"),
            deposit_fee_bps: 10_001,
        };
        assert!(matches!(
            Vault::new(0, info, account("reward.test"), &custody(), 0),
            Err(VaultError::InvalidFeeBps(10_001))
        ));
    }

    #[test]
    fn new_vault_registers_custody_and_locked_account() {
        let vault = empty_vault(0);
        assert!(vault.shares().is_registered(&custody()));
        assert!(vault.shares().is_registered(&locked_shares_account()));
        assert!(!vault.shares().is_registered(&account("carol.test")));
    }

    #[test]
    fn unclaimed_payouts_are_taken_once() {
        let mut vault = empty_vault(0);
        vault.credit_unclaimed(&account("alice.test"), 10).unwrap();
        vault.credit_unclaimed(&account("alice.test"), 5).unwrap();

        assert!(vault.has_holder_entries(&account("alice.test")));
        assert_eq!(vault.take_unclaimed(&account("alice.test")), Ok(15));
        assert_eq!(
            vault.take_unclaimed(&account("alice.test")),
            Err(VaultError::NothingToClaim)
        );
        assert!(!vault.has_holder_entries(&account("alice.test")));
    }

    #[test]
    fn stranded_stake_is_kept_out_of_the_staked_balance() {
        let mut vault = empty_vault(0);
        vault.credit_stranded(&account("alice.test"), 500).unwrap();

        assert_eq!(vault.stranded_of(&account("alice.test")), 500);
        assert_eq!(vault.last_known_staked_balance, 0);
        assert_eq!(vault.take_stranded(&account("alice.test")), Ok(500));
        assert_eq!(
            vault.take_stranded(&account("alice.test")),
            Err(VaultError::NothingToReclaim)
        );
    }
}
