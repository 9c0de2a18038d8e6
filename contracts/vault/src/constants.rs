//! # Constants
//!
//! Accounting constants and gas budgets shared by every vault.

use near_sdk::Gas;

/// Shares permanently locked on the first deposit into an empty vault.
pub const MINIMUM_LIQUIDITY: u128 = 1_000;

/// Holder of the locked minimum-liquidity shares. This is the implicit account
/// of the all-zero ed25519 key, for which no private key exists.
pub const LOCKED_SHARES_ACCOUNT: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// Basis points denominator for the deposit fee.
pub const BPS_DENOMINATOR: u128 = 10_000;

/// Fixed-point scale of the exchange rate view (1e18).
pub const EXCHANGE_RATE_SCALE: u128 = 1_000_000_000_000_000_000;

/// Longest account id; holder storage is measured against it.
pub const MAX_ACCOUNT_ID_LEN: usize = 64;

// ============================================================================
// Gas
// ============================================================================

/// Gas for a plain NEP-141 `ft_transfer`.
pub const GAS_FOR_FT_TRANSFER: Gas = Gas::from_tgas(15);

/// Gas for an `ft_transfer_call` into the farm or router, including the
/// receiver's `ft_on_transfer` and the token's `ft_resolve_transfer`.
pub const GAS_FOR_FT_TRANSFER_CALL: Gas = Gas::from_tgas(50);

/// Gas for `pool_info`, `unstake` and `harvest` on the farm.
pub const GAS_FOR_FARM_CALL: Gas = Gas::from_tgas(30);

/// Gas for `swap_and_add_liquidity` on the router.
pub const GAS_FOR_SWAP: Gas = Gas::from_tgas(60);

pub const GAS_FOR_ON_FARM_POOL_INFO: Gas = Gas::from_tgas(10);
/// Covers releasing the stake of a deposit that minted no shares.
pub const GAS_FOR_ON_DEPOSIT_STAKED: Gas = Gas::from_tgas(80);
pub const GAS_FOR_ON_PAYOUT_TRANSFERRED: Gas = Gas::from_tgas(5);

/// Covers the payout transfer and its resolution callback.
pub const GAS_FOR_ON_REDEEM_UNSTAKED: Gas = Gas::from_tgas(30);

/// Covers returning released stake to the deposit receiver.
pub const GAS_FOR_ON_STAKE_RELEASED: Gas = Gas::from_tgas(30);

pub const GAS_FOR_ON_REINVEST_STAKED: Gas = Gas::from_tgas(10);

/// Covers staking the produced liquidity and `on_reinvest_staked`.
pub const GAS_FOR_ON_LIQUIDITY_ADDED: Gas = Gas::from_tgas(70);

/// Covers the swap and every later stage.
pub const GAS_FOR_ON_REWARD_DEPOSITED: Gas = Gas::from_tgas(140);

/// Covers the router deposit and every later stage.
pub const GAS_FOR_ON_REINVEST_HARVESTED: Gas = Gas::from_tgas(200);
