//! # Vault Errors
//!
//! Engine code returns `Result<_, VaultError>`; contract entry points turn an
//! error into a panic so the whole receipt reverts.

use near_sdk::{env, AccountId};
use thiserror::Error;

use crate::engine::Operation;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VaultError {
    // Configuration
    #[error("Vault already exists for farm pool {0}")]
    VaultAlreadyExists(u64),

    #[error("No vault registered for farm pool {0}")]
    UnknownVault(u64),

    #[error("Deposit fee of {0} bps exceeds 10000")]
    InvalidFeeBps(u16),

    #[error("Expected pooled asset {expected}, received {actual}")]
    UnexpectedAsset { expected: AccountId, actual: AccountId },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(&'static str),

    #[error("Invalid deposit message")]
    InvalidMessage,

    #[error("Only the owner can call this method")]
    Unauthorized,

    // Storage
    #[error("Account {0} is not registered for this vault's shares")]
    NotRegistered(AccountId),

    #[error("Attached deposit of {attached} yoctoNEAR does not cover storage cost of {required}")]
    InsufficientStorageDeposit { required: u128, attached: u128 },

    #[error("Requires attached deposit of at least 1 yoctoNEAR")]
    DepositRequired,

    #[error("Account {0} still has shares awaiting redemption or funds to claim")]
    PendingEntries(AccountId),

    // Insufficient balance
    #[error("Amount must be greater than zero")]
    ZeroAmount,

    #[error("Cannot transfer shares to the sender")]
    SelfTransfer,

    #[error("Insufficient shares: available {available}, requested {requested}")]
    InsufficientShares { available: u128, requested: u128 },

    #[error("Insufficient allowance: available {available}, requested {requested}")]
    InsufficientAllowance { available: u128, requested: u128 },

    #[error("Insufficient staked balance: staked {staked}, requested {requested}")]
    InsufficientStake { staked: u128, requested: u128 },

    #[error("No shares outstanding")]
    NoSharesOutstanding,

    #[error("No shares held by the vault for redemption")]
    NothingToRedeem,

    #[error("No payout to claim")]
    NothingToClaim,

    #[error("No stranded stake to reclaim")]
    NothingToReclaim,

    // Degenerate state
    #[error("Initial deposit of {net} must exceed the minimum liquidity of {minimum}")]
    InsufficientInitialDeposit { net: u128, minimum: u128 },

    #[error("Vault has outstanding shares but no staked balance")]
    DegenerateState,

    #[error("Deposit too small to mint shares")]
    ZeroShares,

    #[error("Redemption too small to withdraw any pooled asset")]
    ZeroRedemption,

    #[error("Arithmetic overflow")]
    MathOverflow,

    #[error("Division by zero")]
    DivisionByZero,

    // Concurrency and external bounds
    #[error("Vault operation in progress: {0:?}")]
    OperationInProgress(Operation),

    #[error("Reinvest deadline {deadline} has passed (now {now})")]
    DeadlineExpired { deadline: u64, now: u64 },

    #[error("Next reinvest allowed at {next_at} (now {now})")]
    ReinvestTooSoon { next_at: u64, now: u64 },

    #[error("Swap limits required: the vault has no minimum swap output configured")]
    SwapLimitsRequired,

    #[error("Minted shares {actual} below requested minimum {minimum}")]
    SlippageNotMet { minimum: u128, actual: u128 },
}

/// Converts an engine error into a receipt-aborting panic.
pub trait OrPanic<T> {
    fn or_panic(self) -> T;
}

impl<T> OrPanic<T> for Result<T, VaultError> {
    fn or_panic(self) -> T {
        self.unwrap_or_else(|err| env::panic_str(&err.to_string()))
    }
}
