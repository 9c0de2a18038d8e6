//! # Compounding Vault Registry Contract
//!
//! A NEAR smart contract that runs one auto-compounding vault per farm pool.
//! This contract enables:
//!
//! - **Deposits**: pooled-asset `ft_transfer_call` into a vault, staked into the farm
//! - **Redemptions**: shares pushed back to the registry are burned for their pro-rata stake
//! - **Reinvesting**: permissionless harvest, swap to liquidity and restake
//! - **Share Ledger**: per-vault NEP-141 share balances with NEP-145 storage
//!   registration and allowances
//!
//! ## Architecture
//!
//! The contract is organized into several modules:
//! - [`engine`]: Vault accounting, share ledger, events and safe math
//! - [`adapters`]: Farm and router cross-contract interfaces
//! - [`registry`]: Vault creation, enumeration and lock recovery
//! - [`deposit`], [`redeem`], [`reinvest`]: The asynchronous vault flows
//! - [`shares`]: Share balance, transfer, allowance and storage methods
//! - [`views`]: Read-only accessors of a single vault

use near_sdk::{
    env,
    json_types::U64,
    near,
    store::{IterableMap, Vector},
    AccountId, BorshStorageKey, PanicOnDefault,
};

pub mod adapters;
pub mod constants;
pub mod engine;
pub mod errors;

mod deposit;
mod redeem;
mod registry;
mod reinvest;
mod shares;
mod views;

#[cfg(test)]
pub mod test_utils;

use engine::Vault;
use errors::VaultError;

/// Storage key prefixes for contract collections.
#[near(serializers = [borsh])]
#[derive(BorshStorageKey)]
pub enum StorageKey {
    /// Vaults by farm pool id.
    Vaults,
    /// Pool ids in creation order.
    AllVaults,
    /// NEP-141 share token of one vault.
    ShareToken { pool_id: u64 },
    ShareAllowances { pool_id: u64 },
    /// Shares pushed into custody, by the holder that pushed them.
    RedeemableShares { pool_id: u64 },
    /// Payouts whose transfer failed, by the account that may claim them.
    UnclaimedPayouts { pool_id: u64 },
    /// Stake the farm kept for deposits that minted no shares, by receiver.
    StrandedStake { pool_id: u64 },
}

/// Deployment-wide collaborators shared by every vault.
#[near(serializers = [json, borsh])]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Farm every vault stakes into.
    pub farm_id: AccountId,
    /// Router turning reward into pooled asset.
    pub router_id: AccountId,
    /// Reward token harvested from the farm.
    pub reward_token_id: AccountId,
    /// Default reinvest deadline, relative to the block of the call.
    pub reinvest_window_ns: U64,
    /// Minimum time between the starts of two reinvests of one vault.
    pub min_reinvest_interval_ns: U64,
}

/// Registry state: the vault arena and its creation order.
#[near(contract_state)]
#[derive(PanicOnDefault)]
pub struct Contract {
    /// The account allowed to register vaults.
    pub owner_id: AccountId,
    pub config: RegistryConfig,
    /// Vaults by farm pool id. At most one vault per pool.
    pub vaults: IterableMap<u64, Vault>,
    /// Append-only list of pool ids in creation order.
    pub all_vaults: Vector<u64>,
}

#[near]
impl Contract {
    /// Initializes the registry.
    ///
    /// # Arguments
    ///
    /// * `owner_id` - Account allowed to register vaults
    /// * `config` - Farm, router and reward token shared by all vaults
    ///
    /// # Panics
    ///
    /// Panics if the reinvest window or interval is zero, or the farm and
    /// router coincide.
    #[init]
    #[private]
    pub fn init(owner_id: AccountId, config: RegistryConfig) -> Self {
        if config.reinvest_window_ns.0 == 0 {
            env::panic_str(
                &VaultError::InvalidConfig("reinvest window must be positive").to_string(),
            );
        }
        if config.min_reinvest_interval_ns.0 == 0 {
            env::panic_str(
                &VaultError::InvalidConfig("reinvest interval must be positive").to_string(),
            );
        }
        if config.farm_id == config.router_id {
            env::panic_str(&VaultError::InvalidConfig("farm and router must differ").to_string());
        }

        Self {
            owner_id,
            config,
            vaults: IterableMap::new(StorageKey::Vaults),
            all_vaults: Vector::new(StorageKey::AllVaults),
        }
    }
}

impl Contract {
    /// Asserts that the caller is the contract owner.
    ///
    /// # Panics
    ///
    /// Panics if the predecessor account is not the owner.
    pub(crate) fn require_owner(&self) {
        if env::predecessor_account_id() != self.owner_id {
            env::panic_str(&VaultError::Unauthorized.to_string());
        }
    }

    pub(crate) fn vault(&self, pool_id: u64) -> Result<&Vault, VaultError> {
        self.vaults
            .get(&pool_id)
            .ok_or(VaultError::UnknownVault(pool_id))
    }

    pub(crate) fn vault_mut(&mut self, pool_id: u64) -> Result<&mut Vault, VaultError> {
        self.vaults
            .get_mut(&pool_id)
            .ok_or(VaultError::UnknownVault(pool_id))
    }
}
