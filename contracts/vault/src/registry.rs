//! # Vault Registry
//!
//! Creates exactly one vault per farm pool and exposes lookup and
//! enumeration. A vault's pooled asset, constituent tokens and deposit fee
//! are read from the farm's own `pool_info` at creation time.

use near_sdk::json_types::U128;
use near_sdk::{env, near, AccountId, Promise, PromiseError};

use crate::adapters::{self, FarmPoolInfo};
use crate::constants::GAS_FOR_ON_FARM_POOL_INFO;
use crate::engine::events::VaultCreated;
use crate::engine::{Operation, Vault, VaultView};
use crate::errors::{OrPanic, VaultError};
use crate::{Contract, ContractExt, RegistryConfig};

#[near]
impl Contract {
    /// Registers a vault for `pool_id`. Owner only.
    ///
    /// The farm is queried for the pool configuration and the vault is
    /// created in [`Contract::on_farm_pool_info`].
    ///
    /// # Panics
    ///
    /// Panics if the caller is not the owner or a vault already exists for
    /// the pool.
    pub fn create_vault(&mut self, pool_id: u64) -> Promise {
        self.require_owner();
        if self.vaults.contains_key(&pool_id) {
            env::panic_str(&VaultError::VaultAlreadyExists(pool_id).to_string());
        }

        adapters::pool_info(self.config.farm_id.clone(), pool_id).then(
            Self::ext(env::current_account_id())
                .with_static_gas(GAS_FOR_ON_FARM_POOL_INFO)
                .on_farm_pool_info(pool_id),
        )
    }

    /// Returns `true` when the vault was registered.
    #[private]
    pub fn on_farm_pool_info(
        &mut self,
        pool_id: u64,
        #[callback_result] info: Result<Option<FarmPoolInfo>, PromiseError>,
    ) -> bool {
        let info = match info {
            Ok(Some(info)) => info,
            Ok(None) => {
                env::log_str(&format!("vault_not_created pool={pool_id} reason=unknown_pool"));
                return false;
            }
            Err(_) => {
                env::log_str(&format!("vault_not_created pool={pool_id} reason=pool_info_failed"));
                return false;
            }
        };

        match self.internal_register_vault(pool_id, info) {
            Ok(()) => true,
            Err(err) => {
                env::log_str(&format!("vault_not_created pool={pool_id} reason={err}"));
                false
            }
        }
    }

    pub fn get_vault(&self, pool_id: u64) -> Option<VaultView> {
        self.vaults.get(&pool_id).map(Vault::view)
    }

    pub fn all_vaults_length(&self) -> u64 {
        u64::from(self.all_vaults.len())
    }

    /// Returns the vault created at position `index` (creation order).
    pub fn get_vault_at(&self, index: u64) -> Option<VaultView> {
        let index = u32::try_from(index).ok()?;
        let pool_id = self.all_vaults.get(index)?;
        self.get_vault(*pool_id)
    }

    /// Pages through vaults in creation order.
    pub fn get_vaults(&self, from_index: Option<u64>, limit: Option<u64>) -> Vec<VaultView> {
        let from_index = from_index.unwrap_or(0);
        let limit = limit.unwrap_or(u64::MAX);

        self.all_vaults
            .iter()
            .skip(usize::try_from(from_index).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .filter_map(|pool_id| self.get_vault(*pool_id))
            .collect()
    }

    pub fn get_config(&self) -> RegistryConfig {
        self.config.clone()
    }

    pub fn get_owner(&self) -> AccountId {
        self.owner_id.clone()
    }

    /// Sets the minimum output of each reinvest swap leg. Owner only.
    ///
    /// # Panics
    ///
    /// Panics if either minimum is zero.
    pub fn set_swap_limits(&mut self, pool_id: u64, min_out_a: U128, min_out_b: U128) {
        self.require_owner();
        self.vault_mut(pool_id)
            .or_panic()
            .set_swap_floor(min_out_a.0, min_out_b.0)
            .or_panic();
        env::log_str(&format!(
            "swap_limits_set pool={pool_id} min_out_a={} min_out_b={}",
            min_out_a.0, min_out_b.0
        ));
    }

    /// Clears the lock of a vault whose terminal callback never ran.
    /// Owner only. Returns the operation that held the lock.
    pub fn release_lock(&mut self, pool_id: u64) -> Option<Operation> {
        self.require_owner();
        let released = self.vault_mut(pool_id).or_panic().finish();
        env::log_str(&format!("lock_released pool={pool_id} operation={released:?}"));
        released
    }
}

impl Contract {
    pub(crate) fn internal_register_vault(
        &mut self,
        pool_id: u64,
        info: FarmPoolInfo,
    ) -> Result<(), VaultError> {
        if self.vaults.contains_key(&pool_id) {
            return Err(VaultError::VaultAlreadyExists(pool_id));
        }

        let vault = Vault::new(
            pool_id,
            info,
            self.config.reward_token_id.clone(),
            &env::current_account_id(),
            env::block_timestamp(),
        )?;

        VaultCreated {
            pool_id,
            pooled_asset: &vault.pooled_asset,
            deposit_fee_bps: vault.deposit_fee_bps,
        }
        .emit();

        self.vaults.insert(pool_id, vault);
        self.all_vaults.push(pool_id);
        Ok(())
    }
}
