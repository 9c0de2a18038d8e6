//! # Test Utilities
//!
//! Helper functions and builders for unit testing the registry and the vault
//! engine.
//!
//! ## Modules
//!
//! - [`helpers`]: Context setup, account ids and contract initialization
//! - [`builders`]: Builder pattern for vaults and pre-populated registries

/// Helper functions for test context and contract initialization.
#[cfg(test)]
pub mod helpers {
    use crate::adapters::FarmPoolInfo;
    use crate::{Contract, RegistryConfig};
    use near_sdk::json_types::U64;
    use near_sdk::test_utils::VMContextBuilder;
    use near_sdk::{testing_env, AccountId, NearToken};

    /// Account the registry is deployed on.
    pub const REGISTRY: &str = "vault.test";
    pub const FARM: &str = "farm.test";
    pub const ROUTER: &str = "router.test";
    pub const REWARD: &str = "reward.test";
    pub const POOLED_ASSET: &str = "lp.test";

    /// Ten minutes.
    pub const REINVEST_WINDOW_NS: u64 = 600_000_000_000;

    /// One hour.
    pub const MIN_REINVEST_INTERVAL_NS: u64 = 3_600_000_000_000;

    pub fn account(id: &str) -> AccountId {
        id.parse().unwrap()
    }

    /// Initializes the NEAR VM context for testing.
    ///
    /// # Example
    ///
    /// ```ignore
    /// init_ctx("alice.test", 1); // Alice calls with 1 yoctoNEAR
    /// contract.share_transfer(0, account("bob.test"), U128(10));
    /// ```
    pub fn init_ctx(predecessor: &str, deposit_yocto: u128) {
        init_ctx_at(predecessor, deposit_yocto, 0);
    }

    /// Same as [`init_ctx`] with an explicit block timestamp (ns).
    pub fn init_ctx_at(predecessor: &str, deposit_yocto: u128, block_timestamp: u64) {
        let mut builder = VMContextBuilder::new();
        builder
            .current_account_id(account(REGISTRY))
            .predecessor_account_id(account(predecessor))
            .attached_deposit(NearToken::from_yoctonear(deposit_yocto))
            .block_timestamp(block_timestamp);
        testing_env!(builder.build());
    }

    pub fn registry_config() -> RegistryConfig {
        RegistryConfig {
            farm_id: account(FARM),
            router_id: account(ROUTER),
            reward_token_id: account(REWARD),
            reinvest_window_ns: U64(REINVEST_WINDOW_NS),
            min_reinvest_interval_ns: U64(MIN_REINVEST_INTERVAL_NS),
        }
    }

    pub fn pool_info(deposit_fee_bps: u16) -> FarmPoolInfo {
        FarmPoolInfo {
            pooled_asset: account(POOLED_ASSET),
            token_a: account("token-a.test"),
            token_b: account("token-b.test"),
            deposit_fee_bps,
        }
    }

    pub fn init_contract(owner: &str) -> Contract {
        init_ctx(owner, 0);
        Contract::init(account(owner), registry_config())
    }
}

/// Builder pattern for vaults and registries in a chosen state.
#[cfg(test)]
pub mod builders {
    use crate::engine::Vault;
    use crate::test_utils::helpers::{account, init_ctx, pool_info, REGISTRY, REWARD};
    use crate::Contract;

    /// Builder for a standalone [`Vault`] with seeded shares and stake.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let vault = VaultBuilder::new(300)
    ///     .holder("alice.test", 100_000)
    ///     .registered("bob.test")
    ///     .staked(100_000)
    ///     .build();
    /// ```
    pub struct VaultBuilder {
        pool_id: u64,
        deposit_fee_bps: u16,
        registered: Vec<String>,
        holders: Vec<(String, u128)>,
        staked: Option<u128>,
        swap_floor: Option<(u128, u128)>,
    }

    impl VaultBuilder {
        pub fn new(deposit_fee_bps: u16) -> Self {
            Self {
                pool_id: 0,
                deposit_fee_bps,
                registered: Vec::new(),
                holders: Vec::new(),
                staked: None,
                swap_floor: None,
            }
        }

        pub fn pool_id(mut self, pool_id: u64) -> Self {
            self.pool_id = pool_id;
            self
        }

        /// Registers `id` for shares without minting any.
        pub fn registered(mut self, id: &str) -> Self {
            self.registered.push(id.to_string());
            self
        }

        /// Registers `id` and mints `shares` straight to it, bypassing
        /// deposit pricing.
        pub fn holder(mut self, id: &str, shares: u128) -> Self {
            self.holders.push((id.to_string(), shares));
            self
        }

        /// Sets the tracked staked balance. Defaults to the minted supply.
        pub fn staked(mut self, amount: u128) -> Self {
            self.staked = Some(amount);
            self
        }

        pub fn swap_floor(mut self, min_out_a: u128, min_out_b: u128) -> Self {
            self.swap_floor = Some((min_out_a, min_out_b));
            self
        }

        /// Builds the vault in a fresh testing context.
        pub fn build(self) -> Vault {
            init_ctx("owner.test", 0);
            self.build_in_ctx()
        }

        /// Builds the vault in the current testing context.
        pub fn build_in_ctx(self) -> Vault {
            let mut vault = Vault::new(
                self.pool_id,
                pool_info(self.deposit_fee_bps),
                account(REWARD),
                &account(REGISTRY),
                0,
            )
            .unwrap();
            for id in &self.registered {
                vault.shares.register(&account(id));
            }
            for (id, shares) in &self.holders {
                vault.shares.register(&account(id));
                vault.shares.mint(&account(id), *shares).unwrap();
            }
            if let Some((min_out_a, min_out_b)) = self.swap_floor {
                vault.set_swap_floor(min_out_a, min_out_b).unwrap();
            }
            vault.last_known_staked_balance = self.staked.unwrap_or(vault.total_shares());
            vault
        }
    }

    /// Builder for a registry with vaults already registered.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let contract = ContractBuilder::new("owner.test")
    ///     .vault(VaultBuilder::new(0).holder("alice.test", 100_000))
    ///     .predecessor("alice.test")
    ///     .attached(1)
    ///     .build();
    /// ```
    pub struct ContractBuilder {
        owner: String,
        vaults: Vec<VaultBuilder>,
        predecessor: Option<String>,
        attached: u128,
    }

    impl ContractBuilder {
        pub fn new(owner: &str) -> Self {
            Self {
                owner: owner.to_string(),
                vaults: Vec::new(),
                predecessor: None,
                attached: 0,
            }
        }

        pub fn vault(mut self, vault: VaultBuilder) -> Self {
            self.vaults.push(vault);
            self
        }

        /// Sets the predecessor (caller) account for subsequent calls.
        pub fn predecessor(mut self, id: &str) -> Self {
            self.predecessor = Some(id.to_string());
            self
        }

        /// Sets the attached deposit in yoctoNEAR.
        pub fn attached(mut self, yocto: u128) -> Self {
            self.attached = yocto;
            self
        }

        pub fn build(self) -> Contract {
            let mut contract = crate::test_utils::helpers::init_contract(&self.owner);
            for builder in self.vaults {
                let vault = builder.build_in_ctx();
                let pool_id = vault.pool_id;
                contract.vaults.insert(pool_id, vault);
                contract.all_vaults.push(pool_id);
            }
            let predecessor = self.predecessor.unwrap_or(self.owner);
            init_ctx(&predecessor, self.attached);
            contract
        }
    }
}
