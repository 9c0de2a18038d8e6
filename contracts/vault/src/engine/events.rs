//! # Vault Events
//!
//! NEP-297 event logging for vault operations.
//! Events are emitted as JSON logs prefixed with `EVENT_JSON:`. Share
//! movements use the standard NEP-141 `ft_mint`, `ft_burn` and
//! `ft_transfer` events.
//!
//! ## Format
//!
//! ```json
//! {
//!   "standard": "compounding_vault",
//!   "version": "1.0.0",
//!   "event": "vault_deposit",
//!   "data": [{ ... }]
//! }
//! ```

use near_sdk::json_types::U128;
use near_sdk::serde::Serialize;
use near_sdk::{env, AccountIdRef};

use super::Operation;

// ============================================================================
// Event Wrapper
// ============================================================================

#[derive(Serialize, Debug)]
#[serde(crate = "near_sdk::serde")]
#[serde(tag = "standard")]
#[must_use = "don't forget to `.emit()` this event"]
#[serde(rename_all = "snake_case")]
pub(crate) enum NearEvent<'a> {
    CompoundingVault(VaultEventPayload<'a>),
}

impl NearEvent<'_> {
    fn to_json_string(&self) -> String {
        #[allow(clippy::redundant_closure)]
        serde_json::to_string(self)
            .ok()
            .unwrap_or_else(|| env::abort())
    }

    fn to_json_event_string(&self) -> String {
        format!("EVENT_JSON:{}", self.to_json_string())
    }

    pub(crate) fn emit(self) {
        env::log_str(&self.to_json_event_string());
    }
}

// ============================================================================
// Vault Lifecycle
// ============================================================================

/// Emitted once when a vault is registered for a farm pool.
#[must_use]
#[derive(Serialize, Debug, Clone)]
#[serde(crate = "near_sdk::serde")]
pub struct VaultCreated<'a> {
    pub pool_id: u64,
    pub pooled_asset: &'a AccountIdRef,
    pub deposit_fee_bps: u16,
}

impl VaultCreated<'_> {
    pub fn emit(self) {
        new_v1(VaultEventKind::VaultCreated(&[self])).emit()
    }
}

/// Emitted when a deposit has been staked and shares minted.
#[must_use]
#[derive(Serialize, Debug, Clone)]
#[serde(crate = "near_sdk::serde")]
pub struct VaultDeposit<'a> {
    pub pool_id: u64,
    /// The account that sent the pooled asset.
    pub sender_id: &'a AccountIdRef,
    /// The account that received the shares.
    pub receiver_id: &'a AccountIdRef,
    /// Gross amount staked, before the farm's deposit fee.
    pub amount: U128,
    pub shares: U128,
}

impl VaultDeposit<'_> {
    pub fn emit(self) {
        new_v1(VaultEventKind::VaultDeposit(&[self])).emit()
    }
}

/// Emitted when custody shares are burned and the pooled asset released.
#[must_use]
#[derive(Serialize, Debug, Clone)]
#[serde(crate = "near_sdk::serde")]
pub struct VaultRedeem<'a> {
    pub pool_id: u64,
    pub receiver_id: &'a AccountIdRef,
    pub shares: U128,
    pub amount: U128,
}

impl VaultRedeem<'_> {
    pub fn emit(self) {
        new_v1(VaultEventKind::VaultRedeem(&[self])).emit()
    }
}

/// Emitted when harvested rewards have been converted and restaked.
#[must_use]
#[derive(Serialize, Debug, Clone)]
#[serde(crate = "near_sdk::serde")]
pub struct VaultReinvest {
    pub pool_id: u64,
    /// Liquidity accepted by the farm.
    pub liquidity: U128,
    /// Increase of the tracked staked balance, net of the deposit fee.
    pub credited: U128,
    pub staked_balance: U128,
}

impl VaultReinvest {
    pub fn emit(self) {
        new_v1(VaultEventKind::VaultReinvest(&[self])).emit()
    }
}

/// Emitted when an adapter call fails and the vault lock is released
/// without changing the vault's accounting.
#[must_use]
#[derive(Serialize, Debug, Clone)]
#[serde(crate = "near_sdk::serde")]
pub struct OperationFailed<'a> {
    pub pool_id: u64,
    pub operation: Operation,
    pub reason: &'a str,
}

impl OperationFailed<'_> {
    pub fn emit(self) {
        new_v1(VaultEventKind::OperationFailed(&[self])).emit()
    }
}

// ============================================================================
// Internal Event Structures
// ============================================================================

#[derive(Serialize, Debug)]
#[serde(crate = "near_sdk::serde")]
pub(crate) struct VaultEventPayload<'a> {
    version: &'static str,
    #[serde(flatten)]
    event_kind: VaultEventKind<'a>,
}

#[derive(Serialize, Debug)]
#[serde(crate = "near_sdk::serde")]
#[serde(tag = "event", content = "data")]
#[serde(rename_all = "snake_case")]
#[allow(clippy::enum_variant_names)]
enum VaultEventKind<'a> {
    VaultCreated(&'a [VaultCreated<'a>]),
    VaultDeposit(&'a [VaultDeposit<'a>]),
    VaultRedeem(&'a [VaultRedeem<'a>]),
    VaultReinvest(&'a [VaultReinvest]),
    OperationFailed(&'a [OperationFailed<'a>]),
}

fn new_v1(event_kind: VaultEventKind) -> NearEvent {
    NearEvent::CompoundingVault(VaultEventPayload {
        version: "1.0.0",
        event_kind,
    })
}
