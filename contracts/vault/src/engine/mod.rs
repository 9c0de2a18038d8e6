//! # Vault Engine Module
//!
//! Per-vault share accounting and the state machine driven by the contract
//! flows.
//!
//! ## Module Organization
//!
//! - [`ledger`]: Per-vault NEP-141 share token, storage registration and allowances
//! - [`vault`]: Vault state, pricing and the re-entrant-call lock
//! - [`events`]: NEP-297 event logging for vault operations
//! - [`mul_div`]: Overflow-free multiplication and division

pub mod events;
pub mod ledger;
pub mod mul_div;
pub mod vault;

pub use ledger::ShareLedger;
pub use vault::*;
