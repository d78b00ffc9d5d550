//! Consensus-side core of the Peggy bridge.
//!
//! A deterministic, single-threaded state machine invoked once per message
//! within a block: message validation and dispatch, the per-event-type
//! attestation tally with its strict nonce sequencing, the fee-ordered
//! outgoing transfer pool, batch building, and checkpoint signature
//! collection. All persistence goes through the host-supplied [`store::Store`];
//! each message commits fully or not at all.
//!
//! The host plugs in its staking view and bank through [`host::StakingKeeper`]
//! and [`host::BankKeeper`]; everything else lives behind [`handler::handle_msg`]
//! and the read-only [`query`] surface.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod attestation;
mod batch;
mod effects;
pub mod error;
pub mod handler;
pub mod host;
mod keeper;
pub mod keys;
pub mod params;
mod pool;
pub mod query;
mod registry;
pub mod store;
pub mod testutil;
mod valset;

pub use error::{PeggyError, Result};
pub use handler::{handle_msg, Msg};
pub use host::{module_account, BankKeeper, StakingKeeper, StoreBank};
pub use keeper::{BlockContext, Keeper};
pub use params::{set_params, PeggyParams, OUTGOING_TX_BATCH_SIZE};
pub use store::{CacheStore, MemStore, Store};
