use crate::{
    error::Result,
    host::{BankKeeper, StakingKeeper},
    keys,
    params::{self, PeggyParams},
    store::{self, Store},
};
use peggy_primitives::UInt64Nonce;

/// Execution context of the current block, supplied by the host.
#[derive(Clone, Copy, Debug, Default)]
pub struct BlockContext {
    pub height: u64,
    /// Block time in unix seconds. The engine never reads the wall clock.
    pub time: u64,
}

impl BlockContext {
    pub fn at_height(height: u64) -> Self {
        Self { height, time: 0 }
    }
}

/// The bridge keeper: every state transition goes through it.
///
/// It borrows the message's store (usually a [`crate::store::CacheStore`])
/// together with the host's staking view and bank; dropping the store
/// uncommitted is what rolls a failed message back.
pub struct Keeper<'a, S: Store + ?Sized, SK: StakingKeeper, BK: BankKeeper> {
    pub(crate) store: &'a mut S,
    pub(crate) staking: &'a SK,
    pub(crate) bank: &'a BK,
}

impl<'a, S: Store + ?Sized, SK: StakingKeeper, BK: BankKeeper> Keeper<'a, S, SK, BK> {
    pub fn new(store: &'a mut S, staking: &'a SK, bank: &'a BK) -> Self {
        Self {
            store,
            staking,
            bank,
        }
    }

    pub fn params(&self) -> Result<PeggyParams> {
        params::params(&*self.store)
    }

    /// Allocates the next outgoing tx id; ids start at 1.
    pub(crate) fn next_tx_id(&mut self) -> Result<u64> {
        let id = store::get_u64(&*self.store, keys::LAST_TX_ID_KEY)?.saturating_add(1);
        store::set_u64(self.store, keys::LAST_TX_ID_KEY, id);
        Ok(id)
    }

    /// Allocates the next batch nonce, strictly monotonic across all tokens.
    pub(crate) fn next_batch_nonce(&mut self) -> Result<UInt64Nonce> {
        let nonce = store::get_u64(&*self.store, keys::LAST_BATCH_NONCE_KEY)?.saturating_add(1);
        store::set_u64(self.store, keys::LAST_BATCH_NONCE_KEY, nonce);
        Ok(UInt64Nonce::new(nonce))
    }
}
