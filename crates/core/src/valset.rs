//! Valset snapshots and the nonce watermarks around them.

use crate::{
    error::{PeggyError, Result},
    host::{BankKeeper, StakingKeeper},
    keeper::{BlockContext, Keeper},
    keys,
    store::{self, Store},
};
use alloy_primitives::Address;
use peggy_primitives::{ConfirmSignature, UInt64Nonce, Valset, ValsetError, ValsetMember};
use tracing::debug;

impl<S: Store + ?Sized, SK: StakingKeeper, BK: BankKeeper> Keeper<'_, S, SK, BK> {
    /// Snapshots the current staking powers as a valset nonced at the block
    /// height. Powers are normalized to each member's share of `u32::MAX`,
    /// the power space the external contract works in.
    pub fn set_valset_request(&mut self, ctx: &BlockContext) -> Result<Valset> {
        let validators = self.staking.bonded_validators();
        let total: u128 = validators.iter().map(|(_, power)| *power as u128).sum();

        let mut members = Vec::with_capacity(validators.len());
        for (validator, power) in &validators {
            let normalized = if total == 0 {
                0
            } else {
                ((*power as u128 * u32::MAX as u128) / total) as u64
            };
            let eth_address = self.eth_address(validator).unwrap_or(Address::ZERO);
            members.push(ValsetMember {
                eth_address,
                power: normalized,
            });
        }

        let nonce = UInt64Nonce::new(ctx.height);
        let valset = Valset::new(nonce, members).map_err(|err| match err {
            ValsetError::DuplicateMember(address) => PeggyError::Internal(format!(
                "staking set binds {address} to more than one validator"
            )),
            ValsetError::PowerOverflow => {
                PeggyError::Internal("normalized valset power overflow".into())
            }
        })?;

        store::set_value(self.store, &keys::valset_key(nonce), &valset)?;
        debug!(%nonce, members = valset.members.len(), "stored valset request");
        Ok(valset)
    }

    pub fn valset(&self, nonce: UInt64Nonce) -> Result<Option<Valset>> {
        store::get_value(&*self.store, &keys::valset_key(nonce))
    }

    pub fn has_valset(&self, nonce: UInt64Nonce) -> bool {
        self.store.has(&keys::valset_key(nonce))
    }

    pub fn valset_confirm(
        &self,
        nonce: UInt64Nonce,
        validator: &peggy_primitives::ValidatorId,
    ) -> Result<Option<ConfirmSignature>> {
        store::get_value(&*self.store, &keys::valset_confirm_key(nonce, validator))
    }

    pub fn last_observed_valset_nonce(&self) -> Result<UInt64Nonce> {
        store::get_u64(&*self.store, keys::LAST_OBSERVED_VALSET_NONCE_KEY).map(UInt64Nonce::new)
    }

    pub(crate) fn set_last_observed_valset_nonce(&mut self, nonce: UInt64Nonce) {
        store::set_u64(self.store, keys::LAST_OBSERVED_VALSET_NONCE_KEY, nonce.u64());
    }

    pub fn last_approved_valset_nonce(&self) -> Result<UInt64Nonce> {
        store::get_u64(&*self.store, keys::LAST_APPROVED_VALSET_NONCE_KEY).map(UInt64Nonce::new)
    }

    pub(crate) fn set_last_approved_valset_nonce(&mut self, nonce: UInt64Nonce) {
        store::set_u64(self.store, keys::LAST_APPROVED_VALSET_NONCE_KEY, nonce.u64());
    }

    pub fn last_approved_batch_nonce(&self) -> Result<UInt64Nonce> {
        store::get_u64(&*self.store, keys::LAST_APPROVED_BATCH_NONCE_KEY).map(UInt64Nonce::new)
    }

    pub(crate) fn set_last_approved_batch_nonce(&mut self, nonce: UInt64Nonce) {
        store::set_u64(self.store, keys::LAST_APPROVED_BATCH_NONCE_KEY, nonce.u64());
    }

    /// Deletes stored valsets and their confirm signatures below `nonce`.
    /// The external chain enforces a newer set; nothing can be relayed with
    /// the old ones anymore.
    pub(crate) fn prune_valsets_below(&mut self, nonce: UInt64Nonce) -> Result<()> {
        let stale: Vec<(Vec<u8>, UInt64Nonce)> = self
            .store
            .iter_prefix(&keys::valset_prefix())
            .filter_map(|(key, _)| {
                let raw: [u8; 8] = key.get(1..9)?.try_into().ok()?;
                let stored = UInt64Nonce::from_be_bytes(raw);
                (stored < nonce).then_some((key, stored))
            })
            .collect();

        for (key, stored) in stale {
            self.store.remove(&key);
            let confirms: Vec<Vec<u8>> = self
                .store
                .iter_prefix(&keys::valset_confirm_prefix(stored))
                .map(|(key, _)| key)
                .collect();
            for confirm in confirms {
                self.store.remove(&confirm);
            }
            debug!(nonce = %stored, "pruned superseded valset");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        host::StoreBank,
        store::MemStore,
        testutil::{self, MockStaking},
    };
    use peggy_primitives::ValidatorId;

    #[test]
    fn snapshot_normalizes_powers_to_u32_space() -> eyre::Result<()> {
        let mut store = MemStore::new();
        let staking = MockStaking::new([
            (ValidatorId::new(&b"a"[..]), 100),
            (ValidatorId::new(&b"b"[..]), 100),
        ]);
        let bank = StoreBank::new();
        testutil::init_params(&mut store)?;
        let mut keeper = Keeper::new(&mut store, &staking, &bank);

        let valset = keeper.set_valset_request(&BlockContext::at_height(7))?;
        assert_eq!(valset.nonce, UInt64Nonce::new(7));
        assert_eq!(valset.members.len(), 2);
        for member in &valset.members {
            assert_eq!(member.power, (u32::MAX / 2) as u64);
        }
        assert!(keeper.has_valset(UInt64Nonce::new(7)));
        Ok(())
    }

    #[test]
    fn pruning_removes_older_valsets_only() -> eyre::Result<()> {
        let mut store = MemStore::new();
        let staking = MockStaking::single(ValidatorId::new(&b"a"[..]), 100);
        let bank = StoreBank::new();
        testutil::init_params(&mut store)?;
        let mut keeper = Keeper::new(&mut store, &staking, &bank);

        keeper.set_valset_request(&BlockContext::at_height(1))?;
        keeper.set_valset_request(&BlockContext::at_height(2))?;
        keeper.set_valset_request(&BlockContext::at_height(3))?;

        keeper.prune_valsets_below(UInt64Nonce::new(3))?;
        assert!(!keeper.has_valset(UInt64Nonce::new(1)));
        assert!(!keeper.has_valset(UInt64Nonce::new(2)));
        assert!(keeper.has_valset(UInt64Nonce::new(3)));
        Ok(())
    }
}
