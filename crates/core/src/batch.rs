//! Batch building and retirement.

use crate::{
    error::{PeggyError, Result},
    host::{module_account, BankKeeper, StakingKeeper},
    keeper::Keeper,
    keys,
    store::{self, Store},
};
use alloy_primitives::{Address, U256};
use peggy_primitives::{voucher_denom, BatchStatus, Coin, OutgoingTxBatch, UInt64Nonce};
use tracing::debug;

impl<S: Store + ?Sized, SK: StakingKeeper, BK: BankKeeper> Keeper<'_, S, SK, BK> {
    /// Packages up to `max_size` highest-fee pool entries for a token into a
    /// new pending batch. The entries leave the pool; their escrow stays
    /// with the module account until the batch is observed.
    pub fn build_outgoing_batch(
        &mut self,
        token_contract: Address,
        max_size: u64,
    ) -> Result<OutgoingTxBatch> {
        let mut selected = Vec::new();
        self.iterate_pool_by_fee(&token_contract, |_, tx| {
            selected.push(tx.clone());
            selected.len() as u64 >= max_size
        })?;
        if selected.is_empty() {
            return Err(PeggyError::EmptyPool(token_contract));
        }

        for tx in &selected {
            self.store
                .remove(&keys::pool_key(&token_contract, &tx.bridge_fee.amount, tx.id));
        }

        let nonce = self.next_batch_nonce()?;
        let batch = OutgoingTxBatch {
            nonce,
            token_contract,
            elements: selected,
            status: BatchStatus::Pending,
        };
        store::set_value(self.store, &keys::batch_key(&token_contract, nonce), &batch)?;
        debug!(%nonce, token = %token_contract, elements = batch.elements.len(), "built outgoing batch");
        Ok(batch)
    }

    pub fn outgoing_batch(
        &self,
        token_contract: &Address,
        nonce: UInt64Nonce,
    ) -> Result<Option<OutgoingTxBatch>> {
        store::get_value(&*self.store, &keys::batch_key(token_contract, nonce))
    }

    pub fn batch_confirm(
        &self,
        token_contract: &Address,
        nonce: UInt64Nonce,
        validator: &peggy_primitives::ValidatorId,
    ) -> Result<Option<peggy_primitives::ConfirmSignature>> {
        store::get_value(
            &*self.store,
            &keys::batch_confirm_key(token_contract, nonce, validator),
        )
    }

    /// Retires a batch whose execution on the external chain was observed:
    /// burns the escrowed amounts and fees, drops the elements, and seals
    /// the batch. `Observed` is terminal.
    pub(crate) fn observe_batch(
        &mut self,
        token_contract: &Address,
        batch_nonce: UInt64Nonce,
    ) -> Result<()> {
        let mut batch = self
            .outgoing_batch(token_contract, batch_nonce)?
            .ok_or(PeggyError::UnknownBatch {
                token_contract: *token_contract,
                nonce: batch_nonce,
            })?;
        if batch.status == BatchStatus::Observed {
            return Err(PeggyError::Duplicate(format!(
                "batch {batch_nonce} for {token_contract} already observed"
            )));
        }

        let mut escrowed = U256::ZERO;
        for tx in &batch.elements {
            escrowed = escrowed
                .checked_add(tx.amount.amount)
                .and_then(|sum| sum.checked_add(tx.bridge_fee.amount))
                .ok_or_else(|| PeggyError::Internal("batch escrow total overflow".into()))?;
        }

        let module = module_account();
        self.bank.burn(
            self.store,
            &module,
            &Coin::new(voucher_denom(token_contract), escrowed),
        )?;

        let ids: Vec<u64> = batch.elements.iter().map(|tx| tx.id).collect();
        for id in ids {
            self.remove_pool_entry(id)?;
        }

        batch.elements.clear();
        batch.status = BatchStatus::Observed;
        store::set_value(
            self.store,
            &keys::batch_key(token_contract, batch_nonce),
            &batch,
        )?;
        debug!(nonce = %batch_nonce, token = %token_contract, burned = %escrowed, "observed outgoing batch");
        Ok(())
    }

    pub(crate) fn set_batch_confirm(
        &mut self,
        token_contract: &Address,
        nonce: UInt64Nonce,
        confirm: &peggy_primitives::ConfirmSignature,
    ) -> Result<Vec<u8>> {
        let key = keys::batch_confirm_key(token_contract, nonce, &confirm.validator);
        store::set_value(self.store, &key, confirm)?;
        Ok(key)
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
    use peggy_primitives::{AccountId, ValidatorId};

    fn setup(store: &mut MemStore) -> (MockStaking, StoreBank, AccountId, Address, String) {
        let staking = MockStaking::single(ValidatorId::new(&b"val"[..]), 100);
        let bank = StoreBank::new();
        let sender = AccountId::new(&[1u8; 20][..]);
        let contract = Address::repeat_byte(0xE7);
        let denom = voucher_denom(&contract);
        testutil::init_params(store).expect("params");
        testutil::seed_vouchers(store, &bank, &sender, contract, "MAX", U256::from(99_999u64))
            .expect("seed");
        (staking, bank, sender, contract, denom)
    }

    fn fill_pool(
        keeper: &mut Keeper<'_, MemStore, MockStaking, StoreBank>,
        sender: &AccountId,
        denom: &str,
    ) {
        for (amount, fee) in [(100u64, 2u64), (101, 3), (102, 2), (103, 1)] {
            keeper
                .add_to_pool(
                    sender,
                    Address::repeat_byte(0xBB),
                    &Coin::new(denom.to_owned(), U256::from(amount)),
                    &Coin::new(denom.to_owned(), U256::from(fee)),
                )
                .expect("pool insert");
        }
    }

    #[test]
    fn build_takes_highest_fee_prefix_and_drains_pool() -> eyre::Result<()> {
        let mut store = MemStore::new();
        let (staking, bank, sender, contract, denom) = setup(&mut store);
        let mut keeper = Keeper::new(&mut store, &staking, &bank);
        fill_pool(&mut keeper, &sender, &denom);

        let batch = keeper.build_outgoing_batch(contract, 2)?;
        assert_eq!(batch.nonce, UInt64Nonce::new(1));
        assert_eq!(batch.status, BatchStatus::Pending);
        let picked: Vec<u64> = batch
            .elements
            .iter()
            .map(|tx| tx.bridge_fee.amount.to::<u64>())
            .collect();
        assert_eq!(picked, vec![3, 2]);

        // the two cheaper entries stay pooled
        let mut remaining = Vec::new();
        keeper.iterate_pool_by_fee(&contract, |_, tx| {
            remaining.push(tx.bridge_fee.amount.to::<u64>());
            false
        })?;
        assert_eq!(remaining, vec![2, 1]);
        Ok(())
    }

    #[test]
    fn batch_nonces_are_global_across_tokens() -> eyre::Result<()> {
        let mut store = MemStore::new();
        let (staking, bank, sender, contract_a, denom_a) = setup(&mut store);
        let contract_b = Address::repeat_byte(0xF2);
        let denom_b = voucher_denom(&contract_b);
        testutil::seed_vouchers(
            &mut store,
            &bank,
            &sender,
            contract_b,
            "B",
            U256::from(10_000u64),
        )?;
        let mut keeper = Keeper::new(&mut store, &staking, &bank);

        fill_pool(&mut keeper, &sender, &denom_a);
        keeper.add_to_pool(
            &sender,
            Address::repeat_byte(0xBB),
            &Coin::new(denom_b.clone(), U256::from(10u64)),
            &Coin::new(denom_b, U256::from(1u64)),
        )?;

        let first = keeper.build_outgoing_batch(contract_a, 10)?;
        let second = keeper.build_outgoing_batch(contract_b, 10)?;
        assert_eq!(first.nonce, UInt64Nonce::new(1));
        assert_eq!(second.nonce, UInt64Nonce::new(2));
        Ok(())
    }

    #[test]
    fn empty_pool_is_rejected() {
        let mut store = MemStore::new();
        let (staking, bank, _, contract, _) = setup(&mut store);
        let mut keeper = Keeper::new(&mut store, &staking, &bank);

        assert!(matches!(
            keeper.build_outgoing_batch(contract, 10),
            Err(PeggyError::EmptyPool(c)) if c == contract
        ));
    }

    #[test]
    fn observing_burns_escrow_and_is_terminal() -> eyre::Result<()> {
        let mut store = MemStore::new();
        let (staking, bank, sender, contract, denom) = setup(&mut store);
        let mut keeper = Keeper::new(&mut store, &staking, &bank);
        fill_pool(&mut keeper, &sender, &denom);

        let batch = keeper.build_outgoing_batch(contract, 10)?;
        let escrowed: u64 = 100 + 2 + 101 + 3 + 102 + 2 + 103 + 1;

        keeper.observe_batch(&contract, batch.nonce)?;
        assert_eq!(
            bank.balance(&store, &module_account(), &denom)?,
            U256::ZERO,
            "all {escrowed} escrowed vouchers must be burned"
        );

        let mut keeper = Keeper::new(&mut store, &staking, &bank);
        let stored = keeper
            .outgoing_batch(&contract, batch.nonce)?
            .expect("batch persists");
        assert_eq!(stored.status, BatchStatus::Observed);
        assert!(stored.elements.is_empty());

        let err = keeper
            .observe_batch(&contract, batch.nonce)
            .expect_err("second observation must fail");
        assert!(matches!(err, PeggyError::Duplicate(_)));
        Ok(())
    }

    #[test]
    fn observing_unknown_batch_fails() {
        let mut store = MemStore::new();
        let (staking, bank, _, contract, _) = setup(&mut store);
        let mut keeper = Keeper::new(&mut store, &staking, &bank);

        assert!(matches!(
            keeper.observe_batch(&contract, UInt64Nonce::new(9)),
            Err(PeggyError::UnknownBatch { .. })
        ));
    }
}
