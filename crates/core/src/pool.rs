//! The outgoing transfer pool: per-token, ordered by fee descending with
//! FIFO tie-break, so batch building and replay are deterministic.

use crate::{
    error::{PeggyError, Result},
    host::{module_account, BankKeeper, StakingKeeper},
    keeper::Keeper,
    keys,
    store::{self, Store},
};
use alloy_primitives::{Address, U256};
use peggy_primitives::{AccountId, Coin, Erc20Token, OutgoingTx};
use std::collections::BTreeMap;
use tracing::debug;

impl<S: Store + ?Sized, SK: StakingKeeper, BK: BankKeeper> Keeper<'_, S, SK, BK> {
    /// Escrows `amount + bridge_fee` from the sender into the module account
    /// and queues the transfer. Returns the fresh tx id.
    pub fn add_to_pool(
        &mut self,
        sender: &AccountId,
        dest_address: Address,
        amount: &Coin,
        bridge_fee: &Coin,
    ) -> Result<u64> {
        if amount.denom != bridge_fee.denom {
            return Err(PeggyError::InvalidDenom(format!(
                "fee denom {} does not match amount denom {}",
                bridge_fee.denom, amount.denom
            )));
        }
        if amount.amount.is_zero() {
            return Err(PeggyError::InvalidAmount("zero transfer amount".into()));
        }
        let token_contract = self.resolve_voucher_denom(&amount.denom)?;

        let module = module_account();
        self.bank.transfer(self.store, sender, &module, amount)?;
        self.bank.transfer(self.store, sender, &module, bridge_fee)?;

        let id = self.next_tx_id()?;
        let tx = OutgoingTx {
            id,
            sender: sender.clone(),
            dest_address,
            amount: Erc20Token::new(token_contract, amount.amount),
            bridge_fee: Erc20Token::new(token_contract, bridge_fee.amount),
        };
        store::set_value(
            self.store,
            &keys::pool_key(&token_contract, &tx.bridge_fee.amount, id),
            &tx,
        )?;
        debug!(id, token = %token_contract, fee = %bridge_fee.amount, "queued outgoing transfer");
        Ok(id)
    }

    /// Removes a pool entry by id. No-op when the id is not pooled.
    pub fn remove_pool_entry(&mut self, id: u64) -> Result<()> {
        let found = self
            .store
            .iter_prefix(&[keys::POOL_PREFIX])
            .map(|(key, _)| key)
            .find(|key| matches!(keys::parse_pool_key(key), Some((_, _, entry)) if entry == id));
        if let Some(key) = found {
            self.store.remove(&key);
        }
        Ok(())
    }

    /// Visits the pool entries for a token, highest fee first, insertion
    /// order among equal fees. Stops early when `visit` returns `true`.
    pub fn iterate_pool_by_fee<F>(&self, token_contract: &Address, mut visit: F) -> Result<()>
    where
        F: FnMut(u64, &OutgoingTx) -> bool,
    {
        for (key, value) in self.store.iter_prefix(&keys::pool_prefix(token_contract)) {
            let tx: OutgoingTx = borsh::from_slice(&value).map_err(|err| {
                PeggyError::Internal(format!(
                    "corrupt pool entry at {}: {err}",
                    alloy_primitives::hex::encode(&key)
                ))
            })?;
            if visit(tx.id, &tx) {
                break;
            }
        }
        Ok(())
    }

    /// Sum of pending bridge fees per token contract; what a relayer looks
    /// at to decide which batch to request.
    pub fn token_fee_map(&self) -> Result<BTreeMap<Address, U256>> {
        let mut fees: BTreeMap<Address, U256> = BTreeMap::new();
        for (key, value) in self.store.iter_prefix(&[keys::POOL_PREFIX]) {
            let tx: OutgoingTx = borsh::from_slice(&value).map_err(|err| {
                PeggyError::Internal(format!(
                    "corrupt pool entry at {}: {err}",
                    alloy_primitives::hex::encode(&key)
                ))
            })?;
            let total = fees.entry(tx.bridge_fee.contract).or_insert(U256::ZERO);
            *total = total
                .checked_add(tx.bridge_fee.amount)
                .ok_or_else(|| PeggyError::Internal("pool fee sum overflow".into()))?;
        }
        Ok(fees)
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
    use peggy_primitives::{voucher_denom, ValidatorId};

    const POWER: u64 = 100;

    fn setup(store: &mut MemStore) -> (MockStaking, StoreBank, AccountId, Address, String) {
        let staking = MockStaking::single(ValidatorId::new(&b"val"[..]), POWER);
        let bank = StoreBank::new();
        let sender = AccountId::new(&[1u8; 20][..]);
        let contract = Address::repeat_byte(0xE7);
        let denom = voucher_denom(&contract);
        testutil::init_params(store).expect("params");
        testutil::seed_vouchers(store, &bank, &sender, contract, "MAX", U256::from(99_999u64))
            .expect("seed");
        (staking, bank, sender, contract, denom)
    }

    #[test]
    fn pool_iterates_fee_desc_with_fifo_tie_break() -> eyre::Result<()> {
        let mut store = MemStore::new();
        let (staking, bank, sender, contract, denom) = setup(&mut store);
        let mut keeper = Keeper::new(&mut store, &staking, &bank);

        // (amount, fee): insertion order matters for the tie at fee 2
        for (amount, fee) in [(100u64, 2u64), (101, 3), (102, 2), (103, 1)] {
            keeper.add_to_pool(
                &sender,
                Address::repeat_byte(0xBB),
                &Coin::new(denom.clone(), U256::from(amount)),
                &Coin::new(denom.clone(), U256::from(fee)),
            )?;
        }

        let mut seen = Vec::new();
        keeper.iterate_pool_by_fee(&contract, |_, tx| {
            seen.push((tx.amount.amount.to::<u64>(), tx.bridge_fee.amount.to::<u64>()));
            false
        })?;
        assert_eq!(seen, vec![(101, 3), (100, 2), (102, 2), (103, 1)]);
        Ok(())
    }

    #[test]
    fn escrow_moves_amount_plus_fee_to_module() -> eyre::Result<()> {
        let mut store = MemStore::new();
        let (staking, bank, sender, _, denom) = setup(&mut store);
        let mut keeper = Keeper::new(&mut store, &staking, &bank);

        keeper.add_to_pool(
            &sender,
            Address::repeat_byte(0xBB),
            &Coin::new(denom.clone(), U256::from(100u64)),
            &Coin::new(denom.clone(), U256::from(2u64)),
        )?;

        assert_eq!(
            bank.balance(&store, &module_account(), &denom)?,
            U256::from(102u64)
        );
        assert_eq!(
            bank.balance(&store, &sender, &denom)?,
            U256::from(99_999u64 - 102)
        );
        Ok(())
    }

    #[test]
    fn insufficient_balance_is_rejected() {
        let mut store = MemStore::new();
        let (staking, bank, sender, _, denom) = setup(&mut store);
        let mut keeper = Keeper::new(&mut store, &staking, &bank);

        let err = keeper
            .add_to_pool(
                &sender,
                Address::repeat_byte(0xBB),
                &Coin::new(denom.clone(), U256::from(99_999u64)),
                &Coin::new(denom, U256::from(1u64)),
            )
            .expect_err("escrow beyond balance must fail");
        assert!(matches!(err, PeggyError::InsufficientFunds(_)));
    }

    #[test]
    fn fee_map_sums_per_token_in_256_bits() -> eyre::Result<()> {
        let mut store = MemStore::new();
        let (staking, bank, sender, contract_a, denom_a) = setup(&mut store);

        let contract_b = Address::repeat_byte(0xF2);
        let denom_b = voucher_denom(&contract_b);
        let big_fee = 1_844_674_407_370_955_141u64;
        testutil::seed_vouchers(
            &mut store,
            &bank,
            &sender,
            contract_b,
            "BIG",
            U256::from(u128::MAX),
        )?;

        let mut keeper = Keeper::new(&mut store, &staking, &bank);
        for fee in [2u64, 3, 2, 1] {
            keeper.add_to_pool(
                &sender,
                Address::repeat_byte(0xBB),
                &Coin::new(denom_a.clone(), U256::from(100u64)),
                &Coin::new(denom_a.clone(), U256::from(fee)),
            )?;
        }
        for fee in [4u64, big_fee, big_fee, big_fee] {
            keeper.add_to_pool(
                &sender,
                Address::repeat_byte(0xBB),
                &Coin::new(denom_b.clone(), U256::from(100u64)),
                &Coin::new(denom_b.clone(), U256::from(fee)),
            )?;
        }

        let fees = keeper.token_fee_map()?;
        assert_eq!(fees.get(&contract_a), Some(&U256::from(8u64)));
        assert_eq!(
            fees.get(&contract_b),
            Some(&U256::from(5_534_023_222_112_865_427u64))
        );
        Ok(())
    }

    #[test]
    fn remove_pool_entry_is_idempotent() -> eyre::Result<()> {
        let mut store = MemStore::new();
        let (staking, bank, sender, contract, denom) = setup(&mut store);
        let mut keeper = Keeper::new(&mut store, &staking, &bank);

        let id = keeper.add_to_pool(
            &sender,
            Address::repeat_byte(0xBB),
            &Coin::new(denom.clone(), U256::from(100u64)),
            &Coin::new(denom, U256::from(2u64)),
        )?;

        keeper.remove_pool_entry(id)?;
        keeper.remove_pool_entry(id)?;

        let mut count = 0;
        keeper.iterate_pool_by_fee(&contract, |_, _| {
            count += 1;
            false
        })?;
        assert_eq!(count, 0);
        Ok(())
    }
}
