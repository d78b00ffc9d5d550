//! Interfaces to the chain subsystems the bridge consumes.
//!
//! The staking view is read-only; the bank mutates balances. Every bank
//! method takes the message's store so its writes commit and roll back
//! together with the bridge's own state.

use crate::{
    error::{PeggyError, Result},
    keys,
    store::Store,
};
use alloy_primitives::U256;
use peggy_primitives::{AccountId, Coin, ValidatorId};

/// The module account holding escrowed and freshly minted vouchers.
pub fn module_account() -> AccountId {
    AccountId::new(&b"peggy"[..])
}

/// Read access to the staking subsystem.
pub trait StakingKeeper {
    /// Active validator set with voting powers at the current block.
    fn bonded_validators(&self) -> Vec<(ValidatorId, u64)>;

    /// Resolves an orchestrator account to the validator it operates.
    fn validator_by_orchestrator(&self, orchestrator: &AccountId) -> Option<ValidatorId>;

    fn total_power(&self) -> u64 {
        self.bonded_validators()
            .iter()
            .fold(0u64, |total, (_, power)| total.saturating_add(*power))
    }

    fn power_of(&self, validator: &ValidatorId) -> Option<u64> {
        self.bonded_validators()
            .into_iter()
            .find(|(candidate, _)| candidate == validator)
            .map(|(_, power)| power)
    }
}

/// Token-supply operations the bridge needs from the bank.
pub trait BankKeeper {
    /// Creates `coin` out of thin air in `to`'s balance.
    fn mint<S: Store + ?Sized>(&self, store: &mut S, to: &AccountId, coin: &Coin) -> Result<()>;

    /// Destroys `coin` from `from`'s balance.
    fn burn<S: Store + ?Sized>(&self, store: &mut S, from: &AccountId, coin: &Coin) -> Result<()>;

    fn transfer<S: Store + ?Sized>(
        &self,
        store: &mut S,
        from: &AccountId,
        to: &AccountId,
        coin: &Coin,
    ) -> Result<()>;

    fn balance<S: Store + ?Sized>(
        &self,
        store: &S,
        owner: &AccountId,
        denom: &str,
    ) -> Result<U256>;
}

/// Reference bank keeping balances under a dedicated prefix of the bridge
/// store. Tests and single-binary embedders use it; chain hosts plug their
/// own bank in instead.
#[derive(Clone, Copy, Debug, Default)]
pub struct StoreBank;

impl StoreBank {
    pub fn new() -> Self {
        Self
    }

    fn write_balance<S: Store + ?Sized>(
        store: &mut S,
        owner: &AccountId,
        denom: &str,
        amount: U256,
    ) {
        let key = keys::balance_key(owner, denom);
        if amount.is_zero() {
            store.remove(&key);
        } else {
            store.set(&key, amount.to_be_bytes::<32>().to_vec());
        }
    }

    fn read_balance<S: Store + ?Sized>(store: &S, owner: &AccountId, denom: &str) -> U256 {
        store
            .get(&keys::balance_key(owner, denom))
            .map(|bytes| U256::from_be_slice(&bytes))
            .unwrap_or(U256::ZERO)
    }
}

impl BankKeeper for StoreBank {
    fn mint<S: Store + ?Sized>(&self, store: &mut S, to: &AccountId, coin: &Coin) -> Result<()> {
        let balance = Self::read_balance(store, to, &coin.denom);
        let balance = balance
            .checked_add(coin.amount)
            .ok_or_else(|| PeggyError::Internal(format!("supply overflow minting {coin}")))?;
        Self::write_balance(store, to, &coin.denom, balance);
        Ok(())
    }

    fn burn<S: Store + ?Sized>(&self, store: &mut S, from: &AccountId, coin: &Coin) -> Result<()> {
        let balance = Self::read_balance(store, from, &coin.denom);
        let balance = balance.checked_sub(coin.amount).ok_or_else(|| {
            PeggyError::InsufficientFunds(format!("burn {coin} from {from}: balance {balance}"))
        })?;
        Self::write_balance(store, from, &coin.denom, balance);
        Ok(())
    }

    fn transfer<S: Store + ?Sized>(
        &self,
        store: &mut S,
        from: &AccountId,
        to: &AccountId,
        coin: &Coin,
    ) -> Result<()> {
        let source = Self::read_balance(store, from, &coin.denom);
        let source = source.checked_sub(coin.amount).ok_or_else(|| {
            PeggyError::InsufficientFunds(format!("send {coin} from {from}: balance {source}"))
        })?;
        let dest = Self::read_balance(store, to, &coin.denom)
            .checked_add(coin.amount)
            .ok_or_else(|| PeggyError::Internal(format!("balance overflow crediting {to}")))?;
        Self::write_balance(store, from, &coin.denom, source);
        Self::write_balance(store, to, &coin.denom, dest);
        Ok(())
    }

    fn balance<S: Store + ?Sized>(
        &self,
        store: &S,
        owner: &AccountId,
        denom: &str,
    ) -> Result<U256> {
        Ok(Self::read_balance(store, owner, denom))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemStore;

    #[test]
    fn mint_transfer_burn_cycle() -> eyre::Result<()> {
        let mut store = MemStore::new();
        let bank = StoreBank::new();
        let alice = AccountId::new(&b"alice"[..]);
        let bob = AccountId::new(&b"bob"[..]);
        let coin = Coin::new("peggy/test", U256::from(100u64));

        bank.mint(&mut store, &alice, &coin)?;
        assert_eq!(bank.balance(&store, &alice, "peggy/test")?, U256::from(100u64));

        bank.transfer(&mut store, &alice, &bob, &Coin::new("peggy/test", U256::from(30u64)))?;
        assert_eq!(bank.balance(&store, &alice, "peggy/test")?, U256::from(70u64));
        assert_eq!(bank.balance(&store, &bob, "peggy/test")?, U256::from(30u64));

        bank.burn(&mut store, &bob, &Coin::new("peggy/test", U256::from(30u64)))?;
        assert_eq!(bank.balance(&store, &bob, "peggy/test")?, U256::ZERO);
        Ok(())
    }

    #[test]
    fn overdraft_is_insufficient_funds() {
        let mut store = MemStore::new();
        let bank = StoreBank::new();
        let alice = AccountId::new(&b"alice"[..]);
        let err = bank
            .transfer(
                &mut store,
                &alice,
                &AccountId::new(&b"bob"[..]),
                &Coin::new("peggy/test", U256::from(1u64)),
            )
            .expect_err("empty account cannot send");
        assert!(matches!(err, PeggyError::InsufficientFunds(_)));
    }
}
