//! Test fixtures shared by the unit and integration tests.

use crate::{
    error::Result,
    host::{BankKeeper, StakingKeeper},
    keys,
    params::{self, PeggyParams},
    store::{self, Store},
};
use alloy_primitives::{Address, U256};
use peggy_primitives::{AccountId, Coin, TokenRef, ValidatorId};

/// Staking double: fixed bonded set, orchestrator accounts map to the
/// validator derived from them.
#[derive(Clone, Debug, Default)]
pub struct MockStaking {
    validators: Vec<(ValidatorId, u64)>,
}

impl MockStaking {
    pub fn new(validators: impl IntoIterator<Item = (ValidatorId, u64)>) -> Self {
        Self {
            validators: validators.into_iter().collect(),
        }
    }

    pub fn single(validator: ValidatorId, power: u64) -> Self {
        Self::new([(validator, power)])
    }
}

impl StakingKeeper for MockStaking {
    fn bonded_validators(&self) -> Vec<(ValidatorId, u64)> {
        self.validators.clone()
    }

    fn validator_by_orchestrator(&self, orchestrator: &AccountId) -> Option<ValidatorId> {
        let candidate = ValidatorId::from_account(orchestrator);
        self.validators
            .iter()
            .find(|(validator, _)| *validator == candidate)
            .map(|(validator, _)| validator.clone())
    }
}

/// Installs default module parameters.
pub fn init_params<S: Store + ?Sized>(store: &mut S) -> Result<()> {
    params::set_params(store, &PeggyParams::default())
}

/// Registers a counterpart token and mints `amount` of its vouchers to
/// `owner`, outside any consensus path; what a prior observed deposit would
/// have produced.
pub fn seed_vouchers<S: Store + ?Sized, BK: BankKeeper>(
    store: &mut S,
    bank: &BK,
    owner: &AccountId,
    token_contract: Address,
    symbol: &str,
    amount: U256,
) -> Result<()> {
    let token = TokenRef::new(token_contract, symbol);
    store::set_value(store, &keys::denom_key(&token_contract), &token)?;
    bank.mint(store, owner, &Coin::new(token.voucher_denom(), amount))
}
