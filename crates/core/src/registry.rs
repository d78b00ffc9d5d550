//! Validator address bindings and the counterpart-denom registry.

use crate::{
    error::{PeggyError, Result},
    host::{BankKeeper, StakingKeeper},
    keeper::Keeper,
    keys,
    store::{self, Store},
};
use alloy_primitives::Address;
use peggy_primitives::{parse_voucher_denom, TokenRef, ValidatorId};
use tracing::trace;

impl<S: Store + ?Sized, SK: StakingKeeper, BK: BankKeeper> Keeper<'_, S, SK, BK> {
    /// Binds a validator to the external address it signs checkpoints with.
    /// Rebinding is allowed; the latest binding wins.
    pub fn set_eth_address(&mut self, validator: &ValidatorId, eth_address: Address) {
        trace!(%validator, %eth_address, "binding validator eth address");
        self.store
            .set(&keys::eth_addr_key(validator), eth_address.as_slice().to_vec());
    }

    pub fn eth_address(&self, validator: &ValidatorId) -> Option<Address> {
        self.store
            .get(&keys::eth_addr_key(validator))
            .filter(|bytes| bytes.len() == Address::len_bytes())
            .map(|bytes| Address::from_slice(&bytes))
    }

    /// Registers the counterpart token behind a voucher denom.
    pub fn set_counterpart(&mut self, token: &TokenRef) -> Result<()> {
        trace!(contract = %token.contract, symbol = %token.symbol, "registering counterpart denom");
        store::set_value(self.store, &keys::denom_key(&token.contract), token)
    }

    pub fn counterpart(&self, contract: &Address) -> Result<Option<TokenRef>> {
        store::get_value(&*self.store, &keys::denom_key(contract))
    }

    pub fn has_counterpart(&self, contract: &Address) -> bool {
        self.store.has(&keys::denom_key(contract))
    }

    /// Resolves a voucher denom to its registered token contract.
    ///
    /// A malformed denom is `InvalidDenom`; a well-formed denom whose token
    /// was never deposited is `UnknownDenom`.
    pub fn resolve_voucher_denom(&self, denom: &str) -> Result<Address> {
        let contract = parse_voucher_denom(denom)
            .ok_or_else(|| PeggyError::InvalidDenom(denom.to_owned()))?;
        if !self.has_counterpart(&contract) {
            return Err(PeggyError::UnknownDenom(denom.to_owned()));
        }
        Ok(contract)
    }
}
