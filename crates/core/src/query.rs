//! Read-only lookups for external adapters (REST/CLI live outside the
//! core; they call these and render the results).

use crate::{
    error::{PeggyError, Result},
    keys,
    store::{self, Store},
};
use alloy_primitives::{hex, Address, U256};
use peggy_primitives::{
    ClaimType, ConfirmSignature, OutgoingTx, OutgoingTxBatch, UInt64Nonce, Valset, ValidatorId,
};
use std::collections::BTreeMap;

pub fn valset<S: Store + ?Sized>(store: &S, nonce: UInt64Nonce) -> Result<Option<Valset>> {
    store::get_value(store, &keys::valset_key(nonce))
}

/// All collected signatures for a valset, ascending by validator id.
pub fn valset_confirms<S: Store + ?Sized>(
    store: &S,
    nonce: UInt64Nonce,
) -> Result<Vec<ConfirmSignature>> {
    decode_all(store.iter_prefix(&keys::valset_confirm_prefix(nonce)))
}

pub fn outgoing_batch<S: Store + ?Sized>(
    store: &S,
    token_contract: &Address,
    nonce: UInt64Nonce,
) -> Result<Option<OutgoingTxBatch>> {
    store::get_value(store, &keys::batch_key(token_contract, nonce))
}

/// All collected signatures for a batch, ascending by validator id.
pub fn batch_confirms<S: Store + ?Sized>(
    store: &S,
    token_contract: &Address,
    nonce: UInt64Nonce,
) -> Result<Vec<ConfirmSignature>> {
    decode_all(store.iter_prefix(&keys::batch_confirm_prefix(token_contract, nonce)))
}

pub fn eth_address<S: Store + ?Sized>(store: &S, validator: &ValidatorId) -> Option<Address> {
    store
        .get(&keys::eth_addr_key(validator))
        .filter(|bytes| bytes.len() == Address::len_bytes())
        .map(|bytes| Address::from_slice(&bytes))
}

/// Pool entries for a token in batching order: fee descending, insertion
/// order among equal fees.
pub fn pool_entries<S: Store + ?Sized>(
    store: &S,
    token_contract: &Address,
) -> Result<Vec<OutgoingTx>> {
    decode_all(store.iter_prefix(&keys::pool_prefix(token_contract)))
}

/// Sum of pending bridge fees per token contract.
pub fn token_fee_map<S: Store + ?Sized>(store: &S) -> Result<BTreeMap<Address, U256>> {
    let mut fees: BTreeMap<Address, U256> = BTreeMap::new();
    let entries: Vec<OutgoingTx> = decode_all(store.iter_prefix(&[keys::POOL_PREFIX]))?;
    for tx in entries {
        let total = fees.entry(tx.bridge_fee.contract).or_insert(U256::ZERO);
        *total = total
            .checked_add(tx.bridge_fee.amount)
            .ok_or_else(|| PeggyError::Internal("pool fee sum overflow".into()))?;
    }
    Ok(fees)
}

pub fn last_observed_nonce<S: Store + ?Sized>(
    store: &S,
    claim_type: ClaimType,
) -> Result<UInt64Nonce> {
    store::get_u64(store, &keys::last_observed_nonce_key(claim_type)).map(UInt64Nonce::new)
}

pub fn last_observed_valset_nonce<S: Store + ?Sized>(store: &S) -> Result<UInt64Nonce> {
    store::get_u64(store, keys::LAST_OBSERVED_VALSET_NONCE_KEY).map(UInt64Nonce::new)
}

pub fn last_approved_valset_nonce<S: Store + ?Sized>(store: &S) -> Result<UInt64Nonce> {
    store::get_u64(store, keys::LAST_APPROVED_VALSET_NONCE_KEY).map(UInt64Nonce::new)
}

fn decode_all<T: borsh::BorshDeserialize>(
    entries: impl Iterator<Item = (Vec<u8>, Vec<u8>)>,
) -> Result<Vec<T>> {
    entries
        .map(|(key, value)| {
            borsh::from_slice(&value).map_err(|err| {
                PeggyError::Internal(format!(
                    "corrupt record at {}: {err}",
                    hex::encode(&key)
                ))
            })
        })
        .collect()
}
