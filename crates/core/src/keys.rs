//! Key layout of the bridge store.
//!
//! One distinct prefix byte per collection; all numeric key components are
//! big-endian so the natural byte order of the store matches the numeric
//! order the engine iterates in.

use alloy_primitives::{Address, B256, U256};
use peggy_primitives::{AccountId, ClaimType, UInt64Nonce, ValidatorId};

/// Module parameters, set once at initialization.
pub const PARAMS_KEY: &[u8] = &[0x00];

/// `0x01 | nonce_be` → Valset
pub const VALSET_PREFIX: u8 = 0x01;
/// `0x02 | nonce_be | validator` → ConfirmSignature
pub const VALSET_CONFIRM_PREFIX: u8 = 0x02;
/// Highest valset nonce the external chain is known to enforce.
pub const LAST_OBSERVED_VALSET_NONCE_KEY: &[u8] = &[0x03];
/// Highest valset nonce an orchestrator reported signatures for.
pub const LAST_APPROVED_VALSET_NONCE_KEY: &[u8] = &[0x04];
/// `0x05 | validator` → ExternalAddress (20 raw bytes)
pub const ETH_ADDR_PREFIX: u8 = 0x05;
/// `0x06 | tokenContract | feeInv_be32 | id_be` → OutgoingTx
///
/// `feeInv = !fee` over the full 256-bit width, so the ascending scan yields
/// highest-fee first, FIFO (by id) among equal fees.
pub const POOL_PREFIX: u8 = 0x06;
/// `0x07 | tokenContract | nonce_be` → OutgoingTxBatch
pub const BATCH_PREFIX: u8 = 0x07;
/// Last assigned batch nonce, global across tokens.
pub const LAST_BATCH_NONCE_KEY: &[u8] = &[0x08];
/// Last assigned outgoing tx id.
pub const LAST_TX_ID_KEY: &[u8] = &[0x09];
/// `0x0a | claimType | nonce_be | digest` → Attestation
pub const ATTESTATION_PREFIX: u8 = 0x0a;
/// `0x0b | claimType` → u64_be, last observed event nonce of the stream.
pub const LAST_OBSERVED_NONCE_PREFIX: u8 = 0x0b;
/// `0x0c | claimType | nonce_be | validator | digest` → marker byte
pub const CLAIM_PREFIX: u8 = 0x0c;
/// `0x0d | tokenContract` → TokenRef (counterpart denom registry)
pub const DENOM_PREFIX: u8 = 0x0d;
/// `0x0e | len_be32 | account | denom` → U256_be32 (reference bank balances)
pub const BALANCE_PREFIX: u8 = 0x0e;
/// Highest batch nonce an orchestrator reported signatures for.
pub const LAST_APPROVED_BATCH_NONCE_KEY: &[u8] = &[0x0f];
/// `0x10 | tokenContract | nonce_be | validator` → ConfirmSignature
pub const BATCH_CONFIRM_PREFIX: u8 = 0x10;

pub fn valset_key(nonce: UInt64Nonce) -> Vec<u8> {
    let mut key = Vec::with_capacity(9);
    key.push(VALSET_PREFIX);
    key.extend_from_slice(&nonce.to_be_bytes());
    key
}

pub fn valset_prefix() -> Vec<u8> {
    vec![VALSET_PREFIX]
}

pub fn valset_confirm_key(nonce: UInt64Nonce, validator: &ValidatorId) -> Vec<u8> {
    let mut key = valset_confirm_prefix(nonce);
    key.extend_from_slice(validator.as_bytes());
    key
}

pub fn valset_confirm_prefix(nonce: UInt64Nonce) -> Vec<u8> {
    let mut key = Vec::with_capacity(9);
    key.push(VALSET_CONFIRM_PREFIX);
    key.extend_from_slice(&nonce.to_be_bytes());
    key
}

pub fn eth_addr_key(validator: &ValidatorId) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + validator.as_bytes().len());
    key.push(ETH_ADDR_PREFIX);
    key.extend_from_slice(validator.as_bytes());
    key
}

pub fn pool_key(token_contract: &Address, fee: &U256, id: u64) -> Vec<u8> {
    let mut key = pool_prefix(token_contract);
    key.extend_from_slice(&(!*fee).to_be_bytes::<32>());
    key.extend_from_slice(&id.to_be_bytes());
    key
}

pub fn pool_prefix(token_contract: &Address) -> Vec<u8> {
    let mut key = Vec::with_capacity(61);
    key.push(POOL_PREFIX);
    key.extend_from_slice(token_contract.as_slice());
    key
}

/// Decomposes a pool key back into `(token contract, fee, id)`.
pub fn parse_pool_key(key: &[u8]) -> Option<(Address, U256, u64)> {
    if key.len() != 61 || key[0] != POOL_PREFIX {
        return None;
    }
    let contract = Address::from_slice(&key[1..21]);
    let fee_inv = U256::from_be_slice(&key[21..53]);
    let id = u64::from_be_bytes(key[53..61].try_into().ok()?);
    Some((contract, !fee_inv, id))
}

pub fn batch_key(token_contract: &Address, nonce: UInt64Nonce) -> Vec<u8> {
    let mut key = batch_token_prefix(token_contract);
    key.extend_from_slice(&nonce.to_be_bytes());
    key
}

pub fn batch_token_prefix(token_contract: &Address) -> Vec<u8> {
    let mut key = Vec::with_capacity(29);
    key.push(BATCH_PREFIX);
    key.extend_from_slice(token_contract.as_slice());
    key
}

pub fn batch_confirm_key(
    token_contract: &Address,
    nonce: UInt64Nonce,
    validator: &ValidatorId,
) -> Vec<u8> {
    let mut key = batch_confirm_prefix(token_contract, nonce);
    key.extend_from_slice(validator.as_bytes());
    key
}

pub fn batch_confirm_prefix(token_contract: &Address, nonce: UInt64Nonce) -> Vec<u8> {
    let mut key = Vec::with_capacity(29);
    key.push(BATCH_CONFIRM_PREFIX);
    key.extend_from_slice(token_contract.as_slice());
    key.extend_from_slice(&nonce.to_be_bytes());
    key
}

pub fn attestation_key(claim_type: ClaimType, nonce: UInt64Nonce, digest: &B256) -> Vec<u8> {
    let mut key = attestation_nonce_prefix(claim_type, nonce);
    key.extend_from_slice(digest.as_slice());
    key
}

pub fn attestation_nonce_prefix(claim_type: ClaimType, nonce: UInt64Nonce) -> Vec<u8> {
    let mut key = Vec::with_capacity(42);
    key.push(ATTESTATION_PREFIX);
    key.push(claim_type.as_u8());
    key.extend_from_slice(&nonce.to_be_bytes());
    key
}

pub fn last_observed_nonce_key(claim_type: ClaimType) -> Vec<u8> {
    vec![LAST_OBSERVED_NONCE_PREFIX, claim_type.as_u8()]
}

pub fn claim_key(
    claim_type: ClaimType,
    nonce: UInt64Nonce,
    validator: &ValidatorId,
    digest: &B256,
) -> Vec<u8> {
    let mut key = Vec::with_capacity(42 + validator.as_bytes().len() + 32);
    key.push(CLAIM_PREFIX);
    key.push(claim_type.as_u8());
    key.extend_from_slice(&nonce.to_be_bytes());
    key.extend_from_slice(validator.as_bytes());
    key.extend_from_slice(digest.as_slice());
    key
}

pub fn denom_key(token_contract: &Address) -> Vec<u8> {
    let mut key = Vec::with_capacity(21);
    key.push(DENOM_PREFIX);
    key.extend_from_slice(token_contract.as_slice());
    key
}

pub fn balance_key(owner: &AccountId, denom: &str) -> Vec<u8> {
    let account = owner.as_bytes();
    let mut key = Vec::with_capacity(5 + account.len() + denom.len());
    key.push(BALANCE_PREFIX);
    key.extend_from_slice(&(account.len() as u32).to_be_bytes());
    key.extend_from_slice(account);
    key.extend_from_slice(denom.as_bytes());
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_keys_order_by_fee_desc_then_id_asc() {
        let token = Address::repeat_byte(0xAA);
        let high_fee = pool_key(&token, &U256::from(3u64), 7);
        let low_fee_early = pool_key(&token, &U256::from(2u64), 1);
        let low_fee_late = pool_key(&token, &U256::from(2u64), 2);

        assert!(high_fee < low_fee_early);
        assert!(low_fee_early < low_fee_late);
    }

    #[test]
    fn pool_key_round_trip() {
        let token = Address::repeat_byte(0x11);
        let fee = U256::from(123_456u64);
        let key = pool_key(&token, &fee, 42);
        assert_eq!(parse_pool_key(&key), Some((token, fee, 42)));
    }

    #[test]
    fn huge_fees_survive_the_inversion() {
        let token = Address::ZERO;
        let fee = U256::MAX - U256::from(5u64);
        let key = pool_key(&token, &fee, 1);
        assert_eq!(parse_pool_key(&key), Some((token, fee, 1)));
    }
}
