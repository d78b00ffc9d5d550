//! Top-level message dispatch.
//!
//! Every message is applied through a [`CacheStore`] overlay: on success the
//! overlay commits, on any error it is dropped, so a rejected message leaves
//! no state change no matter how deep the failure happened.

use crate::{
    error::{PeggyError, Result},
    host::{BankKeeper, StakingKeeper},
    keeper::{BlockContext, Keeper},
    keys,
    store::{self, CacheStore, Store},
};
use alloy_primitives::Address;
use peggy_primitives::{
    proof_of_possession_digest, verify_eth_signature, AccountId, Coin, ConfirmSignature,
    EthereumClaim, UInt64Nonce,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A bridge message. The serde tag is the stable wire type string external
/// adapters dispatch on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Msg {
    /// Bind a validator to the external address it signs with; `signature`
    /// is the proof of possession over `keccak256(validator account)`.
    SetEthAddress {
        validator: AccountId,
        eth_address: Address,
        signature: Vec<u8>,
    },
    /// Snapshot the current staking powers as a valset nonced at the block
    /// height.
    ValsetRequest { requester: AccountId },
    /// Submit a validator's checkpoint signature for a stored valset.
    ValsetConfirm {
        validator: AccountId,
        nonce: UInt64Nonce,
        signature: Vec<u8>,
    },
    /// Escrow vouchers and queue a transfer to the external chain.
    SendToEth {
        sender: AccountId,
        eth_dest: Address,
        amount: Coin,
        bridge_fee: Coin,
    },
    /// Package the highest-fee pool entries of `denom` into a batch.
    RequestBatch { requester: AccountId, denom: String },
    /// Submit a validator's checkpoint signature for a stored batch.
    ConfirmBatch {
        validator: AccountId,
        token_contract: Address,
        nonce: UInt64Nonce,
        signature: Vec<u8>,
    },
    /// Relay one or more claims about events observed on the external chain.
    CreateEthereumClaims {
        orchestrator: AccountId,
        ethereum_chain_id: u64,
        bridge_contract_address: Address,
        claims: Vec<EthereumClaim>,
    },
}

impl Msg {
    /// The stable wire type string, mirroring the serde tag.
    pub const fn type_str(&self) -> &'static str {
        match self {
            Msg::SetEthAddress { .. } => "set_eth_address",
            Msg::ValsetRequest { .. } => "valset_request",
            Msg::ValsetConfirm { .. } => "valset_confirm",
            Msg::SendToEth { .. } => "send_to_eth",
            Msg::RequestBatch { .. } => "request_batch",
            Msg::ConfirmBatch { .. } => "confirm_batch",
            Msg::CreateEthereumClaims { .. } => "create_ethereum_claims",
        }
    }
}

/// Applies one message atomically and returns its opaque result payload
/// (a nonce, an id, or the attestation keys, depending on the message).
pub fn handle_msg<S, SK, BK>(
    store: &mut S,
    staking: &SK,
    bank: &BK,
    ctx: &BlockContext,
    msg: &Msg,
) -> Result<Vec<u8>>
where
    S: Store + ?Sized,
    SK: StakingKeeper,
    BK: BankKeeper,
{
    let mut cache = CacheStore::new(store);
    let result = Keeper::new(&mut cache, staking, bank).dispatch(ctx, msg);
    match result {
        Ok(data) => {
            cache.commit();
            Ok(data)
        }
        Err(err) => {
            debug!(msg = msg.type_str(), kind = err.kind(), %err, "message rejected");
            Err(err)
        }
    }
}

impl<S: Store + ?Sized, SK: StakingKeeper, BK: BankKeeper> Keeper<'_, S, SK, BK> {
    pub fn dispatch(&mut self, ctx: &BlockContext, msg: &Msg) -> Result<Vec<u8>> {
        match msg {
            Msg::SetEthAddress {
                validator,
                eth_address,
                signature,
            } => self.handle_set_eth_address(validator, *eth_address, signature),
            Msg::ValsetRequest { .. } => self.handle_valset_request(ctx),
            Msg::ValsetConfirm {
                validator,
                nonce,
                signature,
            } => self.handle_valset_confirm(validator, *nonce, signature),
            Msg::SendToEth {
                sender,
                eth_dest,
                amount,
                bridge_fee,
            } => self.handle_send_to_eth(sender, *eth_dest, amount, bridge_fee),
            Msg::RequestBatch { denom, .. } => self.handle_request_batch(denom),
            Msg::ConfirmBatch {
                validator,
                token_contract,
                nonce,
                signature,
            } => self.handle_confirm_batch(validator, *token_contract, *nonce, signature),
            Msg::CreateEthereumClaims {
                orchestrator,
                claims,
                ..
            } => self.handle_create_claims(ctx, orchestrator, claims),
        }
    }

    fn handle_set_eth_address(
        &mut self,
        operator: &AccountId,
        eth_address: Address,
        signature: &[u8],
    ) -> Result<Vec<u8>> {
        let validator = self
            .staking
            .validator_by_orchestrator(operator)
            .ok_or_else(|| PeggyError::UnknownValidator(operator.to_string()))?;
        verify_eth_signature(proof_of_possession_digest(operator), signature, eth_address)?;
        self.set_eth_address(&validator, eth_address);
        Ok(Vec::new())
    }

    fn handle_valset_request(&mut self, ctx: &BlockContext) -> Result<Vec<u8>> {
        let valset = self.set_valset_request(ctx)?;
        Ok(valset.nonce.to_be_bytes().to_vec())
    }

    fn handle_valset_confirm(
        &mut self,
        operator: &AccountId,
        nonce: UInt64Nonce,
        signature: &[u8],
    ) -> Result<Vec<u8>> {
        let valset = self
            .valset(nonce)?
            .ok_or(PeggyError::UnknownValset(nonce))?;
        let params = self.params()?;
        let checkpoint = valset.checkpoint(&params.peggy_id);

        let validator = self
            .staking
            .validator_by_orchestrator(operator)
            .ok_or_else(|| PeggyError::UnknownValidator(operator.to_string()))?;
        let eth_address = self
            .eth_address(&validator)
            .ok_or_else(|| PeggyError::EthAddressMissing(validator.to_string()))?;
        verify_eth_signature(checkpoint, signature, eth_address)?;

        if self.valset_confirm(nonce, &validator)?.is_some() {
            return Err(PeggyError::Duplicate(format!(
                "valset {nonce} already confirmed by validator {validator}"
            )));
        }
        let key = keys::valset_confirm_key(nonce, &validator);
        store::set_value(
            self.store,
            &key,
            &ConfirmSignature {
                validator,
                eth_address,
                signature: signature.to_vec(),
            },
        )?;
        Ok(key)
    }

    fn handle_send_to_eth(
        &mut self,
        sender: &AccountId,
        eth_dest: Address,
        amount: &Coin,
        bridge_fee: &Coin,
    ) -> Result<Vec<u8>> {
        let id = self.add_to_pool(sender, eth_dest, amount, bridge_fee)?;
        Ok(id.to_be_bytes().to_vec())
    }

    fn handle_request_batch(&mut self, denom: &str) -> Result<Vec<u8>> {
        let params = self.params()?;
        let token_contract = self.resolve_voucher_denom(denom)?;
        let batch = self.build_outgoing_batch(token_contract, params.batch_size)?;
        Ok(batch.nonce.to_be_bytes().to_vec())
    }

    fn handle_confirm_batch(
        &mut self,
        operator: &AccountId,
        token_contract: Address,
        nonce: UInt64Nonce,
        signature: &[u8],
    ) -> Result<Vec<u8>> {
        let batch = self
            .outgoing_batch(&token_contract, nonce)?
            .ok_or(PeggyError::UnknownBatch {
                token_contract,
                nonce,
            })?;
        let params = self.params()?;
        let checkpoint = batch.checkpoint(&params.peggy_id);

        let validator = self
            .staking
            .validator_by_orchestrator(operator)
            .ok_or_else(|| PeggyError::UnknownValidator(operator.to_string()))?;
        let eth_address = self
            .eth_address(&validator)
            .ok_or_else(|| PeggyError::EthAddressMissing(validator.to_string()))?;
        verify_eth_signature(checkpoint, signature, eth_address)?;

        if self.batch_confirm(&token_contract, nonce, &validator)?.is_some() {
            return Err(PeggyError::Duplicate(format!(
                "batch {nonce} for {token_contract} already confirmed by validator {validator}"
            )));
        }
        self.set_batch_confirm(
            &token_contract,
            nonce,
            &ConfirmSignature {
                validator,
                eth_address,
                signature: signature.to_vec(),
            },
        )
    }

    fn handle_create_claims(
        &mut self,
        ctx: &BlockContext,
        orchestrator: &AccountId,
        claims: &[EthereumClaim],
    ) -> Result<Vec<u8>> {
        let validator = self
            .staking
            .validator_by_orchestrator(orchestrator)
            .ok_or_else(|| PeggyError::UnknownOrchestrator(orchestrator.to_string()))?;

        let mut attestation_keys: Vec<Vec<u8>> = Vec::with_capacity(claims.len());
        for claim in claims {
            let attestation = self.add_claim(ctx, &validator, claim)?;
            attestation_keys.push(keys::attestation_key(
                attestation.claim_type,
                attestation.event_nonce,
                &attestation.details_digest(),
            ));
        }
        Ok(attestation_keys.join(&b", "[..]))
    }
}
