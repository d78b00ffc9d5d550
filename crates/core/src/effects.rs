//! Attestation effects: the state changes an observed event implies.
//!
//! Effects run inside the message that crossed the threshold; any failure
//! rolls the whole message back, so the attestation stays pending and the
//! last-observed nonce does not advance.

use crate::{
    error::{PeggyError, Result},
    host::{module_account, BankKeeper, StakingKeeper},
    keeper::{BlockContext, Keeper},
    keys,
    store::{self, Store},
};
use peggy_primitives::{
    voucher_denom, Attestation, BootstrapClaim, Coin, DepositClaim, EthereumClaim,
    MultiSigUpdateClaim, SignedCheckpointClaim, TokenRef, UInt64Nonce, Valset, ValsetMember,
};
use tracing::debug;

impl<S: Store + ?Sized, SK: StakingKeeper, BK: BankKeeper> Keeper<'_, S, SK, BK> {
    pub(crate) fn apply_attestation(
        &mut self,
        _ctx: &BlockContext,
        attestation: &Attestation,
    ) -> Result<()> {
        match &attestation.details {
            EthereumClaim::BridgeDeposit(claim) => self.apply_deposit(claim),
            EthereumClaim::BridgeWithdrawalBatch(claim) => {
                self.observe_batch(&claim.token_contract, claim.batch_nonce)
            }
            EthereumClaim::BridgeMultiSigUpdate(claim) => self.apply_multisig_update(claim),
            EthereumClaim::BridgeBootstrap(claim) => {
                self.apply_bootstrap(attestation.event_nonce, claim)
            }
            EthereumClaim::OrchestratorSignedMultiSigUpdate(claim) => {
                self.apply_signed_valset_watermark(claim)
            }
            EthereumClaim::OrchestratorSignedWithdrawBatch(claim) => {
                self.apply_signed_batch_watermark(claim)
            }
        }
    }

    /// Mints vouchers for a deposit locked on the external chain and credits
    /// the receiver. First deposit of a token registers its counterpart.
    fn apply_deposit(&mut self, claim: &DepositClaim) -> Result<()> {
        if !self.has_counterpart(&claim.token_contract) {
            self.set_counterpart(&TokenRef::new(claim.token_contract, claim.symbol.clone()))?;
        }

        let coin = Coin::new(voucher_denom(&claim.token_contract), claim.amount);
        let module = module_account();
        self.bank.mint(self.store, &module, &coin)?;
        self.bank
            .transfer(self.store, &module, &claim.cosmos_receiver, &coin)?;
        debug!(
            token = %claim.token_contract,
            amount = %claim.amount,
            receiver = %claim.cosmos_receiver,
            "deposit observed, vouchers credited"
        );
        Ok(())
    }

    /// The external contract enforces a newer valset now: advance the
    /// watermark and drop everything it supersedes.
    fn apply_multisig_update(&mut self, claim: &MultiSigUpdateClaim) -> Result<()> {
        let last = self.last_observed_valset_nonce()?;
        if claim.valset_nonce <= last {
            return Err(PeggyError::NonContiguousNonce {
                got: claim.valset_nonce,
                expected: last.next(),
            });
        }
        if !self.has_valset(claim.valset_nonce) {
            return Err(PeggyError::UnknownValset(claim.valset_nonce));
        }
        self.set_last_observed_valset_nonce(claim.valset_nonce);
        self.prune_valsets_below(claim.valset_nonce)?;
        debug!(nonce = %claim.valset_nonce, "external chain enforces new valset");
        Ok(())
    }

    /// Installs the initial validator set the external contract was deployed
    /// with, after checking it was deployed for this bridge.
    fn apply_bootstrap(&mut self, event_nonce: UInt64Nonce, claim: &BootstrapClaim) -> Result<()> {
        let params = self.params()?;
        if claim.peggy_id != params.peggy_id {
            return Err(PeggyError::InvalidBootstrap(format!(
                "peggy id {:?} does not match configured {:?}",
                claim.peggy_id, params.peggy_id
            )));
        }
        if claim.start_threshold != params.start_threshold {
            return Err(PeggyError::InvalidBootstrap(format!(
                "start threshold {} does not match configured {}",
                claim.start_threshold, params.start_threshold
            )));
        }
        if claim.allowed_validator_set.len() != claim.validator_powers.len() {
            return Err(PeggyError::InvalidBootstrap(
                "validator set and power list lengths differ".into(),
            ));
        }

        let members: Vec<ValsetMember> = claim
            .allowed_validator_set
            .iter()
            .zip(&claim.validator_powers)
            .map(|(eth_address, power)| ValsetMember {
                eth_address: *eth_address,
                power: *power,
            })
            .collect();
        let valset = Valset::new(event_nonce, members)
            .map_err(|err| PeggyError::InvalidBootstrap(err.to_string()))?;

        store::set_value(self.store, &keys::valset_key(event_nonce), &valset)?;
        self.set_last_observed_valset_nonce(event_nonce);
        debug!(nonce = %event_nonce, members = valset.members.len(), "bootstrap valset installed");
        Ok(())
    }

    fn apply_signed_valset_watermark(&mut self, claim: &SignedCheckpointClaim) -> Result<()> {
        let last = self.last_approved_valset_nonce()?;
        if claim.signed_nonce <= last {
            return Err(PeggyError::NonContiguousNonce {
                got: claim.signed_nonce,
                expected: last.next(),
            });
        }
        self.set_last_approved_valset_nonce(claim.signed_nonce);
        Ok(())
    }

    /// Best-effort watermark; reports about already-covered batches are
    /// informational and never fail.
    fn apply_signed_batch_watermark(&mut self, claim: &SignedCheckpointClaim) -> Result<()> {
        if claim.signed_nonce > self.last_approved_batch_nonce()? {
            self.set_last_approved_batch_nonce(claim.signed_nonce);
        }
        Ok(())
    }
}
