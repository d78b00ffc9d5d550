//! The attestation engine: per-(type, nonce, digest) tallies of validator
//! claims, strict per-type nonce sequencing, and the >2/3 observation
//! threshold.

use crate::{
    error::{PeggyError, Result},
    host::{BankKeeper, StakingKeeper},
    keeper::{BlockContext, Keeper},
    keys,
    store::{self, Store},
};
use alloy_primitives::B256;
use peggy_primitives::{
    Attestation, AttestationStatus, ClaimType, EthereumClaim, UInt64Nonce, ValidatorId,
};
use tracing::{debug, trace};

impl<S: Store + ?Sized, SK: StakingKeeper, BK: BankKeeper> Keeper<'_, S, SK, BK> {
    /// Records one validator's claim and folds it into the matching
    /// attestation. When the accumulated power crosses two thirds of the
    /// total, the attestation is observed and its effects run inside the
    /// same message.
    pub fn add_claim(
        &mut self,
        ctx: &BlockContext,
        validator: &ValidatorId,
        claim: &EthereumClaim,
    ) -> Result<Attestation> {
        let claim_type = claim.claim_type();
        let event_nonce = claim.event_nonce();
        let digest = claim.details_digest();

        let marker_key = keys::claim_key(claim_type, event_nonce, validator, &digest);
        if self.store.has(&marker_key) {
            return Err(PeggyError::Duplicate(format!(
                "claim {claim_type}/{event_nonce} already submitted by validator {validator}"
            )));
        }

        // A claim must either start the next event in the stream or join a
        // tally already in progress; skipping ahead and re-claiming observed
        // nonces are both forbidden.
        let expected = self.last_observed_nonce(claim_type)?.next();
        if event_nonce != expected && !self.has_pending_attestation(claim_type, event_nonce)? {
            return Err(PeggyError::NonContiguousNonce {
                got: event_nonce,
                expected,
            });
        }

        self.store.set(&marker_key, vec![1]);

        let attestation_key = keys::attestation_key(claim_type, event_nonce, &digest);
        let mut attestation: Attestation = store::get_value(&*self.store, &attestation_key)?
            .unwrap_or_else(|| Attestation::new(claim.clone()));
        if attestation.has_signer(validator) {
            return Err(PeggyError::Duplicate(format!(
                "validator {validator} already in signer set"
            )));
        }
        attestation.signers.push(validator.clone());

        let total_power = self.staking.total_power();
        let accumulated: u128 = attestation
            .signers
            .iter()
            .filter_map(|signer| self.staking.power_of(signer))
            .map(u128::from)
            .sum();
        attestation.accumulated_power = accumulated.min(u64::MAX as u128) as u64;

        let crosses = attestation.status == AttestationStatus::Pending
            && accumulated * 3 > u128::from(total_power) * 2;

        if crosses {
            attestation.status = AttestationStatus::Observed;
            self.set_last_observed_nonce(claim_type, event_nonce);
            self.prune_competing_attestations(claim_type, event_nonce, &digest)?;
            store::set_value(self.store, &attestation_key, &attestation)?;
            debug!(
                claim_type = %claim_type,
                nonce = %event_nonce,
                power = attestation.accumulated_power,
                total = total_power,
                "attestation observed"
            );
            self.apply_attestation(ctx, &attestation)?;
        } else {
            store::set_value(self.store, &attestation_key, &attestation)?;
            trace!(
                claim_type = %claim_type,
                nonce = %event_nonce,
                power = attestation.accumulated_power,
                total = total_power,
                "claim recorded, attestation pending"
            );
        }
        Ok(attestation)
    }

    pub fn attestation(
        &self,
        claim_type: ClaimType,
        nonce: UInt64Nonce,
        digest: &B256,
    ) -> Result<Option<Attestation>> {
        store::get_value(&*self.store, &keys::attestation_key(claim_type, nonce, digest))
    }

    pub fn has_claim(
        &self,
        claim_type: ClaimType,
        nonce: UInt64Nonce,
        validator: &ValidatorId,
        digest: &B256,
    ) -> bool {
        self.store
            .has(&keys::claim_key(claim_type, nonce, validator, digest))
    }

    pub fn last_observed_nonce(&self, claim_type: ClaimType) -> Result<UInt64Nonce> {
        store::get_u64(&*self.store, &keys::last_observed_nonce_key(claim_type))
            .map(UInt64Nonce::new)
    }

    fn set_last_observed_nonce(&mut self, claim_type: ClaimType, nonce: UInt64Nonce) {
        store::set_u64(
            self.store,
            &keys::last_observed_nonce_key(claim_type),
            nonce.u64(),
        );
    }

    fn has_pending_attestation(&self, claim_type: ClaimType, nonce: UInt64Nonce) -> Result<bool> {
        for (key, value) in self
            .store
            .iter_prefix(&keys::attestation_nonce_prefix(claim_type, nonce))
        {
            let attestation: Attestation = borsh::from_slice(&value).map_err(|err| {
                PeggyError::Internal(format!(
                    "corrupt attestation at {}: {err}",
                    alloy_primitives::hex::encode(&key)
                ))
            })?;
            if attestation.status == AttestationStatus::Pending {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Deletes the losing pending attestations at an observed (type, nonce).
    /// At most one observed attestation per (type, nonce) can ever exist;
    /// divergent minority views must not accumulate in storage.
    fn prune_competing_attestations(
        &mut self,
        claim_type: ClaimType,
        nonce: UInt64Nonce,
        winner_digest: &B256,
    ) -> Result<()> {
        let winner_key = keys::attestation_key(claim_type, nonce, winner_digest);
        let losers: Vec<Vec<u8>> = self
            .store
            .iter_prefix(&keys::attestation_nonce_prefix(claim_type, nonce))
            .map(|(key, _)| key)
            .filter(|key| *key != winner_key)
            .collect();
        for key in losers {
            self.store.remove(&key);
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
    use alloy_primitives::B256;
    use peggy_primitives::{SignedCheckpointClaim, UInt64Nonce};

    fn watermark_claim(event_nonce: u64, signed_nonce: u64) -> EthereumClaim {
        EthereumClaim::OrchestratorSignedWithdrawBatch(SignedCheckpointClaim {
            event_nonce: UInt64Nonce::new(event_nonce),
            signed_nonce: UInt64Nonce::new(signed_nonce),
            checkpoint: B256::repeat_byte(0x5C),
        })
    }

    fn divergent_claim(event_nonce: u64, signed_nonce: u64) -> EthereumClaim {
        EthereumClaim::OrchestratorSignedWithdrawBatch(SignedCheckpointClaim {
            event_nonce: UInt64Nonce::new(event_nonce),
            signed_nonce: UInt64Nonce::new(signed_nonce),
            checkpoint: B256::repeat_byte(0xD1),
        })
    }

    #[test]
    fn full_power_validator_observes_immediately() -> eyre::Result<()> {
        let mut store = MemStore::new();
        let validator = ValidatorId::new(&b"val"[..]);
        let staking = MockStaking::single(validator.clone(), 100);
        let bank = StoreBank::new();
        testutil::init_params(&mut store)?;
        let mut keeper = Keeper::new(&mut store, &staking, &bank);

        let attestation =
            keeper.add_claim(&BlockContext::at_height(1), &validator, &watermark_claim(1, 5))?;
        assert_eq!(attestation.status, AttestationStatus::Observed);
        assert_eq!(
            keeper.last_observed_nonce(ClaimType::OrchestratorSignedWithdrawBatch)?,
            UInt64Nonce::new(1)
        );
        Ok(())
    }

    #[test]
    fn exactly_two_thirds_does_not_observe() -> eyre::Result<()> {
        let mut store = MemStore::new();
        let validators: Vec<ValidatorId> = (0u8..3)
            .map(|tag| ValidatorId::new(vec![tag]))
            .collect();
        // 2 of 3 equal-power signers hold exactly 2/3: not strictly greater
        let staking = MockStaking::new(validators.iter().map(|v| (v.clone(), 10u64)));
        let bank = StoreBank::new();
        testutil::init_params(&mut store)?;
        let mut keeper = Keeper::new(&mut store, &staking, &bank);
        let ctx = BlockContext::at_height(1);

        let first = keeper.add_claim(&ctx, &validators[0], &watermark_claim(1, 5))?;
        assert_eq!(first.status, AttestationStatus::Pending);
        let second = keeper.add_claim(&ctx, &validators[1], &watermark_claim(1, 5))?;
        assert_eq!(second.status, AttestationStatus::Pending, "20/30 is not > 2/3");

        let third = keeper.add_claim(&ctx, &validators[2], &watermark_claim(1, 5))?;
        assert_eq!(third.status, AttestationStatus::Observed);
        Ok(())
    }

    #[test]
    fn duplicate_claims_are_rejected() -> eyre::Result<()> {
        let mut store = MemStore::new();
        let validators: Vec<ValidatorId> = (0u8..2).map(|tag| ValidatorId::new(vec![tag])).collect();
        let staking = MockStaking::new(validators.iter().map(|v| (v.clone(), 10u64)));
        let bank = StoreBank::new();
        testutil::init_params(&mut store)?;
        let mut keeper = Keeper::new(&mut store, &staking, &bank);
        let ctx = BlockContext::at_height(1);

        keeper.add_claim(&ctx, &validators[0], &watermark_claim(1, 5))?;
        let err = keeper
            .add_claim(&ctx, &validators[0], &watermark_claim(1, 5))
            .expect_err("same claim twice must fail");
        assert!(matches!(err, PeggyError::Duplicate(_)));
        Ok(())
    }

    #[test]
    fn nonce_stream_is_strict_per_type() -> eyre::Result<()> {
        let mut store = MemStore::new();
        let validator = ValidatorId::new(&b"val"[..]);
        let staking = MockStaking::single(validator.clone(), 100);
        let bank = StoreBank::new();
        testutil::init_params(&mut store)?;
        let mut keeper = Keeper::new(&mut store, &staking, &bank);
        let ctx = BlockContext::at_height(1);

        // skipping ahead
        let err = keeper
            .add_claim(&ctx, &validator, &watermark_claim(2, 5))
            .expect_err("nonce 2 before 1 must fail");
        assert!(matches!(
            err,
            PeggyError::NonContiguousNonce { got, expected }
                if got == UInt64Nonce::new(2) && expected == UInt64Nonce::new(1)
        ));

        keeper.add_claim(&ctx, &validator, &watermark_claim(1, 5))?;

        // replaying an observed nonce with different details
        let err = keeper
            .add_claim(&ctx, &validator, &watermark_claim(1, 6))
            .expect_err("observed nonce must not accept new claims");
        assert!(matches!(err, PeggyError::NonContiguousNonce { .. }));

        keeper.add_claim(&ctx, &validator, &watermark_claim(2, 6))?;
        Ok(())
    }

    #[test]
    fn divergent_views_race_and_loser_is_pruned() -> eyre::Result<()> {
        let mut store = MemStore::new();
        let validators: Vec<ValidatorId> = (0u8..3).map(|tag| ValidatorId::new(vec![tag])).collect();
        // the two honest signers hold 80/90: past the threshold together
        let powers = [40u64, 10, 40];
        let staking = MockStaking::new(
            validators
                .iter()
                .cloned()
                .zip(powers.iter().copied()),
        );
        let bank = StoreBank::new();
        testutil::init_params(&mut store)?;
        let mut keeper = Keeper::new(&mut store, &staking, &bank);
        let ctx = BlockContext::at_height(1);

        let honest = watermark_claim(1, 5);
        let divergent = divergent_claim(1, 5);

        keeper.add_claim(&ctx, &validators[0], &honest)?;
        keeper.add_claim(&ctx, &validators[1], &divergent)?;

        // both tallies pending at the same nonce
        assert!(keeper
            .attestation(honest.claim_type(), UInt64Nonce::new(1), &honest.details_digest())?
            .is_some());
        assert!(keeper
            .attestation(
                divergent.claim_type(),
                UInt64Nonce::new(1),
                &divergent.details_digest()
            )?
            .is_some());

        // the honest view wins the race
        let observed = keeper.add_claim(&ctx, &validators[2], &honest)?;
        assert_eq!(observed.status, AttestationStatus::Observed);

        // the losing tally is gone; the winner is terminal
        assert!(keeper
            .attestation(
                divergent.claim_type(),
                UInt64Nonce::new(1),
                &divergent.details_digest()
            )?
            .is_none());
        let winner = keeper
            .attestation(honest.claim_type(), UInt64Nonce::new(1), &honest.details_digest())?
            .expect("winner persists");
        assert_eq!(winner.status, AttestationStatus::Observed);
        Ok(())
    }
}
