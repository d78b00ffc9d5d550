use crate::{
    address::ValidatorId,
    claim::{ClaimType, EthereumClaim},
    nonce::UInt64Nonce,
};
use alloy_primitives::B256;
use borsh::{
    io::{Read, Result as IoResult, Write},
    BorshDeserialize, BorshSerialize,
};
use serde::{Deserialize, Serialize};

/// Lifecycle of an attestation. `Observed` is terminal: an attestation never
/// transitions out of it.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
pub enum AttestationStatus {
    Pending,
    Observed,
}

/// Aggregated validator claims about one external event, keyed by
/// `(claim type, event nonce, details digest)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attestation {
    pub claim_type: ClaimType,
    pub event_nonce: UInt64Nonce,
    /// The concrete claim payload every signer asserted.
    pub details: EthereumClaim,
    pub signers: Vec<ValidatorId>,
    /// Voting power of `signers` under the staking set current at the last
    /// recorded claim.
    pub accumulated_power: u64,
    pub status: AttestationStatus,
}

impl Attestation {
    /// A fresh pending attestation for the given claim payload.
    pub fn new(details: EthereumClaim) -> Self {
        Self {
            claim_type: details.claim_type(),
            event_nonce: details.event_nonce(),
            details,
            signers: Vec::new(),
            accumulated_power: 0,
            status: AttestationStatus::Pending,
        }
    }

    pub fn has_signer(&self, validator: &ValidatorId) -> bool {
        self.signers.iter().any(|signer| signer == validator)
    }

    pub fn details_digest(&self) -> B256 {
        self.details.details_digest()
    }
}

impl BorshSerialize for Attestation {
    fn serialize<W: Write>(&self, writer: &mut W) -> IoResult<()> {
        BorshSerialize::serialize(&self.claim_type, writer)?;
        BorshSerialize::serialize(&self.event_nonce, writer)?;
        BorshSerialize::serialize(&self.details, writer)?;
        BorshSerialize::serialize(&self.signers, writer)?;
        BorshSerialize::serialize(&self.accumulated_power, writer)?;
        BorshSerialize::serialize(&self.status, writer)
    }
}

impl BorshDeserialize for Attestation {
    fn deserialize_reader<R: Read>(reader: &mut R) -> IoResult<Self> {
        Ok(Self {
            claim_type: ClaimType::deserialize_reader(reader)?,
            event_nonce: UInt64Nonce::deserialize_reader(reader)?,
            details: EthereumClaim::deserialize_reader(reader)?,
            signers: Vec::<ValidatorId>::deserialize_reader(reader)?,
            accumulated_power: u64::deserialize_reader(reader)?,
            status: AttestationStatus::deserialize_reader(reader)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claim::DepositClaim;
    use alloy_primitives::{Address, U256};

    #[test]
    fn new_attestation_is_pending_and_unsigned() {
        let attestation = Attestation::new(EthereumClaim::BridgeDeposit(DepositClaim {
            event_nonce: UInt64Nonce::new(1),
            token_contract: Address::ZERO,
            symbol: "TEST".to_owned(),
            amount: U256::from(1u64),
            ethereum_sender: Address::ZERO,
            cosmos_receiver: crate::AccountId::new(&b"r"[..]),
        }));
        assert_eq!(attestation.status, AttestationStatus::Pending);
        assert_eq!(attestation.claim_type, ClaimType::BridgeDeposit);
        assert_eq!(attestation.event_nonce, UInt64Nonce::new(1));
        assert!(attestation.signers.is_empty());
        assert_eq!(attestation.accumulated_power, 0);
    }
}
