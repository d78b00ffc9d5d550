//! Ethereum recoverable-signature verification.

use crate::{address::AccountId, address::ValidatorId, codec};
use alloy_primitives::{keccak256, Address, Signature, B256};
use borsh::{
    io::{Read, Result as IoResult, Write},
    BorshDeserialize, BorshSerialize,
};
use serde::{Deserialize, Serialize};

/// Length of an Ethereum recoverable signature: `r || s || v`.
pub const ETH_SIGNATURE_LEN: usize = 65;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("invalid signature length: expected {ETH_SIGNATURE_LEN}, got {0}")]
    InvalidLength(usize),
    #[error("invalid recovery id: {0}")]
    InvalidRecoveryId(u8),
    #[error("signature recovery failed")]
    RecoveryFailed,
    #[error("recovered signer {recovered} does not match expected {expected}")]
    AddressMismatch {
        expected: Address,
        recovered: Address,
    },
}

/// Verifies a 65-byte recoverable ECDSA signature over `digest` against the
/// expected external-chain address.
///
/// The recovery byte may be either Ethereum-style (`27`/`28`) or a raw
/// parity (`0`/`1`); anything else is rejected.
pub fn verify_eth_signature(
    digest: B256,
    signature: &[u8],
    expected: Address,
) -> Result<(), SignatureError> {
    if signature.len() != ETH_SIGNATURE_LEN {
        return Err(SignatureError::InvalidLength(signature.len()));
    }
    let v = signature[ETH_SIGNATURE_LEN - 1];
    if !matches!(v, 0 | 1 | 27 | 28) {
        return Err(SignatureError::InvalidRecoveryId(v));
    }
    let signature =
        Signature::try_from(signature).map_err(|_| SignatureError::RecoveryFailed)?;
    let recovered = signature
        .recover_address_from_prehash(&digest)
        .map_err(|_| SignatureError::RecoveryFailed)?;
    if recovered != expected {
        return Err(SignatureError::AddressMismatch {
            expected,
            recovered,
        });
    }
    Ok(())
}

/// Digest a validator signs to prove possession of its external key when
/// binding an external address to its operator account.
pub fn proof_of_possession_digest(operator: &AccountId) -> B256 {
    keccak256(operator.as_bytes())
}

/// A stored validator signature over a canonical checkpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmSignature {
    pub validator: ValidatorId,
    /// External address the signature was verified against at storage time.
    pub eth_address: Address,
    pub signature: Vec<u8>,
}

impl BorshSerialize for ConfirmSignature {
    fn serialize<W: Write>(&self, writer: &mut W) -> IoResult<()> {
        BorshSerialize::serialize(&self.validator, writer)?;
        codec::write_address(writer, &self.eth_address)?;
        BorshSerialize::serialize(&self.signature, writer)
    }
}

impl BorshDeserialize for ConfirmSignature {
    fn deserialize_reader<R: Read>(reader: &mut R) -> IoResult<Self> {
        Ok(Self {
            validator: ValidatorId::deserialize_reader(reader)?,
            eth_address: codec::read_address(reader)?,
            signature: Vec::<u8>::deserialize_reader(reader)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_signer::SignerSync;
    use alloy_signer_local::PrivateKeySigner;

    fn signer() -> PrivateKeySigner {
        PrivateKeySigner::from_bytes(&B256::repeat_byte(0x17)).expect("valid key")
    }

    #[test]
    fn verifies_a_real_signature() -> eyre::Result<()> {
        let signer = signer();
        let digest = keccak256(b"checkpoint bytes");
        let signature = signer.sign_hash_sync(&digest)?.as_bytes();

        verify_eth_signature(digest, &signature, signer.address())?;
        Ok(())
    }

    #[test]
    fn rejects_corrupted_signature() -> eyre::Result<()> {
        let signer = signer();
        let digest = keccak256(b"checkpoint bytes");
        let mut signature = signer.sign_hash_sync(&digest)?.as_bytes().to_vec();
        signature[10] ^= 0x01;

        let err = verify_eth_signature(digest, &signature, signer.address())
            .expect_err("corrupted signature must not verify");
        assert!(matches!(
            err,
            SignatureError::AddressMismatch { .. } | SignatureError::RecoveryFailed
        ));
        Ok(())
    }

    #[test]
    fn rejects_wrong_expected_address() -> eyre::Result<()> {
        let signer = signer();
        let digest = keccak256(b"checkpoint bytes");
        let signature = signer.sign_hash_sync(&digest)?.as_bytes();

        let err = verify_eth_signature(digest, &signature, Address::repeat_byte(0x99))
            .expect_err("wrong signer must not verify");
        assert!(matches!(err, SignatureError::AddressMismatch { .. }));
        Ok(())
    }

    #[test]
    fn rejects_malformed_length_and_recovery_id() -> eyre::Result<()> {
        let signer = signer();
        let digest = keccak256(b"checkpoint bytes");
        let good = signer.sign_hash_sync(&digest)?.as_bytes();

        assert_eq!(
            verify_eth_signature(digest, &good[..64], signer.address()),
            Err(SignatureError::InvalidLength(64))
        );

        let mut bad_v = good.to_vec();
        bad_v[64] = 29;
        assert_eq!(
            verify_eth_signature(digest, &bad_v, signer.address()),
            Err(SignatureError::InvalidRecoveryId(29))
        );
        Ok(())
    }

    #[test]
    fn proof_of_possession_binds_the_operator() {
        let a = proof_of_possession_digest(&AccountId::new(&b"operator-a"[..]));
        let b = proof_of_possession_digest(&AccountId::new(&b"operator-b"[..]));
        assert_ne!(a, b);
    }
}
