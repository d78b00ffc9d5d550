//! Claims: per-validator assertions about events on the external chain.
//!
//! Claims are a closed sum type; the attestation engine never sees a
//! type-erased payload. Each variant hashes its fields (tagged with the
//! claim type, variable-length fields length-prefixed) into the details
//! digest that keys its attestation.

use crate::{address::AccountId, codec, nonce::UInt64Nonce};
use alloy_primitives::{keccak256, Address, B256, U256};
use borsh::{
    io::{Error as IoError, ErrorKind, Read, Result as IoResult, Write},
    BorshDeserialize, BorshSerialize,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kinds of external events validators attest to. Each kind has its own
/// strictly sequenced event-nonce stream.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    BorshSerialize,
    BorshDeserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ClaimType {
    BridgeDeposit,
    BridgeWithdrawalBatch,
    BridgeMultiSigUpdate,
    BridgeBootstrap,
    OrchestratorSignedMultiSigUpdate,
    OrchestratorSignedWithdrawBatch,
}

impl ClaimType {
    pub const ALL: [ClaimType; 6] = [
        ClaimType::BridgeDeposit,
        ClaimType::BridgeWithdrawalBatch,
        ClaimType::BridgeMultiSigUpdate,
        ClaimType::BridgeBootstrap,
        ClaimType::OrchestratorSignedMultiSigUpdate,
        ClaimType::OrchestratorSignedWithdrawBatch,
    ];

    /// Stable wire/storage tag; never reorder.
    pub const fn as_u8(self) -> u8 {
        match self {
            ClaimType::BridgeDeposit => 1,
            ClaimType::BridgeWithdrawalBatch => 2,
            ClaimType::BridgeMultiSigUpdate => 3,
            ClaimType::BridgeBootstrap => 4,
            ClaimType::OrchestratorSignedMultiSigUpdate => 5,
            ClaimType::OrchestratorSignedWithdrawBatch => 6,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            ClaimType::BridgeDeposit => "bridge_deposit",
            ClaimType::BridgeWithdrawalBatch => "bridge_withdrawal_batch",
            ClaimType::BridgeMultiSigUpdate => "bridge_multisig_update",
            ClaimType::BridgeBootstrap => "bridge_bootstrap",
            ClaimType::OrchestratorSignedMultiSigUpdate => "orchestrator_signed_multisig_update",
            ClaimType::OrchestratorSignedWithdrawBatch => "orchestrator_signed_withdraw_batch",
        }
    }
}

impl fmt::Display for ClaimType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A deposit locked in the external bridge contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositClaim {
    pub event_nonce: UInt64Nonce,
    pub token_contract: Address,
    pub symbol: String,
    pub amount: U256,
    pub ethereum_sender: Address,
    pub cosmos_receiver: AccountId,
}

/// A withdrawal batch executed by the external bridge contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalBatchClaim {
    pub event_nonce: UInt64Nonce,
    pub token_contract: Address,
    pub batch_nonce: UInt64Nonce,
}

/// The external contract switching to a new validator-set checkpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiSigUpdateClaim {
    pub event_nonce: UInt64Nonce,
    pub valset_nonce: UInt64Nonce,
}

/// The external contract coming online with its initial configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapClaim {
    pub event_nonce: UInt64Nonce,
    pub peggy_id: String,
    pub start_threshold: u64,
    pub allowed_validator_set: Vec<Address>,
    pub validator_powers: Vec<u64>,
}

/// An orchestrator reporting a checkpoint signature it has collected; pure
/// watermark, no token effect.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedCheckpointClaim {
    pub event_nonce: UInt64Nonce,
    /// Nonce of the valset or batch the checkpoint covers.
    pub signed_nonce: UInt64Nonce,
    pub checkpoint: B256,
}

/// One validator's assertion that an external event happened.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EthereumClaim {
    BridgeDeposit(DepositClaim),
    BridgeWithdrawalBatch(WithdrawalBatchClaim),
    BridgeMultiSigUpdate(MultiSigUpdateClaim),
    BridgeBootstrap(BootstrapClaim),
    OrchestratorSignedMultiSigUpdate(SignedCheckpointClaim),
    OrchestratorSignedWithdrawBatch(SignedCheckpointClaim),
}

impl EthereumClaim {
    pub const fn claim_type(&self) -> ClaimType {
        match self {
            EthereumClaim::BridgeDeposit(_) => ClaimType::BridgeDeposit,
            EthereumClaim::BridgeWithdrawalBatch(_) => ClaimType::BridgeWithdrawalBatch,
            EthereumClaim::BridgeMultiSigUpdate(_) => ClaimType::BridgeMultiSigUpdate,
            EthereumClaim::BridgeBootstrap(_) => ClaimType::BridgeBootstrap,
            EthereumClaim::OrchestratorSignedMultiSigUpdate(_) => {
                ClaimType::OrchestratorSignedMultiSigUpdate
            }
            EthereumClaim::OrchestratorSignedWithdrawBatch(_) => {
                ClaimType::OrchestratorSignedWithdrawBatch
            }
        }
    }

    pub const fn event_nonce(&self) -> UInt64Nonce {
        match self {
            EthereumClaim::BridgeDeposit(c) => c.event_nonce,
            EthereumClaim::BridgeWithdrawalBatch(c) => c.event_nonce,
            EthereumClaim::BridgeMultiSigUpdate(c) => c.event_nonce,
            EthereumClaim::BridgeBootstrap(c) => c.event_nonce,
            EthereumClaim::OrchestratorSignedMultiSigUpdate(c) => c.event_nonce,
            EthereumClaim::OrchestratorSignedWithdrawBatch(c) => c.event_nonce,
        }
    }

    /// Digest identifying the claim payload. Validators claiming the same
    /// event with the same details land on the same attestation; the event
    /// nonce is keyed separately and excluded here.
    pub fn details_digest(&self) -> B256 {
        let mut buf = Vec::with_capacity(128);
        buf.push(self.claim_type().as_u8());
        match self {
            EthereumClaim::BridgeDeposit(c) => {
                buf.extend_from_slice(c.token_contract.as_slice());
                push_bytes(&mut buf, c.symbol.as_bytes());
                buf.extend_from_slice(&c.amount.to_be_bytes::<32>());
                buf.extend_from_slice(c.ethereum_sender.as_slice());
                push_bytes(&mut buf, c.cosmos_receiver.as_bytes());
            }
            EthereumClaim::BridgeWithdrawalBatch(c) => {
                buf.extend_from_slice(c.token_contract.as_slice());
                buf.extend_from_slice(&c.batch_nonce.to_be_bytes());
            }
            EthereumClaim::BridgeMultiSigUpdate(c) => {
                buf.extend_from_slice(&c.valset_nonce.to_be_bytes());
            }
            EthereumClaim::BridgeBootstrap(c) => {
                push_bytes(&mut buf, c.peggy_id.as_bytes());
                buf.extend_from_slice(&c.start_threshold.to_be_bytes());
                buf.extend_from_slice(&(c.allowed_validator_set.len() as u32).to_be_bytes());
                for address in &c.allowed_validator_set {
                    buf.extend_from_slice(address.as_slice());
                }
                buf.extend_from_slice(&(c.validator_powers.len() as u32).to_be_bytes());
                for power in &c.validator_powers {
                    buf.extend_from_slice(&power.to_be_bytes());
                }
            }
            EthereumClaim::OrchestratorSignedMultiSigUpdate(c)
            | EthereumClaim::OrchestratorSignedWithdrawBatch(c) => {
                buf.extend_from_slice(&c.signed_nonce.to_be_bytes());
                buf.extend_from_slice(c.checkpoint.as_slice());
            }
        }
        keccak256(&buf)
    }
}

/// Length-prefixes a variable-length field so adjacent fields cannot be
/// reassociated into a colliding digest.
fn push_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    buf.extend_from_slice(bytes);
}

impl BorshSerialize for DepositClaim {
    fn serialize<W: Write>(&self, writer: &mut W) -> IoResult<()> {
        BorshSerialize::serialize(&self.event_nonce, writer)?;
        codec::write_address(writer, &self.token_contract)?;
        BorshSerialize::serialize(&self.symbol, writer)?;
        codec::write_u256(writer, &self.amount)?;
        codec::write_address(writer, &self.ethereum_sender)?;
        BorshSerialize::serialize(&self.cosmos_receiver, writer)
    }
}

impl BorshDeserialize for DepositClaim {
    fn deserialize_reader<R: Read>(reader: &mut R) -> IoResult<Self> {
        Ok(Self {
            event_nonce: UInt64Nonce::deserialize_reader(reader)?,
            token_contract: codec::read_address(reader)?,
            symbol: String::deserialize_reader(reader)?,
            amount: codec::read_u256(reader)?,
            ethereum_sender: codec::read_address(reader)?,
            cosmos_receiver: AccountId::deserialize_reader(reader)?,
        })
    }
}

impl BorshSerialize for WithdrawalBatchClaim {
    fn serialize<W: Write>(&self, writer: &mut W) -> IoResult<()> {
        BorshSerialize::serialize(&self.event_nonce, writer)?;
        codec::write_address(writer, &self.token_contract)?;
        BorshSerialize::serialize(&self.batch_nonce, writer)
    }
}

impl BorshDeserialize for WithdrawalBatchClaim {
    fn deserialize_reader<R: Read>(reader: &mut R) -> IoResult<Self> {
        Ok(Self {
            event_nonce: UInt64Nonce::deserialize_reader(reader)?,
            token_contract: codec::read_address(reader)?,
            batch_nonce: UInt64Nonce::deserialize_reader(reader)?,
        })
    }
}

impl BorshSerialize for BootstrapClaim {
    fn serialize<W: Write>(&self, writer: &mut W) -> IoResult<()> {
        BorshSerialize::serialize(&self.event_nonce, writer)?;
        BorshSerialize::serialize(&self.peggy_id, writer)?;
        BorshSerialize::serialize(&self.start_threshold, writer)?;
        BorshSerialize::serialize(&(self.allowed_validator_set.len() as u32), writer)?;
        for address in &self.allowed_validator_set {
            codec::write_address(writer, address)?;
        }
        BorshSerialize::serialize(&self.validator_powers, writer)
    }
}

impl BorshDeserialize for BootstrapClaim {
    fn deserialize_reader<R: Read>(reader: &mut R) -> IoResult<Self> {
        let event_nonce = UInt64Nonce::deserialize_reader(reader)?;
        let peggy_id = String::deserialize_reader(reader)?;
        let start_threshold = u64::deserialize_reader(reader)?;
        let count = u32::deserialize_reader(reader)?;
        let mut allowed_validator_set = Vec::with_capacity(count as usize);
        for _ in 0..count {
            allowed_validator_set.push(codec::read_address(reader)?);
        }
        Ok(Self {
            event_nonce,
            peggy_id,
            start_threshold,
            allowed_validator_set,
            validator_powers: Vec::<u64>::deserialize_reader(reader)?,
        })
    }
}

impl BorshSerialize for SignedCheckpointClaim {
    fn serialize<W: Write>(&self, writer: &mut W) -> IoResult<()> {
        BorshSerialize::serialize(&self.event_nonce, writer)?;
        BorshSerialize::serialize(&self.signed_nonce, writer)?;
        codec::write_b256(writer, &self.checkpoint)
    }
}

impl BorshDeserialize for SignedCheckpointClaim {
    fn deserialize_reader<R: Read>(reader: &mut R) -> IoResult<Self> {
        Ok(Self {
            event_nonce: UInt64Nonce::deserialize_reader(reader)?,
            signed_nonce: UInt64Nonce::deserialize_reader(reader)?,
            checkpoint: codec::read_b256(reader)?,
        })
    }
}

impl BorshSerialize for EthereumClaim {
    fn serialize<W: Write>(&self, writer: &mut W) -> IoResult<()> {
        BorshSerialize::serialize(&self.claim_type().as_u8(), writer)?;
        match self {
            EthereumClaim::BridgeDeposit(c) => BorshSerialize::serialize(c, writer),
            EthereumClaim::BridgeWithdrawalBatch(c) => BorshSerialize::serialize(c, writer),
            EthereumClaim::BridgeMultiSigUpdate(c) => BorshSerialize::serialize(c, writer),
            EthereumClaim::BridgeBootstrap(c) => BorshSerialize::serialize(c, writer),
            EthereumClaim::OrchestratorSignedMultiSigUpdate(c) => BorshSerialize::serialize(c, writer),
            EthereumClaim::OrchestratorSignedWithdrawBatch(c) => BorshSerialize::serialize(c, writer),
        }
    }
}

impl BorshDeserialize for EthereumClaim {
    fn deserialize_reader<R: Read>(reader: &mut R) -> IoResult<Self> {
        let tag = u8::deserialize_reader(reader)?;
        Ok(match tag {
            1 => EthereumClaim::BridgeDeposit(DepositClaim::deserialize_reader(reader)?),
            2 => EthereumClaim::BridgeWithdrawalBatch(WithdrawalBatchClaim::deserialize_reader(
                reader,
            )?),
            3 => EthereumClaim::BridgeMultiSigUpdate(MultiSigUpdateClaim::deserialize_reader(
                reader,
            )?),
            4 => EthereumClaim::BridgeBootstrap(BootstrapClaim::deserialize_reader(reader)?),
            5 => EthereumClaim::OrchestratorSignedMultiSigUpdate(
                SignedCheckpointClaim::deserialize_reader(reader)?,
            ),
            6 => EthereumClaim::OrchestratorSignedWithdrawBatch(
                SignedCheckpointClaim::deserialize_reader(reader)?,
            ),
            other => {
                return Err(IoError::new(
                    ErrorKind::InvalidData,
                    format!("unknown claim tag {other}"),
                ))
            }
        })
    }
}

impl BorshSerialize for MultiSigUpdateClaim {
    fn serialize<W: Write>(&self, writer: &mut W) -> IoResult<()> {
        BorshSerialize::serialize(&self.event_nonce, writer)?;
        BorshSerialize::serialize(&self.valset_nonce, writer)
    }
}

impl BorshDeserialize for MultiSigUpdateClaim {
    fn deserialize_reader<R: Read>(reader: &mut R) -> IoResult<Self> {
        Ok(Self {
            event_nonce: UInt64Nonce::deserialize_reader(reader)?,
            valset_nonce: UInt64Nonce::deserialize_reader(reader)?,
        })
    }
}
