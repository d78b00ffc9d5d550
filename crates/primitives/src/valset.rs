use crate::{checkpoint, codec, nonce::UInt64Nonce};
use alloy_primitives::{Address, B256};
use borsh::{
    io::{Read, Result as IoResult, Write},
    BorshDeserialize, BorshSerialize,
};
use serde::{Deserialize, Serialize};

/// One member of a bridge validator set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValsetMember {
    /// External-chain address the member signs checkpoints with. Zero while
    /// the validator has not registered a binding yet.
    pub eth_address: Address,
    /// Voting power normalized to the member's share of `u32::MAX`.
    pub power: u64,
}

impl BorshSerialize for ValsetMember {
    fn serialize<W: Write>(&self, writer: &mut W) -> IoResult<()> {
        codec::write_address(writer, &self.eth_address)?;
        BorshSerialize::serialize(&self.power, writer)
    }
}

impl BorshDeserialize for ValsetMember {
    fn deserialize_reader<R: Read>(reader: &mut R) -> IoResult<Self> {
        Ok(Self {
            eth_address: codec::read_address(reader)?,
            power: u64::deserialize_reader(reader)?,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValsetError {
    #[error("duplicate member address {0}")]
    DuplicateMember(Address),
    #[error("total member power overflows u64")]
    PowerOverflow,
}

/// A snapshot of the validator set at a given nonce.
///
/// Members are kept sorted by power descending, ties broken by address
/// ascending, so the checkpoint encoding is canonical across replicas.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Valset {
    pub nonce: UInt64Nonce,
    pub members: Vec<ValsetMember>,
}

impl Valset {
    /// Builds a canonical valset: sorts the members and rejects power
    /// overflow and duplicate addresses. Zero addresses mark members without
    /// a registered binding and may repeat.
    pub fn new(nonce: UInt64Nonce, mut members: Vec<ValsetMember>) -> Result<Self, ValsetError> {
        members.sort_by(|a, b| {
            b.power
                .cmp(&a.power)
                .then_with(|| a.eth_address.cmp(&b.eth_address))
        });

        let mut total: u64 = 0;
        for member in &members {
            total = total
                .checked_add(member.power)
                .ok_or(ValsetError::PowerOverflow)?;
        }

        let mut bound: Vec<Address> = members
            .iter()
            .map(|m| m.eth_address)
            .filter(|a| !a.is_zero())
            .collect();
        bound.sort();
        for pair in bound.windows(2) {
            if pair[0] == pair[1] {
                return Err(ValsetError::DuplicateMember(pair[0]));
            }
        }

        Ok(Self { nonce, members })
    }

    /// The canonical checkpoint the external contract verifies signatures
    /// against.
    pub fn checkpoint(&self, peggy_id: &str) -> B256 {
        checkpoint::valset_checkpoint(peggy_id, self.nonce, &self.members)
    }
}

impl BorshSerialize for Valset {
    fn serialize<W: Write>(&self, writer: &mut W) -> IoResult<()> {
        BorshSerialize::serialize(&self.nonce, writer)?;
        BorshSerialize::serialize(&self.members, writer)
    }
}

impl BorshDeserialize for Valset {
    fn deserialize_reader<R: Read>(reader: &mut R) -> IoResult<Self> {
        Ok(Self {
            nonce: UInt64Nonce::deserialize_reader(reader)?,
            members: Vec::<ValsetMember>::deserialize_reader(reader)?,
        })
    }
}
