use crate::{
    address::AccountId, checkpoint, codec, nonce::UInt64Nonce, token::Erc20Token,
};
use alloy_primitives::{Address, B256};
use borsh::{
    io::{Read, Result as IoResult, Write},
    BorshDeserialize, BorshSerialize,
};
use serde::{Deserialize, Serialize};

/// An outgoing transfer waiting in the pool or carried by a pending batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingTx {
    /// Unique id assigned at pool insertion; also the FIFO tie-breaker among
    /// equal fees.
    pub id: u64,
    pub sender: AccountId,
    pub dest_address: Address,
    pub amount: Erc20Token,
    /// Fee offered to get the transfer relayed; same token as `amount`.
    pub bridge_fee: Erc20Token,
}

impl BorshSerialize for OutgoingTx {
    fn serialize<W: Write>(&self, writer: &mut W) -> IoResult<()> {
        BorshSerialize::serialize(&self.id, writer)?;
        BorshSerialize::serialize(&self.sender, writer)?;
        codec::write_address(writer, &self.dest_address)?;
        BorshSerialize::serialize(&self.amount, writer)?;
        BorshSerialize::serialize(&self.bridge_fee, writer)
    }
}

impl BorshDeserialize for OutgoingTx {
    fn deserialize_reader<R: Read>(reader: &mut R) -> IoResult<Self> {
        Ok(Self {
            id: u64::deserialize_reader(reader)?,
            sender: AccountId::deserialize_reader(reader)?,
            dest_address: codec::read_address(reader)?,
            amount: Erc20Token::deserialize_reader(reader)?,
            bridge_fee: Erc20Token::deserialize_reader(reader)?,
        })
    }
}

/// Lifecycle of an outgoing batch. `Observed` is terminal.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
pub enum BatchStatus {
    Pending,
    Observed,
}

/// An immutable bundle of outgoing transfers for one token, built from the
/// highest-fee prefix of the pool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingTxBatch {
    /// Strictly monotonic across all tokens.
    pub nonce: UInt64Nonce,
    pub token_contract: Address,
    /// Emptied once the batch is observed; the escrow is burned then.
    pub elements: Vec<OutgoingTx>,
    pub status: BatchStatus,
}

impl OutgoingTxBatch {
    /// The canonical checkpoint the external contract verifies signatures
    /// against.
    pub fn checkpoint(&self, peggy_id: &str) -> B256 {
        checkpoint::batch_checkpoint(peggy_id, self.token_contract, self.nonce, &self.elements)
    }
}

impl BorshSerialize for OutgoingTxBatch {
    fn serialize<W: Write>(&self, writer: &mut W) -> IoResult<()> {
        BorshSerialize::serialize(&self.nonce, writer)?;
        codec::write_address(writer, &self.token_contract)?;
        BorshSerialize::serialize(&self.elements, writer)?;
        BorshSerialize::serialize(&self.status, writer)
    }
}

impl BorshDeserialize for OutgoingTxBatch {
    fn deserialize_reader<R: Read>(reader: &mut R) -> IoResult<Self> {
        Ok(Self {
            nonce: UInt64Nonce::deserialize_reader(reader)?,
            token_contract: codec::read_address(reader)?,
            elements: Vec::<OutgoingTx>::deserialize_reader(reader)?,
            status: BatchStatus::deserialize_reader(reader)?,
        })
    }
}
