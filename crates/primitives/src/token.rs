use crate::codec;
use alloy_primitives::{hex, Address, U256};
use borsh::{
    io::{Read, Result as IoResult, Write},
    BorshDeserialize, BorshSerialize,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix of every voucher denomination minted by the bridge module.
pub const VOUCHER_DENOM_PREFIX: &str = "peggy";

/// Derives the deterministic voucher denomination for a bridged token.
///
/// The contract address alone makes the denomination collision-free; the
/// token's symbol lives in the counterpart registry instead.
pub fn voucher_denom(contract: &Address) -> String {
    format!("{VOUCHER_DENOM_PREFIX}/0x{}", hex::encode(contract))
}

/// Parses a voucher denomination back into the token contract it names.
pub fn parse_voucher_denom(denom: &str) -> Option<Address> {
    let rest = denom
        .strip_prefix(VOUCHER_DENOM_PREFIX)?
        .strip_prefix("/0x")?;
    if rest.len() != Address::len_bytes() * 2 {
        return None;
    }
    let bytes = hex::decode(rest).ok()?;
    Some(Address::from_slice(&bytes))
}

/// A bridged token: external contract address plus display symbol.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRef {
    pub contract: Address,
    pub symbol: String,
}

impl TokenRef {
    pub fn new(contract: Address, symbol: impl Into<String>) -> Self {
        Self {
            contract,
            symbol: symbol.into(),
        }
    }

    pub fn voucher_denom(&self) -> String {
        voucher_denom(&self.contract)
    }
}

impl BorshSerialize for TokenRef {
    fn serialize<W: Write>(&self, writer: &mut W) -> IoResult<()> {
        codec::write_address(writer, &self.contract)?;
        BorshSerialize::serialize(&self.symbol, writer)
    }
}

impl BorshDeserialize for TokenRef {
    fn deserialize_reader<R: Read>(reader: &mut R) -> IoResult<Self> {
        Ok(Self {
            contract: codec::read_address(reader)?,
            symbol: String::deserialize_reader(reader)?,
        })
    }
}

/// An amount of an external token, in the token's native decimals.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Erc20Token {
    pub contract: Address,
    pub amount: U256,
}

impl Erc20Token {
    pub fn new(contract: Address, amount: U256) -> Self {
        Self { contract, amount }
    }

    /// The domestic voucher coin this external amount is represented by.
    pub fn as_voucher_coin(&self) -> Coin {
        Coin::new(voucher_denom(&self.contract), self.amount)
    }
}

impl BorshSerialize for Erc20Token {
    fn serialize<W: Write>(&self, writer: &mut W) -> IoResult<()> {
        codec::write_address(writer, &self.contract)?;
        codec::write_u256(writer, &self.amount)
    }
}

impl BorshDeserialize for Erc20Token {
    fn deserialize_reader<R: Read>(reader: &mut R) -> IoResult<Self> {
        Ok(Self {
            contract: codec::read_address(reader)?,
            amount: codec::read_u256(reader)?,
        })
    }
}

/// A domestic coin: denomination plus 256-bit amount.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: U256,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: U256) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

impl BorshSerialize for Coin {
    fn serialize<W: Write>(&self, writer: &mut W) -> IoResult<()> {
        BorshSerialize::serialize(&self.denom, writer)?;
        codec::write_u256(writer, &self.amount)
    }
}

impl BorshDeserialize for Coin {
    fn deserialize_reader<R: Read>(reader: &mut R) -> IoResult<Self> {
        Ok(Self {
            denom: String::deserialize_reader(reader)?,
            amount: codec::read_u256(reader)?,
        })
    }
}
