//! Borsh helpers for alloy field types inside stored records.
//!
//! Alloy's `Address`, `B256` and `U256` do not implement the borsh traits,
//! so records containing them implement the pair explicitly through these
//! fixed-width big-endian helpers.

use alloy_primitives::{Address, B256, U256};
use borsh::io::{Read, Result, Write};

pub(crate) fn write_address<W: Write>(writer: &mut W, value: &Address) -> Result<()> {
    writer.write_all(value.as_slice())
}

pub(crate) fn read_address<R: Read>(reader: &mut R) -> Result<Address> {
    let mut buf = [0u8; 20];
    reader.read_exact(&mut buf)?;
    Ok(Address::from(buf))
}

pub(crate) fn write_b256<W: Write>(writer: &mut W, value: &B256) -> Result<()> {
    writer.write_all(value.as_slice())
}

pub(crate) fn read_b256<R: Read>(reader: &mut R) -> Result<B256> {
    let mut buf = [0u8; 32];
    reader.read_exact(&mut buf)?;
    Ok(B256::from(buf))
}

pub(crate) fn write_u256<W: Write>(writer: &mut W, value: &U256) -> Result<()> {
    writer.write_all(&value.to_be_bytes::<32>())
}

pub(crate) fn read_u256<R: Read>(reader: &mut R) -> Result<U256> {
    let mut buf = [0u8; 32];
    reader.read_exact(&mut buf)?;
    Ok(U256::from_be_bytes(buf))
}
