use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A monotonically advancing 64-bit nonce, scoped per event stream.
///
/// Zero is reserved as "unset": a stream that has never observed an event
/// reports nonce zero, and the first valid event carries nonce one.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
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
#[serde(transparent)]
pub struct UInt64Nonce(u64);

impl UInt64Nonce {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn zero() -> Self {
        Self(0)
    }

    /// True for the reserved "unset" value.
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub const fn u64(&self) -> u64 {
        self.0
    }

    /// The next nonce in the stream.
    pub const fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }

    pub const fn to_be_bytes(&self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    pub const fn from_be_bytes(bytes: [u8; 8]) -> Self {
        Self(u64::from_be_bytes(bytes))
    }
}

impl From<u64> for UInt64Nonce {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for UInt64Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
