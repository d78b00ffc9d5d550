//! Transactional keyed storage.
//!
//! The host chain supplies the real [`Store`]; [`MemStore`] is the ordered
//! in-memory reference used by tests and single-binary embedders, and
//! [`CacheStore`] is the write overlay that makes one message atomic.

mod cache;
mod mem;

pub use cache::CacheStore;
pub use mem::MemStore;

use crate::error::{PeggyError, Result};
use alloy_primitives::hex;
use borsh::{BorshDeserialize, BorshSerialize};

/// Host-supplied keyed storage.
///
/// Iteration must be in ascending byte order of the keys: the pool's
/// fee index and every replayed scan depend on it. Implementations must be
/// deterministic; hash-ordered maps are not acceptable backings.
pub trait Store {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;
    fn set(&mut self, key: &[u8], value: Vec<u8>);
    fn remove(&mut self, key: &[u8]);
    /// All entries whose key starts with `prefix`, ascending by key.
    fn iter_prefix<'a>(&'a self, prefix: &[u8])
        -> Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + 'a>;

    fn has(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }
}

/// Reads a borsh-encoded record, `None` when the key is absent.
pub fn get_value<T: BorshDeserialize, S: Store + ?Sized>(
    store: &S,
    key: &[u8],
) -> Result<Option<T>> {
    match store.get(key) {
        None => Ok(None),
        Some(bytes) => borsh::from_slice(&bytes).map(Some).map_err(|err| {
            PeggyError::Internal(format!("corrupt record at key {}: {err}", hex::encode(key)))
        }),
    }
}

/// Writes a borsh-encoded record.
pub fn set_value<T: BorshSerialize, S: Store + ?Sized>(
    store: &mut S,
    key: &[u8],
    value: &T,
) -> Result<()> {
    let bytes = borsh::to_vec(value).map_err(|err| PeggyError::Internal(err.to_string()))?;
    store.set(key, bytes);
    Ok(())
}

/// Reads a big-endian u64 counter; absent means zero.
pub fn get_u64<S: Store + ?Sized>(store: &S, key: &[u8]) -> Result<u64> {
    match store.get(key) {
        None => Ok(0),
        Some(bytes) => {
            let raw: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                PeggyError::Internal(format!("corrupt counter at key {}", hex::encode(key)))
            })?;
            Ok(u64::from_be_bytes(raw))
        }
    }
}

/// Writes a big-endian u64 counter.
pub fn set_u64<S: Store + ?Sized>(store: &mut S, key: &[u8], value: u64) {
    store.set(key, value.to_be_bytes().to_vec());
}
