use crate::{
    error::{PeggyError, Result},
    keys,
    store::{self, Store},
};
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// Default cap on the number of transfers packed into one outgoing batch.
pub const OUTGOING_TX_BATCH_SIZE: u64 = 100;

/// Module parameters, fixed at initialization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct PeggyParams {
    /// Domain-separation tag baked into every checkpoint; prevents
    /// cross-bridge signature replay. At most 32 bytes.
    pub peggy_id: String,
    /// How many blocks back validators are still expected to sign valset
    /// checkpoints.
    pub signed_valsets_window: u64,
    /// Voting-power threshold the bootstrap event must declare.
    pub start_threshold: u64,
    /// Cap on transfers per outgoing batch.
    pub batch_size: u64,
}

impl Default for PeggyParams {
    fn default() -> Self {
        Self {
            peggy_id: "peggy".to_owned(),
            signed_valsets_window: 10_000,
            start_threshold: 0,
            batch_size: OUTGOING_TX_BATCH_SIZE,
        }
    }
}

impl PeggyParams {
    pub fn validate(&self) -> Result<()> {
        if self.peggy_id.is_empty() || self.peggy_id.len() > 32 {
            return Err(PeggyError::Internal(format!(
                "peggy id must be 1..=32 bytes, got {}",
                self.peggy_id.len()
            )));
        }
        if self.batch_size == 0 {
            return Err(PeggyError::Internal("batch size must be positive".into()));
        }
        Ok(())
    }
}

/// Installs the module parameters. Called once by the host before the first
/// message; genesis loading itself lives outside the core.
pub fn set_params<S: Store + ?Sized>(store: &mut S, params: &PeggyParams) -> Result<()> {
    params.validate()?;
    store::set_value(store, keys::PARAMS_KEY, params)
}

/// Reads the installed module parameters.
pub fn params<S: Store + ?Sized>(store: &S) -> Result<PeggyParams> {
    store::get_value(store, keys::PARAMS_KEY)?
        .ok_or_else(|| PeggyError::Internal("module parameters not initialized".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemStore;

    #[test]
    fn params_round_trip() -> eyre::Result<()> {
        let mut store = MemStore::new();
        let expected = PeggyParams::default();
        set_params(&mut store, &expected)?;
        assert_eq!(params(&store)?, expected);
        Ok(())
    }

    #[test]
    fn uninitialized_params_error() {
        let store = MemStore::new();
        assert!(matches!(params(&store), Err(PeggyError::Internal(_))));
    }

    #[test]
    fn oversized_peggy_id_is_rejected() {
        let mut store = MemStore::new();
        let params = PeggyParams {
            peggy_id: "x".repeat(33),
            ..Default::default()
        };
        assert!(set_params(&mut store, &params).is_err());
    }
}
