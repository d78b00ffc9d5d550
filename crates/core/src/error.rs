use alloy_primitives::Address;
use peggy_primitives::{SignatureError, UInt64Nonce};

/// Error vocabulary of the bridge core.
///
/// The set is closed: the host maps each kind to a user-visible code via
/// [`PeggyError::kind`]. Downstream failures (bank, staking) are wrapped
/// with context but keep their kind; nothing is swallowed or retried.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PeggyError {
    #[error("invalid signature: {0}")]
    InvalidSignature(#[from] SignatureError),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid denom: {0}")]
    InvalidDenom(String),

    #[error("unknown denom: {0}")]
    UnknownDenom(String),

    #[error("unknown validator: {0}")]
    UnknownValidator(String),

    #[error("unknown orchestrator: {0}")]
    UnknownOrchestrator(String),

    #[error("unknown valset: nonce {0}")]
    UnknownValset(UInt64Nonce),

    #[error("unknown batch: token {token_contract}, nonce {nonce}")]
    UnknownBatch {
        token_contract: Address,
        nonce: UInt64Nonce,
    },

    #[error("no eth address bound for validator {0}")]
    EthAddressMissing(String),

    #[error("duplicate: {0}")]
    Duplicate(String),

    #[error("non-contiguous nonce: got {got}, expected {expected}")]
    NonContiguousNonce {
        got: UInt64Nonce,
        expected: UInt64Nonce,
    },

    #[error("invalid bootstrap: {0}")]
    InvalidBootstrap(String),

    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("empty pool for token {0}")]
    EmptyPool(Address),

    #[error("internal: {0}")]
    Internal(String),
}

impl PeggyError {
    /// Stable kind string the host maps to its error-code space.
    pub const fn kind(&self) -> &'static str {
        match self {
            PeggyError::InvalidSignature(_) => "invalid_signature",
            PeggyError::InvalidAmount(_) => "invalid_amount",
            PeggyError::InvalidDenom(_) => "invalid_denom",
            PeggyError::UnknownDenom(_) => "unknown_denom",
            PeggyError::UnknownValidator(_) => "unknown_validator",
            PeggyError::UnknownOrchestrator(_) => "unknown_orchestrator",
            PeggyError::UnknownValset(_) => "unknown_valset",
            PeggyError::UnknownBatch { .. } => "unknown_batch",
            PeggyError::EthAddressMissing(_) => "eth_address_missing",
            PeggyError::Duplicate(_) => "duplicate",
            PeggyError::NonContiguousNonce { .. } => "non_contiguous_nonce",
            PeggyError::InvalidBootstrap(_) => "invalid_bootstrap",
            PeggyError::InsufficientFunds(_) => "insufficient_funds",
            PeggyError::EmptyPool(_) => "empty_pool",
            PeggyError::Internal(_) => "internal",
        }
    }
}

pub type Result<T> = std::result::Result<T, PeggyError>;
