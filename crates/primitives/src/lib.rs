//! Peggy bridge primitives.
//!
//! Host-independent data model shared by the consensus core and any adapter
//! that needs to speak the bridge's wire formats:
//!
//! - **nonce**: the monotonic 64-bit event/object nonce
//! - **address**: opaque domestic account and validator identifiers
//! - **token**: bridged token references, voucher denominations, coins
//! - **valset**: validator-set snapshots
//! - **batch**: outgoing transfers and withdrawal batches
//! - **claim**: the six-variant sum type of attested external events
//! - **attestation**: aggregated claims and their lifecycle
//! - **checkpoint**: the canonical byte encodings the external contract
//!   verifies signatures against
//! - **signature**: Ethereum recoverable-signature verification
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

pub mod address;
pub mod attestation;
pub mod batch;
pub mod checkpoint;
pub mod claim;
pub(crate) mod codec;
pub mod nonce;
pub mod signature;
pub mod token;
pub mod valset;

pub use address::{AccountId, ValidatorId};
pub use attestation::{Attestation, AttestationStatus};
pub use batch::{BatchStatus, OutgoingTx, OutgoingTxBatch};
pub use checkpoint::{batch_checkpoint, valset_checkpoint};
pub use claim::{
    BootstrapClaim, ClaimType, DepositClaim, EthereumClaim, MultiSigUpdateClaim,
    SignedCheckpointClaim, WithdrawalBatchClaim,
};
pub use nonce::UInt64Nonce;
pub use signature::{
    proof_of_possession_digest, verify_eth_signature, ConfirmSignature, SignatureError,
    ETH_SIGNATURE_LEN,
};
pub use token::{
    parse_voucher_denom, voucher_denom, Coin, Erc20Token, TokenRef, VOUCHER_DENOM_PREFIX,
};
pub use valset::{Valset, ValsetError, ValsetMember};
