//! Canonical checkpoint encodings.
//!
//! These byte layouts are fixed by the external-chain verifier contract and
//! must match it exactly: every word is 32 bytes, ASCII labels are
//! right-padded, addresses are left-padded, integers are big-endian.

use crate::{batch::OutgoingTx, nonce::UInt64Nonce, valset::ValsetMember};
use alloy_primitives::{keccak256, Address, B256, U256};

/// Method name baked into every validator-set checkpoint.
const VALSET_METHOD: &str = "checkpoint";

/// Method name baked into every withdrawal-batch checkpoint.
const BATCH_METHOD: &str = "transactionBatch";

const WORD: usize = 32;

/// Right-pads an ASCII label into a 32-byte word, the way the contract
/// stores `bytes32` constants. Labels longer than 32 bytes are truncated.
fn label32(label: &str) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    let take = label.len().min(WORD);
    word[..take].copy_from_slice(&label.as_bytes()[..take]);
    word
}

fn push_address(buf: &mut Vec<u8>, address: &Address) {
    buf.extend_from_slice(&[0u8; 12]);
    buf.extend_from_slice(address.as_slice());
}

fn push_u64(buf: &mut Vec<u8>, value: u64) {
    buf.extend_from_slice(&[0u8; 24]);
    buf.extend_from_slice(&value.to_be_bytes());
}

fn push_u256(buf: &mut Vec<u8>, value: &U256) {
    buf.extend_from_slice(&value.to_be_bytes::<32>());
}

/// `keccak256(peggyId_32 || "checkpoint"_32 || nonce_32 || addresses_32* || powers_32*)`
pub fn valset_checkpoint(peggy_id: &str, nonce: UInt64Nonce, members: &[ValsetMember]) -> B256 {
    let mut buf = Vec::with_capacity(WORD * (3 + members.len() * 2));
    buf.extend_from_slice(&label32(peggy_id));
    buf.extend_from_slice(&label32(VALSET_METHOD));
    push_u64(&mut buf, nonce.u64());
    for member in members {
        push_address(&mut buf, &member.eth_address);
    }
    for member in members {
        push_u64(&mut buf, member.power);
    }
    keccak256(&buf)
}

/// `keccak256(peggyId_32 || "transactionBatch"_32 || amounts_32* || destinations_32* || fees_32* || batchNonce_32 || tokenContract_32)`
pub fn batch_checkpoint(
    peggy_id: &str,
    token_contract: Address,
    batch_nonce: UInt64Nonce,
    elements: &[OutgoingTx],
) -> B256 {
    let mut buf = Vec::with_capacity(WORD * (4 + elements.len() * 3));
    buf.extend_from_slice(&label32(peggy_id));
    buf.extend_from_slice(&label32(BATCH_METHOD));
    for tx in elements {
        push_u256(&mut buf, &tx.amount.amount);
    }
    for tx in elements {
        push_address(&mut buf, &tx.dest_address);
    }
    for tx in elements {
        push_u256(&mut buf, &tx.bridge_fee.amount);
    }
    push_u64(&mut buf, batch_nonce.u64());
    push_address(&mut buf, &token_contract);
    keccak256(&buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{address::AccountId, token::Erc20Token};

    #[test]
    fn label32_right_pads() {
        let word = label32("peggy");
        assert_eq!(&word[..5], b"peggy");
        assert_eq!(&word[5..], &[0u8; 27]);
    }

    #[test]
    fn valset_checkpoint_matches_manual_layout() {
        let members = [
            ValsetMember {
                eth_address: Address::repeat_byte(0x11),
                power: 3000,
            },
            ValsetMember {
                eth_address: Address::repeat_byte(0x22),
                power: 1000,
            },
        ];
        let checkpoint = valset_checkpoint("peggy", UInt64Nonce::new(7), &members);

        let mut expected = Vec::new();
        expected.extend_from_slice(&label32("peggy"));
        expected.extend_from_slice(&label32("checkpoint"));
        expected.extend_from_slice(&[0u8; 24]);
        expected.extend_from_slice(&7u64.to_be_bytes());
        for member in &members {
            expected.extend_from_slice(&[0u8; 12]);
            expected.extend_from_slice(member.eth_address.as_slice());
        }
        for member in &members {
            expected.extend_from_slice(&[0u8; 24]);
            expected.extend_from_slice(&member.power.to_be_bytes());
        }
        assert_eq!(checkpoint, keccak256(&expected));
    }

    #[test]
    fn checkpoints_are_domain_separated() {
        let valset = valset_checkpoint("peggy", UInt64Nonce::new(1), &[]);
        let batch = batch_checkpoint("peggy", Address::ZERO, UInt64Nonce::new(1), &[]);
        assert_ne!(valset, batch);

        let other_bridge = valset_checkpoint("not-peggy", UInt64Nonce::new(1), &[]);
        assert_ne!(valset, other_bridge);
    }

    #[test]
    fn batch_checkpoint_covers_every_element_field() {
        let contract = Address::repeat_byte(0xEE);
        let tx = |id: u64, amount: u64, fee: u64| OutgoingTx {
            id,
            sender: AccountId::new(&b"sender"[..]),
            dest_address: Address::repeat_byte(id as u8),
            amount: Erc20Token::new(contract, U256::from(amount)),
            bridge_fee: Erc20Token::new(contract, U256::from(fee)),
        };
        let base = vec![tx(1, 100, 2), tx(2, 101, 3)];
        let checkpoint = batch_checkpoint("peggy", contract, UInt64Nonce::new(1), &base);

        let mut fee_changed = base.clone();
        fee_changed[1].bridge_fee.amount = U256::from(4u64);
        assert_ne!(
            checkpoint,
            batch_checkpoint("peggy", contract, UInt64Nonce::new(1), &fee_changed)
        );

        let mut dest_changed = base.clone();
        dest_changed[0].dest_address = Address::repeat_byte(0x99);
        assert_ne!(
            checkpoint,
            batch_checkpoint("peggy", contract, UInt64Nonce::new(1), &dest_changed)
        );

        assert_ne!(
            checkpoint,
            batch_checkpoint("peggy", contract, UInt64Nonce::new(2), &base)
        );
    }
}
