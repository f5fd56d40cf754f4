// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Legacy transfer transaction construction.
//!
//! Builds the wire form of a single-signer system-program transfer:
//! message header, account keys, recent blockhash, one transfer
//! instruction, then the payer's signature over the serialized message.
//! The result is base64 for `sendTransaction`.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use super::wallet::SigningWallet;

/// System program id (all zeros; base58 `11111111111111111111111111111111`).
const SYSTEM_PROGRAM: [u8; 32] = [0u8; 32];

/// Instruction tag for SystemInstruction::Transfer.
const TRANSFER_TAG: u32 = 2;

#[derive(Debug, thiserror::Error)]
pub enum TxError {
    #[error("invalid recipient address: {0}")]
    InvalidRecipient(String),

    #[error("invalid blockhash: {0}")]
    InvalidBlockhash(String),
}

/// Build and sign a transfer of `lamports` from `wallet` to `recipient`.
pub fn build_transfer(
    wallet: &dyn SigningWallet,
    recipient: &str,
    lamports: u64,
    recent_blockhash: &str,
) -> Result<String, TxError> {
    let recipient_key = decode_key(recipient).map_err(TxError::InvalidRecipient)?;
    let blockhash = decode_key(recent_blockhash).map_err(TxError::InvalidBlockhash)?;
    let payer_key = wallet.public_key();

    // Account keys in order: payer (writable signer), recipient (writable),
    // system program (readonly). A self-transfer collapses payer and
    // recipient into one entry.
    let self_transfer = recipient_key == payer_key;
    let mut accounts: Vec<[u8; 32]> = vec![payer_key];
    let recipient_index: u8 = if self_transfer {
        0
    } else {
        accounts.push(recipient_key);
        1
    };
    accounts.push(SYSTEM_PROGRAM);
    let program_index = (accounts.len() - 1) as u8;

    let mut message = Vec::with_capacity(3 + 1 + accounts.len() * 32 + 32 + 16);

    // Header: one required signature, no readonly signed accounts, one
    // readonly unsigned account (the system program).
    message.push(1);
    message.push(0);
    message.push(1);

    encode_compact_u16(accounts.len() as u16, &mut message);
    for key in &accounts {
        message.extend_from_slice(key);
    }

    message.extend_from_slice(&blockhash);

    // One instruction: system-program transfer.
    encode_compact_u16(1, &mut message);
    message.push(program_index);
    encode_compact_u16(2, &mut message);
    message.push(0);
    message.push(recipient_index);

    let mut data = Vec::with_capacity(12);
    data.extend_from_slice(&TRANSFER_TAG.to_le_bytes());
    data.extend_from_slice(&lamports.to_le_bytes());
    encode_compact_u16(data.len() as u16, &mut message);
    message.extend_from_slice(&data);

    let signature = wallet.sign_message(&message);

    let mut tx = Vec::with_capacity(1 + 64 + message.len());
    encode_compact_u16(1, &mut tx);
    tx.extend_from_slice(&signature);
    tx.extend_from_slice(&message);

    Ok(BASE64.encode(tx))
}

fn decode_key(encoded: &str) -> Result<[u8; 32], String> {
    let bytes = bs58::decode(encoded)
        .into_vec()
        .map_err(|e| e.to_string())?;
    let key: [u8; 32] = bytes
        .try_into()
        .map_err(|v: Vec<u8>| format!("expected 32 bytes, got {}", v.len()))?;
    Ok(key)
}

/// Shortvec length encoding: 7 bits per byte, high bit marks continuation.
fn encode_compact_u16(mut value: u16, out: &mut Vec<u8>) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::wallet::WalletProvider;
    use ed25519_dalek::{Signature, Verifier, VerifyingKey};
    use uuid::Uuid;

    const BLOCKHASH: &str = "EETubP5AKHgjPAhzPAFcb8BAY1hMH639CWCFTqi3hq1k";

    fn wallet() -> impl SigningWallet {
        WalletProvider::new("test-wallet-secret-0123456789abcdef")
            .unwrap()
            .derive(Uuid::new_v4())
            .unwrap()
    }

    fn recipient_address() -> String {
        WalletProvider::new("test-wallet-secret-0123456789abcdef")
            .unwrap()
            .derive(Uuid::new_v4())
            .unwrap()
            .address()
    }

    #[test]
    fn compact_u16_matches_shortvec_encoding() {
        let cases: &[(u16, &[u8])] = &[
            (0, &[0x00]),
            (1, &[0x01]),
            (127, &[0x7f]),
            (128, &[0x80, 0x01]),
            (16384, &[0x80, 0x80, 0x01]),
        ];
        for (value, expected) in cases {
            let mut out = Vec::new();
            encode_compact_u16(*value, &mut out);
            assert_eq!(out.as_slice(), *expected, "value {value}");
        }
    }

    #[test]
    fn transfer_has_expected_wire_layout() {
        let wallet = wallet();
        let tx = build_transfer(&wallet, &recipient_address(), 50_000_000, BLOCKHASH).unwrap();
        let raw = BASE64.decode(tx).unwrap();

        // One signature, then the message.
        assert_eq!(raw[0], 1);
        let message = &raw[65..];

        // Header and three account keys.
        assert_eq!(&message[..3], &[1, 0, 1]);
        assert_eq!(message[3], 3);
        assert_eq!(&message[4..36], wallet.public_key().as_slice());
        assert_eq!(&message[68..100], SYSTEM_PROGRAM.as_slice());

        // Instruction data: transfer tag then lamports, little-endian.
        let data = &message[message.len() - 12..];
        assert_eq!(&data[..4], &2u32.to_le_bytes());
        assert_eq!(&data[4..], &50_000_000u64.to_le_bytes());
    }

    #[test]
    fn signature_verifies_over_the_message() {
        let wallet = wallet();
        let tx = build_transfer(&wallet, &recipient_address(), 1_000, BLOCKHASH).unwrap();
        let raw = BASE64.decode(tx).unwrap();

        let signature = Signature::from_bytes(raw[1..65].try_into().unwrap());
        let verifying = VerifyingKey::from_bytes(&wallet.public_key()).unwrap();
        verifying.verify(&raw[65..], &signature).unwrap();
    }

    #[test]
    fn self_transfer_deduplicates_accounts() {
        let wallet = wallet();
        let tx = build_transfer(&wallet, &wallet.address(), 1_000, BLOCKHASH).unwrap();
        let raw = BASE64.decode(tx).unwrap();
        let message = &raw[65..];

        // Only payer and system program remain.
        assert_eq!(message[3], 2);
        assert_eq!(&message[36..68], SYSTEM_PROGRAM.as_slice());
    }

    #[test]
    fn bad_inputs_are_rejected() {
        let wallet = wallet();
        assert!(matches!(
            build_transfer(&wallet, "nonsense!", 1, BLOCKHASH),
            Err(TxError::InvalidRecipient(_))
        ));
        assert!(matches!(
            build_transfer(&wallet, &recipient_address(), 1, "bad hash"),
            Err(TxError::InvalidBlockhash(_))
        ));
    }
}
