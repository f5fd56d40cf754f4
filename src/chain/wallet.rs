// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Custodial signing wallets.
//!
//! Each user's keypair is derived deterministically from the service-wide
//! wallet secret: `seed = HMAC-SHA256(secret, user_id)`. The same user
//! always derives the same keypair, so nothing key-shaped is ever written
//! to disk. Private keys never leave this module.

use ed25519_dalek::{Signer, SigningKey};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("wallet secret is not usable: {0}")]
    InvalidSecret(String),
}

/// A keypair that can sign on behalf of one user.
pub trait SigningWallet: Send + Sync {
    /// Base58 address of the wallet.
    fn address(&self) -> String;

    /// Raw 32-byte public key.
    fn public_key(&self) -> [u8; 32];

    /// Sign a message, returning the 64-byte signature.
    fn sign_message(&self, message: &[u8]) -> [u8; 64];
}

/// Derives per-user custodial wallets from the service secret.
#[derive(Clone)]
pub struct WalletProvider {
    secret: Vec<u8>,
}

impl WalletProvider {
    pub fn new(secret: &str) -> Result<Self, WalletError> {
        if secret.len() < 32 {
            return Err(WalletError::InvalidSecret(
                "secret must be at least 32 bytes".to_string(),
            ));
        }
        Ok(Self {
            secret: secret.as_bytes().to_vec(),
        })
    }

    /// Derive the wallet for a user.
    pub fn derive(&self, user_id: Uuid) -> Result<DerivedWallet, WalletError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| WalletError::InvalidSecret(e.to_string()))?;
        mac.update(user_id.as_bytes());
        let digest = mac.finalize().into_bytes();

        let mut seed = [0u8; 32];
        seed.copy_from_slice(&digest);
        let key = SigningKey::from_bytes(&seed);

        Ok(DerivedWallet { key })
    }
}

/// A derived custodial wallet. Holds the signing key in memory only.
pub struct DerivedWallet {
    key: SigningKey,
}

impl SigningWallet for DerivedWallet {
    fn address(&self) -> String {
        bs58::encode(self.public_key()).into_string()
    }

    fn public_key(&self) -> [u8; 32] {
        self.key.verifying_key().to_bytes()
    }

    fn sign_message(&self, message: &[u8]) -> [u8; 64] {
        self.key.sign(message).to_bytes()
    }
}
