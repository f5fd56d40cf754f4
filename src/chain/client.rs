// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Solana JSON-RPC client.
//!
//! A thin wrapper over the node's HTTP endpoint covering the handful of
//! methods the unlock flow needs: balance reads, blockhash fetch,
//! transaction submission, and confirmation polling.

use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};

/// Commitment level used for submissions and confirmation checks.
const COMMITMENT: &str = "confirmed";

/// Poll interval while waiting for a signature to confirm.
const CONFIRM_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("RPC transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("unexpected RPC response: {0}")]
    InvalidResponse(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("transaction {signature} failed on chain: {reason}")]
    TransactionFailed { signature: String, reason: String },

    #[error("blockhash expired before transaction {signature} confirmed")]
    BlockhashExpired { signature: String },
}

pub type ChainResult<T> = Result<T, ChainError>;

/// Latest blockhash plus the height after which it is no longer valid.
#[derive(Debug, Clone)]
pub struct LatestBlockhash {
    pub blockhash: String,
    pub last_valid_block_height: u64,
}

/// Solana JSON-RPC client.
#[derive(Clone)]
pub struct ChainClient {
    rpc_url: String,
    http: reqwest::Client,
}

impl ChainClient {
    pub fn new(rpc_url: String) -> Self {
        Self {
            rpc_url,
            http: reqwest::Client::new(),
        }
    }

    async fn call(&self, method: &str, params: Value) -> ChainResult<Value> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response: Value = self
            .http
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        if let Some(error) = response.get("error") {
            #[derive(Deserialize)]
            struct RpcError {
                code: i64,
                message: String,
            }
            let error: RpcError = serde_json::from_value(error.clone())
                .map_err(|e| ChainError::InvalidResponse(e.to_string()))?;
            return Err(ChainError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        response
            .get("result")
            .cloned()
            .ok_or_else(|| ChainError::InvalidResponse(format!("{method}: missing result")))
    }

    /// Balance of an address in lamports.
    pub async fn get_balance(&self, address: &str) -> ChainResult<u64> {
        // Reject garbage before it hits the node.
        let decoded = bs58::decode(address)
            .into_vec()
            .map_err(|e| ChainError::InvalidAddress(e.to_string()))?;
        if decoded.len() != 32 {
            return Err(ChainError::InvalidAddress(format!(
                "expected 32 bytes, got {}",
                decoded.len()
            )));
        }

        let result = self
            .call("getBalance", json!([address, {"commitment": COMMITMENT}]))
            .await?;
        result
            .pointer("/value")
            .and_then(Value::as_u64)
            .ok_or_else(|| ChainError::InvalidResponse("getBalance: missing value".to_string()))
    }

    pub async fn get_latest_blockhash(&self) -> ChainResult<LatestBlockhash> {
        let result = self
            .call("getLatestBlockhash", json!([{"commitment": COMMITMENT}]))
            .await?;

        let blockhash = result
            .pointer("/value/blockhash")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ChainError::InvalidResponse("getLatestBlockhash: missing blockhash".to_string())
            })?
            .to_string();
        let last_valid_block_height = result
            .pointer("/value/lastValidBlockHeight")
            .and_then(Value::as_u64)
            .ok_or_else(|| {
                ChainError::InvalidResponse(
                    "getLatestBlockhash: missing lastValidBlockHeight".to_string(),
                )
            })?;

        Ok(LatestBlockhash {
            blockhash,
            last_valid_block_height,
        })
    }

    pub async fn get_block_height(&self) -> ChainResult<u64> {
        let result = self
            .call("getBlockHeight", json!([{"commitment": COMMITMENT}]))
            .await?;
        result
            .as_u64()
            .ok_or_else(|| ChainError::InvalidResponse("getBlockHeight: not a number".to_string()))
    }

    /// Submit a base64-encoded signed transaction. Returns the signature.
    pub async fn send_transaction(&self, tx_base64: &str) -> ChainResult<String> {
        let result = self
            .call(
                "sendTransaction",
                json!([tx_base64, {"encoding": "base64", "preflightCommitment": COMMITMENT}]),
            )
            .await?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| {
                ChainError::InvalidResponse("sendTransaction: signature not a string".to_string())
            })
    }

    /// What the cluster currently knows about a signature, if anything.
    pub async fn get_signature_status(&self, signature: &str) -> ChainResult<Option<SignatureStatus>> {
        let result = self
            .call(
                "getSignatureStatuses",
                json!([[signature], {"searchTransactionHistory": false}]),
            )
            .await?;

        let status = result.pointer("/value/0").cloned().ok_or_else(|| {
            ChainError::InvalidResponse("getSignatureStatuses: missing value".to_string())
        })?;
        if status.is_null() {
            return Ok(None);
        }

        let confirmation_status = status
            .pointer("/confirmationStatus")
            .and_then(Value::as_str)
            .unwrap_or("processed")
            .to_string();
        let err = status.get("err").filter(|e| !e.is_null()).cloned();

        Ok(Some(SignatureStatus {
            confirmation_status,
            err,
        }))
    }

    /// Wait until `signature` reaches `confirmed`, the transaction fails, or
    /// the blockhash it was built against expires.
    pub async fn confirm_transaction(
        &self,
        signature: &str,
        last_valid_block_height: u64,
    ) -> ChainResult<()> {
        loop {
            if let Some(status) = self.get_signature_status(signature).await? {
                if let Some(err) = status.err {
                    return Err(ChainError::TransactionFailed {
                        signature: signature.to_string(),
                        reason: err.to_string(),
                    });
                }
                if status.confirmation_status == "confirmed"
                    || status.confirmation_status == "finalized"
                {
                    return Ok(());
                }
            }

            if self.get_block_height().await? > last_valid_block_height {
                return Err(ChainError::BlockhashExpired {
                    signature: signature.to_string(),
                });
            }

            tokio::time::sleep(CONFIRM_POLL_INTERVAL).await;
        }
    }
}

#[derive(Debug, Clone)]
pub struct SignatureStatus {
    pub confirmation_status: String,
    pub err: Option<Value>,
}
