// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The unlock flow: pay a creator's price once to open messaging.
//!
//! Order of operations matters here. Everything that can fail without
//! money moving is checked first; the payment is sent only after the
//! creator is known, the pair is not yet connected, and the balance
//! covers price plus fee. The connection row is written only after the
//! transfer confirms, and a write conflict at that point means another
//! request for the same pair won the race, which callers treat as
//! already-connected rather than as a failure.

use tracing::{info, warn};
use uuid::Uuid;

use crate::chain::{build_transfer, ChainError, SigningWallet, TxError, WalletError};
use crate::events::AppEvent;
use crate::state::AppState;
use crate::storage::{StoreError, StoredConnection, StoredUserProfile};

/// Flat fee reserve on top of the price, in lamports.
const FEE_RESERVE_LAMPORTS: u64 = 5_000;

#[derive(Debug, thiserror::Error)]
pub enum UnlockError {
    #[error("creator not found")]
    CreatorNotFound,

    #[error("cannot unlock your own creator profile")]
    SelfUnlock,

    #[error("creator has no payout wallet configured")]
    CreatorNotPayable,

    #[error("creator price is not positive")]
    InvalidPrice,

    #[error("insufficient funds: need {required} lamports, have {available}")]
    InsufficientFunds { required: u64, available: u64 },

    #[error("token wallet does not match the custodial wallet")]
    WalletMismatch,

    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error(transparent)]
    Tx(#[from] TxError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Storage(#[from] StoreError),

    /// The payment confirmed on chain but the connection row could not be
    /// written. The signature is the caller's proof of payment.
    #[error("payment {signature} confirmed but recording the connection failed: {source}")]
    RecordingFailed {
        signature: String,
        source: StoreError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnlockStatus {
    /// Payment sent, confirmed, and recorded.
    Connected,
    /// The pair was already connected; no payment was attempted, or a
    /// concurrent unlock recorded the row first.
    AlreadyConnected,
}

#[derive(Debug, Clone)]
pub struct UnlockOutcome {
    pub status: UnlockStatus,
    /// Signature of the payment this call made, if it made one.
    pub signature: Option<String>,
    pub amount_lamports: u64,
}

/// Run the unlock flow for `user` against `creator_id`.
///
/// `claimed_address` is the wallet address from the caller's token; it
/// must match the custodial wallet this service derives for the user.
pub async fn unlock_creator(
    state: &AppState,
    user: &StoredUserProfile,
    claimed_address: &str,
    creator_id: Uuid,
) -> Result<UnlockOutcome, UnlockError> {
    let creator = match state.creators.get(creator_id) {
        Ok(creator) => creator,
        Err(StoreError::NotFound(_)) => return Err(UnlockError::CreatorNotFound),
        Err(e) => return Err(e.into()),
    };

    if creator.user_id == user.id {
        return Err(UnlockError::SelfUnlock);
    }
    if creator.wallet_address.trim().is_empty() {
        return Err(UnlockError::CreatorNotPayable);
    }
    if creator.price_lamports == 0 {
        return Err(UnlockError::InvalidPrice);
    }

    // Idempotency short-circuit: a connected pair never pays twice.
    if state.connections.exists(user.id, creator.id)? {
        return Ok(UnlockOutcome {
            status: UnlockStatus::AlreadyConnected,
            signature: None,
            amount_lamports: creator.price_lamports,
        });
    }

    let wallet = state.wallets.derive(user.id)?;
    if wallet.address() != claimed_address {
        return Err(UnlockError::WalletMismatch);
    }

    let required = creator
        .price_lamports
        .saturating_add(FEE_RESERVE_LAMPORTS);
    let available = state.chain.get_balance(&wallet.address()).await?;
    if available < required {
        return Err(UnlockError::InsufficientFunds {
            required,
            available,
        });
    }

    let blockhash = state.chain.get_latest_blockhash().await?;
    let tx = build_transfer(
        &wallet,
        &creator.wallet_address,
        creator.price_lamports,
        &blockhash.blockhash,
    )?;

    let signature = state.chain.send_transaction(&tx).await?;
    info!(
        user_id = %user.id,
        creator_id = %creator.id,
        signature = %signature,
        lamports = creator.price_lamports,
        "unlock payment submitted, awaiting confirmation"
    );

    if let Err(e) = state
        .chain
        .confirm_transaction(&signature, blockhash.last_valid_block_height)
        .await
    {
        warn!(signature = %signature, error = %e, "unlock payment did not confirm");
        return Err(e.into());
    }
    info!(signature = %signature, "unlock payment confirmed");

    let connection = StoredConnection {
        user_id: user.id,
        creator_id: creator.id,
        amount_lamports: creator.price_lamports,
        transaction_signature: signature.clone(),
        created_at: chrono::Utc::now(),
    };

    match state.connections.insert(&connection) {
        Ok(()) => {
            state.events.publish(AppEvent::connection_created(&connection));
            Ok(UnlockOutcome {
                status: UnlockStatus::Connected,
                signature: Some(signature),
                amount_lamports: creator.price_lamports,
            })
        }
        // A concurrent unlock for the same pair recorded its row first.
        Err(StoreError::AlreadyExists(_)) => {
            warn!(
                user_id = %user.id,
                creator_id = %creator.id,
                signature = %signature,
                "connection already recorded by a concurrent unlock"
            );
            Ok(UnlockOutcome {
                status: UnlockStatus::AlreadyConnected,
                signature: Some(signature),
                amount_lamports: creator.price_lamports,
            })
        }
        Err(source) => Err(UnlockError::RecordingFailed { signature, source }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::{routing::post, Json, Router};
    use chrono::Utc;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    use crate::chain::ChainClient;
    use crate::storage::repository::creators::NewCreatorProfile;

    fn setup() -> (TempDir, AppState) {
        let dir = TempDir::new().unwrap();
        let state = AppState::for_tests(dir.path());
        (dir, state)
    }

    fn creator_for(state: &AppState, owner: Uuid) -> crate::storage::StoredCreatorProfile {
        creator_with(state, owner, &payout_address(), 50_000_000)
    }

    fn creator_with(
        state: &AppState,
        owner: Uuid,
        payout: &str,
        price_lamports: u64,
    ) -> crate::storage::StoredCreatorProfile {
        state
            .creators
            .create(NewCreatorProfile {
                user_id: owner,
                username: "stella".to_string(),
                display_name: "Stella".to_string(),
                bio: None,
                category: "art".to_string(),
                avatar_url: None,
                wallet_address: payout.to_string(),
                price_lamports,
            })
            .unwrap()
    }

    fn payout_address() -> String {
        bs58::encode([7u8; 32]).into_string()
    }

    /// Canned JSON-RPC node. Counts `sendTransaction` calls and can mark
    /// every submitted signature as failed on chain. `on_send` runs once
    /// when the first transaction is submitted, for injecting side effects
    /// mid-flow.
    struct RpcStub {
        balance: u64,
        fail_on_chain: bool,
        sends: AtomicUsize,
        on_send: std::sync::Mutex<Option<Box<dyn FnOnce() + Send>>>,
    }

    impl RpcStub {
        fn new(balance: u64, fail_on_chain: bool) -> Arc<Self> {
            Arc::new(Self {
                balance,
                fail_on_chain,
                sends: AtomicUsize::new(0),
                on_send: std::sync::Mutex::new(None),
            })
        }
    }

    async fn spawn_rpc(stub: Arc<RpcStub>) -> String {
        let handler = move |Json(request): Json<Value>| {
            let stub = stub.clone();
            async move {
                let result = match request["method"].as_str().unwrap_or_default() {
                    "getBalance" => json!({"context": {"slot": 1}, "value": stub.balance}),
                    "getLatestBlockhash" => json!({
                        "context": {"slot": 1},
                        "value": {
                            "blockhash": bs58::encode([1u8; 32]).into_string(),
                            "lastValidBlockHeight": 1_000u64,
                        }
                    }),
                    "sendTransaction" => {
                        stub.sends.fetch_add(1, Ordering::SeqCst);
                        if let Some(hook) = stub.on_send.lock().unwrap().take() {
                            hook();
                        }
                        json!("StubSignature1111")
                    }
                    "getSignatureStatuses" => {
                        let err = if stub.fail_on_chain {
                            json!({"InstructionError": [0, {"Custom": 1}]})
                        } else {
                            Value::Null
                        };
                        json!({
                            "context": {"slot": 1},
                            "value": [{"slot": 1, "confirmationStatus": "confirmed", "err": err}]
                        })
                    }
                    "getBlockHeight" => json!(10u64),
                    _ => Value::Null,
                };
                Json(json!({"jsonrpc": "2.0", "id": 1, "result": result}))
            }
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, Router::new().route("/", post(handler)))
                .await
                .unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn unknown_creator_is_rejected_before_any_payment() {
        let (_dir, state) = setup();
        let user = state.users.get_or_create("alice@example.com").unwrap();

        let err = unlock_creator(&state, &user, "addr", Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, UnlockError::CreatorNotFound));
    }

    #[tokio::test]
    async fn unlocking_your_own_profile_is_rejected() {
        let (_dir, state) = setup();
        let user = state.users.get_or_create("alice@example.com").unwrap();
        let creator = creator_for(&state, user.id);

        let err = unlock_creator(&state, &user, "addr", creator.id)
            .await
            .unwrap_err();
        assert!(matches!(err, UnlockError::SelfUnlock));
    }

    #[tokio::test]
    async fn connected_pairs_short_circuit_without_touching_the_chain() {
        let (_dir, state) = setup();
        let user = state.users.get_or_create("alice@example.com").unwrap();
        let creator = creator_for(&state, Uuid::new_v4());

        state
            .connections
            .insert(&StoredConnection {
                user_id: user.id,
                creator_id: creator.id,
                amount_lamports: creator.price_lamports,
                transaction_signature: "sig-earlier".to_string(),
                created_at: Utc::now(),
            })
            .unwrap();

        // The test RPC endpoint is unreachable, so reaching the chain
        // would fail; the short-circuit must come first.
        let outcome = unlock_creator(&state, &user, "addr", creator.id)
            .await
            .unwrap();
        assert_eq!(outcome.status, UnlockStatus::AlreadyConnected);
        assert!(outcome.signature.is_none());
    }

    #[tokio::test]
    async fn mismatched_wallet_claims_are_rejected() {
        let (_dir, state) = setup();
        let user = state.users.get_or_create("alice@example.com").unwrap();
        let creator = creator_for(&state, Uuid::new_v4());

        let err = unlock_creator(&state, &user, "not-the-derived-address", creator.id)
            .await
            .unwrap_err();
        assert!(matches!(err, UnlockError::WalletMismatch));
    }

    #[tokio::test]
    async fn a_creator_without_a_payout_wallet_is_rejected() {
        let (_dir, state) = setup();
        let user = state.users.get_or_create("alice@example.com").unwrap();
        let creator = creator_with(&state, Uuid::new_v4(), "", 50_000_000);

        let err = unlock_creator(&state, &user, "addr", creator.id)
            .await
            .unwrap_err();
        assert!(matches!(err, UnlockError::CreatorNotPayable));
    }

    #[tokio::test]
    async fn a_zero_price_is_rejected() {
        let (_dir, state) = setup();
        let user = state.users.get_or_create("alice@example.com").unwrap();
        let creator = creator_with(&state, Uuid::new_v4(), &payout_address(), 0);

        let err = unlock_creator(&state, &user, "addr", creator.id)
            .await
            .unwrap_err();
        assert!(matches!(err, UnlockError::InvalidPrice));
    }

    #[tokio::test]
    async fn a_successful_payment_records_the_connection() {
        let (_dir, mut state) = setup();
        let stub = RpcStub::new(100_000_000, false);
        state.chain = ChainClient::new(spawn_rpc(stub.clone()).await);

        let user = state.users.get_or_create("alice@example.com").unwrap();
        let creator = creator_for(&state, Uuid::new_v4());
        let address = state.wallets.derive(user.id).unwrap().address();

        let outcome = unlock_creator(&state, &user, &address, creator.id)
            .await
            .unwrap();

        assert_eq!(outcome.status, UnlockStatus::Connected);
        assert_eq!(outcome.signature.as_deref(), Some("StubSignature1111"));
        assert_eq!(outcome.amount_lamports, 50_000_000);
        assert_eq!(stub.sends.load(Ordering::SeqCst), 1);

        let row = state
            .connections
            .get(user.id, creator.id)
            .unwrap()
            .unwrap();
        assert_eq!(row.amount_lamports, 50_000_000);
        assert_eq!(row.transaction_signature, "StubSignature1111");
    }

    #[tokio::test]
    async fn a_second_unlock_never_pays_twice() {
        let (_dir, mut state) = setup();
        let stub = RpcStub::new(100_000_000, false);
        state.chain = ChainClient::new(spawn_rpc(stub.clone()).await);

        let user = state.users.get_or_create("alice@example.com").unwrap();
        let creator = creator_for(&state, Uuid::new_v4());
        let address = state.wallets.derive(user.id).unwrap().address();

        let first = unlock_creator(&state, &user, &address, creator.id)
            .await
            .unwrap();
        assert_eq!(first.status, UnlockStatus::Connected);

        let second = unlock_creator(&state, &user, &address, creator.id)
            .await
            .unwrap();
        assert_eq!(second.status, UnlockStatus::AlreadyConnected);
        assert!(second.signature.is_none());
        assert_eq!(stub.sends.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn losing_the_insert_race_reports_already_connected() {
        let (_dir, mut state) = setup();
        let user = state.users.get_or_create("alice@example.com").unwrap();
        let creator = creator_for(&state, Uuid::new_v4());

        // A rival unlock for the same pair lands its row while this one's
        // payment is in flight, after the pre-check but before the insert.
        let stub = RpcStub::new(100_000_000, false);
        {
            let connections = state.connections.clone();
            let (user_id, creator_id) = (user.id, creator.id);
            *stub.on_send.lock().unwrap() = Some(Box::new(move || {
                connections
                    .insert(&StoredConnection {
                        user_id,
                        creator_id,
                        amount_lamports: 50_000_000,
                        transaction_signature: "sig-rival".to_string(),
                        created_at: Utc::now(),
                    })
                    .unwrap();
            }));
        }
        state.chain = ChainClient::new(spawn_rpc(stub.clone()).await);
        let address = state.wallets.derive(user.id).unwrap().address();

        let outcome = unlock_creator(&state, &user, &address, creator.id)
            .await
            .unwrap();

        assert_eq!(outcome.status, UnlockStatus::AlreadyConnected);
        // This attempt did pay; the signature stays with the caller as
        // proof even though the rival's row won.
        assert_eq!(outcome.signature.as_deref(), Some("StubSignature1111"));
        assert_eq!(stub.sends.load(Ordering::SeqCst), 1);

        let row = state
            .connections
            .get(user.id, creator.id)
            .unwrap()
            .unwrap();
        assert_eq!(row.transaction_signature, "sig-rival");
    }

    #[tokio::test]
    async fn an_on_chain_failure_leaves_no_connection() {
        let (_dir, mut state) = setup();
        let stub = RpcStub::new(100_000_000, true);
        state.chain = ChainClient::new(spawn_rpc(stub.clone()).await);

        let user = state.users.get_or_create("alice@example.com").unwrap();
        let creator = creator_for(&state, Uuid::new_v4());
        let address = state.wallets.derive(user.id).unwrap().address();

        let err = unlock_creator(&state, &user, &address, creator.id)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            UnlockError::Chain(ChainError::TransactionFailed { .. })
        ));
        assert!(state
            .connections
            .get(user.id, creator.id)
            .unwrap()
            .is_none());
        assert_eq!(stub.sends.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn a_short_balance_is_rejected_before_sending() {
        let (_dir, mut state) = setup();
        // Exactly the price, missing the fee reserve.
        let stub = RpcStub::new(50_000_000, false);
        state.chain = ChainClient::new(spawn_rpc(stub.clone()).await);

        let user = state.users.get_or_create("alice@example.com").unwrap();
        let creator = creator_for(&state, Uuid::new_v4());
        let address = state.wallets.derive(user.id).unwrap().address();

        let err = unlock_creator(&state, &user, &address, creator.id)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            UnlockError::InsufficientFunds {
                required: 50_005_000,
                available: 50_000_000,
            }
        ));
        assert_eq!(stub.sends.load(Ordering::SeqCst), 0);
    }
}
