// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The unlock endpoint.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::identity::resolve_profile;
use crate::auth::WalletAuth;
use crate::chain::format_amount;
use crate::error::ApiError;
use crate::state::AppState;
use crate::unlock::{unlock_creator, UnlockError, UnlockStatus};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UnlockResponseStatus {
    Connected,
    AlreadyConnected,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UnlockResponse {
    pub status: UnlockResponseStatus,
    /// Signature of the payment this request made, if it made one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    pub amount: String,
    pub amount_lamports: u64,
}

impl From<UnlockError> for ApiError {
    fn from(err: UnlockError) -> Self {
        match err {
            UnlockError::CreatorNotFound => ApiError::not_found("Creator not found"),
            UnlockError::SelfUnlock => {
                ApiError::bad_request("You cannot unlock your own creator profile")
            }
            UnlockError::CreatorNotPayable => {
                ApiError::unprocessable("This creator has no payout wallet configured")
            }
            UnlockError::InvalidPrice => {
                ApiError::unprocessable("This creator's unlock price is not payable")
            }
            UnlockError::InsufficientFunds {
                required,
                available,
            } => ApiError::new(
                StatusCode::PAYMENT_REQUIRED,
                format!(
                    "Insufficient funds: need {} but the wallet holds {}",
                    format_amount(required),
                    format_amount(available)
                ),
            ),
            UnlockError::WalletMismatch => {
                ApiError::forbidden("Token wallet does not match the account wallet")
            }
            UnlockError::Wallet(e) => e.into(),
            UnlockError::Tx(e) => ApiError::bad_request(e.to_string()),
            UnlockError::Chain(e) => e.into(),
            UnlockError::Storage(e) => e.into(),
            UnlockError::RecordingFailed { signature, source } => {
                tracing::error!(
                    signature = %signature,
                    error = %source,
                    "confirmed payment could not be recorded"
                );
                ApiError::internal(format!(
                    "Payment {signature} confirmed but the connection could not be recorded; \
                     keep the signature as proof of payment"
                ))
            }
        }
    }
}

/// Pay a creator's unlock price and open messaging with them.
#[utoipa::path(
    post,
    path = "/v1/creators/{creator_id}/unlock",
    tag = "Unlock",
    params(("creator_id" = Uuid, Path, description = "Creator to unlock")),
    responses(
        (status = 200, description = "Connected, or already connected", body = UnlockResponse),
        (status = 402, description = "Insufficient funds"),
        (status = 403, description = "No wallet on the account"),
        (status = 404, description = "No such creator"),
        (status = 422, description = "Creator is missing a payout wallet or a payable price")
    )
)]
pub async fn unlock(
    State(state): State<AppState>,
    auth: WalletAuth,
    Path(creator_id): Path<Uuid>,
) -> Result<Json<UnlockResponse>, ApiError> {
    let profile = resolve_profile(&state, &auth.0)?;
    let claimed_address = auth.wallet_address().to_string();

    let outcome = unlock_creator(&state, &profile, &claimed_address, creator_id).await?;

    Ok(Json(UnlockResponse {
        status: match outcome.status {
            UnlockStatus::Connected => UnlockResponseStatus::Connected,
            UnlockStatus::AlreadyConnected => UnlockResponseStatus::AlreadyConnected,
        },
        signature: outcome.signature,
        amount: format_amount(outcome.amount_lamports),
        amount_lamports: outcome.amount_lamports,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthenticatedUser;
    use crate::storage::repository::creators::NewCreatorProfile;
    use crate::storage::StoredConnection;
    use chrono::Utc;
    use tempfile::TempDir;

    fn setup() -> (TempDir, AppState) {
        let dir = TempDir::new().unwrap();
        let state = AppState::for_tests(dir.path());
        (dir, state)
    }

    fn wallet_auth(email: &str, address: &str) -> WalletAuth {
        WalletAuth(AuthenticatedUser {
            subject: "user_123".to_string(),
            email: email.to_string(),
            name: None,
            picture: None,
            wallet_address: Some(address.to_string()),
            issuer: "test".to_string(),
            expires_at: 0,
        })
    }

    #[tokio::test]
    async fn unknown_creator_maps_to_404() {
        let (_dir, state) = setup();

        let err = unlock(
            State(state.clone()),
            wallet_auth("alice@example.com", "So1Addr111"),
            Path(Uuid::new_v4()),
        )
        .await
        .unwrap_err();

        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn already_connected_pairs_return_without_paying() {
        let (_dir, state) = setup();
        let user = state.users.get_or_create("alice@example.com").unwrap();
        let creator = state
            .creators
            .create(NewCreatorProfile {
                user_id: Uuid::new_v4(),
                username: "stella".to_string(),
                display_name: "Stella".to_string(),
                bio: None,
                category: "art".to_string(),
                avatar_url: None,
                wallet_address: "CreatorPayoutAddr".to_string(),
                price_lamports: 50_000_000,
            })
            .unwrap();
        state
            .connections
            .insert(&StoredConnection {
                user_id: user.id,
                creator_id: creator.id,
                amount_lamports: 50_000_000,
                transaction_signature: "sig-prior".to_string(),
                created_at: Utc::now(),
            })
            .unwrap();

        let Json(response) = unlock(
            State(state.clone()),
            wallet_auth("alice@example.com", "ignored"),
            Path(creator.id),
        )
        .await
        .unwrap();

        assert!(matches!(
            response.status,
            UnlockResponseStatus::AlreadyConnected
        ));
        assert!(response.signature.is_none());
        assert_eq!(response.amount, "0.05");
    }

    #[tokio::test]
    async fn wallet_mismatch_maps_to_403() {
        let (_dir, state) = setup();
        state
            .creators
            .create(NewCreatorProfile {
                user_id: Uuid::new_v4(),
                username: "stella".to_string(),
                display_name: "Stella".to_string(),
                bio: None,
                category: "art".to_string(),
                avatar_url: None,
                wallet_address: "CreatorPayoutAddr".to_string(),
                price_lamports: 50_000_000,
            })
            .unwrap();
        let creator = state.creators.get_by_username("stella").unwrap().unwrap();

        let err = unlock(
            State(state.clone()),
            wallet_auth("alice@example.com", "WrongAddress"),
            Path(creator.id),
        )
        .await
        .unwrap_err();

        assert_eq!(err.status, StatusCode::FORBIDDEN);
    }
}
