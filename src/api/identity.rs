// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity and wallet endpoints.
//!
//! The identity provider is the source of truth for who the caller is;
//! this module maps a verified token onto a local profile row and manages
//! the custodial wallet attached to it.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{Auth, AuthenticatedUser, WalletAuth};
use crate::chain::{format_amount, SigningWallet};
use crate::error::ApiError;
use crate::state::AppState;
use crate::storage::{IdentityUpdate, StoredUserProfile};

/// Resolve the caller's token to a local profile, creating the profile on
/// first contact and refreshing provider-supplied fields (name, picture,
/// wallet address) on later contacts.
pub fn resolve_profile(
    state: &AppState,
    user: &AuthenticatedUser,
) -> Result<StoredUserProfile, ApiError> {
    Ok(state.users.sync_identity(
        &user.email,
        IdentityUpdate {
            name: user.name.as_deref(),
            picture: user.picture.as_deref(),
            wallet_address: user.wallet_address.as_deref(),
        },
    )?)
}

/// How far along the wallet setup the account is.
#[derive(Debug, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WalletState {
    /// Signed in, no wallet yet.
    None,
    /// Wallet provisioned and usable.
    Ready,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MeResponse {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    pub wallet_state: WalletState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
    /// Creator profile id, if the account has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateMeRequest {
    pub display_name: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WalletResponse {
    /// Base58 address of the custodial wallet.
    pub address: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BalanceResponse {
    pub address: String,
    pub lamports: u64,
    /// Balance as a decimal token string.
    pub amount: String,
}

#[utoipa::path(
    get,
    path = "/v1/me",
    tag = "Identity",
    responses(
        (status = 200, description = "The caller's profile", body = MeResponse),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn get_me(
    State(state): State<AppState>,
    Auth(user): Auth,
) -> Result<Json<MeResponse>, ApiError> {
    let profile = resolve_profile(&state, &user)?;
    let creator = state.creators.get_by_user(profile.id)?;

    Ok(Json(MeResponse {
        id: profile.id,
        email: profile.email,
        display_name: profile.display_name,
        profile_image: profile.profile_image,
        wallet_state: if profile.wallet_address.is_some() {
            WalletState::Ready
        } else {
            WalletState::None
        },
        wallet_address: profile.wallet_address,
        creator_id: creator.map(|c| c.id),
    }))
}

#[utoipa::path(
    patch,
    path = "/v1/me",
    tag = "Identity",
    request_body = UpdateMeRequest,
    responses(
        (status = 200, description = "Updated profile", body = MeResponse),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn update_me(
    State(state): State<AppState>,
    Auth(user): Auth,
    Json(request): Json<UpdateMeRequest>,
) -> Result<Json<MeResponse>, ApiError> {
    let profile = resolve_profile(&state, &user)?;
    let profile = state
        .users
        .set_display_name(profile.id, request.display_name)?;
    let creator = state.creators.get_by_user(profile.id)?;

    Ok(Json(MeResponse {
        id: profile.id,
        email: profile.email,
        display_name: profile.display_name,
        profile_image: profile.profile_image,
        wallet_state: if profile.wallet_address.is_some() {
            WalletState::Ready
        } else {
            WalletState::None
        },
        wallet_address: profile.wallet_address,
        creator_id: creator.map(|c| c.id),
    }))
}

/// Provision the custodial wallet for the caller.
///
/// Derivation is deterministic, so calling this twice yields the same
/// address; the handler is idempotent.
#[utoipa::path(
    post,
    path = "/v1/wallet",
    tag = "Identity",
    responses(
        (status = 201, description = "Wallet provisioned", body = WalletResponse),
        (status = 200, description = "Wallet already existed", body = WalletResponse),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn create_wallet(
    State(state): State<AppState>,
    Auth(user): Auth,
) -> Result<(StatusCode, Json<WalletResponse>), ApiError> {
    let profile = state.users.get_or_create(&user.email)?;
    let wallet = state.wallets.derive(profile.id)?;
    let address = wallet.address();

    let already_provisioned = profile.wallet_address.is_some();
    if !already_provisioned {
        state.users.set_wallet_address(profile.id, &address)?;
        tracing::info!(user_id = %profile.id, address = %address, "wallet provisioned");
    }

    let status = if already_provisioned {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(WalletResponse { address })))
}

#[utoipa::path(
    get,
    path = "/v1/wallet/balance",
    tag = "Identity",
    responses(
        (status = 200, description = "Current balance", body = BalanceResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "No wallet on the account")
    )
)]
pub async fn get_balance(
    State(state): State<AppState>,
    auth: WalletAuth,
) -> Result<Json<BalanceResponse>, ApiError> {
    let address = auth.wallet_address().to_string();
    let lamports = state.chain.get_balance(&address).await?;

    Ok(Json(BalanceResponse {
        address,
        amount: format_amount(lamports),
        lamports,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, AppState) {
        let dir = TempDir::new().unwrap();
        let state = AppState::for_tests(dir.path());
        (dir, state)
    }

    fn token_user(email: &str, wallet: Option<&str>) -> AuthenticatedUser {
        AuthenticatedUser {
            subject: "user_123".to_string(),
            email: email.to_string(),
            name: None,
            picture: None,
            wallet_address: wallet.map(str::to_string),
            issuer: "test".to_string(),
            expires_at: 0,
        }
    }

    #[tokio::test]
    async fn me_creates_the_profile_on_first_contact() {
        let (_dir, state) = setup();

        let Json(me) = get_me(State(state.clone()), Auth(token_user("alice@example.com", None)))
            .await
            .unwrap();

        assert_eq!(me.email, "alice@example.com");
        assert_eq!(me.wallet_state, WalletState::None);
        assert!(me.creator_id.is_none());

        // Same email resolves to the same profile.
        let again = state.users.get_or_create("alice@example.com").unwrap();
        assert_eq!(again.id, me.id);
    }

    #[tokio::test]
    async fn me_records_a_wallet_claim_on_the_profile() {
        let (_dir, state) = setup();

        let Json(me) = get_me(
            State(state.clone()),
            Auth(token_user("bob@example.com", Some("So1Addr111"))),
        )
        .await
        .unwrap();

        assert_eq!(me.wallet_state, WalletState::Ready);
        assert_eq!(me.wallet_address.as_deref(), Some("So1Addr111"));
    }

    #[tokio::test]
    async fn create_wallet_is_idempotent() {
        let (_dir, state) = setup();
        let user = token_user("carol@example.com", None);

        let (status, Json(first)) = create_wallet(State(state.clone()), Auth(user.clone()))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::CREATED);

        let (status, Json(second)) = create_wallet(State(state.clone()), Auth(user))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first.address, second.address);

        let profile = state.users.get_or_create("carol@example.com").unwrap();
        assert_eq!(profile.wallet_address, Some(first.address));
    }

    #[tokio::test]
    async fn repeat_sign_ins_refresh_provider_fields_on_the_same_row() {
        let (_dir, state) = setup();

        let mut user = token_user("eve@example.com", None);
        user.name = Some("Eve".to_string());
        let Json(first) = get_me(State(state.clone()), Auth(user.clone()))
            .await
            .unwrap();
        assert_eq!(first.display_name.as_deref(), Some("Eve"));

        user.name = Some("Evelyn".to_string());
        user.picture = Some("https://img.example/eve.png".to_string());
        let Json(second) = get_me(State(state.clone()), Auth(user)).await.unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.display_name.as_deref(), Some("Evelyn"));
        assert_eq!(
            second.profile_image.as_deref(),
            Some("https://img.example/eve.png")
        );
    }

    #[tokio::test]
    async fn update_me_sets_display_name() {
        let (_dir, state) = setup();

        let Json(me) = update_me(
            State(state.clone()),
            Auth(token_user("dora@example.com", None)),
            Json(UpdateMeRequest {
                display_name: Some("Dora".to_string()),
            }),
        )
        .await
        .unwrap();

        assert_eq!(me.display_name.as_deref(), Some("Dora"));
    }
}
