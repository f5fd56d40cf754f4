// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Creator directory, registration, dashboard sessions, and earnings.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::{Auth, Identity, MaybeAuth, WalletAuth};
use crate::chain::{format_amount, parse_amount};
use crate::error::ApiError;
use crate::session::CreatorAuth;
use crate::state::AppState;
use crate::storage::{StoreError, StoredCreatorProfile};
use crate::storage::repository::creators::NewCreatorProfile;

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 30;

/// Public view of a creator profile.
#[derive(Debug, Serialize, ToSchema)]
pub struct CreatorSummary {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    /// Unlock price as a decimal token string.
    pub price: String,
    pub price_lamports: u64,
    /// Whether the caller has unlocked this creator. Absent for
    /// unauthenticated callers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected: Option<bool>,
}

impl CreatorSummary {
    fn from_profile(profile: StoredCreatorProfile, connected: Option<bool>) -> Self {
        Self {
            id: profile.id,
            username: profile.username,
            display_name: profile.display_name,
            bio: profile.bio,
            category: profile.category,
            avatar_url: profile.avatar_url,
            price: format_amount(profile.price_lamports),
            price_lamports: profile.price_lamports,
            connected,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterCreatorRequest {
    pub username: String,
    pub display_name: String,
    #[serde(default)]
    pub bio: Option<String>,
    pub category: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Unlock price as a decimal token string, e.g. "0.05".
    pub price: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCreatorRequest {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub price: Option<String>,
}

/// Directory filters for `GET /v1/creators`.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct DirectoryQuery {
    /// Case-insensitive substring match on display name or category.
    #[serde(default)]
    pub search: Option<String>,
    /// Exact category filter.
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreatorLoginResponse {
    /// Opaque session token for the `X-Creator-Session` header.
    pub token: String,
    pub creator_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// One supporter as seen from the creator dashboard.
#[derive(Debug, Serialize, ToSchema)]
pub struct SupporterConnection {
    pub user_id: Uuid,
    pub display_name: String,
    pub amount: String,
    pub amount_lamports: u64,
    pub transaction_signature: String,
    pub connected_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DayEarnings {
    pub date: NaiveDate,
    pub amount: String,
    pub lamports: u64,
    /// Number of unlocks that day.
    pub unlocks: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EarningsResponse {
    pub total: String,
    pub total_lamports: u64,
    /// Daily totals, most recent day first.
    pub days: Vec<DayEarnings>,
}

fn validate_username(username: &str) -> Result<(), ApiError> {
    if username.len() < USERNAME_MIN || username.len() > USERNAME_MAX {
        return Err(ApiError::unprocessable(format!(
            "Username must be {USERNAME_MIN}-{USERNAME_MAX} characters"
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
    {
        return Err(ApiError::unprocessable(
            "Username may only contain lowercase letters, digits, '_' and '-'",
        ));
    }
    Ok(())
}

/// Resolve the caller (if any) to a profile id for connected flags.
fn caller_profile_id(state: &AppState, identity: &Identity) -> Result<Option<Uuid>, ApiError> {
    match identity.user() {
        Some(user) => Ok(state.users.get_by_email(&user.email)?.map(|p| p.id)),
        None => Ok(None),
    }
}

#[utoipa::path(
    get,
    path = "/v1/creators",
    tag = "Creators",
    params(DirectoryQuery),
    responses((status = 200, description = "Matching creators, newest first", body = [CreatorSummary]))
)]
pub async fn list_creators(
    State(state): State<AppState>,
    MaybeAuth(identity): MaybeAuth,
    Query(query): Query<DirectoryQuery>,
) -> Result<Json<Vec<CreatorSummary>>, ApiError> {
    let caller = caller_profile_id(&state, &identity)?;

    let mut creators = state.creators.list()?;
    if let Some(ref category) = query.category {
        creators.retain(|p| p.category == *category);
    }
    if let Some(ref search) = query.search {
        let needle = search.to_lowercase();
        creators.retain(|p| {
            p.display_name.to_lowercase().contains(&needle)
                || p.category.to_lowercase().contains(&needle)
        });
    }
    creators.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let mut summaries = Vec::with_capacity(creators.len());
    for profile in creators {
        let connected = match caller {
            Some(user_id) => Some(state.connections.exists(user_id, profile.id)?),
            None => None,
        };
        summaries.push(CreatorSummary::from_profile(profile, connected));
    }

    Ok(Json(summaries))
}

#[utoipa::path(
    get,
    path = "/v1/creators/{creator_id}",
    tag = "Creators",
    params(("creator_id" = String, Path, description = "Creator id or username handle")),
    responses(
        (status = 200, description = "Creator profile", body = CreatorSummary),
        (status = 404, description = "No such creator")
    )
)]
pub async fn get_creator(
    State(state): State<AppState>,
    MaybeAuth(identity): MaybeAuth,
    Path(handle): Path<String>,
) -> Result<Json<CreatorSummary>, ApiError> {
    // Accept either the profile id or the username handle.
    let profile = match handle.parse::<Uuid>() {
        Ok(id) => match state.creators.get(id) {
            Ok(profile) => Some(profile),
            Err(StoreError::NotFound(_)) => None,
            Err(e) => return Err(e.into()),
        },
        Err(_) => state.creators.get_by_username(&handle)?,
    }
    .ok_or_else(|| ApiError::not_found(format!("Creator '{handle}' not found")))?;

    let connected = match caller_profile_id(&state, &identity)? {
        Some(user_id) => Some(state.connections.exists(user_id, profile.id)?),
        None => None,
    };

    Ok(Json(CreatorSummary::from_profile(profile, connected)))
}

#[utoipa::path(
    post,
    path = "/v1/creators",
    tag = "Creators",
    request_body = RegisterCreatorRequest,
    responses(
        (status = 200, description = "Existing profile updated", body = CreatorSummary),
        (status = 201, description = "Creator profile created", body = CreatorSummary),
        (status = 409, description = "Username taken by another account"),
        (status = 422, description = "Invalid username or price")
    )
)]
pub async fn register_creator(
    State(state): State<AppState>,
    auth: WalletAuth,
    Json(request): Json<RegisterCreatorRequest>,
) -> Result<(StatusCode, Json<CreatorSummary>), ApiError> {
    validate_username(&request.username)?;
    let price_lamports = parse_amount(&request.price).map_err(ApiError::unprocessable)?;

    let profile = state.users.get_or_create(&auth.0.email)?;
    let payout_address = auth.wallet_address().to_string();

    // Signing up under a username you already own refreshes the profile.
    if let Some(existing) = state.creators.get_by_username(&request.username)? {
        if existing.user_id != profile.id {
            return Err(ApiError::conflict(format!(
                "Username '{}' is taken",
                request.username
            )));
        }
        let creator = state.creators.update(existing.id, |p| {
            p.display_name = request.display_name.clone();
            p.bio = request.bio.clone();
            p.category = request.category.clone();
            p.avatar_url = request.avatar_url.clone();
            p.wallet_address = payout_address.clone();
            p.price_lamports = price_lamports;
        })?;
        tracing::info!(creator_id = %creator.id, username = %creator.username, "creator profile refreshed");
        return Ok((StatusCode::OK, Json(CreatorSummary::from_profile(creator, None))));
    }

    let creator = state.creators.create(NewCreatorProfile {
        user_id: profile.id,
        username: request.username,
        display_name: request.display_name,
        bio: request.bio,
        category: request.category,
        avatar_url: request.avatar_url,
        wallet_address: payout_address,
        price_lamports,
    })?;

    tracing::info!(creator_id = %creator.id, username = %creator.username, "creator registered");

    Ok((
        StatusCode::CREATED,
        Json(CreatorSummary::from_profile(creator, None)),
    ))
}

#[utoipa::path(
    post,
    path = "/v1/creators/login",
    tag = "Creators",
    responses(
        (status = 200, description = "Dashboard session issued", body = CreatorLoginResponse),
        (status = 404, description = "The account has no creator profile")
    )
)]
pub async fn login_creator(
    State(state): State<AppState>,
    Auth(user): Auth,
) -> Result<Json<CreatorLoginResponse>, ApiError> {
    let profile = state.users.get_or_create(&user.email)?;
    let creator = state
        .creators
        .get_by_user(profile.id)?
        .ok_or_else(|| ApiError::not_found("This account has no creator profile"))?;

    let session = state.sessions.create(creator.id, profile.id).await;

    Ok(Json(CreatorLoginResponse {
        token: session.token,
        creator_id: session.creator_id,
        expires_at: session.expires_at,
    }))
}

#[utoipa::path(
    post,
    path = "/v1/creators/logout",
    tag = "Creators",
    responses((status = 204, description = "Session revoked"))
)]
pub async fn logout_creator(
    State(state): State<AppState>,
    CreatorAuth(session): CreatorAuth,
) -> Result<StatusCode, ApiError> {
    state.sessions.revoke(&session.token).await;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    patch,
    path = "/v1/creators/me",
    tag = "Creators",
    request_body = UpdateCreatorRequest,
    responses(
        (status = 200, description = "Updated profile", body = CreatorSummary),
        (status = 422, description = "Invalid price")
    )
)]
pub async fn update_creator(
    State(state): State<AppState>,
    CreatorAuth(session): CreatorAuth,
    Json(request): Json<UpdateCreatorRequest>,
) -> Result<Json<CreatorSummary>, ApiError> {
    let price_lamports = match &request.price {
        Some(price) => Some(parse_amount(price).map_err(ApiError::unprocessable)?),
        None => None,
    };

    let creator = state.creators.update(session.creator_id, |profile| {
        if let Some(ref name) = request.display_name {
            profile.display_name = name.clone();
        }
        if let Some(ref bio) = request.bio {
            profile.bio = Some(bio.clone());
        }
        if let Some(ref category) = request.category {
            profile.category = category.clone();
        }
        if let Some(ref url) = request.avatar_url {
            profile.avatar_url = Some(url.clone());
        }
        if let Some(lamports) = price_lamports {
            profile.price_lamports = lamports;
        }
    })?;

    Ok(Json(CreatorSummary::from_profile(creator, None)))
}

#[utoipa::path(
    get,
    path = "/v1/creators/me/connections",
    tag = "Creators",
    responses((status = 200, description = "Supporters, newest first", body = [SupporterConnection]))
)]
pub async fn list_supporters(
    State(state): State<AppState>,
    CreatorAuth(session): CreatorAuth,
) -> Result<Json<Vec<SupporterConnection>>, ApiError> {
    let connections = state.connections.list_for_creator(session.creator_id)?;

    let mut supporters = Vec::with_capacity(connections.len());
    for connection in connections {
        let user = state.users.get(connection.user_id)?;
        let display_name = user
            .display_name
            .unwrap_or_else(|| user.email.clone());
        supporters.push(SupporterConnection {
            user_id: connection.user_id,
            display_name,
            amount: format_amount(connection.amount_lamports),
            amount_lamports: connection.amount_lamports,
            transaction_signature: connection.transaction_signature,
            connected_at: connection.created_at,
        });
    }

    Ok(Json(supporters))
}

#[utoipa::path(
    get,
    path = "/v1/creators/me/earnings",
    tag = "Creators",
    responses((status = 200, description = "Earnings by day", body = EarningsResponse))
)]
pub async fn get_earnings(
    State(state): State<AppState>,
    CreatorAuth(session): CreatorAuth,
) -> Result<Json<EarningsResponse>, ApiError> {
    let connections = state.connections.list_for_creator(session.creator_id)?;

    let mut total_lamports: u64 = 0;
    let mut by_day: BTreeMap<NaiveDate, (u64, usize)> = BTreeMap::new();
    for connection in &connections {
        total_lamports = total_lamports.saturating_add(connection.amount_lamports);
        let entry = by_day
            .entry(connection.created_at.date_naive())
            .or_insert((0, 0));
        entry.0 = entry.0.saturating_add(connection.amount_lamports);
        entry.1 += 1;
    }

    let days = by_day
        .into_iter()
        .rev()
        .map(|(date, (lamports, unlocks))| DayEarnings {
            date,
            amount: format_amount(lamports),
            lamports,
            unlocks,
        })
        .collect();

    Ok(Json(EarningsResponse {
        total: format_amount(total_lamports),
        total_lamports,
        days,
    }))
}
