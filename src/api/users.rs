// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User-side views: unlocked creators and payment history.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::identity::resolve_profile;
use crate::auth::Auth;
use crate::chain::format_amount;
use crate::error::ApiError;
use crate::state::AppState;
use crate::storage::SenderRole;

/// Preview of the newest message in a thread.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessagePreview {
    pub sender: SenderRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A creator the caller has unlocked.
#[derive(Debug, Serialize, ToSchema)]
pub struct ConnectedCreator {
    pub creator_id: Uuid,
    pub username: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub connected_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message: Option<MessagePreview>,
}

/// One past unlock payment.
#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentRecord {
    pub creator_id: Uuid,
    pub creator_username: String,
    pub amount: String,
    pub amount_lamports: u64,
    pub transaction_signature: String,
    pub created_at: DateTime<Utc>,
}

#[utoipa::path(
    get,
    path = "/v1/me/connections",
    tag = "Me",
    responses((status = 200, description = "Unlocked creators, newest first", body = [ConnectedCreator]))
)]
pub async fn list_connections(
    State(state): State<AppState>,
    Auth(user): Auth,
) -> Result<Json<Vec<ConnectedCreator>>, ApiError> {
    let profile = resolve_profile(&state, &user)?;
    let connections = state.connections.list_for_user(profile.id)?;

    let mut creators = Vec::with_capacity(connections.len());
    for connection in connections {
        let creator = state.creators.get(connection.creator_id)?;
        let last_message = state
            .messages
            .latest(profile.id, creator.id)?
            .map(|m| MessagePreview {
                sender: m.sender,
                content: m.content,
                created_at: m.created_at,
            });

        creators.push(ConnectedCreator {
            creator_id: creator.id,
            username: creator.username,
            display_name: creator.display_name,
            avatar_url: creator.avatar_url,
            connected_at: connection.created_at,
            last_message,
        });
    }

    Ok(Json(creators))
}

#[utoipa::path(
    get,
    path = "/v1/me/transactions",
    tag = "Me",
    responses((status = 200, description = "Unlock payments, newest first", body = [PaymentRecord]))
)]
pub async fn list_transactions(
    State(state): State<AppState>,
    Auth(user): Auth,
) -> Result<Json<Vec<PaymentRecord>>, ApiError> {
    let profile = resolve_profile(&state, &user)?;
    let connections = state.connections.list_for_user(profile.id)?;

    let mut payments = Vec::with_capacity(connections.len());
    for connection in connections {
        let creator = state.creators.get(connection.creator_id)?;
        payments.push(PaymentRecord {
            creator_id: creator.id,
            creator_username: creator.username,
            amount: format_amount(connection.amount_lamports),
            amount_lamports: connection.amount_lamports,
            transaction_signature: connection.transaction_signature,
            created_at: connection.created_at,
        });
    }

    Ok(Json(payments))
}
