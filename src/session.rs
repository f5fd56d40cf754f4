// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Creator dashboard sessions.
//!
//! Logging in to the dashboard issues an opaque server-side session token;
//! the client holds only the token and sends it in the `X-Creator-Session`
//! header. Sessions expire after a fixed TTL and can be revoked by logout.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the session token.
pub const SESSION_HEADER: &str = "x-creator-session";

/// Session lifetime.
const SESSION_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone)]
pub struct CreatorSession {
    pub token: String,
    pub creator_id: Uuid,
    /// User account that owns the creator profile.
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CreatorSession {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// In-memory session store. Sessions do not survive a restart; creators
/// log in again with their identity token.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, CreatorSession>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new session for a creator.
    pub async fn create(&self, creator_id: Uuid, user_id: Uuid) -> CreatorSession {
        let now = Utc::now();
        let session = CreatorSession {
            token: format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple()),
            creator_id,
            user_id,
            created_at: now,
            expires_at: now + Duration::hours(SESSION_TTL_HOURS),
        };

        let mut sessions = self.sessions.write().await;
        // Opportunistically drop whatever has expired.
        sessions.retain(|_, s| !s.is_expired(now));
        sessions.insert(session.token.clone(), session.clone());

        session
    }

    /// Look up a session, treating an expired one as absent.
    pub async fn get(&self, token: &str) -> Option<CreatorSession> {
        let now = Utc::now();
        let sessions = self.sessions.read().await;
        sessions
            .get(token)
            .filter(|s| !s.is_expired(now))
            .cloned()
    }

    pub async fn revoke(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }
}

/// Extractor for handlers that require an active creator session.
pub struct CreatorAuth(pub CreatorSession);

impl FromRequestParts<AppState> for CreatorAuth {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Creator session required"))?;

        let session = state
            .sessions
            .get(token)
            .await
            .ok_or_else(|| ApiError::unauthorized("Creator session is invalid or expired"))?;

        Ok(CreatorAuth(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn created_sessions_can_be_looked_up() {
        let store = SessionStore::new();
        let creator = Uuid::new_v4();
        let user = Uuid::new_v4();

        let session = store.create(creator, user).await;
        let found = store.get(&session.token).await.unwrap();

        assert_eq!(found.creator_id, creator);
        assert_eq!(found.user_id, user);
    }

    #[tokio::test]
    async fn unknown_tokens_resolve_to_none() {
        let store = SessionStore::new();
        assert!(store.get("nope").await.is_none());
    }

    #[tokio::test]
    async fn revoked_sessions_are_gone() {
        let store = SessionStore::new();
        let session = store.create(Uuid::new_v4(), Uuid::new_v4()).await;

        assert!(store.revoke(&session.token).await);
        assert!(store.get(&session.token).await.is_none());
        assert!(!store.revoke(&session.token).await);
    }

    #[tokio::test]
    async fn expired_sessions_read_as_absent() {
        let store = SessionStore::new();
        let session = store.create(Uuid::new_v4(), Uuid::new_v4()).await;

        {
            let mut sessions = store.sessions.write().await;
            let entry = sessions.get_mut(&session.token).unwrap();
            entry.expires_at = Utc::now() - Duration::seconds(1);
        }

        assert!(store.get(&session.token).await.is_none());
    }
}
