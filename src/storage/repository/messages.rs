// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Message repository.
//!
//! Both directions of a thread live in one table; the sender role on each
//! record says which side wrote it. Key order is chronological within a
//! thread, so reading a conversation is a single range scan with no
//! client-side merge.

use chrono::{DateTime, Utc};
use redb::ReadableDatabase;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::storage::db::{message_key, prefix_end, thread_prefix, Store, StoreResult, MESSAGES};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SenderRole {
    User,
    Creator,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: Uuid,
    pub user_id: Uuid,
    pub creator_id: Uuid,
    pub sender: SenderRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct MessageRepository {
    store: Store,
}

impl MessageRepository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn append(&self, message: &StoredMessage) -> StoreResult<()> {
        let key = message_key(
            &message.user_id.to_string(),
            &message.creator_id.to_string(),
            message.created_at.timestamp_millis(),
            &message.id.to_string(),
        );
        let raw = serde_json::to_vec(message)?;

        let txn = self.store.db().begin_write()?;
        {
            let mut table = txn.open_table(MESSAGES)?;
            table.insert(key.as_slice(), raw.as_slice())?;
        }
        txn.commit()?;

        Ok(())
    }

    /// Full thread between a user and a creator, oldest first.
    pub fn thread(&self, user_id: Uuid, creator_id: Uuid) -> StoreResult<Vec<StoredMessage>> {
        let prefix = thread_prefix(&user_id.to_string(), &creator_id.to_string());
        let end = prefix_end(&prefix);

        let txn = self.store.db().begin_read()?;
        let table = txn.open_table(MESSAGES)?;
        let mut messages = Vec::new();
        for row in table.range(prefix.as_slice()..end.as_slice())? {
            let (_, value) = row?;
            messages.push(serde_json::from_slice::<StoredMessage>(value.value())?);
        }
        Ok(messages)
    }

    /// Most recent message in a thread, if any.
    pub fn latest(&self, user_id: Uuid, creator_id: Uuid) -> StoreResult<Option<StoredMessage>> {
        let prefix = thread_prefix(&user_id.to_string(), &creator_id.to_string());
        let end = prefix_end(&prefix);

        let txn = self.store.db().begin_read()?;
        let table = txn.open_table(MESSAGES)?;
        let mut range = table.range(prefix.as_slice()..end.as_slice())?;
        match range.next_back() {
            Some(row) => {
                let (_, value) = row?;
                Ok(Some(serde_json::from_slice(value.value())?))
            }
            None => Ok(None),
        }
    }
}
