// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded database handle and table definitions.
//!
//! Every table is created up front so that read transactions never observe
//! a missing table. Repositories open their tables through the shared
//! [`Store`] handle; they never own a database of their own.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, TableDefinition};
use thiserror::Error;

/// `user_id -> UserProfile json`
pub(crate) const USER_PROFILES: TableDefinition<&str, &[u8]> = TableDefinition::new("user_profiles");

/// `lowercase(email) -> user_id`
pub(crate) const USER_EMAIL_INDEX: TableDefinition<&str, &str> =
    TableDefinition::new("user_email_index");

/// `creator_id -> CreatorProfile json`
pub(crate) const CREATOR_PROFILES: TableDefinition<&str, &[u8]> =
    TableDefinition::new("creator_profiles");

/// `lowercase(username) -> creator_id`
pub(crate) const CREATOR_USERNAME_INDEX: TableDefinition<&str, &str> =
    TableDefinition::new("creator_username_index");

/// `{user_id}|{creator_id} -> PaidConnection json`
///
/// The pair is the primary key; inserting an existing pair is a conflict.
pub(crate) const PAID_CONNECTIONS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("paid_connections");

/// `{creator_id}|{user_id} -> user_id` (reverse index for creator-side listings)
pub(crate) const CONNECTIONS_BY_CREATOR: TableDefinition<&str, &str> =
    TableDefinition::new("connections_by_creator");

/// `{user_id}|{creator_id}|{ts_be}|{message_id} -> Message json`
pub(crate) const MESSAGES: TableDefinition<&[u8], &[u8]> = TableDefinition::new("messages");

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Shared handle to the embedded database.
#[derive(Clone)]
pub struct Store {
    db: Arc<Database>,
}

impl Store {
    /// Open (or create) the database file and pre-create all tables.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create tables so read transactions never hit TableDoesNotExist.
        let txn = db.begin_write()?;
        {
            txn.open_table(USER_PROFILES)?;
            txn.open_table(USER_EMAIL_INDEX)?;
            txn.open_table(CREATOR_PROFILES)?;
            txn.open_table(CREATOR_USERNAME_INDEX)?;
            txn.open_table(PAID_CONNECTIONS)?;
            txn.open_table(CONNECTIONS_BY_CREATOR)?;
            txn.open_table(MESSAGES)?;
        }
        txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    pub(crate) fn db(&self) -> &Database {
        &self.db
    }
}

/// Composite key for a paid connection: `{user_id}|{creator_id}`.
pub(crate) fn pair_key(user_id: &str, creator_id: &str) -> String {
    format!("{user_id}|{creator_id}")
}

/// Composite key for a message: `{user_id}|{creator_id}|{ts_be}|{message_id}`.
///
/// The big-endian timestamp makes lexicographic key order equal to
/// chronological order within a thread.
pub(crate) fn message_key(
    user_id: &str,
    creator_id: &str,
    ts_millis: i64,
    message_id: &str,
) -> Vec<u8> {
    let mut key = Vec::with_capacity(user_id.len() + creator_id.len() + message_id.len() + 11);
    key.extend_from_slice(user_id.as_bytes());
    key.push(b'|');
    key.extend_from_slice(creator_id.as_bytes());
    key.push(b'|');
    key.extend_from_slice(&(ts_millis.max(0) as u64).to_be_bytes());
    key.push(b'|');
    key.extend_from_slice(message_id.as_bytes());
    key
}

/// Prefix covering every message in one user/creator thread.
pub(crate) fn thread_prefix(user_id: &str, creator_id: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(user_id.len() + creator_id.len() + 2);
    prefix.extend_from_slice(user_id.as_bytes());
    prefix.push(b'|');
    prefix.extend_from_slice(creator_id.as_bytes());
    prefix.push(b'|');
    prefix
}

/// Exclusive upper bound for a prefix range scan.
pub(crate) fn prefix_end(prefix: &[u8]) -> Vec<u8> {
    let mut end = prefix.to_vec();
    end.push(0xff);
    end
}
