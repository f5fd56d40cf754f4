// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Paid connection repository.
//!
//! A connection is the durable record that a user has paid a creator's
//! unlock price. The `{user_id}|{creator_id}` pair is the primary key, so
//! uniqueness is a property of the key space: two concurrent unlocks for
//! the same pair resolve to one insert and one conflict, never two rows.

use chrono::{DateTime, Utc};
use redb::{ReadableDatabase, ReadableTable};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::storage::db::{
    pair_key, Store, StoreError, StoreResult, CONNECTIONS_BY_CREATOR, PAID_CONNECTIONS,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredConnection {
    pub user_id: Uuid,
    pub creator_id: Uuid,
    /// Amount paid, in lamports.
    pub amount_lamports: u64,
    /// On-chain signature of the unlock payment.
    pub transaction_signature: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct ConnectionRepository {
    store: Store,
}

impl ConnectionRepository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Insert a connection, failing with [`StoreError::AlreadyExists`] if
    /// the pair is already connected.
    pub fn insert(&self, connection: &StoredConnection) -> StoreResult<()> {
        let user = connection.user_id.to_string();
        let creator = connection.creator_id.to_string();
        let key = pair_key(&user, &creator);
        let reverse_key = pair_key(&creator, &user);
        let raw = serde_json::to_vec(connection)?;

        let txn = self.store.db().begin_write()?;
        {
            let mut table = txn.open_table(PAID_CONNECTIONS)?;
            if table.get(key.as_str())?.is_some() {
                return Err(StoreError::AlreadyExists(format!(
                    "connection {user} -> {creator}"
                )));
            }
            table.insert(key.as_str(), raw.as_slice())?;
            drop(table);

            let mut reverse = txn.open_table(CONNECTIONS_BY_CREATOR)?;
            reverse.insert(reverse_key.as_str(), user.as_str())?;
        }
        txn.commit()?;

        Ok(())
    }

    pub fn get(&self, user_id: Uuid, creator_id: Uuid) -> StoreResult<Option<StoredConnection>> {
        let key = pair_key(&user_id.to_string(), &creator_id.to_string());
        let txn = self.store.db().begin_read()?;
        let table = txn.open_table(PAID_CONNECTIONS)?;
        match table.get(key.as_str())? {
            Some(raw) => Ok(Some(serde_json::from_slice(raw.value())?)),
            None => Ok(None),
        }
    }

    pub fn exists(&self, user_id: Uuid, creator_id: Uuid) -> StoreResult<bool> {
        Ok(self.get(user_id, creator_id)?.is_some())
    }

    /// Connections made by a user, newest first.
    pub fn list_for_user(&self, user_id: Uuid) -> StoreResult<Vec<StoredConnection>> {
        let prefix = format!("{user_id}|");

        let txn = self.store.db().begin_read()?;
        let table = txn.open_table(PAID_CONNECTIONS)?;
        let mut connections = Vec::new();
        for row in table.range(prefix.as_str()..)? {
            let (key, value) = row?;
            if !key.value().starts_with(&prefix) {
                break;
            }
            connections.push(serde_json::from_slice::<StoredConnection>(value.value())?);
        }
        connections.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(connections)
    }

    /// Connections received by a creator, newest first.
    pub fn list_for_creator(&self, creator_id: Uuid) -> StoreResult<Vec<StoredConnection>> {
        let prefix = format!("{creator_id}|");

        let user_ids: Vec<String> = {
            let txn = self.store.db().begin_read()?;
            let reverse = txn.open_table(CONNECTIONS_BY_CREATOR)?;
            let mut ids = Vec::new();
            for row in reverse.range(prefix.as_str()..)? {
                let (key, value) = row?;
                if !key.value().starts_with(&prefix) {
                    break;
                }
                ids.push(value.value().to_string());
            }
            ids
        };

        let txn = self.store.db().begin_read()?;
        let table = txn.open_table(PAID_CONNECTIONS)?;
        let creator = creator_id.to_string();
        let mut connections = Vec::new();
        for user in user_ids {
            let key = pair_key(&user, &creator);
            if let Some(raw) = table.get(key.as_str())? {
                connections.push(serde_json::from_slice::<StoredConnection>(raw.value())?);
            }
        }
        connections.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(connections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn repo() -> (TempDir, ConnectionRepository) {
        let dir = TempDir::new().unwrap();
        let store = Store::open(&dir.path().join("test.redb")).unwrap();
        (dir, ConnectionRepository::new(store))
    }

    fn connection(user_id: Uuid, creator_id: Uuid, signature: &str) -> StoredConnection {
        StoredConnection {
            user_id,
            creator_id,
            amount_lamports: 50_000_000,
            transaction_signature: signature.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn duplicate_pair_is_a_conflict() {
        let (_dir, repo) = repo();
        let user = Uuid::new_v4();
        let creator = Uuid::new_v4();

        repo.insert(&connection(user, creator, "sig-1")).unwrap();
        let err = repo.insert(&connection(user, creator, "sig-2")).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));

        // The first insert wins; exactly one row exists for the pair.
        let stored = repo.get(user, creator).unwrap().unwrap();
        assert_eq!(stored.transaction_signature, "sig-1");
        assert_eq!(repo.list_for_user(user).unwrap().len(), 1);
    }

    #[test]
    fn listings_cover_both_sides() {
        let (_dir, repo) = repo();
        let user = Uuid::new_v4();
        let creator_a = Uuid::new_v4();
        let creator_b = Uuid::new_v4();
        let other_user = Uuid::new_v4();

        repo.insert(&connection(user, creator_a, "s1")).unwrap();
        repo.insert(&connection(user, creator_b, "s2")).unwrap();
        repo.insert(&connection(other_user, creator_a, "s3")).unwrap();

        assert_eq!(repo.list_for_user(user).unwrap().len(), 2);
        assert_eq!(repo.list_for_creator(creator_a).unwrap().len(), 2);
        assert_eq!(repo.list_for_creator(creator_b).unwrap().len(), 1);
    }

    #[test]
    fn missing_pair_reads_as_none() {
        let (_dir, repo) = repo();
        assert!(repo.get(Uuid::new_v4(), Uuid::new_v4()).unwrap().is_none());
        assert!(!repo.exists(Uuid::new_v4(), Uuid::new_v4()).unwrap());
    }
}
