// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Creator profile repository.
//!
//! Creator profiles are publicly listable and carry the per-message price
//! plus the payout wallet address. Usernames are unique case-insensitively.

use chrono::{DateTime, Utc};
use redb::{ReadableDatabase, ReadableTable};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::storage::db::{Store, StoreError, StoreResult, CREATOR_PROFILES, CREATOR_USERNAME_INDEX};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCreatorProfile {
    pub id: Uuid,
    /// Owning user account.
    pub user_id: Uuid,
    pub username: String,
    pub display_name: String,
    pub bio: Option<String>,
    pub category: String,
    pub avatar_url: Option<String>,
    /// Payout address; unlock payments are sent here.
    pub wallet_address: String,
    /// Price to unlock messaging, in lamports.
    pub price_lamports: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct NewCreatorProfile {
    pub user_id: Uuid,
    pub username: String,
    pub display_name: String,
    pub bio: Option<String>,
    pub category: String,
    pub avatar_url: Option<String>,
    pub wallet_address: String,
    pub price_lamports: u64,
}

#[derive(Clone)]
pub struct CreatorRepository {
    store: Store,
}

impl CreatorRepository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Create a creator profile. Fails if the username is already taken or
    /// the owning user already has a creator profile.
    pub fn create(&self, new: NewCreatorProfile) -> StoreResult<StoredCreatorProfile> {
        let index_key = new.username.to_lowercase();

        let txn = self.store.db().begin_write()?;
        let profile = {
            let index = txn.open_table(CREATOR_USERNAME_INDEX)?;
            if index.get(index_key.as_str())?.is_some() {
                return Err(StoreError::AlreadyExists(format!(
                    "username {} is taken",
                    new.username
                )));
            }
            drop(index);

            let table = txn.open_table(CREATOR_PROFILES)?;
            for row in table.iter()? {
                let (_, value) = row?;
                let existing: StoredCreatorProfile = serde_json::from_slice(value.value())?;
                if existing.user_id == new.user_id {
                    return Err(StoreError::AlreadyExists(format!(
                        "user {} already has a creator profile",
                        new.user_id
                    )));
                }
            }
            drop(table);

            let now = Utc::now();
            let profile = StoredCreatorProfile {
                id: Uuid::new_v4(),
                user_id: new.user_id,
                username: new.username,
                display_name: new.display_name,
                bio: new.bio,
                category: new.category,
                avatar_url: new.avatar_url,
                wallet_address: new.wallet_address,
                price_lamports: new.price_lamports,
                created_at: now,
                updated_at: now,
            };
            let id = profile.id.to_string();
            let raw = serde_json::to_vec(&profile)?;

            let mut table = txn.open_table(CREATOR_PROFILES)?;
            table.insert(id.as_str(), raw.as_slice())?;
            drop(table);

            let mut index = txn.open_table(CREATOR_USERNAME_INDEX)?;
            index.insert(index_key.as_str(), id.as_str())?;

            profile
        };
        txn.commit()?;

        Ok(profile)
    }

    pub fn get(&self, id: Uuid) -> StoreResult<StoredCreatorProfile> {
        let id = id.to_string();
        let txn = self.store.db().begin_read()?;
        let table = txn.open_table(CREATOR_PROFILES)?;
        let raw = table
            .get(id.as_str())?
            .ok_or_else(|| StoreError::NotFound(format!("creator {id}")))?;
        Ok(serde_json::from_slice(raw.value())?)
    }

    pub fn get_by_username(&self, username: &str) -> StoreResult<Option<StoredCreatorProfile>> {
        let index_key = username.to_lowercase();
        let txn = self.store.db().begin_read()?;
        let index = txn.open_table(CREATOR_USERNAME_INDEX)?;
        let Some(id) = index.get(index_key.as_str())?.map(|v| v.value().to_string()) else {
            return Ok(None);
        };
        let table = txn.open_table(CREATOR_PROFILES)?;
        let raw = table
            .get(id.as_str())?
            .ok_or_else(|| StoreError::NotFound(format!("creator {id}")))?;
        Ok(Some(serde_json::from_slice(raw.value())?))
    }

    /// Creator profile owned by a given user, if any.
    pub fn get_by_user(&self, user_id: Uuid) -> StoreResult<Option<StoredCreatorProfile>> {
        let txn = self.store.db().begin_read()?;
        let table = txn.open_table(CREATOR_PROFILES)?;
        for row in table.iter()? {
            let (_, value) = row?;
            let profile: StoredCreatorProfile = serde_json::from_slice(value.value())?;
            if profile.user_id == user_id {
                return Ok(Some(profile));
            }
        }
        Ok(None)
    }

    /// All creator profiles, for the public directory.
    pub fn list(&self) -> StoreResult<Vec<StoredCreatorProfile>> {
        let txn = self.store.db().begin_read()?;
        let table = txn.open_table(CREATOR_PROFILES)?;
        let mut profiles = Vec::new();
        for row in table.iter()? {
            let (_, value) = row?;
            profiles.push(serde_json::from_slice(value.value())?);
        }
        Ok(profiles)
    }

    /// Apply profile edits. Username is immutable once chosen.
    pub fn update<F>(&self, id: Uuid, mut apply: F) -> StoreResult<StoredCreatorProfile>
    where
        F: FnMut(&mut StoredCreatorProfile),
    {
        let key = id.to_string();
        let txn = self.store.db().begin_write()?;
        let profile = {
            let mut table = txn.open_table(CREATOR_PROFILES)?;
            let raw = table
                .get(key.as_str())?
                .ok_or_else(|| StoreError::NotFound(format!("creator {key}")))?;
            let mut profile: StoredCreatorProfile = serde_json::from_slice(raw.value())?;
            drop(raw);

            let username = profile.username.clone();
            apply(&mut profile);
            profile.username = username;
            profile.updated_at = Utc::now();

            let raw = serde_json::to_vec(&profile)?;
            table.insert(key.as_str(), raw.as_slice())?;
            profile
        };
        txn.commit()?;
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn repo() -> (TempDir, CreatorRepository) {
        let dir = TempDir::new().unwrap();
        let store = Store::open(&dir.path().join("test.redb")).unwrap();
        (dir, CreatorRepository::new(store))
    }

    fn new_profile(user_id: Uuid, username: &str) -> NewCreatorProfile {
        NewCreatorProfile {
            user_id,
            username: username.to_string(),
            display_name: username.to_string(),
            bio: None,
            category: "art".to_string(),
            avatar_url: None,
            wallet_address: "CreatorPayoutAddr".to_string(),
            price_lamports: 50_000_000,
        }
    }

    #[test]
    fn usernames_are_unique_case_insensitively() {
        let (_dir, repo) = repo();
        repo.create(new_profile(Uuid::new_v4(), "stella")).unwrap();

        let err = repo.create(new_profile(Uuid::new_v4(), "Stella")).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[test]
    fn one_creator_profile_per_user() {
        let (_dir, repo) = repo();
        let user = Uuid::new_v4();
        repo.create(new_profile(user, "first")).unwrap();

        let err = repo.create(new_profile(user, "second")).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[test]
    fn lookup_by_username_and_list() {
        let (_dir, repo) = repo();
        let created = repo.create(new_profile(Uuid::new_v4(), "nova")).unwrap();

        let found = repo.get_by_username("NOVA").unwrap().unwrap();
        assert_eq!(found.id, created.id);

        let all = repo.list().unwrap();
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn update_keeps_username_immutable() {
        let (_dir, repo) = repo();
        let created = repo.create(new_profile(Uuid::new_v4(), "vega")).unwrap();

        let updated = repo
            .update(created.id, |p| {
                p.username = "hijacked".to_string();
                p.price_lamports = 75_000_000;
            })
            .unwrap();

        assert_eq!(updated.username, "vega");
        assert_eq!(updated.price_lamports, 75_000_000);
    }
}
