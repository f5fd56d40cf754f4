// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User profile repository.
//!
//! A profile row is created lazily the first time an authenticated identity
//! touches the service, keyed by a server-assigned UUID with a unique email
//! index on top. Later sign-ins refresh the provider-supplied fields on the
//! same row; profiles are never deleted.

use chrono::{DateTime, Utc};
use redb::{ReadableDatabase, ReadableTable};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::storage::db::{Store, StoreError, StoreResult, USER_EMAIL_INDEX, USER_PROFILES};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredUserProfile {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub profile_image: Option<String>,
    /// Wallet address bound to the account, refreshed from the identity
    /// provider or set when the custodial wallet is provisioned.
    pub wallet_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Identity-provider fields carried into a profile sync.
#[derive(Debug, Default, Clone)]
pub struct IdentityUpdate<'a> {
    pub name: Option<&'a str>,
    pub picture: Option<&'a str>,
    pub wallet_address: Option<&'a str>,
}

#[derive(Clone)]
pub struct UserRepository {
    store: Store,
}

impl UserRepository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Fetch the profile for an email, creating it on first sight.
    ///
    /// Emails are matched case-insensitively; the stored profile keeps the
    /// casing from the first login.
    pub fn get_or_create(&self, email: &str) -> StoreResult<StoredUserProfile> {
        let index_key = email.to_lowercase();

        let txn = self.store.db().begin_write()?;
        let profile = {
            let index = txn.open_table(USER_EMAIL_INDEX)?;
            let existing_id = index.get(index_key.as_str())?.map(|v| v.value().to_string());
            drop(index);

            match existing_id {
                Some(id) => {
                    let table = txn.open_table(USER_PROFILES)?;
                    let raw = table
                        .get(id.as_str())?
                        .ok_or_else(|| StoreError::NotFound(format!("user {id}")))?;
                    serde_json::from_slice(raw.value())?
                }
                None => {
                    let now = Utc::now();
                    let profile = StoredUserProfile {
                        id: Uuid::new_v4(),
                        email: email.to_string(),
                        display_name: None,
                        profile_image: None,
                        wallet_address: None,
                        created_at: now,
                        updated_at: now,
                    };
                    let id = profile.id.to_string();
                    let raw = serde_json::to_vec(&profile)?;

                    let mut table = txn.open_table(USER_PROFILES)?;
                    table.insert(id.as_str(), raw.as_slice())?;
                    drop(table);

                    let mut index = txn.open_table(USER_EMAIL_INDEX)?;
                    index.insert(index_key.as_str(), id.as_str())?;

                    profile
                }
            }
        };
        txn.commit()?;

        Ok(profile)
    }

    /// Upsert a profile from the latest identity-provider values.
    ///
    /// Creates the row on first sign-in; later sign-ins refresh name,
    /// picture, and wallet address on the same row. Fields the provider
    /// did not send are left untouched.
    pub fn sync_identity(
        &self,
        email: &str,
        update: IdentityUpdate<'_>,
    ) -> StoreResult<StoredUserProfile> {
        let profile = self.get_or_create(email)?;

        let name_changed =
            update.name.is_some() && update.name != profile.display_name.as_deref();
        let picture_changed =
            update.picture.is_some() && update.picture != profile.profile_image.as_deref();
        let wallet_changed = update.wallet_address.is_some()
            && update.wallet_address != profile.wallet_address.as_deref();

        if !name_changed && !picture_changed && !wallet_changed {
            return Ok(profile);
        }

        self.update(profile.id, |stored| {
            if let Some(name) = update.name {
                stored.display_name = Some(name.to_string());
            }
            if let Some(picture) = update.picture {
                stored.profile_image = Some(picture.to_string());
            }
            if let Some(address) = update.wallet_address {
                stored.wallet_address = Some(address.to_string());
            }
            Ok(())
        })
    }

    pub fn get(&self, id: Uuid) -> StoreResult<StoredUserProfile> {
        let id = id.to_string();
        let txn = self.store.db().begin_read()?;
        let table = txn.open_table(USER_PROFILES)?;
        let raw = table
            .get(id.as_str())?
            .ok_or_else(|| StoreError::NotFound(format!("user {id}")))?;
        Ok(serde_json::from_slice(raw.value())?)
    }

    pub fn get_by_email(&self, email: &str) -> StoreResult<Option<StoredUserProfile>> {
        let index_key = email.to_lowercase();
        let txn = self.store.db().begin_read()?;
        let index = txn.open_table(USER_EMAIL_INDEX)?;
        let Some(id) = index.get(index_key.as_str())?.map(|v| v.value().to_string()) else {
            return Ok(None);
        };
        let table = txn.open_table(USER_PROFILES)?;
        let raw = table
            .get(id.as_str())?
            .ok_or_else(|| StoreError::NotFound(format!("user {id}")))?;
        Ok(Some(serde_json::from_slice(raw.value())?))
    }

    /// Record a wallet address on the profile. A no-op when the address is
    /// already the stored one.
    pub fn set_wallet_address(&self, id: Uuid, address: &str) -> StoreResult<StoredUserProfile> {
        self.update(id, |profile| {
            profile.wallet_address = Some(address.to_string());
            Ok(())
        })
    }

    pub fn set_display_name(&self, id: Uuid, name: Option<String>) -> StoreResult<StoredUserProfile> {
        self.update(id, |profile| {
            profile.display_name = name.clone();
            Ok(())
        })
    }

    fn update<F>(&self, id: Uuid, mut apply: F) -> StoreResult<StoredUserProfile>
    where
        F: FnMut(&mut StoredUserProfile) -> StoreResult<()>,
    {
        let key = id.to_string();
        let txn = self.store.db().begin_write()?;
        let profile = {
            let mut table = txn.open_table(USER_PROFILES)?;
            let raw = table
                .get(key.as_str())?
                .ok_or_else(|| StoreError::NotFound(format!("user {key}")))?;
            let mut profile: StoredUserProfile = serde_json::from_slice(raw.value())?;
            drop(raw);

            apply(&mut profile)?;
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

    fn repo() -> (TempDir, UserRepository) {
        let dir = TempDir::new().unwrap();
        let store = Store::open(&dir.path().join("test.redb")).unwrap();
        (dir, UserRepository::new(store))
    }

    #[test]
    fn get_or_create_is_idempotent_per_email() {
        let (_dir, repo) = repo();

        let first = repo.get_or_create("alice@example.com").unwrap();
        let second = repo.get_or_create("Alice@Example.com").unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.email, "alice@example.com");
    }

    #[test]
    fn sync_refreshes_provider_fields_on_the_same_row() {
        let (_dir, repo) = repo();

        let first = repo
            .sync_identity(
                "alice@example.com",
                IdentityUpdate {
                    name: Some("Alice"),
                    picture: Some("https://img.example/alice.png"),
                    wallet_address: None,
                },
            )
            .unwrap();
        assert_eq!(first.display_name.as_deref(), Some("Alice"));

        let second = repo
            .sync_identity(
                "alice@example.com",
                IdentityUpdate {
                    name: Some("Alice B."),
                    picture: Some("https://img.example/alice2.png"),
                    wallet_address: None,
                },
            )
            .unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.display_name.as_deref(), Some("Alice B."));
        assert_eq!(
            second.profile_image.as_deref(),
            Some("https://img.example/alice2.png")
        );
    }

    #[test]
    fn sync_leaves_missing_fields_untouched() {
        let (_dir, repo) = repo();

        repo.sync_identity(
            "bob@example.com",
            IdentityUpdate {
                name: Some("Bob"),
                picture: None,
                wallet_address: Some("So1Addr111"),
            },
        )
        .unwrap();

        let profile = repo
            .sync_identity("bob@example.com", IdentityUpdate::default())
            .unwrap();

        assert_eq!(profile.display_name.as_deref(), Some("Bob"));
        assert_eq!(profile.wallet_address.as_deref(), Some("So1Addr111"));
    }

    #[test]
    fn wallet_address_updates_when_it_differs() {
        let (_dir, repo) = repo();
        let profile = repo.get_or_create("bob@example.com").unwrap();

        repo.set_wallet_address(profile.id, "So1Addr111").unwrap();
        repo.set_wallet_address(profile.id, "So1Addr111").unwrap();
        let updated = repo.set_wallet_address(profile.id, "So1Addr222").unwrap();

        assert_eq!(updated.wallet_address.as_deref(), Some("So1Addr222"));
    }

    #[test]
    fn unknown_user_is_not_found() {
        let (_dir, repo) = repo();
        let err = repo.get(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
