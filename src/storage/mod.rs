// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Persistent Storage Module
//!
//! All application state lives in a single embedded [`redb`] database under
//! the data directory. The database is the source of truth for profiles,
//! paid connections, and message history; nothing is kept client-side.
//!
//! ## Storage Layout
//!
//! ```text
//! {DATA_DIR}/
//!   intouch.redb       # profiles, connections, messages
//! ```
//!
//! ## Key Design
//!
//! - Profiles are keyed by their UUID.
//! - Secondary indexes (email, username) map a lowercased lookup value to
//!   the owning UUID.
//! - A paid connection is keyed by `{user_id}|{creator_id}`, so the pair
//!   itself is the primary key and a duplicate unlock is a plain key
//!   collision rather than a race to be detected after the fact.
//! - Messages are keyed by `{user_id}|{creator_id}|{ts_be}|{message_id}`
//!   where `ts_be` is the big-endian creation timestamp in milliseconds,
//!   so a prefix range scan yields one thread in chronological order.

pub mod db;
pub mod repository;

pub use db::{Store, StoreError, StoreResult};
pub use repository::{
    ConnectionRepository, CreatorRepository, IdentityUpdate, MessageRepository, SenderRole,
    StoredConnection, StoredCreatorProfile, StoredMessage, StoredUserProfile, UserRepository,
};
