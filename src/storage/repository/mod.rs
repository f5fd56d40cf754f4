// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Typed repositories over the embedded database.
//!
//! Each repository wraps the shared [`Store`](super::Store) handle and owns
//! the serialization and key layout for one entity family.

pub mod connections;
pub mod creators;
pub mod messages;
pub mod users;

pub use connections::{ConnectionRepository, StoredConnection};
pub use creators::{CreatorRepository, StoredCreatorProfile};
pub use messages::{MessageRepository, SenderRole, StoredMessage};
pub use users::{IdentityUpdate, StoredUserProfile, UserRepository};
