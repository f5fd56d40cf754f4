// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! InTouch - Pay-to-Unlock Creator Messaging Service
//!
//! Supporters pay a one-time, per-creator fee (a native token transfer on a
//! Solana-style chain) to unlock a private message thread with that creator.
//! Payments are settled from custodial wallets derived server-side per user.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - End-user authentication (hosted identity provider JWTs)
//! - `chain` - Chain RPC client, transaction building, custodial wallets
//! - `session` - Server-side creator dashboard sessions
//! - `storage` - Embedded database (redb) and repositories
//! - `unlock` - The paid-unlock flow tying payment to connection

pub mod api;
pub mod auth;
pub mod chain;
pub mod config;
pub mod error;
pub mod events;
pub mod session;
pub mod state;
pub mod storage;
pub mod unlock;
