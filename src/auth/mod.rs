// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! JWT authentication against the external identity provider.
//!
//! ## Auth Flow
//!
//! 1. The client authenticates with the identity provider and obtains a JWT
//! 2. The client sends `Authorization: Bearer <JWT>`
//! 3. This server:
//!    - Fetches the provider JWKS via HTTPS
//!    - Verifies signature, expiry, issuer, audience
//!    - Extracts `sub`, `email`, and the optional `wallet` claim
//!
//! ## Identity States
//!
//! A request is in exactly one of three states, modelled by [`Identity`]:
//! no valid token, a valid token without a wallet claim, or a valid token
//! with one. Handlers take the extractor matching the weakest state they
//! accept; there is no duck-typing on the shape of the user object.
//!
//! ## Security
//!
//! - JWKS is fetched over HTTPS and cached with a TTL
//! - Clock skew tolerance is 60 seconds
//! - Without a JWKS URL the server runs in development mode and skips
//!   signature verification

pub mod claims;
pub mod error;
pub mod extractor;
pub mod jwks;

pub use claims::{AuthenticatedUser, Identity};
pub use error::AuthError;
pub use extractor::{Auth, MaybeAuth, WalletAuth};
pub use jwks::JwksManager;
