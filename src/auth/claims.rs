// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and the authenticated identity representation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Claims carried by an identity-provider JWT.
///
/// The provider issues standard OIDC claims plus a custom `wallet` claim
/// once a wallet has been attached to the account.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityClaims {
    /// Subject, the provider's canonical user identifier.
    pub sub: String,

    /// Email the account logged in with.
    #[serde(default)]
    pub email: Option<String>,

    /// Display name from the provider profile.
    #[serde(default)]
    pub name: Option<String>,

    /// Avatar URL from the provider profile.
    #[serde(default)]
    pub picture: Option<String>,

    /// Expiration timestamp.
    #[serde(default)]
    pub exp: i64,

    /// Issuer.
    #[serde(default)]
    pub iss: String,

    /// Audience (validated by the jsonwebtoken crate, not read directly).
    #[serde(default)]
    #[allow(dead_code)]
    pub aud: Option<serde_json::Value>,

    /// Wallet claim, present once the account has a wallet.
    #[serde(default)]
    pub wallet: Option<WalletClaim>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletClaim {
    /// Base58 wallet address.
    pub address: String,
}

/// Authenticated identity extracted from a verified JWT.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthenticatedUser {
    /// Provider subject identifier.
    pub subject: String,

    /// Account email, used to resolve the local profile.
    pub email: String,

    /// Display name from the provider profile.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Avatar URL from the provider profile.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,

    /// Wallet address from the token, if the account has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,

    /// Original issuer (kept for logging, not serialized).
    #[serde(skip)]
    pub issuer: String,

    /// Token expiration (kept for logging, not serialized).
    #[serde(skip)]
    pub expires_at: i64,
}

impl AuthenticatedUser {
    pub fn from_claims(claims: IdentityClaims, email: String) -> Self {
        Self {
            subject: claims.sub,
            email,
            name: claims.name,
            picture: claims.picture,
            wallet_address: claims.wallet.map(|w| w.address),
            issuer: claims.iss,
            expires_at: claims.exp,
        }
    }

    pub fn has_wallet(&self) -> bool {
        self.wallet_address.is_some()
    }
}

/// The three identity states a request can be in.
///
/// There is no partially-authenticated shape to probe: a handler matches
/// on the variant and gets exactly the data that state guarantees.
#[derive(Debug, Clone)]
pub enum Identity {
    /// No token, or a token that failed verification.
    Unauthenticated,

    /// Valid token, no wallet claim.
    Authenticated(AuthenticatedUser),

    /// Valid token with a wallet claim.
    WithWallet(AuthenticatedUser),
}

impl Identity {
    pub fn from_user(user: AuthenticatedUser) -> Self {
        if user.has_wallet() {
            Identity::WithWallet(user)
        } else {
            Identity::Authenticated(user)
        }
    }

    /// The authenticated user, whichever wallet state they are in.
    pub fn user(&self) -> Option<&AuthenticatedUser> {
        match self {
            Identity::Unauthenticated => None,
            Identity::Authenticated(user) | Identity::WithWallet(user) => Some(user),
        }
    }

    pub fn wallet_address(&self) -> Option<&str> {
        match self {
            Identity::WithWallet(user) => user.wallet_address.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_claims(wallet: Option<&str>) -> IdentityClaims {
        IdentityClaims {
            sub: "user_123".to_string(),
            email: Some("alice@example.com".to_string()),
            name: Some("Alice".to_string()),
            picture: None,
            exp: 1700003600,
            iss: "https://auth.example.com".to_string(),
            aud: None,
            wallet: wallet.map(|a| WalletClaim {
                address: a.to_string(),
            }),
        }
    }

    #[test]
    fn identity_state_follows_wallet_claim() {
        let without = AuthenticatedUser::from_claims(
            sample_claims(None),
            "alice@example.com".to_string(),
        );
        assert!(matches!(
            Identity::from_user(without),
            Identity::Authenticated(_)
        ));

        let with = AuthenticatedUser::from_claims(
            sample_claims(Some("So1Addr111")),
            "alice@example.com".to_string(),
        );
        let identity = Identity::from_user(with);
        assert!(matches!(identity, Identity::WithWallet(_)));
        assert_eq!(identity.wallet_address(), Some("So1Addr111"));
    }

    #[test]
    fn unauthenticated_has_no_user() {
        let identity = Identity::Unauthenticated;
        assert!(identity.user().is_none());
        assert!(identity.wallet_address().is_none());
    }
}
