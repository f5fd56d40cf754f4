// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for the three identity states.
//!
//! Handlers declare the weakest state they accept:
//!
//! ```rust,ignore
//! async fn profile(Auth(user): Auth) -> impl IntoResponse { ... }
//! async fn unlock(WalletAuth(user): WalletAuth) -> impl IntoResponse { ... }
//! async fn directory(MaybeAuth(identity): MaybeAuth) -> impl IntoResponse { ... }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{decode, decode_header, Validation};

use super::claims::IdentityClaims;
use super::{AuthenticatedUser, AuthError, Identity};
use crate::state::AppState;

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Extractor requiring a valid token, with or without a wallet.
pub struct Auth(pub AuthenticatedUser);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingAuthHeader)?
            .to_str()
            .map_err(|_| AuthError::InvalidAuthHeader)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidAuthHeader)?;

        let user = verify_jwt(token, &state.auth_config).await?;

        Ok(Auth(user))
    }
}

/// Extractor requiring a valid token that carries a wallet claim.
///
/// Rejects with 403 `wallet_required` when the account is authenticated
/// but has not provisioned a wallet yet.
pub struct WalletAuth(pub AuthenticatedUser);

impl WalletAuth {
    pub fn wallet_address(&self) -> &str {
        // Guaranteed by construction.
        self.0.wallet_address.as_deref().unwrap_or_default()
    }
}

impl FromRequestParts<AppState> for WalletAuth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Auth(user) = Auth::from_request_parts(parts, state).await?;

        if !user.has_wallet() {
            return Err(AuthError::WalletRequired);
        }

        Ok(WalletAuth(user))
    }
}

/// Extractor that never rejects; yields the full [`Identity`] tri-state.
///
/// Used by public endpoints that behave differently for signed-in callers.
pub struct MaybeAuth(pub Identity);

impl FromRequestParts<AppState> for MaybeAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match Auth::from_request_parts(parts, state).await {
            Ok(Auth(user)) => Ok(MaybeAuth(Identity::from_user(user))),
            Err(_) => Ok(MaybeAuth(Identity::Unauthenticated)),
        }
    }
}

/// Verify a JWT and extract the identity.
///
/// In production mode (JWKS configured) the signature is verified against
/// the provider JWKS. In development mode only the structure and expiry
/// are checked.
async fn verify_jwt(
    token: &str,
    auth_config: &crate::state::AuthConfig,
) -> Result<AuthenticatedUser, AuthError> {
    let claims = if let Some(ref jwks) = auth_config.jwks {
        verify_jwt_production(token, jwks, auth_config).await?
    } else {
        verify_jwt_development(token)?
    };

    let email = claims
        .email
        .clone()
        .ok_or(AuthError::MissingEmailClaim)?;

    Ok(AuthenticatedUser::from_claims(claims, email))
}

async fn verify_jwt_production(
    token: &str,
    jwks: &super::JwksManager,
    auth_config: &crate::state::AuthConfig,
) -> Result<IdentityClaims, AuthError> {
    let header = decode_header(token).map_err(|_| AuthError::MalformedToken)?;

    let (decoding_key, algorithm) = if let Some(kid) = &header.kid {
        jwks.get_decoding_key(kid).await?
    } else {
        jwks.get_any_decoding_key().await?
    };

    let mut validation = Validation::new(algorithm);
    validation.leeway = CLOCK_SKEW_LEEWAY;

    if let Some(ref issuer) = auth_config.issuer {
        validation.set_issuer(&[issuer]);
    }

    if let Some(ref audience) = auth_config.audience {
        validation.set_audience(&[audience]);
    } else {
        validation.validate_aud = false;
    }

    let token_data =
        decode::<IdentityClaims>(token, &decoding_key, &validation).map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::InvalidSignature,
            jsonwebtoken::errors::ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
            jsonwebtoken::errors::ErrorKind::InvalidAudience => AuthError::InvalidAudience,
            jsonwebtoken::errors::ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
            _ => AuthError::MalformedToken,
        })?;

    Ok(token_data.claims)
}

/// Development verification (no signature check).
///
/// WARNING: only for development environments.
fn verify_jwt_development(token: &str) -> Result<IdentityClaims, AuthError> {
    let token_data = jsonwebtoken::dangerous::insecure_decode::<IdentityClaims>(token)
        .map_err(|_| AuthError::MalformedToken)?;

    let claims = token_data.claims;

    let now = chrono::Utc::now().timestamp();
    if claims.exp > 0 && claims.exp < now - CLOCK_SKEW_LEEWAY as i64 {
        return Err(AuthError::TokenExpired);
    }

    Ok(claims)
}
