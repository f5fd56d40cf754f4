// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration Constants
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Root directory for the embedded database | `/data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `CHAIN_RPC_URL` | Chain JSON-RPC endpoint | devnet public endpoint |
//! | `IDENTITY_JWKS_URL` | Identity provider JWKS endpoint for JWT verification | Required for production |
//! | `IDENTITY_ISSUER` | Expected JWT issuer claim | Required for production |
//! | `IDENTITY_AUDIENCE` | Expected JWT audience claim | Optional |
//! | `WALLET_SECRET` | Server secret for custodial key derivation | Required for payments |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

/// Environment variable name for the data directory path.
///
/// The embedded database file (`intouch.redb`) lives under this directory.
///
/// # Default
/// `/data`
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Default data directory when `DATA_DIR` is unset.
pub const DEFAULT_DATA_DIR: &str = "/data";

/// Environment variable name for the server bind address.
pub const HOST_ENV: &str = "HOST";

/// Environment variable name for the server bind port.
pub const PORT_ENV: &str = "PORT";

/// Environment variable name for the chain JSON-RPC endpoint.
pub const CHAIN_RPC_URL_ENV: &str = "CHAIN_RPC_URL";

/// Default chain JSON-RPC endpoint when `CHAIN_RPC_URL` is unset (devnet).
pub const DEFAULT_CHAIN_RPC_URL: &str = "https://api.devnet.solana.com";

/// Environment variable name for the identity provider JWKS endpoint.
///
/// When set, JWTs are fully verified against the provider's published keys.
/// When unset, the server runs in development mode and only validates token
/// structure and expiry.
pub const IDENTITY_JWKS_URL_ENV: &str = "IDENTITY_JWKS_URL";

/// Environment variable name for the expected JWT issuer claim.
pub const IDENTITY_ISSUER_ENV: &str = "IDENTITY_ISSUER";

/// Environment variable name for the expected JWT audience claim.
pub const IDENTITY_AUDIENCE_ENV: &str = "IDENTITY_AUDIENCE";

/// Environment variable name for the custodial wallet derivation secret.
///
/// Per-user signing keys are derived from this secret; rotating it rotates
/// every custodial wallet address. When unset, an ephemeral secret is
/// generated at startup and wallet addresses change on every restart.
pub const WALLET_SECRET_ENV: &str = "WALLET_SECRET";

/// Environment variable name for the logging format (`json` or `pretty`).
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";
