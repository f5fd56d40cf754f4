// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{env, fs, net::SocketAddr, path::PathBuf};

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use intouch_server::api::router;
use intouch_server::auth::JwksManager;
use intouch_server::chain::{ChainClient, WalletProvider};
use intouch_server::config::{
    CHAIN_RPC_URL_ENV, DATA_DIR_ENV, DEFAULT_CHAIN_RPC_URL, DEFAULT_DATA_DIR, HOST_ENV,
    IDENTITY_AUDIENCE_ENV, IDENTITY_ISSUER_ENV, IDENTITY_JWKS_URL_ENV, LOG_FORMAT_ENV, PORT_ENV,
    WALLET_SECRET_ENV,
};
use intouch_server::state::{AppState, AuthConfig};
use intouch_server::storage::Store;

#[tokio::main]
async fn main() {
    init_tracing();

    let data_dir = PathBuf::from(env::var(DATA_DIR_ENV).unwrap_or_else(|_| DEFAULT_DATA_DIR.into()));
    fs::create_dir_all(&data_dir).expect("Failed to create data directory");
    let store =
        Store::open(&data_dir.join("intouch.redb")).expect("Failed to open embedded database");

    let rpc_url = env::var(CHAIN_RPC_URL_ENV).unwrap_or_else(|_| DEFAULT_CHAIN_RPC_URL.into());
    url::Url::parse(&rpc_url).expect("Invalid chain RPC URL");
    let chain = ChainClient::new(rpc_url.clone());

    let wallets = match env::var(WALLET_SECRET_ENV) {
        Ok(secret) => WalletProvider::new(&secret).expect("Invalid wallet secret"),
        Err(_) => {
            warn!("{WALLET_SECRET_ENV} not set; using an ephemeral secret, custodial wallet addresses will not survive a restart");
            let ephemeral = format!(
                "{}{}",
                uuid::Uuid::new_v4().simple(),
                uuid::Uuid::new_v4().simple()
            );
            WalletProvider::new(&ephemeral).expect("Ephemeral wallet secret")
        }
    };

    let auth_config = build_auth_config();
    let state = AppState::new(store, chain, wallets).with_auth_config(auth_config);
    let app = router(state);

    let host = env::var(HOST_ENV).unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var(PORT_ENV)
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .unwrap_or(8080);
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .expect("Failed to parse bind address");

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            wait_for_signal().await;
            info!("Shutdown signal received, draining connections");
            shutdown.cancel();
        }
    });

    info!(%addr, rpc_url, "InTouch server listening (docs at /docs)");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .expect("Server failed");
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    let json = env::var(LOG_FORMAT_ENV).as_deref() == Ok("json");
    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn build_auth_config() -> AuthConfig {
    let jwks = match env::var(IDENTITY_JWKS_URL_ENV) {
        Ok(url) => Some(JwksManager::new(url)),
        Err(_) => {
            warn!("{IDENTITY_JWKS_URL_ENV} not set; JWT signatures will NOT be verified (development mode)");
            None
        }
    };

    AuthConfig {
        jwks,
        issuer: env::var(IDENTITY_ISSUER_ENV).ok(),
        audience: env::var(IDENTITY_AUDIENCE_ENV).ok(),
    }
}

async fn wait_for_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
