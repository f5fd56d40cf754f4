// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared application state.

use crate::auth::JwksManager;
use crate::chain::{ChainClient, WalletProvider};
use crate::events::EventBus;
use crate::session::SessionStore;
use crate::storage::{
    ConnectionRepository, CreatorRepository, MessageRepository, Store, UserRepository,
};

/// Authentication configuration.
///
/// With `jwks` set the server verifies token signatures against the
/// identity provider; without it, development mode skips verification.
#[derive(Clone, Default)]
pub struct AuthConfig {
    pub jwks: Option<JwksManager>,
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

#[derive(Clone)]
pub struct AppState {
    pub users: UserRepository,
    pub creators: CreatorRepository,
    pub connections: ConnectionRepository,
    pub messages: MessageRepository,
    pub chain: ChainClient,
    pub wallets: WalletProvider,
    pub sessions: SessionStore,
    pub events: EventBus,
    pub auth_config: AuthConfig,
}

impl AppState {
    pub fn new(store: Store, chain: ChainClient, wallets: WalletProvider) -> Self {
        Self {
            users: UserRepository::new(store.clone()),
            creators: CreatorRepository::new(store.clone()),
            connections: ConnectionRepository::new(store.clone()),
            messages: MessageRepository::new(store),
            chain,
            wallets,
            sessions: SessionStore::new(),
            events: EventBus::new(),
            auth_config: AuthConfig::default(),
        }
    }

    pub fn with_auth_config(mut self, auth_config: AuthConfig) -> Self {
        self.auth_config = auth_config;
        self
    }

    /// State backed by a fresh database in `dir`, with a localhost RPC
    /// endpoint nothing will dial during unit tests.
    #[cfg(test)]
    pub fn for_tests(dir: &std::path::Path) -> Self {
        let store = Store::open(&dir.join("test.redb")).expect("Failed to open test store");
        let chain = ChainClient::new("http://127.0.0.1:0".to_string());
        let wallets = WalletProvider::new("test-wallet-secret-0123456789abcdef")
            .expect("Failed to create test wallet provider");
        Self::new(store, chain, wallets)
    }
}
