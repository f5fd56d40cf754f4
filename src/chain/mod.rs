// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Chain Module
//!
//! Solana JSON-RPC client, transfer transaction construction, and the
//! custodial signing wallet. The chain node is an external boundary: this
//! module talks to it over HTTP and never holds chain state of its own.

pub mod client;
pub mod tx;
pub mod wallet;

pub use client::{ChainClient, ChainError, ChainResult, LatestBlockhash};
pub use tx::{build_transfer, TxError};
pub use wallet::{DerivedWallet, SigningWallet, WalletError, WalletProvider};

/// Lamports per whole token.
pub const LAMPORTS_PER_TOKEN: u64 = 1_000_000_000;

const TOKEN_DECIMALS: u32 = 9;

/// Parse a decimal token amount (e.g. "0.05") into lamports.
///
/// Rejects malformed input, more than 9 fractional digits, zero, and
/// anything that overflows u64.
pub fn parse_amount(amount: &str) -> Result<u64, String> {
    let amount = amount.trim();
    if amount.is_empty() {
        return Err("amount is empty".to_string());
    }

    let (whole, frac) = match amount.split_once('.') {
        Some((w, f)) => (w, f),
        None => (amount, ""),
    };

    if whole.is_empty() && frac.is_empty() {
        return Err("amount is malformed".to_string());
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("amount {amount} is not a decimal number"));
    }
    if frac.len() > TOKEN_DECIMALS as usize {
        return Err(format!(
            "amount {amount} has more than {TOKEN_DECIMALS} decimal places"
        ));
    }

    let whole_part: u64 = if whole.is_empty() {
        0
    } else {
        whole
            .parse()
            .map_err(|_| format!("amount {amount} is too large"))?
    };

    let frac_part: u64 = if frac.is_empty() {
        0
    } else {
        let padded = format!("{frac:0<9}");
        padded
            .parse()
            .map_err(|_| format!("amount {amount} is malformed"))?
    };

    let lamports = whole_part
        .checked_mul(LAMPORTS_PER_TOKEN)
        .and_then(|v| v.checked_add(frac_part))
        .ok_or_else(|| format!("amount {amount} is too large"))?;

    if lamports == 0 {
        return Err("amount must be positive".to_string());
    }

    Ok(lamports)
}

/// Format lamports as a decimal token string with trailing zeros trimmed.
pub fn format_amount(lamports: u64) -> String {
    let whole = lamports / LAMPORTS_PER_TOKEN;
    let frac = lamports % LAMPORTS_PER_TOKEN;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{frac:09}");
    format!("{whole}.{}", frac.trim_end_matches('0'))
}
