#![allow(dead_code)]
//! Shared scaffolding for the integration tests: throwaway SQLite databases and a scripted
//! in-memory stand-in for the marketplace API.
use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use chrono::{DateTime, Duration, Utc};
use marketplace_tools::{
    fold_fee_map, FeeMap, FetchOutcome, FilterExpr, LedgerEntry, MarketplaceApiError, RemoteOrder, TokenResponse,
};
pub use order_sync_engine::test_utils::prepare_env::{prepare_test_env, random_db_path};
use order_sync_engine::{
    db_types::NewAccount,
    traits::{AccountStore, RemoteSource},
    SqliteDatabase,
};

/// Insert a ready-to-sync account with a fresh token and return its database id.
pub async fn seed_account(db: &SqliteDatabase, shop_id: &str, initial_sync_days: i64) -> i64 {
    let now = Utc::now();
    let account = NewAccount {
        shop_id: shop_id.to_string(),
        name: format!("Shop {shop_id}"),
        access_token: format!("at-{shop_id}"),
        refresh_token: format!("rt-{shop_id}"),
        expires_in: 3600,
        token_issued_at: now,
        initial_sync_start: now - Duration::days(initial_sync_days),
    };
    db.insert_account(account).await.expect("Error inserting account")
}

/// Insert an account whose access token is already expired, forcing a refresh on the next
/// pass.
pub async fn seed_account_with_stale_token(db: &SqliteDatabase, shop_id: &str) -> i64 {
    let now = Utc::now();
    let account = NewAccount {
        shop_id: shop_id.to_string(),
        name: format!("Shop {shop_id}"),
        access_token: format!("at-{shop_id}"),
        refresh_token: format!("rt-{shop_id}"),
        expires_in: 0,
        token_issued_at: now - Duration::hours(1),
        initial_sync_start: now - Duration::days(30),
    };
    db.insert_account(account).await.expect("Error inserting account")
}

#[derive(Default)]
struct FakeState {
    orders: HashMap<String, Vec<RemoteOrder>>,
    ledger: HashMap<String, Vec<LedgerEntry>>,
    revoked_refresh_tokens: HashSet<String>,
    refresh_count: usize,
}

/// A scripted marketplace. Every filter returns the shop's full order list; the reconciler's
/// modified-clock guard makes re-deliveries harmless, exactly as with the real API.
#[derive(Clone, Default)]
pub struct FakeSource {
    state: Arc<Mutex<FakeState>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_orders(&self, shop_id: &str, orders: Vec<RemoteOrder>) {
        self.state.lock().unwrap().orders.insert(shop_id.to_string(), orders);
    }

    pub fn set_ledger(&self, shop_id: &str, entries: Vec<LedgerEntry>) {
        self.state.lock().unwrap().ledger.insert(shop_id.to_string(), entries);
    }

    pub fn revoke_refresh_token(&self, refresh_token: &str) {
        self.state.lock().unwrap().revoked_refresh_tokens.insert(refresh_token.to_string());
    }

    pub fn refresh_count(&self) -> usize {
        self.state.lock().unwrap().refresh_count
    }
}

impl RemoteSource for FakeSource {
    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, MarketplaceApiError> {
        let mut state = self.state.lock().unwrap();
        if state.revoked_refresh_tokens.contains(refresh_token) {
            return Err(MarketplaceApiError::Unauthorized("refresh grant rejected".to_string()));
        }
        state.refresh_count += 1;
        let n = state.refresh_count;
        Ok(TokenResponse {
            access_token: format!("fresh-at-{n}"),
            refresh_token: format!("fresh-rt-{n}"),
            expires_in: 3600,
        })
    }

    async fn fetch_orders(&self, _token: &str, shop_id: &str, _filter: &FilterExpr) -> FetchOutcome<RemoteOrder> {
        let state = self.state.lock().unwrap();
        let items = state.orders.get(shop_id).cloned().unwrap_or_default();
        FetchOutcome { items, complete: true, pages: 1 }
    }

    async fn build_fee_map(&self, _token: &str, shop_id: &str, _since: DateTime<Utc>) -> FeeMap {
        let state = self.state.lock().unwrap();
        let entries = state.ledger.get(shop_id).cloned().unwrap_or_default();
        fold_fee_map(&entries, true)
    }
}

/// A minimal paid order on the reference marketplace.
pub fn us_order(order_id: &str, created_at: i64, earnings: &str) -> RemoteOrder {
    RemoteOrder {
        order_id: order_id.to_string(),
        created_at,
        modified_at: created_at,
        payment_status: "paid".to_string(),
        marketplace: "US".to_string(),
        currency: "USD".to_string(),
        line_items: vec![marketplace_tools::RemoteLineItem {
            title: "Walnut box".to_string(),
            sku: Some("WB-12".to_string()),
            quantity: 1,
        }],
        subtotal: "90.00".to_string(),
        shipping: "10.00".to_string(),
        tax: "8.00".to_string(),
        grand_total: "108.00".to_string(),
        earnings: Some(earnings.to_string()),
        ..RemoteOrder::default()
    }
}

pub fn ledger_fee(id: i64, order_id: &str, amount: &str) -> LedgerEntry {
    LedgerEntry {
        id,
        kind: "transaction_fee".to_string(),
        direction: "charge".to_string(),
        amount: amount.to_string(),
        currency: "USD".to_string(),
        posted_at: Utc::now().timestamp(),
        order_ids: vec![order_id.to_string()],
    }
}
