use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::db_types::{Account, NewAccount, TokenUpdate};

#[derive(Debug, Clone, Error)]
pub enum AccountStoreError {
    #[error("Could not access the account database. {0}")]
    DatabaseError(String),
    #[error("Account does not exist: {0}")]
    AccountNotFound(String),
}

/// Storage for seller accounts, their credentials and their sync watermarks.
#[allow(async_fn_in_trait)]
pub trait AccountStore {
    /// All accounts currently participating in sync, in insertion order.
    async fn fetch_enabled_accounts(&self) -> Result<Vec<Account>, AccountStoreError>;

    async fn fetch_account_by_shop_id(&self, shop_id: &str) -> Result<Account, AccountStoreError>;

    /// Register a new account. Fails if the shop id is already present.
    async fn insert_account(&self, account: NewAccount) -> Result<i64, AccountStoreError>;

    /// Persist a freshly issued token pair. Must complete before the new access token is
    /// used for any remote call, so that a crash cannot strand a rotated refresh token.
    async fn update_tokens(&self, shop_id: &str, update: &TokenUpdate) -> Result<(), AccountStoreError>;

    /// Advance the sync watermarks after a fully successful account pass. `None` leaves the
    /// corresponding watermark untouched.
    async fn update_watermarks(
        &self,
        shop_id: &str,
        last_new_sync: Option<DateTime<Utc>>,
        last_modified_sync: Option<DateTime<Utc>>,
    ) -> Result<(), AccountStoreError>;
}
