//! `SqliteDatabase` is the concrete SQLite backend for the sync engine.
//!
//! It implements all the storage traits defined in the [`crate::traits`] module over a single
//! connection pool.
use std::fmt::Debug;

use chrono::{DateTime, NaiveDate, Utc};
use log::*;
use mos_common::Money;
use sqlx::SqlitePool;

use super::db::{accounts, db_url, exchange_rates, new_pool, orders};
use crate::{
    db_types::{Account, ExchangeRate, MappedOrder, NewAccount, OrderId, OrderRecord, TokenUpdate},
    finance::DerivedFields,
    traits::{AccountStore, AccountStoreError, ExchangeRateError, ExchangeRates, OrderStore, OrderStoreError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the url from the environment.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date by applying any pending embedded migrations.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("📝️ Applying pending database migrations");
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

impl From<sqlx::Error> for AccountStoreError {
    fn from(e: sqlx::Error) -> Self {
        AccountStoreError::DatabaseError(e.to_string())
    }
}

impl From<sqlx::Error> for OrderStoreError {
    fn from(e: sqlx::Error) -> Self {
        OrderStoreError::DatabaseError(e.to_string())
    }
}

impl AccountStore for SqliteDatabase {
    async fn fetch_enabled_accounts(&self) -> Result<Vec<Account>, AccountStoreError> {
        let mut conn = self.pool.acquire().await?;
        let result = accounts::fetch_enabled_accounts(&mut conn).await?;
        Ok(result)
    }

    async fn fetch_account_by_shop_id(&self, shop_id: &str) -> Result<Account, AccountStoreError> {
        let mut conn = self.pool.acquire().await?;
        accounts::fetch_account_by_shop_id(shop_id, &mut conn)
            .await?
            .ok_or_else(|| AccountStoreError::AccountNotFound(shop_id.to_string()))
    }

    async fn insert_account(&self, account: NewAccount) -> Result<i64, AccountStoreError> {
        let mut conn = self.pool.acquire().await?;
        let id = accounts::insert_account(account, &mut conn).await?;
        Ok(id)
    }

    async fn update_tokens(&self, shop_id: &str, update: &TokenUpdate) -> Result<(), AccountStoreError> {
        let mut conn = self.pool.acquire().await?;
        accounts::update_tokens(shop_id, update, &mut conn).await?;
        Ok(())
    }

    async fn update_watermarks(
        &self,
        shop_id: &str,
        last_new_sync: Option<DateTime<Utc>>,
        last_modified_sync: Option<DateTime<Utc>>,
    ) -> Result<(), AccountStoreError> {
        let mut conn = self.pool.acquire().await?;
        accounts::update_watermarks(shop_id, last_new_sync, last_modified_sync, &mut conn).await?;
        Ok(())
    }
}

impl OrderStore for SqliteDatabase {
    async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<OrderRecord>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let result = orders::fetch_order_by_order_id(order_id, &mut conn).await?;
        Ok(result)
    }

    async fn insert_order(&self, order: &MappedOrder) -> Result<i64, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let id = orders::insert_order(order, &mut conn).await?;
        Ok(id)
    }

    async fn update_order(&self, order: &OrderRecord) -> Result<(), OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::update_order(order, &mut conn).await?;
        Ok(())
    }

    async fn latest_order_creation(&self, account_id: i64) -> Result<Option<DateTime<Utc>>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let result = orders::latest_order_creation(account_id, &mut conn).await?;
        Ok(result)
    }

    async fn save_derived(&self, order_pk: i64, derived: &DerivedFields) -> Result<(), OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::save_derived(order_pk, derived, &mut conn).await?;
        Ok(())
    }

    async fn set_fee(&self, order_pk: i64, fee: Money, fee_usd: Money) -> Result<(), OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::set_fee(order_pk, fee, fee_usd, &mut conn).await?;
        Ok(())
    }

    async fn set_ad_fee(&self, order_pk: i64, ad_fee: Money) -> Result<(), OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::set_ad_fee(order_pk, ad_fee, &mut conn).await?;
        Ok(())
    }

    async fn set_earnings(&self, order_pk: i64, earnings: Money, earnings_usd: Money) -> Result<(), OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::set_earnings(order_pk, earnings, earnings_usd, &mut conn).await?;
        Ok(())
    }

    async fn set_cost_inputs(
        &self,
        order_pk: i64,
        pre_tax_cost: Money,
        estimated_tax: Money,
    ) -> Result<(), OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::set_cost_inputs(order_pk, pre_tax_cost, estimated_tax, &mut conn).await?;
        Ok(())
    }
}

impl ExchangeRates for SqliteDatabase {
    async fn fetch_rate_at(&self, ledger: &str, date: NaiveDate) -> Result<ExchangeRate, ExchangeRateError> {
        let mut conn = self.pool.acquire().await.map_err(|e| ExchangeRateError::DatabaseError(e.to_string()))?;
        exchange_rates::fetch_rate_at(ledger, date, &mut conn).await
    }

    async fn fetch_last_rate(&self, ledger: &str) -> Result<ExchangeRate, ExchangeRateError> {
        let mut conn = self.pool.acquire().await.map_err(|e| ExchangeRateError::DatabaseError(e.to_string()))?;
        exchange_rates::fetch_last_rate(ledger, &mut conn).await
    }

    async fn set_exchange_rate(&self, rate: &ExchangeRate) -> Result<(), ExchangeRateError> {
        let mut conn = self.pool.acquire().await.map_err(|e| ExchangeRateError::DatabaseError(e.to_string()))?;
        exchange_rates::set_exchange_rate(rate, &mut conn).await
    }

    async fn has_rates(&self, ledger: &str) -> Result<bool, ExchangeRateError> {
        let mut conn = self.pool.acquire().await.map_err(|e| ExchangeRateError::DatabaseError(e.to_string()))?;
        exchange_rates::has_rates(ledger, &mut conn).await
    }
}
