use chrono::{DateTime, Utc};
use mos_common::Money;
use thiserror::Error;

use crate::{
    db_types::{MappedOrder, OrderId, OrderRecord},
    finance::DerivedFields,
};

#[derive(Debug, Clone, Error)]
pub enum OrderStoreError {
    #[error("Could not access the order database. {0}")]
    DatabaseError(String),
    #[error("Order does not exist: {0}")]
    OrderNotFound(String),
}

/// Storage for the local order mirror.
///
/// Raw marketplace facts and derived financial fields are written along separate paths, so
/// that a reconciliation pass can never clobber a recalculation and vice versa.
#[allow(async_fn_in_trait)]
pub trait OrderStore {
    async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<OrderRecord>, OrderStoreError>;

    /// Insert a first-seen order and return its primary key.
    async fn insert_order(&self, order: &MappedOrder) -> Result<i64, OrderStoreError>;

    /// Overwrite the remote-sourced fields of an existing record from a merged copy.
    /// Derived fields and manual inputs on the row are left alone.
    async fn update_order(&self, order: &OrderRecord) -> Result<(), OrderStoreError>;

    /// Creation time of the newest locally stored order for the account, if any.
    async fn latest_order_creation(&self, account_id: i64) -> Result<Option<DateTime<Utc>>, OrderStoreError>;

    /// Write the output of a financial recalculation in one shot.
    async fn save_derived(&self, order_pk: i64, derived: &DerivedFields) -> Result<(), OrderStoreError>;

    /// Store an aggregated marketplace fee and its USD mirror.
    async fn set_fee(&self, order_pk: i64, fee: Money, fee_usd: Money) -> Result<(), OrderStoreError>;

    async fn set_ad_fee(&self, order_pk: i64, ad_fee: Money) -> Result<(), OrderStoreError>;

    /// Manually supply the true earnings figure (used after a partial refund).
    async fn set_earnings(&self, order_pk: i64, earnings: Money, earnings_usd: Money) -> Result<(), OrderStoreError>;

    async fn set_cost_inputs(
        &self,
        order_pk: i64,
        pre_tax_cost: Money,
        estimated_tax: Money,
    ) -> Result<(), OrderStoreError>;
}
