//! The AdminApi handles the manual-edit surface: single-order recalculation, ad spend,
//! supplier cost inputs, and the post-refund earnings entry. Every write re-runs the
//! financial pipeline for the affected order.

use std::fmt::Debug;

use log::*;
use mos_common::Money;

use crate::{
    db_types::{OrderId, OrderRecord, PaymentStatus},
    finance::{recalculate, resolve_settlement_rate, DerivedFields, FinanceInputs, FinancePolicy},
    sync::SyncError,
    traits::{ExchangeRates, OrderStore},
};

pub struct AdminApi<B> {
    db: B,
    policy: FinancePolicy,
}

impl<B> Debug for AdminApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AdminApi")
    }
}

impl<B> AdminApi<B>
where B: OrderStore + ExchangeRates
{
    pub fn new(db: B, policy: FinancePolicy) -> Self {
        Self { db, policy }
    }

    async fn fetch_order(&self, order_id: &OrderId) -> Result<OrderRecord, SyncError> {
        self.db
            .fetch_order_by_order_id(order_id)
            .await?
            .ok_or_else(|| SyncError::OrderNotFound(order_id.as_str().to_string()))
    }

    async fn recompute_and_save(&self, order: &OrderRecord) -> Result<DerivedFields, SyncError> {
        let rate = resolve_settlement_rate(&self.db, &self.policy, order.created_at.date_naive()).await?;
        let inputs = FinanceInputs::from_order(order, rate);
        let derived = recalculate(&inputs, &self.policy);
        self.db.save_derived(order.id, &derived).await?;
        Ok(derived)
    }

    /// Recompute the derived financial fields for one order.
    pub async fn recalculate_order(&self, order_id: &OrderId) -> Result<DerivedFields, SyncError> {
        let order = self.fetch_order(order_id).await?;
        let derived = self.recompute_and_save(&order).await?;
        info!("🧮️ Order {order_id} recalculated");
        Ok(derived)
    }

    pub async fn set_ad_fee(&self, order_id: &OrderId, ad_fee: Money) -> Result<DerivedFields, SyncError> {
        let mut order = self.fetch_order(order_id).await?;
        self.db.set_ad_fee(order.id, ad_fee).await?;
        order.ad_fee = Some(ad_fee);
        let derived = self.recompute_and_save(&order).await?;
        info!("🧮️ Ad fee for order {order_id} set to {ad_fee}");
        Ok(derived)
    }

    /// Enter the true earnings figure for a partially refunded order. Rejected for any other
    /// payment status; those records' earnings come from the marketplace.
    pub async fn set_earnings(&self, order_id: &OrderId, earnings: Money) -> Result<DerivedFields, SyncError> {
        let mut order = self.fetch_order(order_id).await?;
        if order.payment_status != PaymentStatus::PartiallyRefunded {
            return Err(SyncError::Invalid(format!(
                "Earnings can only be entered manually for partially refunded orders. Order {order_id} is {}",
                order.payment_status
            )));
        }
        let earnings_usd = earnings.mul_rate(order.conversion_rate);
        self.db.set_earnings(order.id, earnings, earnings_usd).await?;
        order.earnings = Some(earnings);
        order.earnings_usd = Some(earnings_usd);
        let derived = self.recompute_and_save(&order).await?;
        info!("🧮️ Earnings for order {order_id} set to {earnings}");
        Ok(derived)
    }

    pub async fn set_cost_inputs(
        &self,
        order_id: &OrderId,
        pre_tax_cost: Money,
        estimated_tax: Money,
    ) -> Result<DerivedFields, SyncError> {
        let mut order = self.fetch_order(order_id).await?;
        self.db.set_cost_inputs(order.id, pre_tax_cost, estimated_tax).await?;
        order.pre_tax_cost = Some(pre_tax_cost);
        order.estimated_tax = Some(estimated_tax);
        let derived = self.recompute_and_save(&order).await?;
        info!("🧮️ Cost inputs for order {order_id} set to {pre_tax_cost} + {estimated_tax}");
        Ok(derived)
    }
}
