//! The per-account sync orchestrator.
//!
//! `SyncApi::sync_all` fans out one task per enabled account and waits for all of them to
//! settle. Accounts are fully independent: each task only touches its own account's rows, and
//! a failure is captured in that account's summary entry rather than aborting the batch.
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use log::*;
use marketplace_tools::RemoteOrder;
use serde::Serialize;

use crate::{
    db_types::{Account, OrderId},
    finance::{recalculate, resolve_settlement_rate, DerivedFields, FinanceInputs, FinancePolicy},
    sync::{
        credentials::ensure_valid_token,
        planner::plan_windows,
        reconciler::{map_remote, reconcile},
        refunds::{apply_refund_action, evaluate_transition},
        SyncError,
    },
    traits::{AccountStore, ExchangeRates, OrderStore, RemoteSource},
};

/// Which windows a sync pass should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncScope {
    /// New-orders window and modified window.
    Full,
    /// Modified window only.
    ModifiedOnly,
}

/// A change on an existing order that a seller wants to hear about.
#[derive(Debug, Clone, Serialize)]
pub struct OrderChangeNotice {
    pub shop_id: String,
    pub order_id: String,
    pub fields: Vec<String>,
}

/// The outcome of one account's pass.
#[derive(Debug, Clone, Serialize)]
pub struct AccountOutcome {
    pub shop_id: String,
    pub success: bool,
    pub new_orders: usize,
    pub updated_orders: usize,
    pub notifications: Vec<OrderChangeNotice>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncSummary {
    pub accounts: Vec<AccountOutcome>,
    pub total_new: usize,
    pub total_updated: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct BackfillOutcome {
    pub shop_id: String,
    pub success: bool,
    pub orders_updated: usize,
    /// False when the ledger scan was cut short; totals may be understated and a re-run is
    /// warranted.
    pub complete: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BackfillSummary {
    pub accounts: Vec<BackfillOutcome>,
    pub total_updated: usize,
}

struct AccountTally {
    new_orders: usize,
    updated_orders: usize,
    notifications: Vec<OrderChangeNotice>,
}

/// The sync engine entry point, generic over the storage backend and the remote API so that
/// full cycles can be driven in tests without a network.
pub struct SyncApi<B, S> {
    db: B,
    source: S,
    policy: FinancePolicy,
}

impl<B, S> SyncApi<B, S>
where
    B: AccountStore + OrderStore + ExchangeRates,
    S: RemoteSource,
{
    pub fn new(db: B, source: S, policy: FinancePolicy) -> Self {
        Self { db, source, policy }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    /// Run one sync pass over every enabled account and aggregate the results. Individual
    /// account failures are reported, never propagated.
    pub async fn sync_all(&self, scope: SyncScope) -> Result<SyncSummary, SyncError> {
        let accounts = self.db.fetch_enabled_accounts().await?;
        info!("🔄️ Starting sync pass over {} account(s)", accounts.len());
        let outcomes = join_all(accounts.into_iter().map(|account| self.sync_account_guarded(account, scope))).await;
        let mut summary = SyncSummary::default();
        for outcome in outcomes {
            summary.total_new += outcome.new_orders;
            summary.total_updated += outcome.updated_orders;
            summary.accounts.push(outcome);
        }
        info!(
            "🔄️ Sync pass complete. {} new, {} updated across {} account(s)",
            summary.total_new,
            summary.total_updated,
            summary.accounts.len()
        );
        Ok(summary)
    }

    async fn sync_account_guarded(&self, account: Account, scope: SyncScope) -> AccountOutcome {
        let shop_id = account.shop_id.clone();
        match self.sync_account(account, scope).await {
            Ok(tally) => AccountOutcome {
                shop_id,
                success: true,
                new_orders: tally.new_orders,
                updated_orders: tally.updated_orders,
                notifications: tally.notifications,
                error: None,
            },
            Err(e) => {
                error!("🔄️ Sync failed for shop {shop_id}: {e}");
                AccountOutcome {
                    shop_id,
                    success: false,
                    new_orders: 0,
                    updated_orders: 0,
                    notifications: Vec::new(),
                    error: Some(e.to_string()),
                }
            },
        }
    }

    /// One account's pass: credential upkeep, window planning, fetch + reconcile each window,
    /// then a single watermark checkpoint at the end.
    async fn sync_account(&self, mut account: Account, scope: SyncScope) -> Result<AccountTally, SyncError> {
        let token = ensure_valid_token(&self.db, &self.source, &mut account).await?;
        let latest_local = self.db.latest_order_creation(account.id).await?;
        let windows = plan_windows(&account, latest_local, Utc::now());
        let mut tally = AccountTally { new_orders: 0, updated_orders: 0, notifications: Vec::new() };
        let mut new_watermark = None;
        let mut modified_watermark = None;

        if scope == SyncScope::Full {
            if let Some(window) = windows.new_orders {
                debug!("🔄️ Shop {}: new-orders window {}", account.shop_id, window.filter("created"));
                let outcome = self.source.fetch_orders(&token, &account.shop_id, &window.filter("created")).await;
                for remote in &outcome.items {
                    self.process_record(&account, remote, &mut tally).await?;
                }
                // Only a complete listing may advance the watermark; a partial fetch will be
                // re-covered next pass.
                if outcome.complete {
                    new_watermark = Some(window.end);
                }
            }
        }

        if let Some(window) = windows.modified {
            debug!("🔄️ Shop {}: modified window {}", account.shop_id, window.filter("modified"));
            let outcome = self.source.fetch_orders(&token, &account.shop_id, &window.filter("modified")).await;
            for remote in &outcome.items {
                self.process_record(&account, remote, &mut tally).await?;
            }
            if outcome.complete {
                modified_watermark = Some(window.end);
            }
        }

        self.db.update_watermarks(&account.shop_id, new_watermark, modified_watermark).await?;
        Ok(tally)
    }

    /// Reconcile one remote order, evaluate any refund transition, and re-run the financial
    /// pipeline when the record warrants it.
    async fn process_record(
        &self,
        account: &Account,
        remote: &RemoteOrder,
        tally: &mut AccountTally,
    ) -> Result<(), SyncError> {
        use crate::db_types::PaymentStatus;

        let mapped = map_remote(account.id, remote);
        let outcome = reconcile(&self.db, &mapped).await?;
        if !outcome.persisted {
            return Ok(());
        }
        let mut order = outcome.order;
        if outcome.is_new {
            tally.new_orders += 1;
        } else {
            tally.updated_orders += 1;
            let notifiable = outcome.changes.notifiable();
            if !notifiable.is_empty() {
                tally.notifications.push(OrderChangeNotice {
                    shop_id: account.shop_id.clone(),
                    order_id: order.order_id.as_str().to_string(),
                    fields: notifiable.iter().map(|f| format!("{f:?}")).collect(),
                });
            }
        }

        let transition =
            outcome.previous_status.and_then(|old| evaluate_transition(old, order.payment_status));
        if let Some(action) = transition {
            apply_refund_action(&mut order, action);
            self.db.update_order(&order).await?;
        }

        if order.payment_status == PaymentStatus::Paid || transition.is_some() {
            let derived = self.recalculate_record(&order).await?;
            self.db.save_derived(order.id, &derived).await?;
        }
        Ok(())
    }

    async fn recalculate_record(&self, order: &crate::db_types::OrderRecord) -> Result<DerivedFields, SyncError> {
        let rate = resolve_settlement_rate(&self.db, &self.policy, order.created_at.date_naive()).await?;
        let inputs = FinanceInputs::from_order(order, rate);
        Ok(recalculate(&inputs, &self.policy))
    }

    /// Scan each account's payment ledger since `since` and write aggregated fee totals onto
    /// the referenced orders. Fees for orders not stored locally are skipped.
    pub async fn backfill_fees(&self, since: DateTime<Utc>) -> Result<BackfillSummary, SyncError> {
        let accounts = self.db.fetch_enabled_accounts().await?;
        info!("🧮️ Starting fee backfill over {} account(s) since {since}", accounts.len());
        let outcomes =
            join_all(accounts.into_iter().map(|account| self.backfill_account_guarded(account, since))).await;
        let mut summary = BackfillSummary::default();
        for outcome in outcomes {
            summary.total_updated += outcome.orders_updated;
            summary.accounts.push(outcome);
        }
        Ok(summary)
    }

    async fn backfill_account_guarded(&self, account: Account, since: DateTime<Utc>) -> BackfillOutcome {
        let shop_id = account.shop_id.clone();
        match self.backfill_account(account, since).await {
            Ok((orders_updated, complete)) => {
                BackfillOutcome { shop_id, success: true, orders_updated, complete, error: None }
            },
            Err(e) => {
                error!("🧮️ Fee backfill failed for shop {shop_id}: {e}");
                BackfillOutcome { shop_id, success: false, orders_updated: 0, complete: false, error: Some(e.to_string()) }
            },
        }
    }

    async fn backfill_account(&self, mut account: Account, since: DateTime<Utc>) -> Result<(usize, bool), SyncError> {
        let token = ensure_valid_token(&self.db, &self.source, &mut account).await?;
        let fee_map = self.source.build_fee_map(&token, &account.shop_id, since).await;
        let mut updated = 0;
        let order_ids: Vec<String> = fee_map.order_ids().cloned().collect();
        for order_id in order_ids {
            let Some(fee) = fee_map.get(&order_id) else { continue };
            let oid = OrderId(order_id.clone());
            match self.db.fetch_order_by_order_id(&oid).await? {
                Some(order) => {
                    let fee_usd = fee.mul_rate(order.conversion_rate);
                    self.db.set_fee(order.id, fee, fee_usd).await?;
                    updated += 1;
                },
                None => trace!("🧮️ Fee for unknown order {oid}. Skipping"),
            }
        }
        info!(
            "🧮️ Fee backfill for shop {}: {updated} order(s) updated{}",
            account.shop_id,
            if fee_map.complete { "" } else { " (incomplete ledger scan)" }
        );
        Ok((updated, fee_map.complete))
    }
}
