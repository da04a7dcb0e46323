//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module
//! neat and tidy 🙏
//!
//! All the sync and backfill handlers run the engine to completion before responding; the
//! response body is the aggregated summary. Callers that want fire-and-forget semantics can
//! put their own queue in front.
use actix_web::{get, post, web, HttpResponse, Responder};
use log::*;
use marketplace_tools::MarketplaceApi;
use mos_common::Money;
use order_sync_engine::{
    db_types::{ExchangeRate, OrderId},
    AdminApi, RatesApi, SqliteDatabase, SyncApi, SyncScope,
};

use crate::{
    data_objects::{AdFeeParams, BackfillParams, CostParams, EarningsParams, ExchangeRateResult, NewRateParams},
    errors::ServerError,
};

pub type Engine = SyncApi<SqliteDatabase, MarketplaceApi>;

fn parse_amount(raw: &str, field: &str) -> Result<Money, ServerError> {
    raw.parse::<Money>().map_err(|e| ServerError::InvalidRequestBody(format!("Invalid {field}: {e}")))
}

#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Sync   ----------------------------------------------------

/// Run a full sync pass (new-orders and modified windows) over every enabled account.
#[post("/sync/orders")]
pub async fn sync_orders(engine: web::Data<Engine>) -> Result<HttpResponse, ServerError> {
    debug!("💻️ Full sync requested");
    let summary = engine.sync_all(SyncScope::Full).await?;
    Ok(HttpResponse::Ok().json(summary))
}

/// Run a modified-windows-only pass.
#[post("/sync/modified")]
pub async fn sync_modified(engine: web::Data<Engine>) -> Result<HttpResponse, ServerError> {
    debug!("💻️ Modified-only sync requested");
    let summary = engine.sync_all(SyncScope::ModifiedOnly).await?;
    Ok(HttpResponse::Ok().json(summary))
}

/// Scan each account's payment ledger and write aggregated fee totals onto orders.
#[post("/fees/backfill")]
pub async fn fees_backfill(
    engine: web::Data<Engine>,
    params: web::Json<BackfillParams>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ Fee backfill requested since {}", params.since);
    let summary = engine.backfill_fees(params.since).await?;
    Ok(HttpResponse::Ok().json(summary))
}

//----------------------------------------------  Orders  ----------------------------------------------------

#[post("/orders/{order_id}/recalculate")]
pub async fn recalculate_order(
    admin: web::Data<AdminApi<SqliteDatabase>>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId(path.into_inner());
    let derived = admin.recalculate_order(&order_id).await?;
    Ok(HttpResponse::Ok().json(derived))
}

/// Enter the true earnings for a partially refunded order.
#[post("/orders/{order_id}/earnings")]
pub async fn set_earnings(
    admin: web::Data<AdminApi<SqliteDatabase>>,
    path: web::Path<String>,
    params: web::Json<EarningsParams>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId(path.into_inner());
    let earnings = parse_amount(&params.earnings, "earnings")?;
    let derived = admin.set_earnings(&order_id, earnings).await?;
    Ok(HttpResponse::Ok().json(derived))
}

#[post("/orders/{order_id}/ad-fee")]
pub async fn set_ad_fee(
    admin: web::Data<AdminApi<SqliteDatabase>>,
    path: web::Path<String>,
    params: web::Json<AdFeeParams>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId(path.into_inner());
    let ad_fee = parse_amount(&params.ad_fee, "ad_fee")?;
    let derived = admin.set_ad_fee(&order_id, ad_fee).await?;
    Ok(HttpResponse::Ok().json(derived))
}

#[post("/orders/{order_id}/costs")]
pub async fn set_costs(
    admin: web::Data<AdminApi<SqliteDatabase>>,
    path: web::Path<String>,
    params: web::Json<CostParams>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId(path.into_inner());
    let pre_tax_cost = parse_amount(&params.pre_tax_cost, "pre_tax_cost")?;
    let estimated_tax = parse_amount(&params.estimated_tax, "estimated_tax")?;
    let derived = admin.set_cost_inputs(&order_id, pre_tax_cost, estimated_tax).await?;
    Ok(HttpResponse::Ok().json(derived))
}

//----------------------------------------------  Rates   ----------------------------------------------------

#[get("/rates/{ledger}")]
pub async fn get_rate(
    rates: web::Data<RatesApi<SqliteDatabase>>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServerError> {
    let ledger = path.into_inner();
    let rate =
        rates.fetch_last_rate(&ledger).await.map_err(|e| ServerError::NoRecordFound(e.to_string()))?;
    let result =
        ExchangeRateResult { ledger: rate.ledger, rate: rate.rate, effective_date: rate.effective_date };
    Ok(HttpResponse::Ok().json(result))
}

/// Append a new settlement rate. Existing order records are not recomputed.
#[post("/rates")]
pub async fn post_rate(
    rates: web::Data<RatesApi<SqliteDatabase>>,
    params: web::Json<NewRateParams>,
) -> Result<HttpResponse, ServerError> {
    let params = params.into_inner();
    let rate = ExchangeRate::new(params.ledger, params.rate, params.effective_date);
    rates.set_exchange_rate(&rate).await.map_err(|e| ServerError::BackendError(e.to_string()))?;
    info!("💻️ Exchange rate appended: {rate}");
    Ok(HttpResponse::Ok().json(serde_json::json!({"success": true})))
}
