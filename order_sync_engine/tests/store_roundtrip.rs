//! Storage-layer round trips against a real SQLite file.
mod support;

use chrono::{Duration, NaiveDate, Utc};
use mos_common::Money;
use order_sync_engine::{
    db_types::{ExchangeRate, MappedOrder, OrderId, PaymentStatus, TokenUpdate},
    finance::DerivedFields,
    traits::{AccountStore, AccountStoreError, ExchangeRateError, ExchangeRates, OrderStore},
    RatesApi, SqliteDatabase,
};
use support::{prepare_test_env, random_db_path, seed_account};

async fn new_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database connection")
}

fn mapped_order(account_id: i64, order_id: &str) -> MappedOrder {
    let now = Utc::now();
    MappedOrder {
        account_id,
        order_id: OrderId(order_id.to_string()),
        created_at: now - Duration::hours(3),
        modified_at: now - Duration::hours(3),
        payment_status: PaymentStatus::Paid,
        item_title: "Walnut box".to_string(),
        item_quantity: 1,
        marketplace: "US".to_string(),
        currency: "USD".to_string(),
        conversion_rate: 1.0,
        subtotal: Money::from_cents(9_000),
        shipping: Money::from_cents(1_000),
        tax: Money::from_cents(800),
        order_total: Money::from_cents(10_800),
        earnings: Some(Money::from_units(100)),
        subtotal_usd: Money::from_cents(9_000),
        shipping_usd: Money::from_cents(1_000),
        tax_usd: Money::from_cents(800),
        order_total_usd: Money::from_cents(10_800),
        earnings_usd: Some(Money::from_units(100)),
        ..MappedOrder::default()
    }
}

#[tokio::test]
async fn account_round_trip() {
    let db = new_db().await;
    let id = seed_account(&db, "shop-a", 30).await;
    let account = db.fetch_account_by_shop_id("shop-a").await.unwrap();
    assert_eq!(account.id, id);
    assert_eq!(account.name, "Shop shop-a");
    assert!(account.enabled);
    assert!(account.last_new_sync.is_none());

    let enabled = db.fetch_enabled_accounts().await.unwrap();
    assert_eq!(enabled.len(), 1);

    let missing = db.fetch_account_by_shop_id("nope").await;
    assert!(matches!(missing, Err(AccountStoreError::AccountNotFound(_))));
}

#[tokio::test]
async fn token_updates_persist() {
    let db = new_db().await;
    seed_account(&db, "shop-a", 30).await;
    let update = TokenUpdate {
        access_token: "new-at".to_string(),
        refresh_token: "new-rt".to_string(),
        expires_in: 7200,
        issued_at: Utc::now(),
    };
    db.update_tokens("shop-a", &update).await.unwrap();
    let account = db.fetch_account_by_shop_id("shop-a").await.unwrap();
    assert_eq!(account.access_token, "new-at");
    assert_eq!(account.refresh_token, "new-rt");
    assert_eq!(account.expires_in, 7200);
}

#[tokio::test]
async fn partial_watermark_update_leaves_the_other_alone() {
    let db = new_db().await;
    seed_account(&db, "shop-a", 30).await;
    let t1 = Utc::now() - Duration::hours(1);
    db.update_watermarks("shop-a", Some(t1), None).await.unwrap();
    let account = db.fetch_account_by_shop_id("shop-a").await.unwrap();
    assert_eq!(account.last_new_sync.map(|t| t.timestamp()), Some(t1.timestamp()));
    assert!(account.last_modified_sync.is_none());

    let t2 = Utc::now();
    db.update_watermarks("shop-a", None, Some(t2)).await.unwrap();
    let account = db.fetch_account_by_shop_id("shop-a").await.unwrap();
    // The new-orders watermark survived the modified-only update
    assert_eq!(account.last_new_sync.map(|t| t.timestamp()), Some(t1.timestamp()));
    assert_eq!(account.last_modified_sync.map(|t| t.timestamp()), Some(t2.timestamp()));
}

#[tokio::test]
async fn order_round_trip_and_latest_creation() {
    let db = new_db().await;
    let account_id = seed_account(&db, "shop-a", 30).await;
    assert!(db.latest_order_creation(account_id).await.unwrap().is_none());

    let mapped = mapped_order(account_id, "1001");
    let pk = db.insert_order(&mapped).await.unwrap();
    let stored = db.fetch_order_by_order_id(&OrderId("1001".into())).await.unwrap().unwrap();
    assert_eq!(stored.id, pk);
    assert_eq!(stored.order_total, Money::from_cents(10_800));
    assert_eq!(stored.earnings, Some(Money::from_units(100)));
    assert_eq!(stored.payment_status, PaymentStatus::Paid);
    assert!(stored.withholding.is_none());

    let latest = db.latest_order_creation(account_id).await.unwrap().unwrap();
    assert_eq!(latest.timestamp(), mapped.created_at.timestamp());

    let mut newer = mapped_order(account_id, "1002");
    newer.created_at = Utc::now() - Duration::hours(1);
    db.insert_order(&newer).await.unwrap();
    let latest = db.latest_order_creation(account_id).await.unwrap().unwrap();
    assert_eq!(latest.timestamp(), newer.created_at.timestamp());
}

#[tokio::test]
async fn duplicate_order_id_is_rejected() {
    let db = new_db().await;
    let account_id = seed_account(&db, "shop-a", 30).await;
    let mapped = mapped_order(account_id, "1001");
    db.insert_order(&mapped).await.unwrap();
    assert!(db.insert_order(&mapped).await.is_err());
}

#[tokio::test]
async fn derived_and_manual_writes_round_trip() {
    let db = new_db().await;
    let account_id = seed_account(&db, "shop-a", 30).await;
    let pk = db.insert_order(&mapped_order(account_id, "1001")).await.unwrap();

    let derived = DerivedFields {
        withholding: Some(Money::from_cents(100)),
        net: Some(Money::from_cents(9_876)),
        settlement_rate: Some(85.0),
        settlement_amount: Some(Money::from_cents(839_460)),
        supplier_cost: None,
        supplier_fee: None,
        profit: None,
    };
    db.save_derived(pk, &derived).await.unwrap();
    db.set_fee(pk, Money::from_cents(150), Money::from_cents(150)).await.unwrap();
    db.set_ad_fee(pk, Money::from_cents(300)).await.unwrap();
    db.set_cost_inputs(pk, Money::from_cents(1_000), Money::from_cents(200)).await.unwrap();

    let stored = db.fetch_order_by_order_id(&OrderId("1001".into())).await.unwrap().unwrap();
    assert_eq!(stored.net, Some(Money::from_cents(9_876)));
    assert_eq!(stored.settlement_rate, Some(85.0));
    assert_eq!(stored.settlement_amount, Some(Money::from_cents(839_460)));
    assert_eq!(stored.supplier_cost, None);
    assert_eq!(stored.marketplace_fee, Some(Money::from_cents(150)));
    assert_eq!(stored.ad_fee, Some(Money::from_cents(300)));
    assert_eq!(stored.pre_tax_cost, Some(Money::from_cents(1_000)));
    assert_eq!(stored.estimated_tax, Some(Money::from_cents(200)));
}

#[tokio::test]
async fn exchange_rate_series_is_dated_and_append_only() {
    let db = new_db().await;
    assert!(!db.has_rates("USD_INR").await.unwrap());

    let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
    db.set_exchange_rate(&ExchangeRate::new("USD_INR".into(), 82.0, d(2024, 1, 1))).await.unwrap();
    db.set_exchange_rate(&ExchangeRate::new("USD_INR".into(), 85.0, d(2024, 6, 1))).await.unwrap();
    db.set_exchange_rate(&ExchangeRate::new("USD_EUR".into(), 0.92, d(2024, 3, 1))).await.unwrap();
    assert!(db.has_rates("USD_INR").await.unwrap());

    // A date between the two entries resolves to the earlier rate
    let rate = db.fetch_rate_at("USD_INR", d(2024, 3, 15)).await.unwrap();
    assert_eq!(rate.rate, 82.0);
    let rate = db.fetch_rate_at("USD_INR", d(2024, 6, 1)).await.unwrap();
    assert_eq!(rate.rate, 85.0);
    let rate = db.fetch_last_rate("USD_INR").await.unwrap();
    assert_eq!(rate.rate, 85.0);

    // Nothing applies before the first entry
    let missing = db.fetch_rate_at("USD_INR", d(2023, 12, 31)).await;
    assert!(matches!(missing, Err(ExchangeRateError::RateDoesNotExist(_))));
    let missing = db.fetch_last_rate("USD_GBP").await;
    assert!(matches!(missing, Err(ExchangeRateError::RateDoesNotExist(_))));
}

#[tokio::test]
async fn rates_api_delegates_to_the_store() {
    let db = new_db().await;
    let api = RatesApi::new(db.clone());
    let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    api.set_exchange_rate(&ExchangeRate::new("USD_INR".into(), 84.5, date)).await.unwrap();
    let rate = api.fetch_last_rate("USD_INR").await.unwrap();
    assert_eq!(rate.rate, 84.5);
    assert_eq!(rate.effective_date, date);
}
