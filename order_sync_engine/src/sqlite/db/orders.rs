use chrono::{DateTime, Utc};
use log::debug;
use mos_common::Money;
use sqlx::SqliteConnection;

use crate::{
    db_types::{MappedOrder, OrderId, OrderRecord},
    finance::DerivedFields,
};

pub async fn fetch_order_by_order_id(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<OrderRecord>, sqlx::Error> {
    let order =
        sqlx::query_as("SELECT * FROM orders WHERE order_id = $1").bind(order_id.as_str()).fetch_optional(conn).await?;
    Ok(order)
}

/// Insert a first-seen order, returning its primary key. Derived fields start out NULL and
/// are filled in by the financial pipeline.
pub async fn insert_order(order: &MappedOrder, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let (id,): (i64,) = sqlx::query_as(
        r#"
            INSERT INTO orders (
                account_id, order_id, created_at, modified_at, payment_status, is_cancelled,
                buyer_name, buyer_email,
                ship_name, ship_line1, ship_line2, ship_city, ship_state, ship_zip, ship_country,
                item_title, item_sku, item_quantity,
                tracking_number, carrier, shipped_at, note,
                marketplace, currency, conversion_rate,
                subtotal, shipping, tax, discount, order_total, earnings, marketplace_fee,
                subtotal_usd, shipping_usd, tax_usd, discount_usd, order_total_usd, earnings_usd, marketplace_fee_usd
            ) VALUES (
                $1, $2, $3, $4, $5, $6,
                $7, $8,
                $9, $10, $11, $12, $13, $14, $15,
                $16, $17, $18,
                $19, $20, $21, $22,
                $23, $24, $25,
                $26, $27, $28, $29, $30, $31, $32,
                $33, $34, $35, $36, $37, $38, $39
            )
            RETURNING id;
        "#,
    )
    .bind(order.account_id)
    .bind(order.order_id.as_str())
    .bind(order.created_at)
    .bind(order.modified_at)
    .bind(order.payment_status)
    .bind(order.is_cancelled)
    .bind(&order.buyer_name)
    .bind(&order.buyer_email)
    .bind(&order.ship_name)
    .bind(&order.ship_line1)
    .bind(&order.ship_line2)
    .bind(&order.ship_city)
    .bind(&order.ship_state)
    .bind(&order.ship_zip)
    .bind(&order.ship_country)
    .bind(&order.item_title)
    .bind(&order.item_sku)
    .bind(order.item_quantity)
    .bind(&order.tracking_number)
    .bind(&order.carrier)
    .bind(order.shipped_at)
    .bind(&order.note)
    .bind(&order.marketplace)
    .bind(&order.currency)
    .bind(order.conversion_rate)
    .bind(order.subtotal)
    .bind(order.shipping)
    .bind(order.tax)
    .bind(order.discount)
    .bind(order.order_total)
    .bind(order.earnings)
    .bind(order.marketplace_fee)
    .bind(order.subtotal_usd)
    .bind(order.shipping_usd)
    .bind(order.tax_usd)
    .bind(order.discount_usd)
    .bind(order.order_total_usd)
    .bind(order.earnings_usd)
    .bind(order.marketplace_fee_usd)
    .fetch_one(conn)
    .await?;
    debug!("📝️ Order [{}] inserted with id {id}", order.order_id);
    Ok(id)
}

/// Overwrite the remote-sourced columns of an existing row from a merged record. Manual
/// inputs and derived columns are deliberately not touched here.
pub async fn update_order(order: &OrderRecord, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            UPDATE orders SET
              modified_at = $1,
              payment_status = $2,
              is_cancelled = $3,
              buyer_name = $4,
              buyer_email = $5,
              ship_name = $6,
              ship_line1 = $7,
              ship_line2 = $8,
              ship_city = $9,
              ship_state = $10,
              ship_zip = $11,
              ship_country = $12,
              item_title = $13,
              item_sku = $14,
              item_quantity = $15,
              tracking_number = $16,
              carrier = $17,
              shipped_at = $18,
              note = $19,
              conversion_rate = $20,
              subtotal = $21,
              shipping = $22,
              tax = $23,
              discount = $24,
              order_total = $25,
              earnings = $26,
              marketplace_fee = $27,
              subtotal_usd = $28,
              shipping_usd = $29,
              tax_usd = $30,
              discount_usd = $31,
              order_total_usd = $32,
              earnings_usd = $33,
              marketplace_fee_usd = $34,
              updated_at = CURRENT_TIMESTAMP
            WHERE id = $35
        "#,
    )
    .bind(order.modified_at)
    .bind(order.payment_status)
    .bind(order.is_cancelled)
    .bind(&order.buyer_name)
    .bind(&order.buyer_email)
    .bind(&order.ship_name)
    .bind(&order.ship_line1)
    .bind(&order.ship_line2)
    .bind(&order.ship_city)
    .bind(&order.ship_state)
    .bind(&order.ship_zip)
    .bind(&order.ship_country)
    .bind(&order.item_title)
    .bind(&order.item_sku)
    .bind(order.item_quantity)
    .bind(&order.tracking_number)
    .bind(&order.carrier)
    .bind(order.shipped_at)
    .bind(&order.note)
    .bind(order.conversion_rate)
    .bind(order.subtotal)
    .bind(order.shipping)
    .bind(order.tax)
    .bind(order.discount)
    .bind(order.order_total)
    .bind(order.earnings)
    .bind(order.marketplace_fee)
    .bind(order.subtotal_usd)
    .bind(order.shipping_usd)
    .bind(order.tax_usd)
    .bind(order.discount_usd)
    .bind(order.order_total_usd)
    .bind(order.earnings_usd)
    .bind(order.marketplace_fee_usd)
    .bind(order.id)
    .execute(conn)
    .await?;
    debug!("📝️ Order [{}] updated", order.order_id);
    Ok(())
}

pub async fn latest_order_creation(
    account_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
    let latest: Option<(DateTime<Utc>,)> =
        sqlx::query_as("SELECT MAX(created_at) FROM orders WHERE account_id = $1 HAVING MAX(created_at) IS NOT NULL")
            .bind(account_id)
            .fetch_optional(conn)
            .await?;
    Ok(latest.map(|(t,)| t))
}

/// Write the full output of a financial recalculation in a single statement.
pub async fn save_derived(
    order_pk: i64,
    derived: &DerivedFields,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            UPDATE orders SET
              withholding = $1,
              net = $2,
              settlement_rate = $3,
              settlement_amount = $4,
              supplier_cost = $5,
              supplier_fee = $6,
              profit = $7,
              updated_at = CURRENT_TIMESTAMP
            WHERE id = $8
        "#,
    )
    .bind(derived.withholding)
    .bind(derived.net)
    .bind(derived.settlement_rate)
    .bind(derived.settlement_amount)
    .bind(derived.supplier_cost)
    .bind(derived.supplier_fee)
    .bind(derived.profit)
    .bind(order_pk)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn set_fee(
    order_pk: i64,
    fee: Money,
    fee_usd: Money,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE orders SET marketplace_fee = $1, marketplace_fee_usd = $2, updated_at = CURRENT_TIMESTAMP WHERE id = \
         $3",
    )
    .bind(fee)
    .bind(fee_usd)
    .bind(order_pk)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn set_ad_fee(order_pk: i64, ad_fee: Money, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE orders SET ad_fee = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2")
        .bind(ad_fee)
        .bind(order_pk)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn set_earnings(
    order_pk: i64,
    earnings: Money,
    earnings_usd: Money,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE orders SET earnings = $1, earnings_usd = $2, updated_at = CURRENT_TIMESTAMP WHERE id = $3")
        .bind(earnings)
        .bind(earnings_usd)
        .bind(order_pk)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn set_cost_inputs(
    order_pk: i64,
    pre_tax_cost: Money,
    estimated_tax: Money,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE orders SET pre_tax_cost = $1, estimated_tax = $2, updated_at = CURRENT_TIMESTAMP WHERE id = $3")
        .bind(pre_tax_cost)
        .bind(estimated_tax)
        .bind(order_pk)
        .execute(conn)
        .await?;
    Ok(())
}
