use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
use mos_common::Money;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

//--------------------------------------       OrderId        ---------------------------------------------------------
/// The order identifier assigned by the marketplace. Immutable, and the upsert key for
/// reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self(String::new())
    }
}

//--------------------------------------    PaymentStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentStatus {
    #[default]
    /// The buyer has paid and the payment stands.
    Paid,
    /// Part of the payment was refunded. The true earnings figure is unknown until a human
    /// supplies it.
    PartiallyRefunded,
    /// The full payment was refunded.
    FullyRefunded,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Paid => write!(f, "Paid"),
            PaymentStatus::PartiallyRefunded => write!(f, "PartiallyRefunded"),
            PaymentStatus::FullyRefunded => write!(f, "FullyRefunded"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid payment status: {0}")]
pub struct ConversionError(String);

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Paid" => Ok(Self::Paid),
            "PartiallyRefunded" => Ok(Self::PartiallyRefunded),
            "FullyRefunded" => Ok(Self::FullyRefunded),
            s => Err(ConversionError(s.to_string())),
        }
    }
}

impl From<String> for PaymentStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid payment status: {value}. But this conversion cannot fail. Defaulting to Paid");
            PaymentStatus::Paid
        })
    }
}

impl PaymentStatus {
    /// Map the marketplace's lowercase wire value onto the local enum. Unknown values are
    /// treated as Paid rather than dropping the record.
    pub fn from_remote(value: &str) -> Self {
        match value {
            "paid" => Self::Paid,
            "partially_refunded" => Self::PartiallyRefunded,
            "fully_refunded" => Self::FullyRefunded,
            other => {
                error!("Unknown remote payment status '{other}'. Defaulting to Paid");
                Self::Paid
            },
        }
    }
}

//--------------------------------------       Account        ---------------------------------------------------------
/// One seller account on the marketplace: its OAuth credential state and the watermarks that
/// bound the next incremental sync.
#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub id: i64,
    /// The marketplace's stable identifier for the shop.
    pub shop_id: String,
    pub name: String,
    pub access_token: String,
    pub refresh_token: String,
    /// Access token validity in seconds, as reported by the token endpoint.
    pub expires_in: i64,
    pub token_issued_at: DateTime<Utc>,
    /// Highest order creation time seen in a successful new-orders pass.
    pub last_new_sync: Option<DateTime<Utc>>,
    /// End of the last successful modified-orders scan.
    pub last_modified_sync: Option<DateTime<Utc>>,
    /// How far back the very first sync reaches.
    pub initial_sync_start: DateTime<Utc>,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub shop_id: String,
    pub name: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub token_issued_at: DateTime<Utc>,
    pub initial_sync_start: DateTime<Utc>,
}

/// A freshly issued token pair, persisted before the new access token is used.
#[derive(Debug, Clone)]
pub struct TokenUpdate {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub issued_at: DateTime<Utc>,
}

//--------------------------------------     OrderRecord      ---------------------------------------------------------
/// The local copy of a marketplace order, raw and derived fields together.
///
/// Every source-currency monetary field has a USD mirror that is recomputed whenever the
/// source value or the conversion rate changes. The derived fields at the bottom are a pure
/// function of the raw facts and the applicable exchange rate; they are only written by the
/// financial pipeline or the designated manual-override paths.
#[derive(Debug, Clone, FromRow)]
pub struct OrderRecord {
    pub id: i64,
    pub account_id: i64,
    pub order_id: OrderId,
    /// Creation time on the marketplace.
    pub created_at: DateTime<Utc>,
    /// The marketplace's last-modified clock; the reconciliation guard.
    pub modified_at: DateTime<Utc>,
    pub payment_status: PaymentStatus,
    pub is_cancelled: bool,
    pub buyer_name: Option<String>,
    pub buyer_email: Option<String>,
    pub ship_name: Option<String>,
    pub ship_line1: Option<String>,
    pub ship_line2: Option<String>,
    pub ship_city: Option<String>,
    pub ship_state: Option<String>,
    pub ship_zip: Option<String>,
    pub ship_country: Option<String>,
    /// First line item, denormalized for convenience.
    pub item_title: String,
    pub item_sku: Option<String>,
    pub item_quantity: i64,
    pub tracking_number: Option<String>,
    pub carrier: Option<String>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub note: Option<String>,
    pub marketplace: String,
    pub currency: String,
    /// Source-currency to USD. 1 on the reference marketplace; 0 means "unknown", not "free".
    pub conversion_rate: f64,
    pub subtotal: Money,
    pub shipping: Money,
    pub tax: Money,
    pub discount: Money,
    pub order_total: Money,
    /// None is the explicit "unknown" marker, distinct from zero.
    pub earnings: Option<Money>,
    pub marketplace_fee: Option<Money>,
    pub subtotal_usd: Money,
    pub shipping_usd: Money,
    pub tax_usd: Money,
    pub discount_usd: Money,
    pub order_total_usd: Money,
    pub earnings_usd: Option<Money>,
    pub marketplace_fee_usd: Option<Money>,
    /// Manually entered advertising spend.
    pub ad_fee: Option<Money>,
    /// Manually entered supplier cost inputs, in the supplier's currency.
    pub pre_tax_cost: Option<Money>,
    pub estimated_tax: Option<Money>,
    pub withholding: Option<Money>,
    pub net: Option<Money>,
    /// The settlement-ledger rate in effect when the record was last recalculated.
    pub settlement_rate: Option<f64>,
    pub settlement_amount: Option<Money>,
    pub supplier_cost: Option<Money>,
    pub supplier_fee: Option<Money>,
    pub profit: Option<Money>,
    pub first_seen_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------     MappedOrder      ---------------------------------------------------------
/// The remote-sourced portion of an order, mapped into the local schema. This is what the
/// reconciler diffs against the stored record and what a first sighting inserts.
#[derive(Debug, Clone, Default)]
pub struct MappedOrder {
    pub account_id: i64,
    pub order_id: OrderId,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub payment_status: PaymentStatus,
    pub is_cancelled: bool,
    pub buyer_name: Option<String>,
    pub buyer_email: Option<String>,
    pub ship_name: Option<String>,
    pub ship_line1: Option<String>,
    pub ship_line2: Option<String>,
    pub ship_city: Option<String>,
    pub ship_state: Option<String>,
    pub ship_zip: Option<String>,
    pub ship_country: Option<String>,
    pub item_title: String,
    pub item_sku: Option<String>,
    pub item_quantity: i64,
    pub tracking_number: Option<String>,
    pub carrier: Option<String>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub note: Option<String>,
    pub marketplace: String,
    pub currency: String,
    pub conversion_rate: f64,
    pub subtotal: Money,
    pub shipping: Money,
    pub tax: Money,
    pub discount: Money,
    pub order_total: Money,
    pub earnings: Option<Money>,
    pub marketplace_fee: Option<Money>,
    pub subtotal_usd: Money,
    pub shipping_usd: Money,
    pub tax_usd: Money,
    pub discount_usd: Money,
    pub order_total_usd: Money,
    pub earnings_usd: Option<Money>,
    pub marketplace_fee_usd: Option<Money>,
}

//--------------------------------------    ExchangeRate      ---------------------------------------------------------
/// One point in the append-only exchange-rate series for a ledger. Lookups take the most
/// recent rate with an effective date on or before the target date.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub ledger: String,
    pub rate: f64,
    pub effective_date: chrono::NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl ExchangeRate {
    pub fn new(ledger: String, rate: f64, effective_date: chrono::NaiveDate) -> Self {
        Self { ledger, rate, effective_date, created_at: Utc::now() }
    }
}

impl Display for ExchangeRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} @ {} (effective {})", self.ledger, self.rate, self.effective_date)
    }
}
