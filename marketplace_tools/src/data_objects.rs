use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Response from the `/oauth/token` endpoint for both `authorization_code` and
/// `refresh_token` grants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Validity of the access token in seconds.
    pub expires_in: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Buyer {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteAddress {
    pub name: Option<String>,
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteLineItem {
    pub title: String,
    pub sku: Option<String>,
    pub quantity: i64,
}

/// An order as the marketplace API returns it. Monetary amounts are decimal strings in the
/// shop's source currency; `grand_total_usd` is the marketplace's own converted figure and,
/// together with `grand_total`, is the pair a conversion rate is derived from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteOrder {
    pub order_id: String,
    /// Creation time, epoch seconds.
    pub created_at: i64,
    /// Last-modified time, epoch seconds. This is the reconciliation clock.
    pub modified_at: i64,
    pub payment_status: String,
    #[serde(default)]
    pub is_cancelled: bool,
    pub marketplace: String,
    pub currency: String,
    #[serde(default)]
    pub buyer: Option<Buyer>,
    #[serde(default)]
    pub shipping_address: Option<RemoteAddress>,
    #[serde(default)]
    pub line_items: Vec<RemoteLineItem>,
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(default)]
    pub carrier: Option<String>,
    #[serde(default)]
    pub shipped_at: Option<i64>,
    #[serde(default)]
    pub note: Option<String>,
    pub subtotal: String,
    pub shipping: String,
    pub tax: String,
    #[serde(default)]
    pub discount: Option<String>,
    pub grand_total: String,
    #[serde(default)]
    pub earnings: Option<String>,
    #[serde(default)]
    pub grand_total_usd: Option<String>,
}

impl RemoteOrder {
    pub fn created_utc(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.created_at, 0).single().unwrap_or_default()
    }

    pub fn modified_utc(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.modified_at, 0).single().unwrap_or_default()
    }

    pub fn shipped_utc(&self) -> Option<DateTime<Utc>> {
        self.shipped_at.and_then(|t| Utc.timestamp_opt(t, 0).single())
    }
}

/// An entry in the marketplace payment ledger. Fee entries reference zero or more orders;
/// `direction` distinguishes charges from reversals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub kind: String,
    pub direction: String,
    pub amount: String,
    pub currency: String,
    /// Booking time, epoch seconds.
    pub posted_at: i64,
    #[serde(default)]
    pub order_ids: Vec<String>,
}

impl LedgerEntry {
    pub fn is_charge(&self) -> bool {
        self.direction == "charge"
    }

    pub fn is_reversal(&self) -> bool {
        self.direction == "reversal"
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn deserialize_remote_order() {
        let json = r#"{
            "order_id": "310442",
            "created_at": 1714000000,
            "modified_at": 1714003600,
            "payment_status": "paid",
            "marketplace": "UK",
            "currency": "GBP",
            "buyer": {"name": "A. Customer", "email": "a@example.com"},
            "shipping_address": {"line1": "1 High St", "city": "Leeds", "zip": "LS1 1AA", "country": "GB"},
            "line_items": [{"title": "Walnut box", "sku": "WB-12", "quantity": 2}],
            "subtotal": "40.00",
            "shipping": "6.50",
            "tax": "9.30",
            "grand_total": "55.80",
            "earnings": "38.75",
            "grand_total_usd": "69.75"
        }"#;
        let order: RemoteOrder = serde_json::from_str(json).unwrap();
        assert_eq!(order.order_id, "310442");
        assert!(!order.is_cancelled);
        assert_eq!(order.line_items[0].quantity, 2);
        assert_eq!(order.created_utc().timestamp(), 1_714_000_000);
        assert!(order.tracking_number.is_none());
    }

    #[test]
    fn deserialize_ledger_entry() {
        let json = r#"{
            "id": 99,
            "kind": "transaction_fee",
            "direction": "charge",
            "amount": "1.30",
            "currency": "USD",
            "posted_at": 1714000000,
            "order_ids": ["310442"]
        }"#;
        let entry: LedgerEntry = serde_json::from_str(json).unwrap();
        assert!(entry.is_charge());
        assert!(!entry.is_reversal());
        assert_eq!(entry.order_ids, vec!["310442".to_string()]);
    }
}
