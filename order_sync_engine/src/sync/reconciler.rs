//! Record reconciliation: mapping remote orders into the local schema, diffing them against
//! what is stored, and merging changed records without touching derived or manual fields.
use log::*;
use marketplace_tools::RemoteOrder;
use mos_common::{Money, HOME_CURRENCY_CODE};

use crate::{
    db_types::{MappedOrder, OrderId, OrderRecord, PaymentStatus},
    traits::{OrderStore, OrderStoreError},
};

/// Orders from this marketplace are already in USD; their conversion rate is exactly 1.
pub const REFERENCE_MARKETPLACE: &str = "US";

/// A field of the local order record that reconciliation may find changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderField {
    PaymentStatus,
    Cancelled,
    TrackingNumber,
    Carrier,
    ShippedAt,
    ShipName,
    ShipLine1,
    ShipLine2,
    ShipCity,
    ShipState,
    ShipZip,
    ShipCountry,
    BuyerName,
    BuyerEmail,
    LineItem,
    Note,
    Amounts,
    ConversionRate,
}

impl OrderField {
    /// Changes a seller wants to hear about: payment and fulfilment state, and where the
    /// parcel is going. Amount drift and buyer details are recorded silently.
    pub fn is_notifiable(&self) -> bool {
        matches!(
            self,
            OrderField::PaymentStatus
                | OrderField::Cancelled
                | OrderField::TrackingNumber
                | OrderField::Carrier
                | OrderField::ShippedAt
                | OrderField::ShipName
                | OrderField::ShipLine1
                | OrderField::ShipLine2
                | OrderField::ShipCity
                | OrderField::ShipState
                | OrderField::ShipZip
                | OrderField::ShipCountry
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub changed: Vec<OrderField>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }

    pub fn contains(&self, field: OrderField) -> bool {
        self.changed.contains(&field)
    }

    pub fn notifiable(&self) -> Vec<OrderField> {
        self.changed.iter().copied().filter(OrderField::is_notifiable).collect()
    }
}

/// The result of reconciling one remote order.
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    pub order: OrderRecord,
    pub changes: ChangeSet,
    pub is_new: bool,
    /// False when the incoming copy was stale and nothing was written.
    pub persisted: bool,
    /// The stored payment status before this pass, for refund-transition evaluation.
    pub previous_status: Option<PaymentStatus>,
}

fn parse_amount(raw: &str, field: &str, order_id: &str) -> Money {
    raw.parse::<Money>().unwrap_or_else(|e| {
        warn!("🔄️ Unparseable {field} '{raw}' on order {order_id}: {e}. Defaulting to 0");
        Money::ZERO
    })
}

fn parse_optional_amount(raw: Option<&String>, field: &str, order_id: &str) -> Option<Money> {
    raw.map(|s| parse_amount(s, field, order_id))
}

/// Map a remote order into the local schema.
///
/// The conversion rate is derived from the marketplace's own USD total where one is given.
/// Reference-marketplace and USD-denominated orders get a rate of exactly 1; anything else without a USD total
/// gets 0, the explicit "unknown" marker, and zero USD mirrors.
pub fn map_remote(account_id: i64, remote: &RemoteOrder) -> MappedOrder {
    let oid = remote.order_id.as_str();
    let subtotal = parse_amount(&remote.subtotal, "subtotal", oid);
    let shipping = parse_amount(&remote.shipping, "shipping", oid);
    let tax = parse_amount(&remote.tax, "tax", oid);
    let discount = parse_optional_amount(remote.discount.as_ref(), "discount", oid).unwrap_or(Money::ZERO);
    let order_total = parse_amount(&remote.grand_total, "grand_total", oid);
    let earnings = parse_optional_amount(remote.earnings.as_ref(), "earnings", oid);

    let conversion_rate = if remote.marketplace == REFERENCE_MARKETPLACE || remote.currency == HOME_CURRENCY_CODE {
        1.0
    } else {
        let usd_total = parse_optional_amount(remote.grand_total_usd.as_ref(), "grand_total_usd", oid);
        match usd_total {
            Some(usd) if !order_total.is_zero() => usd.value() as f64 / order_total.value() as f64,
            _ => {
                warn!("🔄️ No conversion rate derivable for order {oid} ({})", remote.marketplace);
                0.0
            },
        }
    };

    let first_item = remote.line_items.first();
    let buyer = remote.buyer.clone().unwrap_or_default();
    let address = remote.shipping_address.clone().unwrap_or_default();
    MappedOrder {
        account_id,
        order_id: OrderId(remote.order_id.clone()),
        created_at: remote.created_utc(),
        modified_at: remote.modified_utc(),
        payment_status: PaymentStatus::from_remote(&remote.payment_status),
        is_cancelled: remote.is_cancelled,
        buyer_name: buyer.name,
        buyer_email: buyer.email,
        ship_name: address.name,
        ship_line1: address.line1,
        ship_line2: address.line2,
        ship_city: address.city,
        ship_state: address.state,
        ship_zip: address.zip,
        ship_country: address.country,
        item_title: first_item.map(|i| i.title.clone()).unwrap_or_default(),
        item_sku: first_item.and_then(|i| i.sku.clone()),
        item_quantity: first_item.map(|i| i.quantity).unwrap_or(1),
        tracking_number: remote.tracking_number.clone(),
        carrier: remote.carrier.clone(),
        shipped_at: remote.shipped_utc(),
        note: remote.note.clone(),
        marketplace: remote.marketplace.clone(),
        currency: remote.currency.clone(),
        conversion_rate,
        subtotal,
        shipping,
        tax,
        discount,
        order_total,
        earnings,
        marketplace_fee: None,
        subtotal_usd: subtotal.mul_rate(conversion_rate),
        shipping_usd: shipping.mul_rate(conversion_rate),
        tax_usd: tax.mul_rate(conversion_rate),
        discount_usd: discount.mul_rate(conversion_rate),
        order_total_usd: order_total.mul_rate(conversion_rate),
        earnings_usd: earnings.map(|e| e.mul_rate(conversion_rate)),
        marketplace_fee_usd: None,
    }
}

fn rates_differ(a: f64, b: f64) -> bool {
    (a - b).abs() > 1e-9
}

fn option_updates<T: PartialEq>(existing: &Option<T>, incoming: &Option<T>) -> bool {
    match incoming {
        Some(value) => existing.as_ref() != Some(value),
        None => false,
    }
}

/// Field-by-field comparison of a stored record against a fresher remote copy.
///
/// `Some`-valued incoming fields are compared; an incoming `None` never counts as a change,
/// so the remote omitting a field cannot erase locally held data. Timestamps compare at
/// second precision, matching the remote clock's resolution.
pub fn diff(existing: &OrderRecord, incoming: &MappedOrder) -> ChangeSet {
    let mut changed = Vec::new();
    if existing.payment_status != incoming.payment_status {
        changed.push(OrderField::PaymentStatus);
    }
    if existing.is_cancelled != incoming.is_cancelled {
        changed.push(OrderField::Cancelled);
    }
    if option_updates(&existing.tracking_number, &incoming.tracking_number) {
        changed.push(OrderField::TrackingNumber);
    }
    if option_updates(&existing.carrier, &incoming.carrier) {
        changed.push(OrderField::Carrier);
    }
    if incoming.shipped_at.map(|t| t.timestamp()) != existing.shipped_at.map(|t| t.timestamp())
        && incoming.shipped_at.is_some()
    {
        changed.push(OrderField::ShippedAt);
    }
    if option_updates(&existing.ship_name, &incoming.ship_name) {
        changed.push(OrderField::ShipName);
    }
    if option_updates(&existing.ship_line1, &incoming.ship_line1) {
        changed.push(OrderField::ShipLine1);
    }
    if option_updates(&existing.ship_line2, &incoming.ship_line2) {
        changed.push(OrderField::ShipLine2);
    }
    if option_updates(&existing.ship_city, &incoming.ship_city) {
        changed.push(OrderField::ShipCity);
    }
    if option_updates(&existing.ship_state, &incoming.ship_state) {
        changed.push(OrderField::ShipState);
    }
    if option_updates(&existing.ship_zip, &incoming.ship_zip) {
        changed.push(OrderField::ShipZip);
    }
    if option_updates(&existing.ship_country, &incoming.ship_country) {
        changed.push(OrderField::ShipCountry);
    }
    if option_updates(&existing.buyer_name, &incoming.buyer_name) {
        changed.push(OrderField::BuyerName);
    }
    if option_updates(&existing.buyer_email, &incoming.buyer_email) {
        changed.push(OrderField::BuyerEmail);
    }
    if existing.item_title != incoming.item_title
        || option_updates(&existing.item_sku, &incoming.item_sku)
        || existing.item_quantity != incoming.item_quantity
    {
        changed.push(OrderField::LineItem);
    }
    if option_updates(&existing.note, &incoming.note) {
        changed.push(OrderField::Note);
    }
    if existing.subtotal != incoming.subtotal
        || existing.shipping != incoming.shipping
        || existing.tax != incoming.tax
        || existing.discount != incoming.discount
        || existing.order_total != incoming.order_total
        || option_updates(&existing.earnings, &incoming.earnings)
    {
        changed.push(OrderField::Amounts);
    }
    if rates_differ(existing.conversion_rate, incoming.conversion_rate) && incoming.conversion_rate != 0.0 {
        changed.push(OrderField::ConversionRate);
    }
    ChangeSet { changed }
}

/// Fold the incoming copy over the stored record. Remote-sourced fields take the incoming
/// value (with incoming `None` keeping the stored value); derived fields and manual inputs
/// pass through untouched.
pub fn merge(existing: &OrderRecord, incoming: &MappedOrder) -> OrderRecord {
    let mut merged = existing.clone();
    merged.modified_at = incoming.modified_at;
    merged.payment_status = incoming.payment_status;
    merged.is_cancelled = incoming.is_cancelled;
    merged.buyer_name = incoming.buyer_name.clone().or(merged.buyer_name);
    merged.buyer_email = incoming.buyer_email.clone().or(merged.buyer_email);
    merged.ship_name = incoming.ship_name.clone().or(merged.ship_name);
    merged.ship_line1 = incoming.ship_line1.clone().or(merged.ship_line1);
    merged.ship_line2 = incoming.ship_line2.clone().or(merged.ship_line2);
    merged.ship_city = incoming.ship_city.clone().or(merged.ship_city);
    merged.ship_state = incoming.ship_state.clone().or(merged.ship_state);
    merged.ship_zip = incoming.ship_zip.clone().or(merged.ship_zip);
    merged.ship_country = incoming.ship_country.clone().or(merged.ship_country);
    merged.item_title = incoming.item_title.clone();
    merged.item_sku = incoming.item_sku.clone().or(merged.item_sku);
    merged.item_quantity = incoming.item_quantity;
    merged.tracking_number = incoming.tracking_number.clone().or(merged.tracking_number);
    merged.carrier = incoming.carrier.clone().or(merged.carrier);
    merged.shipped_at = incoming.shipped_at.or(merged.shipped_at);
    merged.note = incoming.note.clone().or(merged.note);
    merged.subtotal = incoming.subtotal;
    merged.shipping = incoming.shipping;
    merged.tax = incoming.tax;
    merged.discount = incoming.discount;
    merged.order_total = incoming.order_total;
    merged.earnings = incoming.earnings.or(merged.earnings);
    if incoming.conversion_rate != 0.0 {
        merged.conversion_rate = incoming.conversion_rate;
        merged.subtotal_usd = incoming.subtotal_usd;
        merged.shipping_usd = incoming.shipping_usd;
        merged.tax_usd = incoming.tax_usd;
        merged.discount_usd = incoming.discount_usd;
        merged.order_total_usd = incoming.order_total_usd;
        merged.earnings_usd = incoming.earnings_usd.or(merged.earnings_usd);
    } else {
        // This copy carries no rate; its mirrors are all zero. Keep the stored rate and
        // rebuild the mirrors from the incoming source amounts so they stay in step.
        let rate = merged.conversion_rate;
        merged.subtotal_usd = incoming.subtotal.mul_rate(rate);
        merged.shipping_usd = incoming.shipping.mul_rate(rate);
        merged.tax_usd = incoming.tax.mul_rate(rate);
        merged.discount_usd = incoming.discount.mul_rate(rate);
        merged.order_total_usd = incoming.order_total.mul_rate(rate);
        merged.earnings_usd = merged.earnings.map(|e| e.mul_rate(rate));
    }
    merged
}

/// Reconcile one mapped order against storage.
///
/// First sightings are inserted. Known orders are only touched when the incoming copy's
/// modified clock is strictly ahead of the stored one; a stale or equal copy is ignored
/// entirely, so re-running a window is idempotent.
pub async fn reconcile<B: OrderStore>(db: &B, incoming: &MappedOrder) -> Result<ReconcileOutcome, OrderStoreError> {
    match db.fetch_order_by_order_id(&incoming.order_id).await? {
        None => {
            let id = db.insert_order(incoming).await?;
            let order = db
                .fetch_order_by_order_id(&incoming.order_id)
                .await?
                .ok_or_else(|| OrderStoreError::OrderNotFound(format!("{} vanished after insert", incoming.order_id)))?;
            debug!("🔄️ Order {} first seen, stored with id {id}", incoming.order_id);
            Ok(ReconcileOutcome { order, changes: ChangeSet::default(), is_new: true, persisted: true, previous_status: None })
        },
        Some(existing) => {
            if incoming.modified_at.timestamp() <= existing.modified_at.timestamp() {
                trace!("🔄️ Order {} unchanged since last pass. Skipping", incoming.order_id);
                return Ok(ReconcileOutcome {
                    order: existing,
                    changes: ChangeSet::default(),
                    is_new: false,
                    persisted: false,
                    previous_status: None,
                });
            }
            let changes = diff(&existing, incoming);
            let previous_status = existing.payment_status;
            let merged = merge(&existing, incoming);
            db.update_order(&merged).await?;
            if !changes.is_empty() {
                debug!("🔄️ Order {} updated. {} field(s) changed", incoming.order_id, changes.changed.len());
            }
            Ok(ReconcileOutcome {
                order: merged,
                changes,
                is_new: false,
                persisted: true,
                previous_status: Some(previous_status),
            })
        },
    }
}

#[cfg(test)]
mod test {
    use chrono::{TimeZone, Utc};
    use marketplace_tools::{Buyer, RemoteAddress, RemoteLineItem};

    use super::*;

    fn remote_order() -> RemoteOrder {
        RemoteOrder {
            order_id: "310442".to_string(),
            created_at: 1_714_000_000,
            modified_at: 1_714_003_600,
            payment_status: "paid".to_string(),
            is_cancelled: false,
            marketplace: "UK".to_string(),
            currency: "GBP".to_string(),
            buyer: Some(Buyer { name: Some("A. Customer".to_string()), email: None }),
            shipping_address: Some(RemoteAddress {
                line1: Some("1 High St".to_string()),
                city: Some("Leeds".to_string()),
                ..RemoteAddress::default()
            }),
            line_items: vec![RemoteLineItem { title: "Walnut box".to_string(), sku: Some("WB-12".to_string()), quantity: 2 }],
            tracking_number: None,
            carrier: None,
            shipped_at: None,
            note: None,
            subtotal: "40.00".to_string(),
            shipping: "6.50".to_string(),
            tax: "9.30".to_string(),
            discount: None,
            grand_total: "55.80".to_string(),
            earnings: Some("38.75".to_string()),
            grand_total_usd: Some("69.75".to_string()),
        }
    }

    fn record_from(mapped: &MappedOrder) -> OrderRecord {
        let now = Utc::now();
        OrderRecord {
            id: 1,
            account_id: mapped.account_id,
            order_id: mapped.order_id.clone(),
            created_at: mapped.created_at,
            modified_at: mapped.modified_at,
            payment_status: mapped.payment_status,
            is_cancelled: mapped.is_cancelled,
            buyer_name: mapped.buyer_name.clone(),
            buyer_email: mapped.buyer_email.clone(),
            ship_name: mapped.ship_name.clone(),
            ship_line1: mapped.ship_line1.clone(),
            ship_line2: mapped.ship_line2.clone(),
            ship_city: mapped.ship_city.clone(),
            ship_state: mapped.ship_state.clone(),
            ship_zip: mapped.ship_zip.clone(),
            ship_country: mapped.ship_country.clone(),
            item_title: mapped.item_title.clone(),
            item_sku: mapped.item_sku.clone(),
            item_quantity: mapped.item_quantity,
            tracking_number: mapped.tracking_number.clone(),
            carrier: mapped.carrier.clone(),
            shipped_at: mapped.shipped_at,
            note: mapped.note.clone(),
            marketplace: mapped.marketplace.clone(),
            currency: mapped.currency.clone(),
            conversion_rate: mapped.conversion_rate,
            subtotal: mapped.subtotal,
            shipping: mapped.shipping,
            tax: mapped.tax,
            discount: mapped.discount,
            order_total: mapped.order_total,
            earnings: mapped.earnings,
            marketplace_fee: None,
            subtotal_usd: mapped.subtotal_usd,
            shipping_usd: mapped.shipping_usd,
            tax_usd: mapped.tax_usd,
            discount_usd: mapped.discount_usd,
            order_total_usd: mapped.order_total_usd,
            earnings_usd: mapped.earnings_usd,
            marketplace_fee_usd: None,
            ad_fee: None,
            pre_tax_cost: None,
            estimated_tax: None,
            withholding: None,
            net: None,
            settlement_rate: None,
            settlement_amount: None,
            supplier_cost: None,
            supplier_fee: None,
            profit: None,
            first_seen_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn conversion_rate_from_usd_total() {
        let mapped = map_remote(1, &remote_order());
        assert!((mapped.conversion_rate - 1.25).abs() < 1e-9);
        assert_eq!(mapped.order_total, Money::from_cents(5_580));
        assert_eq!(mapped.order_total_usd, Money::from_cents(6_975));
        assert_eq!(mapped.earnings_usd, Some(Money::from_cents(4_844)));
    }

    #[test]
    fn reference_marketplace_gets_unit_rate() {
        let mut remote = remote_order();
        remote.marketplace = "US".to_string();
        remote.currency = "USD".to_string();
        remote.grand_total_usd = None;
        let mapped = map_remote(1, &remote);
        assert!((mapped.conversion_rate - 1.0).abs() < 1e-9);
        assert_eq!(mapped.order_total_usd, mapped.order_total);
    }

    #[test]
    fn usd_denominated_order_gets_unit_rate() {
        let mut remote = remote_order();
        remote.marketplace = "CA".to_string();
        remote.currency = "USD".to_string();
        remote.grand_total_usd = None;
        let mapped = map_remote(1, &remote);
        assert!((mapped.conversion_rate - 1.0).abs() < 1e-9);
    }

    #[test]
    fn missing_usd_total_means_unknown_rate() {
        let mut remote = remote_order();
        remote.grand_total_usd = None;
        let mapped = map_remote(1, &remote);
        assert_eq!(mapped.conversion_rate, 0.0);
        assert_eq!(mapped.order_total_usd, Money::ZERO);
    }

    #[test]
    fn garbled_amount_defaults_to_zero() {
        let mut remote = remote_order();
        remote.tax = "nine".to_string();
        let mapped = map_remote(1, &remote);
        assert_eq!(mapped.tax, Money::ZERO);
        // The rest of the record still maps
        assert_eq!(mapped.subtotal, Money::from_cents(4_000));
    }

    #[test]
    fn diff_flags_fulfilment_changes_as_notifiable() {
        let mapped = map_remote(1, &remote_order());
        let existing = record_from(&mapped);
        let mut incoming = mapped.clone();
        incoming.tracking_number = Some("TRK-1".to_string());
        incoming.carrier = Some("RoyalMail".to_string());
        incoming.shipped_at = Some(Utc.timestamp_opt(1_714_100_000, 0).unwrap());
        incoming.note = Some("gift wrap".to_string());
        let changes = diff(&existing, &incoming);
        assert!(changes.contains(OrderField::TrackingNumber));
        assert!(changes.contains(OrderField::Carrier));
        assert!(changes.contains(OrderField::ShippedAt));
        assert!(changes.contains(OrderField::Note));
        let notifiable = changes.notifiable();
        assert_eq!(notifiable.len(), 3);
        assert!(!notifiable.contains(&OrderField::Note));
    }

    #[test]
    fn incoming_none_is_not_a_change() {
        let mapped = map_remote(1, &remote_order());
        let mut existing = record_from(&mapped);
        existing.tracking_number = Some("TRK-1".to_string());
        let changes = diff(&existing, &mapped);
        assert!(changes.is_empty());
    }

    #[test]
    fn merge_preserves_manual_and_derived_fields() {
        let mapped = map_remote(1, &remote_order());
        let mut existing = record_from(&mapped);
        existing.ad_fee = Some(Money::from_cents(150));
        existing.pre_tax_cost = Some(Money::from_cents(1_000));
        existing.withholding = Some(Money::from_cents(48));
        existing.marketplace_fee = Some(Money::from_cents(130));
        let mut incoming = mapped.clone();
        incoming.tracking_number = Some("TRK-1".to_string());
        let merged = merge(&existing, &incoming);
        assert_eq!(merged.ad_fee, Some(Money::from_cents(150)));
        assert_eq!(merged.pre_tax_cost, Some(Money::from_cents(1_000)));
        assert_eq!(merged.withholding, Some(Money::from_cents(48)));
        assert_eq!(merged.marketplace_fee, Some(Money::from_cents(130)));
        assert_eq!(merged.tracking_number, Some("TRK-1".to_string()));
    }

    #[test]
    fn merge_keeps_stored_values_on_incoming_none() {
        let mapped = map_remote(1, &remote_order());
        let mut existing = record_from(&mapped);
        existing.tracking_number = Some("TRK-1".to_string());
        existing.earnings = Some(Money::from_cents(3_875));
        let mut incoming = mapped.clone();
        incoming.tracking_number = None;
        incoming.earnings = None;
        incoming.earnings_usd = None;
        let merged = merge(&existing, &incoming);
        assert_eq!(merged.tracking_number, Some("TRK-1".to_string()));
        assert_eq!(merged.earnings, Some(Money::from_cents(3_875)));
    }

    #[test]
    fn unknown_incoming_rate_keeps_stored_rate() {
        let mapped = map_remote(1, &remote_order());
        let existing = record_from(&mapped);
        let mut incoming = mapped.clone();
        incoming.conversion_rate = 0.0;
        incoming.subtotal_usd = Money::ZERO;
        incoming.shipping_usd = Money::ZERO;
        incoming.tax_usd = Money::ZERO;
        incoming.discount_usd = Money::ZERO;
        incoming.order_total_usd = Money::ZERO;
        incoming.earnings_usd = None;
        let changes = diff(&existing, &incoming);
        assert!(!changes.contains(OrderField::ConversionRate));
        let merged = merge(&existing, &incoming);
        assert!((merged.conversion_rate - 1.25).abs() < 1e-9);
        // The mirrors follow the retained rate rather than the incoming zeroed copies
        assert_eq!(merged.subtotal_usd, mapped.subtotal.mul_rate(1.25));
        assert_eq!(merged.shipping_usd, mapped.shipping.mul_rate(1.25));
        assert_eq!(merged.tax_usd, mapped.tax.mul_rate(1.25));
        assert_eq!(merged.order_total_usd, mapped.order_total.mul_rate(1.25));
        assert_eq!(merged.earnings_usd, mapped.earnings.map(|e| e.mul_rate(1.25)));
    }
}
