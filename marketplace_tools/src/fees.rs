//! Folding the payment ledger into per-order fee totals.
use std::collections::HashMap;

use log::*;
use mos_common::Money;

use crate::LedgerEntry;

/// Ledger entry kinds that count as marketplace fees against an order.
pub const FEE_KINDS: &[&str] = &["transaction_fee", "listing_fee", "processing_fee", "shipping_label"];

pub fn is_fee_entry(entry: &LedgerEntry) -> bool {
    FEE_KINDS.contains(&entry.kind.as_str())
}

/// Net marketplace fees keyed by remote order id. `complete` is false when the ledger walk
/// behind this map stopped early; totals may then be understated.
#[derive(Debug, Clone, Default)]
pub struct FeeMap {
    totals: HashMap<String, Money>,
    pub complete: bool,
}

impl FeeMap {
    pub fn get(&self, order_id: &str) -> Option<Money> {
        self.totals.get(order_id).copied()
    }

    pub fn len(&self) -> usize {
        self.totals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    pub fn order_ids(&self) -> impl Iterator<Item = &String> {
        self.totals.keys()
    }
}

/// Fold ledger entries into a fee map: charges add to the referenced orders' running totals,
/// reversals subtract. Entries of non-fee kinds, or with unparseable amounts, are skipped.
///
/// The fold runs over the fully collected entry list, never streaming, so the totals are
/// stable before they are joined against orders.
pub fn fold_fee_map(entries: &[LedgerEntry], complete: bool) -> FeeMap {
    let mut map = FeeMap { complete, ..Default::default() };
    for entry in entries.iter().filter(|e| is_fee_entry(e)) {
        let amount = match entry.amount.parse::<Money>() {
            Ok(a) => a,
            Err(e) => {
                warn!("📡️ Skipping ledger entry {} with unparseable amount '{}': {e}", entry.id, entry.amount);
                continue;
            },
        };
        let signed = if entry.is_reversal() { -amount } else { amount };
        for order_id in &entry.order_ids {
            let total = map.totals.entry(order_id.clone()).or_default();
            *total = *total + signed;
        }
    }
    debug!("📡️ Fee map built: {} orders, complete={}", map.len(), map.complete);
    map
}

#[cfg(test)]
mod test {
    use super::*;

    fn entry(id: i64, kind: &str, direction: &str, amount: &str, orders: &[&str]) -> LedgerEntry {
        LedgerEntry {
            id,
            kind: kind.to_string(),
            direction: direction.to_string(),
            amount: amount.to_string(),
            currency: "USD".to_string(),
            posted_at: 1_714_000_000,
            order_ids: orders.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn charges_add_and_reversals_subtract() {
        let entries = vec![
            entry(1, "transaction_fee", "charge", "1.30", &["A"]),
            entry(2, "listing_fee", "charge", "0.20", &["A"]),
            entry(3, "transaction_fee", "reversal", "0.50", &["A"]),
            entry(4, "processing_fee", "charge", "0.75", &["B"]),
        ];
        let map = fold_fee_map(&entries, true);
        assert_eq!(map.get("A"), Some(Money::from_cents(100)));
        assert_eq!(map.get("B"), Some(Money::from_cents(75)));
        assert_eq!(map.get("C"), None);
        assert!(map.complete);
    }

    #[test]
    fn non_fee_kinds_are_ignored() {
        let entries = vec![
            entry(1, "deposit", "charge", "100.00", &["A"]),
            entry(2, "transaction_fee", "charge", "1.00", &["A"]),
        ];
        let map = fold_fee_map(&entries, true);
        assert_eq!(map.get("A"), Some(Money::from_units(1)));
    }

    #[test]
    fn entry_without_order_refs_contributes_nothing() {
        let entries = vec![entry(1, "listing_fee", "charge", "0.20", &[])];
        let map = fold_fee_map(&entries, true);
        assert!(map.is_empty());
    }

    #[test]
    fn unparseable_amounts_are_skipped() {
        let entries = vec![
            entry(1, "transaction_fee", "charge", "not-a-number", &["A"]),
            entry(2, "transaction_fee", "charge", "2.00", &["A"]),
        ];
        let map = fold_fee_map(&entries, false);
        assert_eq!(map.get("A"), Some(Money::from_units(2)));
        assert!(!map.complete);
    }
}
