//! Refund state transitions.
//!
//! The only modelled transitions start at `Paid`. A full refund zeroes every monetary field
//! and recomputes to all-zero derived values; a partial refund marks earnings as unknown and
//! lets the pipeline propagate the `None`. Reversals back to `Paid` are not modelled, and a
//! repeated report of the same refunded status is a no-op.
use log::*;
use mos_common::Money;

use crate::db_types::{OrderRecord, PaymentStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefundAction {
    /// Full refund: zero every monetary field on the record.
    ZeroOut,
    /// Partial refund: the true earnings are unknown until entered by hand.
    MarkUnknown,
}

/// Evaluate an old-vs-new status pair. Only `Paid -> *Refunded` yields an action.
pub fn evaluate_transition(old: PaymentStatus, new: PaymentStatus) -> Option<RefundAction> {
    match (old, new) {
        (PaymentStatus::Paid, PaymentStatus::FullyRefunded) => Some(RefundAction::ZeroOut),
        (PaymentStatus::Paid, PaymentStatus::PartiallyRefunded) => Some(RefundAction::MarkUnknown),
        _ => None,
    }
}

/// Apply the action to the record in place. The caller persists the record and re-runs the
/// financial pipeline afterwards.
pub fn apply_refund_action(order: &mut OrderRecord, action: RefundAction) {
    match action {
        RefundAction::ZeroOut => {
            info!("🔄️ Order {} fully refunded. Zeroing monetary fields", order.order_id);
            order.subtotal = Money::ZERO;
            order.shipping = Money::ZERO;
            order.tax = Money::ZERO;
            order.discount = Money::ZERO;
            order.order_total = Money::ZERO;
            order.earnings = Some(Money::ZERO);
            order.marketplace_fee = Some(Money::ZERO);
            order.subtotal_usd = Money::ZERO;
            order.shipping_usd = Money::ZERO;
            order.tax_usd = Money::ZERO;
            order.discount_usd = Money::ZERO;
            order.order_total_usd = Money::ZERO;
            order.earnings_usd = Some(Money::ZERO);
            order.marketplace_fee_usd = Some(Money::ZERO);
            order.ad_fee = Some(Money::ZERO);
            order.pre_tax_cost = Some(Money::ZERO);
            order.estimated_tax = Some(Money::ZERO);
        },
        RefundAction::MarkUnknown => {
            info!("🔄️ Order {} partially refunded. Earnings now unknown", order.order_id);
            order.earnings = None;
            order.earnings_usd = None;
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn only_paid_transitions_act() {
        use PaymentStatus::*;
        assert_eq!(evaluate_transition(Paid, FullyRefunded), Some(RefundAction::ZeroOut));
        assert_eq!(evaluate_transition(Paid, PartiallyRefunded), Some(RefundAction::MarkUnknown));
        assert_eq!(evaluate_transition(Paid, Paid), None);
        // Re-entrant reports are no-ops
        assert_eq!(evaluate_transition(FullyRefunded, FullyRefunded), None);
        assert_eq!(evaluate_transition(PartiallyRefunded, PartiallyRefunded), None);
        // Reversals and cross-refund moves are not modelled
        assert_eq!(evaluate_transition(FullyRefunded, Paid), None);
        assert_eq!(evaluate_transition(PartiallyRefunded, FullyRefunded), None);
    }
}
