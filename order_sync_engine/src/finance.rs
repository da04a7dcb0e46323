//! The financial recalculation pipeline.
//!
//! `recalculate` is a pure function of an order's raw facts and the [`FinancePolicy`]; every
//! stage short-circuits to `None` when an input it needs is unknown. The async
//! [`resolve_settlement_rate`] helper looks up the dated settlement-ledger rate separately, so
//! the pipeline itself stays synchronous and trivially testable.
use std::env;

use chrono::NaiveDate;
use log::*;
use mos_common::Money;
use serde::Serialize;

use crate::{
    db_types::{OrderRecord, PaymentStatus},
    traits::{ExchangeRateError, ExchangeRates},
};

/// The tunable constants of the pipeline. Defaults carry the production values; each can be
/// overridden with an `MOS_FINANCE_*` environment variable.
#[derive(Debug, Clone)]
pub struct FinancePolicy {
    /// Fraction of earnings withheld at source.
    pub withholding_rate: f64,
    /// Fixed per-order processing fee, waived on zero earnings.
    pub order_fee: Money,
    /// The exchange-rate ledger settlements are converted through.
    pub settlement_ledger: String,
    /// Used only while the settlement ledger has no rate history at all.
    pub bootstrap_settlement_rate: f64,
    /// Conversion applied to supplier cost inputs.
    pub supplier_fx_rate: f64,
    pub supplier_fee_rate: f64,
    pub supplier_tax_rate: f64,
    /// Refunded orders sold after this date are exempt from the supplier tax multiplier.
    pub supplier_tax_waiver_date: NaiveDate,
}

impl Default for FinancePolicy {
    fn default() -> Self {
        Self {
            withholding_rate: 0.01,
            order_fee: Money::from_cents(24),
            settlement_ledger: "USD_INR".to_string(),
            bootstrap_settlement_rate: 83.0,
            supplier_fx_rate: 11.5,
            supplier_fee_rate: 0.05,
            supplier_tax_rate: 0.13,
            supplier_tax_waiver_date: NaiveDate::from_ymd_opt(2023, 4, 1).unwrap_or(NaiveDate::MIN),
        }
    }
}

impl FinancePolicy {
    pub fn from_env_or_default() -> Self {
        let mut policy = Self::default();
        if let Some(rate) = read_f64("MOS_FINANCE_WITHHOLDING_RATE") {
            policy.withholding_rate = rate;
        }
        if let Ok(fee) = env::var("MOS_FINANCE_ORDER_FEE") {
            match fee.parse::<Money>() {
                Ok(fee) => policy.order_fee = fee,
                Err(e) => warn!("🪛️ Ignoring invalid MOS_FINANCE_ORDER_FEE: {e}"),
            }
        }
        if let Ok(ledger) = env::var("MOS_FINANCE_SETTLEMENT_LEDGER") {
            policy.settlement_ledger = ledger;
        }
        if let Some(rate) = read_f64("MOS_FINANCE_BOOTSTRAP_RATE") {
            policy.bootstrap_settlement_rate = rate;
        }
        if let Some(rate) = read_f64("MOS_FINANCE_SUPPLIER_FX_RATE") {
            policy.supplier_fx_rate = rate;
        }
        if let Some(rate) = read_f64("MOS_FINANCE_SUPPLIER_FEE_RATE") {
            policy.supplier_fee_rate = rate;
        }
        if let Some(rate) = read_f64("MOS_FINANCE_SUPPLIER_TAX_RATE") {
            policy.supplier_tax_rate = rate;
        }
        policy
    }
}

fn read_f64(var: &str) -> Option<f64> {
    let raw = env::var(var).ok()?;
    match raw.parse::<f64>() {
        Ok(v) => Some(v),
        Err(e) => {
            warn!("🪛️ Ignoring invalid {var}: {e}");
            None
        },
    }
}

/// Everything `recalculate` needs, lifted off an order record.
#[derive(Debug, Clone, Default)]
pub struct FinanceInputs {
    /// USD earnings, `None` while unknown (e.g. after a partial refund).
    pub earnings: Option<Money>,
    /// Settlement-ledger rate for the sale date, `None` when no applicable rate exists.
    pub settlement_rate: Option<f64>,
    pub pre_tax_cost: Option<Money>,
    pub estimated_tax: Option<Money>,
    pub refunded: bool,
    pub sale_date: NaiveDate,
}

impl FinanceInputs {
    pub fn from_order(order: &OrderRecord, settlement_rate: Option<f64>) -> Self {
        Self {
            earnings: order.earnings_usd,
            settlement_rate,
            pre_tax_cost: order.pre_tax_cost,
            estimated_tax: order.estimated_tax,
            refunded: order.payment_status != PaymentStatus::Paid,
            sale_date: order.created_at.date_naive(),
        }
    }
}

/// The output of one recalculation. `None` means "unknown", never zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DerivedFields {
    pub withholding: Option<Money>,
    pub net: Option<Money>,
    pub settlement_rate: Option<f64>,
    pub settlement_amount: Option<Money>,
    pub supplier_cost: Option<Money>,
    pub supplier_fee: Option<Money>,
    pub profit: Option<Money>,
}

/// Run the full pipeline. Pure; all rate lookups happen beforehand.
pub fn recalculate(inputs: &FinanceInputs, policy: &FinancePolicy) -> DerivedFields {
    let mut derived = DerivedFields::default();
    if let Some(earnings) = inputs.earnings {
        let withholding = earnings.percent(policy.withholding_rate);
        // The per-order fee is waived on zero earnings so a fully refunded order nets
        // exactly zero.
        let fee = if earnings.is_zero() { Money::ZERO } else { policy.order_fee };
        let net = earnings - withholding - fee;
        derived.withholding = Some(withholding);
        derived.net = Some(net);
        if let Some(rate) = inputs.settlement_rate {
            derived.settlement_rate = Some(rate);
            derived.settlement_amount = Some(net.mul_rate(rate));
        }
    }
    if let Some(pre_tax) = inputs.pre_tax_cost {
        let base = pre_tax + inputs.estimated_tax.unwrap_or(Money::ZERO);
        let tax_multiplier = if inputs.refunded && inputs.sale_date > policy.supplier_tax_waiver_date {
            1.0
        } else {
            1.0 + policy.supplier_tax_rate
        };
        derived.supplier_cost = Some(base.mul_rate(policy.supplier_fx_rate).mul_rate(tax_multiplier));
        derived.supplier_fee = Some(base.mul_rate(policy.supplier_fx_rate).mul_rate(policy.supplier_fee_rate));
    }
    if let (Some(settlement), Some(cost), Some(fee)) =
        (derived.settlement_amount, derived.supplier_cost, derived.supplier_fee)
    {
        derived.profit = Some(settlement - cost - fee);
    }
    derived
}

/// Look up the settlement rate for a sale date.
///
/// Returns `None` when rate history exists but none of it applies to the date. The bootstrap
/// constant is used only while the ledger has no history at all.
pub async fn resolve_settlement_rate<B: ExchangeRates>(
    db: &B,
    policy: &FinancePolicy,
    sale_date: NaiveDate,
) -> Result<Option<f64>, ExchangeRateError> {
    if !db.has_rates(&policy.settlement_ledger).await? {
        debug!("💱️ No rate history for {}; using bootstrap rate {}", policy.settlement_ledger, policy.bootstrap_settlement_rate);
        return Ok(Some(policy.bootstrap_settlement_rate));
    }
    match db.fetch_rate_at(&policy.settlement_ledger, sale_date).await {
        Ok(rate) => Ok(Some(rate.rate)),
        Err(ExchangeRateError::RateDoesNotExist(_)) => {
            warn!("💱️ No {} rate applies on or before {sale_date}", policy.settlement_ledger);
            Ok(None)
        },
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn paid_inputs(earnings_cents: i64, rate: f64) -> FinanceInputs {
        FinanceInputs {
            earnings: Some(Money::from_cents(earnings_cents)),
            settlement_rate: Some(rate),
            pre_tax_cost: None,
            estimated_tax: None,
            refunded: false,
            sale_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        }
    }

    #[test]
    fn standard_sale() {
        let policy = FinancePolicy::default();
        let derived = recalculate(&paid_inputs(10_000, 85.0), &policy);
        assert_eq!(derived.withholding, Some(Money::from_cents(100)));
        assert_eq!(derived.net, Some(Money::from_cents(9_876)));
        assert_eq!(derived.settlement_amount, Some(Money::from_cents(839_460)));
        assert_eq!(derived.supplier_cost, None);
        assert_eq!(derived.profit, None);
    }

    #[test]
    fn zero_earnings_nets_zero() {
        let policy = FinancePolicy::default();
        let derived = recalculate(&paid_inputs(0, 85.0), &policy);
        assert_eq!(derived.withholding, Some(Money::ZERO));
        assert_eq!(derived.net, Some(Money::ZERO));
        assert_eq!(derived.settlement_amount, Some(Money::ZERO));
    }

    #[test]
    fn unknown_earnings_propagate() {
        let policy = FinancePolicy::default();
        let mut inputs = paid_inputs(10_000, 85.0);
        inputs.earnings = None;
        let derived = recalculate(&inputs, &policy);
        assert_eq!(derived, DerivedFields::default());
    }

    #[test]
    fn missing_rate_stops_at_net() {
        let policy = FinancePolicy::default();
        let mut inputs = paid_inputs(10_000, 85.0);
        inputs.settlement_rate = None;
        let derived = recalculate(&inputs, &policy);
        assert_eq!(derived.net, Some(Money::from_cents(9_876)));
        assert_eq!(derived.settlement_amount, None);
        assert_eq!(derived.profit, None);
    }

    #[test]
    fn supplier_costs_and_profit() {
        let policy = FinancePolicy::default();
        let mut inputs = paid_inputs(10_000, 85.0);
        inputs.pre_tax_cost = Some(Money::from_cents(1_000));
        inputs.estimated_tax = Some(Money::from_cents(200));
        let derived = recalculate(&inputs, &policy);
        // base 12.00 * 11.5 = 138.00; * 1.13 = 155.94; fee 138.00 * 0.05 = 6.90
        assert_eq!(derived.supplier_cost, Some(Money::from_cents(15_594)));
        assert_eq!(derived.supplier_fee, Some(Money::from_cents(690)));
        let expected = Money::from_cents(839_460) - Money::from_cents(15_594) - Money::from_cents(690);
        assert_eq!(derived.profit, Some(expected));
    }

    #[test]
    fn refund_after_cutoff_waives_supplier_tax() {
        let policy = FinancePolicy::default();
        let mut inputs = paid_inputs(0, 85.0);
        inputs.refunded = true;
        inputs.pre_tax_cost = Some(Money::from_cents(1_000));
        let derived = recalculate(&inputs, &policy);
        // base 10.00 * 11.5 = 115.00, no tax multiplier
        assert_eq!(derived.supplier_cost, Some(Money::from_cents(11_500)));
    }

    #[test]
    fn missing_estimated_tax_counts_as_zero() {
        let policy = FinancePolicy::default();
        let mut inputs = paid_inputs(10_000, 85.0);
        inputs.pre_tax_cost = Some(Money::from_cents(1_000));
        let derived = recalculate(&inputs, &policy);
        assert_eq!(derived.supplier_fee, Some(Money::from_cents(575)));
    }
}
