//! The RatesApi manages the append-only settlement exchange-rate series.

use std::fmt::Debug;

use crate::{
    db_types::ExchangeRate,
    traits::{ExchangeRateError, ExchangeRates},
};

pub struct RatesApi<B> {
    db: B,
}

impl<B> Debug for RatesApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RatesApi")
    }
}

impl<B> RatesApi<B>
where B: ExchangeRates
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn fetch_last_rate(&self, ledger: &str) -> Result<ExchangeRate, ExchangeRateError> {
        self.db.fetch_last_rate(ledger).await
    }

    /// Append a new rate. Existing order records are not recomputed; they keep the rate that
    /// was in effect at their last recalculation.
    pub async fn set_exchange_rate(&self, rate: &ExchangeRate) -> Result<(), ExchangeRateError> {
        self.db.set_exchange_rate(rate).await
    }
}
