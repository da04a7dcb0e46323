use chrono::NaiveDate;
use thiserror::Error;

use crate::db_types::ExchangeRate;

#[derive(Debug, Clone, Error)]
pub enum ExchangeRateError {
    #[error("Could not access the exchange rate database. {0}")]
    DatabaseError(String),
    #[error("No exchange rate is recorded for {0}")]
    RateDoesNotExist(String),
}

/// An append-only, dated exchange-rate series per ledger (e.g. "USD_INR").
#[allow(async_fn_in_trait)]
pub trait ExchangeRates {
    /// The most recent rate with an effective date on or before `date`.
    async fn fetch_rate_at(&self, ledger: &str, date: NaiveDate) -> Result<ExchangeRate, ExchangeRateError>;

    /// The latest rate on record for the ledger, regardless of date.
    async fn fetch_last_rate(&self, ledger: &str) -> Result<ExchangeRate, ExchangeRateError>;

    /// Append a new rate. Existing entries are never modified.
    async fn set_exchange_rate(&self, rate: &ExchangeRate) -> Result<(), ExchangeRateError>;

    /// Whether any rate at all has been recorded for the ledger.
    async fn has_rates(&self, ledger: &str) -> Result<bool, ExchangeRateError>;
}
