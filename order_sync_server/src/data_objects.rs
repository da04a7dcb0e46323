use std::fmt::Display;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackfillParams {
    /// Scan ledger entries posted since this instant.
    pub since: DateTime<Utc>,
}

/// Monetary amounts arrive as decimal strings, e.g. "12.50".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EarningsParams {
    pub earnings: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdFeeParams {
    pub ad_fee: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostParams {
    pub pre_tax_cost: String,
    pub estimated_tax: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRateParams {
    pub ledger: String,
    pub rate: f64,
    pub effective_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeRateResult {
    pub ledger: String,
    pub rate: f64,
    pub effective_date: NaiveDate,
}
