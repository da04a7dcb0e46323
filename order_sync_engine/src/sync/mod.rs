//! The synchronization engine: credential upkeep, window planning, record reconciliation,
//! refund transitions and the per-account orchestrator that ties them together.

pub mod credentials;
pub mod orchestrator;
pub mod planner;
pub mod reconciler;
pub mod refunds;

use marketplace_tools::MarketplaceApiError;
use thiserror::Error;

use crate::traits::{AccountStoreError, ExchangeRateError, OrderStoreError};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Marketplace API error: {0}")]
    RemoteError(#[from] MarketplaceApiError),
    #[error("Account storage error: {0}")]
    AccountStoreError(#[from] AccountStoreError),
    #[error("Order storage error: {0}")]
    OrderStoreError(#[from] OrderStoreError),
    #[error("Exchange rate error: {0}")]
    ExchangeRateError(#[from] ExchangeRateError),
    #[error("Authorization failed for shop {0}: {1}")]
    Unauthorized(String, String),
    #[error("Order does not exist: {0}")]
    OrderNotFound(String),
    #[error("Invalid request: {0}")]
    Invalid(String),
}
