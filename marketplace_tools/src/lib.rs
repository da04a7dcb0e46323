//! HTTP client for the marketplace seller API.
//!
//! This crate owns everything that talks to the remote marketplace: the OAuth token endpoint,
//! the paginated order listing, and the payment-ledger feed that fee backfills are built from.
//! The retry and pagination utilities live here too, so that every remote call site shares a
//! single backoff policy and a single page-walking loop.
mod client;
mod config;
mod error;

mod data_objects;
mod fees;
mod filter;
pub mod paging;
pub mod retry;

pub use client::MarketplaceApi;
pub use config::MarketplaceConfig;
pub use data_objects::{Buyer, LedgerEntry, RemoteAddress, RemoteLineItem, RemoteOrder, TokenResponse};
pub use error::MarketplaceApiError;
pub use fees::{fold_fee_map, FeeMap};
pub use filter::{FilterExpr, TimeWindow};
pub use paging::{FetchOutcome, Page};
