//! # Order sync server
//! The HTTP trigger surface in front of the sync engine. It is responsible for:
//! * Kicking off full and modified-only sync passes over all enabled accounts.
//! * Triggering marketplace fee backfills.
//! * The manual-edit endpoints (earnings, ad spend, supplier costs) and single-order
//!   recalculation.
//! * Reading and appending settlement exchange rates.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more
//! information.

pub mod config;
pub mod data_objects;
pub mod errors;
pub mod routes;
pub mod server;
