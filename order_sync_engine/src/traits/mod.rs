//! The behaviours a storage backend must provide for the sync engine to run on top of it.
//!
//! Each concern gets its own trait so that backends can be composed or mocked piecemeal in
//! tests. The SQLite backend implements all of them on one type.

mod account_store;
mod exchange_rates;
mod order_store;
mod remote_source;

pub use account_store::{AccountStore, AccountStoreError};
pub use exchange_rates::{ExchangeRateError, ExchangeRates};
pub use order_store::{OrderStore, OrderStoreError};
pub use remote_source::RemoteSource;
