//! Marketplace Order Sync engine
//!
//! The engine keeps a local datastore eventually consistent with a remote marketplace and
//! derives the financial picture of every order it ingests. It is split along the same lines
//! as the data flow:
//!
//! 1. Storage traits and the SQLite backend ([`traits`], `sqlite`). Access the database through
//!    the public APIs rather than the backend directly; the data types in [`db_types`] are the
//!    exception and are public.
//! 2. The synchronization flow ([`sync`]): credential lifecycle, incremental window planning,
//!    paginated fetching (via `marketplace_tools`), record reconciliation, the refund state
//!    machine, and the orchestrator that fans the whole thing out across accounts.
//! 3. The financial pipeline ([`finance`]): a pure recalculation of withholding, net,
//!    settlement, supplier cost and profit from a record's raw monetary facts.
//! 4. Thin API wrappers ([`AdminApi`] for manual edits and single-order recomputes,
//!    [`RatesApi`] for the exchange-rate ledger), created by handing them a backend that
//!    implements the relevant storage traits.
pub mod db_types;
pub mod finance;
pub mod sync;
pub mod traits;

mod api;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use api::{AdminApi, RatesApi};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use sync::{
    orchestrator::{AccountOutcome, BackfillOutcome, BackfillSummary, OrderChangeNotice, SyncApi, SyncScope, SyncSummary},
    SyncError,
};
