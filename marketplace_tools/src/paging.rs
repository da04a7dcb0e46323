//! Offset-cursor pagination over the marketplace list endpoints.
use std::{future::Future, time::Duration};

use log::*;
use serde::Deserialize;

use crate::MarketplaceApiError;

/// Maximum number of records per page request.
pub const PAGE_SIZE: u32 = 200;
/// Hard ceiling on the cursor, bounding the cost of a malformed filter.
pub const MAX_RECORDS: u32 = 10_000;
/// Pause between successive page requests to stay clear of rate limits.
pub const PAGE_DELAY: Duration = Duration::from_millis(250);

/// One page of a list response: `{"items": [...], "total": n}`.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

/// The result of walking a paginated listing. `complete` is false when retries were exhausted
/// partway through, or when the safety ceiling stopped the cursor; the items gathered so far
/// are returned either way.
#[derive(Debug, Clone)]
pub struct FetchOutcome<T> {
    pub items: Vec<T>,
    pub complete: bool,
    pub pages: u32,
}

impl<T> Default for FetchOutcome<T> {
    fn default() -> Self {
        Self { items: Vec::new(), complete: false, pages: 0 }
    }
}

/// Repeatedly request pages of `page_size` records, advancing the offset cursor until the
/// cumulative count reaches the server-reported total or a short page arrives.
///
/// A page request that fails (after the caller's own retries) terminates the loop early with
/// the partial result rather than propagating the error.
pub async fn fetch_all_pages<T, F, Fut>(page_size: u32, delay: Duration, mut fetch_page: F) -> FetchOutcome<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Page<T>, MarketplaceApiError>>,
{
    let mut outcome = FetchOutcome::default();
    let mut offset = 0u32;
    loop {
        if offset >= MAX_RECORDS {
            warn!("📡️ Pagination stopped at the {MAX_RECORDS}-record ceiling. Check the filter expression.");
            break;
        }
        let page = match fetch_page(offset).await {
            Ok(page) => page,
            Err(e) => {
                warn!("📡️ Page request at offset {offset} failed: {e}. Returning {} records fetched so far.", outcome.items.len());
                break;
            },
        };
        let count = page.items.len();
        outcome.items.extend(page.items);
        outcome.pages += 1;
        trace!("📡️ Fetched page {} ({count} records, {} of {} total)", outcome.pages, outcome.items.len(), page.total);
        if outcome.items.len() as u64 >= page.total || count < page_size as usize {
            outcome.complete = true;
            break;
        }
        offset += page_size;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
    outcome
}
