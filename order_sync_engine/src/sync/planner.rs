//! Incremental sync window planning.
//!
//! Each account pass runs up to two queries against the remote API: a new-orders window and a
//! modified-orders window. The planner derives both from the account's watermarks and what is
//! already stored locally, so repeated passes never re-fetch the whole history.
use chrono::{DateTime, Duration, Utc};
use marketplace_tools::TimeWindow;

use crate::db_types::Account;

/// Window ends are pulled back by this much so that a remote clock slightly behind ours
/// cannot hide records created right at the boundary.
pub const CLOCK_SKEW_BUFFER: Duration = Duration::seconds(5);
/// A new-orders window shorter than this is skipped; the next pass picks the records up.
pub const MIN_NEW_WINDOW: Duration = Duration::seconds(60);
/// Modified-orders scans reach back at most this far.
pub const MODIFIED_LOOKBACK: Duration = Duration::days(30);

/// The queries one account pass should run. `None` means the corresponding scan is skipped
/// this time round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncWindows {
    pub new_orders: Option<TimeWindow>,
    pub modified: Option<TimeWindow>,
}

/// Derive the fetch windows for an account.
///
/// The new-orders window opens just past the newest locally stored order (falling back to the
/// watermark, then to the account's initial sync start), so that a pass which fetched records
/// but failed before its watermark save does not re-fetch them. The modified window opens at
/// the modified watermark, clamped to the lookback horizon.
pub fn plan_windows(account: &Account, latest_local_creation: Option<DateTime<Utc>>, now: DateTime<Utc>) -> SyncWindows {
    let end = now - CLOCK_SKEW_BUFFER;

    let new_start = latest_local_creation
        .map(|t| t + Duration::seconds(1))
        .or(account.last_new_sync)
        .unwrap_or(account.initial_sync_start);
    let new_window = TimeWindow::new(new_start, end);
    let new_orders = (!new_window.is_empty() && new_window.span() >= MIN_NEW_WINDOW).then_some(new_window);

    let horizon = now - MODIFIED_LOOKBACK;
    let modified_start = account.last_modified_sync.unwrap_or(horizon).max(horizon);
    let modified_window = TimeWindow::new(modified_start, end);
    let modified = (!modified_window.is_empty()).then_some(modified_window);

    SyncWindows { new_orders, modified }
}

#[cfg(test)]
mod test {
    use super::*;

    fn account(
        last_new_sync: Option<DateTime<Utc>>,
        last_modified_sync: Option<DateTime<Utc>>,
        initial_sync_start: DateTime<Utc>,
    ) -> Account {
        let now = Utc::now();
        Account {
            id: 1,
            shop_id: "shop-1".to_string(),
            name: "Test shop".to_string(),
            access_token: "at".to_string(),
            refresh_token: "rt".to_string(),
            expires_in: 3600,
            token_issued_at: now,
            last_new_sync,
            last_modified_sync,
            initial_sync_start,
            enabled: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn first_sync_opens_at_initial_start() {
        let now = Utc::now();
        let start = now - Duration::days(90);
        let windows = plan_windows(&account(None, None, start), None, now);
        let new_orders = windows.new_orders.unwrap();
        assert_eq!(new_orders.start, start);
        assert_eq!(new_orders.end, now - CLOCK_SKEW_BUFFER);
        // No modified watermark: scan the full lookback horizon
        assert_eq!(windows.modified.unwrap().start, now - MODIFIED_LOOKBACK);
    }

    #[test]
    fn new_window_opens_past_latest_local_order() {
        let now = Utc::now();
        let watermark = now - Duration::hours(6);
        let latest_local = now - Duration::hours(2);
        let windows = plan_windows(&account(Some(watermark), None, now - Duration::days(90)), Some(latest_local), now);
        // The stored order wins over the stale watermark
        assert_eq!(windows.new_orders.unwrap().start, latest_local + Duration::seconds(1));
    }

    #[test]
    fn tiny_new_window_is_skipped() {
        let now = Utc::now();
        let latest_local = now - Duration::seconds(30);
        let windows = plan_windows(&account(None, None, now - Duration::days(90)), Some(latest_local), now);
        assert!(windows.new_orders.is_none());
        assert!(windows.modified.is_some());
    }

    #[test]
    fn modified_watermark_is_clamped_to_lookback() {
        let now = Utc::now();
        let stale = now - Duration::days(400);
        let windows = plan_windows(&account(None, Some(stale), now - Duration::days(500)), None, now);
        assert_eq!(windows.modified.unwrap().start, now - MODIFIED_LOOKBACK);
    }

    #[test]
    fn recent_modified_watermark_is_used_as_is() {
        let now = Utc::now();
        let recent = now - Duration::days(2);
        let windows = plan_windows(&account(None, Some(recent), now - Duration::days(90)), None, now);
        assert_eq!(windows.modified.unwrap().start, recent);
    }

    #[test]
    fn window_ends_are_skew_buffered() {
        let now = Utc::now();
        let windows = plan_windows(&account(None, None, now - Duration::days(90)), None, now);
        assert_eq!(windows.new_orders.unwrap().end, now - CLOCK_SKEW_BUFFER);
        assert_eq!(windows.modified.unwrap().end, now - CLOCK_SKEW_BUFFER);
    }
}
