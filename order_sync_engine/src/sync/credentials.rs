//! OAuth credential upkeep for seller accounts.
use chrono::{DateTime, Utc};
use log::*;
use marketplace_tools::MarketplaceApiError;

use crate::{
    db_types::{Account, TokenUpdate},
    sync::SyncError,
    traits::{AccountStore, RemoteSource},
};

/// Refresh the access token when less than this much validity remains.
pub const TOKEN_SAFETY_MARGIN_MS: i64 = 120_000;

/// Whether the account's access token is within the safety margin of expiry (or past it).
pub fn needs_refresh(account: &Account, now: DateTime<Utc>) -> bool {
    let elapsed_ms = (now - account.token_issued_at).num_milliseconds();
    let remaining_ms = account.expires_in * 1000 - elapsed_ms;
    remaining_ms < TOKEN_SAFETY_MARGIN_MS
}

/// Return an access token that is good for at least the safety margin, refreshing and
/// persisting a new token pair first if needed.
///
/// The rotated pair is written to storage before the new access token is returned, so a
/// crash between refresh and use cannot strand an unrecorded refresh token. A rejected
/// refresh grant maps to [`SyncError::Unauthorized`], which disables further work on the
/// account for this pass.
pub async fn ensure_valid_token<B, S>(db: &B, source: &S, account: &mut Account) -> Result<String, SyncError>
where
    B: AccountStore,
    S: RemoteSource,
{
    let now = Utc::now();
    if !needs_refresh(account, now) {
        return Ok(account.access_token.clone());
    }
    debug!("🔑️ Access token for shop {} is stale. Refreshing", account.shop_id);
    let response = match source.refresh_token(&account.refresh_token).await {
        Ok(response) => response,
        Err(MarketplaceApiError::Unauthorized(msg)) => {
            return Err(SyncError::Unauthorized(account.shop_id.clone(), msg));
        },
        Err(e) => return Err(e.into()),
    };
    let update = TokenUpdate {
        access_token: response.access_token.clone(),
        refresh_token: response.refresh_token.clone(),
        expires_in: response.expires_in,
        issued_at: now,
    };
    db.update_tokens(&account.shop_id, &update).await?;
    account.access_token = update.access_token;
    account.refresh_token = update.refresh_token;
    account.expires_in = update.expires_in;
    account.token_issued_at = update.issued_at;
    info!("🔑️ Token refreshed for shop {}. Valid for {}s", account.shop_id, account.expires_in);
    Ok(account.access_token.clone())
}

#[cfg(test)]
mod test {
    use chrono::Duration;

    use super::*;

    fn account(expires_in: i64, issued_ago_secs: i64, now: DateTime<Utc>) -> Account {
        Account {
            id: 1,
            shop_id: "shop-1".to_string(),
            name: "Test shop".to_string(),
            access_token: "at".to_string(),
            refresh_token: "rt".to_string(),
            expires_in,
            token_issued_at: now - Duration::seconds(issued_ago_secs),
            last_new_sync: None,
            last_modified_sync: None,
            initial_sync_start: now - Duration::days(30),
            enabled: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn fresh_token_is_kept() {
        let now = Utc::now();
        // 1 hour validity, issued 5 minutes ago
        assert!(!needs_refresh(&account(3600, 300, now), now));
    }

    #[test]
    fn token_near_expiry_is_refreshed() {
        let now = Utc::now();
        // 90 seconds of validity left, inside the 120s margin
        assert!(needs_refresh(&account(3600, 3510, now), now));
    }

    #[test]
    fn expired_token_is_refreshed() {
        let now = Utc::now();
        assert!(needs_refresh(&account(3600, 7200, now), now));
    }
}
