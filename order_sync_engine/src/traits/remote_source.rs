use chrono::{DateTime, Utc};
use marketplace_tools::{FeeMap, FetchOutcome, FilterExpr, MarketplaceApi, MarketplaceApiError, RemoteOrder, TokenResponse};

/// The slice of the marketplace API the sync engine actually consumes.
///
/// The orchestrator is generic over this trait so that sync cycles can be driven against a
/// scripted fake in tests, with no HTTP server in the loop.
#[allow(async_fn_in_trait)]
pub trait RemoteSource {
    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, MarketplaceApiError>;

    /// Fetch every order matching the filter. Page failures after retries degrade to a
    /// partial outcome rather than an error.
    async fn fetch_orders(&self, token: &str, shop_id: &str, filter: &FilterExpr) -> FetchOutcome<RemoteOrder>;

    /// Aggregate ledger fee entries posted since `since` into per-order fee totals.
    async fn build_fee_map(&self, token: &str, shop_id: &str, since: DateTime<Utc>) -> FeeMap;
}

impl RemoteSource for MarketplaceApi {
    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, MarketplaceApiError> {
        MarketplaceApi::refresh_token(self, refresh_token).await
    }

    async fn fetch_orders(&self, token: &str, shop_id: &str, filter: &FilterExpr) -> FetchOutcome<RemoteOrder> {
        MarketplaceApi::fetch_orders(self, token, shop_id, filter).await
    }

    async fn build_fee_map(&self, token: &str, shop_id: &str, since: DateTime<Utc>) -> FeeMap {
        MarketplaceApi::build_fee_map(self, token, shop_id, since).await
    }
}
