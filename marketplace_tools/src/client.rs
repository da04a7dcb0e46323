use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
};
use serde::de::DeserializeOwned;

use crate::{
    config::MarketplaceConfig,
    data_objects::{LedgerEntry, RemoteOrder, TokenResponse},
    fees::fold_fee_map,
    filter::{FilterExpr, TimeWindow},
    paging::{fetch_all_pages, FetchOutcome, Page, PAGE_DELAY, PAGE_SIZE},
    retry::{with_backoff, RetryPolicy},
    FeeMap,
    MarketplaceApiError,
};

/// Client for the marketplace seller API.
///
/// Access tokens are supplied per call; the client holds no per-seller credential state, so a
/// single instance is shared across all accounts being synchronized.
#[derive(Clone)]
pub struct MarketplaceApi {
    config: MarketplaceConfig,
    retry: RetryPolicy,
    client: Arc<Client>,
}

impl MarketplaceApi {
    pub fn new(config: MarketplaceConfig) -> Result<Self, MarketplaceApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert("Accept", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| MarketplaceApiError::Initialization(e.to_string()))?;
        Ok(Self { config, retry: RetryPolicy::default(), client: Arc::new(client) })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    async fn rest_query<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        params: &[(&str, String)],
        form: Option<&[(&str, &str)]>,
    ) -> Result<T, MarketplaceApiError> {
        let url = self.url(path);
        trace!("📡️ Sending {method} {url}");
        let mut req = self.client.request(method, url);
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        if !params.is_empty() {
            req = req.query(params);
        }
        if let Some(form) = form {
            req = req.form(form);
        }
        let response = req.send().await.map_err(MarketplaceApiError::from_reqwest)?;
        let status = response.status();
        if status.is_success() {
            trace!("📡️ Query successful. {status}");
            response.json::<T>().await.map_err(|e| MarketplaceApiError::JsonError(e.to_string()))
        } else {
            let message = response.text().await.map_err(MarketplaceApiError::from_reqwest)?;
            match status.as_u16() {
                401 | 403 => Err(MarketplaceApiError::Unauthorized(message)),
                status => Err(MarketplaceApiError::QueryError { status, message }),
            }
        }
    }

    /// Exchange an authorization code for an initial token pair.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, MarketplaceApiError> {
        self.request_token(&[("grant_type", "authorization_code"), ("code", code)]).await
    }

    /// Exchange a refresh token for a fresh token pair. Transient failures are retried with
    /// the shared backoff policy; authorization failures are returned immediately.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, MarketplaceApiError> {
        self.request_token(&[("grant_type", "refresh_token"), ("refresh_token", refresh_token)]).await
    }

    async fn request_token(&self, grant: &[(&str, &str)]) -> Result<TokenResponse, MarketplaceApiError> {
        let mut form = vec![
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.reveal().as_str()),
        ];
        form.extend_from_slice(grant);
        debug!("📡️ Requesting token with grant_type={}", grant.first().map(|g| g.1).unwrap_or("?"));
        let response = with_backoff(&self.retry, MarketplaceApiError::is_retryable, "token request", || {
            self.rest_query::<TokenResponse>(Method::POST, "/oauth/token", None, &[], Some(&form))
        })
        .await?;
        info!("📡️ Token request succeeded. New token valid for {}s", response.expires_in);
        Ok(response)
    }

    async fn fetch_order_page(
        &self,
        token: &str,
        shop_id: &str,
        filter: &FilterExpr,
        offset: u32,
    ) -> Result<Page<RemoteOrder>, MarketplaceApiError> {
        let path = format!("/v1/shops/{shop_id}/orders");
        let params =
            [("filter", filter.to_string()), ("limit", PAGE_SIZE.to_string()), ("offset", offset.to_string())];
        with_backoff(&self.retry, MarketplaceApiError::is_retryable, "order page", || {
            self.rest_query::<Page<RemoteOrder>>(Method::GET, &path, Some(token), &params, None)
        })
        .await
    }

    /// Fetch every order matching the filter expression, walking the offset cursor until the
    /// listing is exhausted. Retry exhaustion on a page degrades to a partial result.
    pub async fn fetch_orders(
        &self,
        token: &str,
        shop_id: &str,
        filter: &FilterExpr,
    ) -> FetchOutcome<RemoteOrder> {
        debug!("📡️ Fetching orders for shop {shop_id} with filter {filter}");
        let outcome =
            fetch_all_pages(PAGE_SIZE, PAGE_DELAY, |offset| self.fetch_order_page(token, shop_id, filter, offset))
                .await;
        info!(
            "📡️ Fetched {} orders for shop {shop_id} in {} page(s){}",
            outcome.items.len(),
            outcome.pages,
            if outcome.complete { "" } else { " (incomplete)" }
        );
        outcome
    }

    async fn fetch_ledger_page(
        &self,
        token: &str,
        shop_id: &str,
        filter: &FilterExpr,
        offset: u32,
    ) -> Result<Page<LedgerEntry>, MarketplaceApiError> {
        let path = format!("/v1/shops/{shop_id}/ledger");
        let params =
            [("filter", filter.to_string()), ("limit", PAGE_SIZE.to_string()), ("offset", offset.to_string())];
        with_backoff(&self.retry, MarketplaceApiError::is_retryable, "ledger page", || {
            self.rest_query::<Page<LedgerEntry>>(Method::GET, &path, Some(token), &params, None)
        })
        .await
    }

    /// Fetch ledger entries posted since the given date.
    pub async fn fetch_ledger(
        &self,
        token: &str,
        shop_id: &str,
        since: DateTime<Utc>,
    ) -> FetchOutcome<LedgerEntry> {
        let filter = TimeWindow::new(since, Utc::now()).filter("posted");
        debug!("📡️ Fetching ledger for shop {shop_id} with filter {filter}");
        fetch_all_pages(PAGE_SIZE, PAGE_DELAY, |offset| self.fetch_ledger_page(token, shop_id, &filter, offset)).await
    }

    /// Scan the ledger feed since `since` and fold fee entries into a per-order fee map.
    /// The fold only happens once pagination has finished, so totals are stable.
    pub async fn build_fee_map(
        &self,
        token: &str,
        shop_id: &str,
        since: DateTime<Utc>,
    ) -> FeeMap {
        let outcome = self.fetch_ledger(token, shop_id, since).await;
        if !outcome.complete {
            warn!("📡️ Ledger scan for shop {shop_id} was incomplete; fee totals may be understated");
        }
        fold_fee_map(&outcome.items, outcome.complete)
    }
}
