use std::time::Duration;

use log::*;
use mos_common::Secret;

const DEFAULT_BASE_URL: &str = "https://api.marketplace.example.com";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Default)]
pub struct MarketplaceConfig {
    /// Base URL of the marketplace API, e.g. "https://api.marketplace.example.com"
    pub base_url: String,
    pub client_id: String,
    pub client_secret: Secret<String>,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
}

impl MarketplaceConfig {
    pub fn from_env_or_default() -> Self {
        let base_url = std::env::var("MOS_MARKETPLACE_BASE_URL").unwrap_or_else(|_| {
            warn!("🪛️ MOS_MARKETPLACE_BASE_URL not set, using (probably useless) default");
            DEFAULT_BASE_URL.to_string()
        });
        let client_id = std::env::var("MOS_MARKETPLACE_CLIENT_ID").unwrap_or_else(|_| {
            warn!("🪛️ MOS_MARKETPLACE_CLIENT_ID not set, using (probably useless) default");
            "mos-client".to_string()
        });
        let client_secret = Secret::new(std::env::var("MOS_MARKETPLACE_CLIENT_SECRET").unwrap_or_else(|_| {
            warn!("🪛️ MOS_MARKETPLACE_CLIENT_SECRET not set, using (probably useless) default");
            "00000000000000".to_string()
        }));
        let timeout = std::env::var("MOS_MARKETPLACE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        Self { base_url, client_id, client_secret, timeout }
    }
}
